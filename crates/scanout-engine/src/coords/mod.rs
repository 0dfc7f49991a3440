//! Integer pixel geometry shared by the scanout pipeline and console glue.
//!
//! Canonical space:
//! - Physical pixels of the guest scanout
//! - Origin top-left
//! - +X right, +Y down

mod point;
mod rect;

pub use point::{Point, Size};
pub use rect::Rect;
