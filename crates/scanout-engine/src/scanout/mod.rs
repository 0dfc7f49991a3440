//! Per-console scanout pipeline.
//!
//! A guest hands over a texture each frame; on flush the pipeline composites
//! it (plus an optional cursor) into an owned texture and reads the result
//! back into host memory.
//!
//! GPU work goes through [`FramebufferOps`] and [`Compositor`] so the
//! pipeline can run against wgpu or a recording double.

mod framebuffer;
mod ops;
mod pipeline;
mod stats;
mod surface;

pub use framebuffer::{FramebufferBinding, TextureId, TextureRef};
pub use ops::{Compositor, FramebufferOps};
pub use pipeline::{CursorTexture, ScanoutPhase, ScanoutState};
pub use stats::ScanoutStats;
pub use surface::{DisplaySurface, HostSurface, PixelFormat, SurfaceRef};
