//! Headless GPU scanout engine.
//!
//! Renders guest framebuffers into host memory without a windowing system:
//! one rendering device is selected and opened once, then every graphic
//! console gets a scanout pipeline that composites the guest texture (and
//! cursor) and reads the result back into a host surface.

pub mod config;
pub mod console;
pub mod coords;
pub mod device;
pub mod logging;
pub mod render;
pub mod scanout;

#[cfg(test)]
mod testing;
