//! Rendering device selection + shared context management.
//!
//! This module is responsible for:
//! - enumerating rendering devices and picking one (explicit render node or first)
//! - opening and initializing a display on that device
//! - negotiating the API profile and the single matching configuration
//! - creating the shared context every console context shares with
//!
//! The platform API is abstracted by [`RenderPlatform`]; [`WgpuPlatform`] is
//! the wgpu-backed implementation.

mod context;
mod error;
mod init;
mod platform;
mod select;
mod wgpu_platform;

pub use context::RenderContext;
pub use error::{InitError, PlatformError};
pub use init::select_and_open;
pub use platform::{
    has_extension, ApiProfile, ApiVersion, ConfigAttribs, ContextId, ContextParams,
    RenderPlatform, SurfaceType, DEVICE_FILE_EXTENSION, SURFACELESS_EXTENSION,
};
pub use select::{choose_device, RenderDevice};
pub use wgpu_platform::{WgpuDevice, WgpuPlatform, WgpuPlatformConfig};
