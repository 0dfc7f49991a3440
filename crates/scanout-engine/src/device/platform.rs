use std::fmt;

use super::PlatformError;

/// Extension advertised by devices that can report their device file.
pub const DEVICE_FILE_EXTENSION: &str = "device_drm";

/// Display extension required for rendering without any surface.
pub const SURFACELESS_EXTENSION: &str = "surfaceless_context";

/// Rendering API profile bound for the process.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ApiProfile {
    /// Desktop core profile.
    Core,
    /// Embedded-systems profile.
    Embedded,
}

impl ApiProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiProfile::Core => "core",
            ApiProfile::Embedded => "gles",
        }
    }
}

impl fmt::Display for ApiProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Version reported when a display is initialized.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Surface types a configuration must support.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceType {
    /// Offscreen (pbuffer-style) render targets.
    Offscreen,
}

/// Capability bits a configuration must match.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ConfigAttribs {
    pub surface_type: Option<SurfaceType>,
    pub renderable: ApiProfile,
}

impl ConfigAttribs {
    /// Attributes requested for `profile`.
    ///
    /// The core profile also asks for offscreen surfaces; the embedded profile
    /// only constrains the renderable type.
    pub fn for_profile(profile: ApiProfile) -> Self {
        match profile {
            ApiProfile::Core => Self {
                surface_type: Some(SurfaceType::Offscreen),
                renderable: ApiProfile::Core,
            },
            ApiProfile::Embedded => Self {
                surface_type: None,
                renderable: ApiProfile::Embedded,
            },
        }
    }
}

/// Handle of a rendering context created through a [`RenderPlatform`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u32);

/// Parameters a guest supplies when asking for a rendering context.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ContextParams {
    pub major_ver: u32,
    pub minor_ver: u32,
}

impl Default for ContextParams {
    fn default() -> Self {
        Self { major_ver: 3, minor_ver: 0 }
    }
}

/// Platform rendering API used to select a device and create contexts.
///
/// All calls happen on the thread that owns the rendering context; there is
/// no concurrent submission against one platform.
pub trait RenderPlatform {
    /// Enumerated device handle.
    type Device;
    /// Opened display bound to one device.
    type Display;
    /// Framebuffer configuration chosen for the display.
    type Config;

    /// Whether devices can be enumerated individually.
    fn supports_device_enumeration(&self) -> bool;

    fn query_devices(&self) -> Result<Vec<Self::Device>, PlatformError>;

    /// Space-separated extension list, `None` if the device reports none.
    fn device_extensions(&self, device: &Self::Device) -> Option<String>;

    /// Device file path; only meaningful when [`DEVICE_FILE_EXTENSION`] is advertised.
    fn device_file(&self, device: &Self::Device) -> Option<String>;

    fn open_device_display(&self, device: &Self::Device) -> Result<Self::Display, PlatformError>;

    /// Opens the platform's default display when enumeration is unavailable.
    fn open_default_display(&self) -> Result<Self::Display, PlatformError>;

    fn initialize(&self, display: &Self::Display) -> Result<ApiVersion, PlatformError>;

    fn bind_api(&self, display: &Self::Display, profile: ApiProfile) -> Result<(), PlatformError>;

    /// Returns every configuration matching `attribs`.
    fn choose_configs(
        &self,
        display: &Self::Display,
        attribs: &ConfigAttribs,
    ) -> Result<Vec<Self::Config>, PlatformError>;

    fn has_display_extension(&self, display: &Self::Display, name: &str) -> bool;

    /// Creates a context, sharing objects with `share` when given.
    fn create_context(
        &self,
        display: &Self::Display,
        config: &Self::Config,
        profile: ApiProfile,
        share: Option<ContextId>,
        params: &ContextParams,
    ) -> Result<ContextId, PlatformError>;

    fn destroy_context(&self, display: &Self::Display, context: ContextId);

    /// Makes `context` current on the calling thread (`None` releases it).
    fn make_current(
        &self,
        display: &Self::Display,
        context: Option<ContextId>,
    ) -> Result<(), PlatformError>;

    fn current_context(&self) -> Option<ContextId>;
}

/// Returns `true` if the space-separated `extensions` list contains `name`.
pub fn has_extension(extensions: &str, name: &str) -> bool {
    extensions.split_whitespace().any(|ext| ext == name)
}
