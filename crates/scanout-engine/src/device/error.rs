use std::fmt;

use super::ApiProfile;

/// Error reported by a [`RenderPlatform`](super::RenderPlatform) call.
///
/// Platforms describe their own failure (driver error code, wgpu error
/// message); the engine only needs to report it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PlatformError {
    message: String,
}

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for PlatformError {}

/// Startup failure of device selection or context initialization.
///
/// Platform failures are exposed through [`std::error::Error::source`], not
/// repeated in the message. Every variant is fatal: it indicates missing or misconfigured hardware or
/// driver support, so callers report it and abort startup.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum InitError {
    /// The device query itself failed.
    Enumeration(PlatformError),
    /// Enumeration succeeded but returned no devices.
    NoDevicesFound,
    /// An explicit render node was requested, none matched, and the policy is strict.
    RequestedDeviceNotFound(String),
    /// The platform display handle for the chosen device could not be opened.
    DisplayOpenFailed(PlatformError),
    DisplayInitFailed(PlatformError),
    ApiBindFailed { profile: ApiProfile, source: PlatformError },
    /// Zero or several configurations matched; exactly one is required.
    ConfigSelectionFailed { profile: ApiProfile, matches: usize },
    SurfacelessUnsupported,
    ContextCreationFailed(PlatformError),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::Enumeration(_) => write!(f, "device enumeration failed"),
            InitError::NoDevicesFound => write!(f, "no rendering devices exist"),
            InitError::RequestedDeviceNotFound(path) => {
                write!(f, "requested render node {path} not found")
            }
            InitError::DisplayOpenFailed(_) => write!(f, "failed to open display"),
            InitError::DisplayInitFailed(_) => write!(f, "display initialization failed"),
            InitError::ApiBindFailed { profile, .. } => {
                write!(f, "binding the {profile} API failed")
            }
            InitError::ConfigSelectionFailed { profile, matches } => write!(
                f,
                "config selection failed ({profile} mode): {matches} matching configs, expected exactly one"
            ),
            InitError::SurfacelessUnsupported => {
                write!(f, "surfaceless rendering is not supported by the display")
            }
            InitError::ContextCreationFailed(_) => write!(f, "shared context creation failed"),
        }
    }
}

impl std::error::Error for InitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InitError::Enumeration(e)
            | InitError::DisplayOpenFailed(e)
            | InitError::DisplayInitFailed(e)
            | InitError::ContextCreationFailed(e) => Some(e),
            InitError::ApiBindFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
