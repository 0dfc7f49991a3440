use std::fmt;

use crate::config::RenderNodePolicy;

use super::platform::{has_extension, DEVICE_FILE_EXTENSION};
use super::{InitError, RenderPlatform};

/// Summary of one enumerated device.
///
/// Built once per enumeration; the platform handle itself stays with the
/// caller so only the chosen one is opened.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RenderDevice {
    /// Position in enumeration order.
    pub index: usize,
    pub extensions: Option<String>,
    /// Device file, present only for devices advertising [`DEVICE_FILE_EXTENSION`].
    pub device_file: Option<String>,
}

impl RenderDevice {
    /// Queries extension string and device file of `device`.
    pub fn probe<P: RenderPlatform>(platform: &P, index: usize, device: &P::Device) -> Self {
        let extensions = platform.device_extensions(device);
        let device_file = match extensions.as_deref() {
            Some(exts) if has_extension(exts, DEVICE_FILE_EXTENSION) => {
                platform.device_file(device)
            }
            _ => None,
        };

        Self { index, extensions, device_file }
    }

    /// Whether the device can be matched against an explicit device path.
    pub fn is_eligible(&self) -> bool {
        self.extensions
            .as_deref()
            .is_some_and(|exts| has_extension(exts, DEVICE_FILE_EXTENSION))
    }
}

impl fmt::Display for RenderDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_eligible() {
            let file = self.device_file.as_deref().unwrap_or("NULL");
            write!(f, "device {} - {file}", self.index)
        } else {
            write!(f, "device {} - no {DEVICE_FILE_EXTENSION}", self.index)
        }
    }
}

/// Picks the device index to open.
///
/// Without a request the first device wins. With a request the first
/// eligible device (enumeration order) whose device file equals it wins;
/// otherwise `policy` decides between falling back to index 0 and failing.
pub fn choose_device(
    devices: &[RenderDevice],
    requested: Option<&str>,
    policy: RenderNodePolicy,
) -> Result<usize, InitError> {
    if devices.is_empty() {
        return Err(InitError::NoDevicesFound);
    }

    let Some(requested) = requested else {
        return Ok(0);
    };

    let matched = devices
        .iter()
        .filter(|d| d.is_eligible())
        .find(|d| d.device_file.as_deref() == Some(requested));

    match (matched, policy) {
        (Some(device), _) => Ok(device.index),
        (None, RenderNodePolicy::Fallback) => {
            log::warn!("render node {requested} not found, falling back to device 0");
            Ok(0)
        }
        (None, RenderNodePolicy::Strict) => {
            Err(InitError::RequestedDeviceNotFound(requested.to_string()))
        }
    }
}
