//! Backend configuration.
//!
//! The option string follows the `key=value[,key=value...]` form used by
//! virtualization front ends for display backends, e.g.
//! `rendernode=/dev/dri/renderD128,gl=es,rendernode-policy=strict`.

use std::fmt;
use std::str::FromStr;

use crate::device::ApiProfile;

/// Rendering profile selector.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum GlMode {
    /// Let the backend pick; resolves to the core profile.
    #[default]
    On,
    /// Desktop core profile.
    Core,
    /// Embedded-systems profile.
    Es,
}

impl GlMode {
    /// Profile actually bound during context initialization.
    pub fn profile(self) -> ApiProfile {
        match self {
            GlMode::On | GlMode::Core => ApiProfile::Core,
            GlMode::Es => ApiProfile::Embedded,
        }
    }
}

impl FromStr for GlMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(GlMode::On),
            "core" => Ok(GlMode::Core),
            "es" => Ok(GlMode::Es),
            "off" => Err(ConfigError::GlRequired),
            other => Err(ConfigError::InvalidValue {
                key: "gl",
                value: other.to_string(),
            }),
        }
    }
}

/// What to do when an explicitly requested render node is not found.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum RenderNodePolicy {
    /// Open the first enumerated device instead (warning logged).
    #[default]
    Fallback,
    /// Fail initialization with `InitError::RequestedDeviceNotFound`.
    Strict,
}

impl FromStr for RenderNodePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fallback" => Ok(RenderNodePolicy::Fallback),
            "strict" => Ok(RenderNodePolicy::Strict),
            other => Err(ConfigError::InvalidValue {
                key: "rendernode-policy",
                value: other.to_string(),
            }),
        }
    }
}

/// Headless backend options.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct HeadlessConfig {
    /// Device file of the render node to use (e.g. `/dev/dri/renderD128`).
    pub rendernode: Option<String>,

    /// Requested rendering profile.
    pub gl: GlMode,

    /// Behavior for an unmatched `rendernode` request.
    pub rendernode_policy: RenderNodePolicy,
}

impl FromStr for HeadlessConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut config = HeadlessConfig::default();

        for option in s.split(',').map(str::trim).filter(|o| !o.is_empty()) {
            let Some((key, value)) = option.split_once('=') else {
                return Err(ConfigError::MissingValue(option.to_string()));
            };

            match key.trim() {
                "rendernode" => {
                    let value = value.trim();
                    if value.is_empty() {
                        return Err(ConfigError::MissingValue(key.to_string()));
                    }
                    config.rendernode = Some(value.to_string());
                }
                "gl" => config.gl = value.trim().parse()?,
                "rendernode-policy" => config.rendernode_policy = value.trim().parse()?,
                other => return Err(ConfigError::UnknownOption(other.to_string())),
            }
        }

        Ok(config)
    }
}

/// Option string errors.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ConfigError {
    UnknownOption(String),
    MissingValue(String),
    InvalidValue { key: &'static str, value: String },
    /// `gl=off` cannot drive a GPU scanout backend.
    GlRequired,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownOption(key) => write!(f, "unknown option '{key}'"),
            ConfigError::MissingValue(key) => write!(f, "option '{key}' needs a value"),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "invalid value '{value}' for option '{key}'")
            }
            ConfigError::GlRequired => write!(f, "headless display requires gl (gl=off given)"),
        }
    }
}

impl std::error::Error for ConfigError {}
