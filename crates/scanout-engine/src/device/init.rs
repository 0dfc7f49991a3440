use crate::config::HeadlessConfig;

use super::platform::{ConfigAttribs, ContextParams, SURFACELESS_EXTENSION};
use super::select::{choose_device, RenderDevice};
use super::{InitError, RenderContext, RenderPlatform};

/// Selects a rendering device, opens it and creates the shared context.
///
/// Runs once at startup. Every error is fatal; there is no retry because a
/// failure here means missing or misconfigured hardware or driver support.
pub fn select_and_open<P: RenderPlatform>(
    platform: P,
    config: &HeadlessConfig,
) -> Result<RenderContext<P>, InitError> {
    let profile = config.gl.profile();

    let display = open_display(&platform, config)?;

    let version = platform
        .initialize(&display)
        .map_err(InitError::DisplayInitFailed)?;
    log::info!("display initialized, version {version}");

    platform
        .bind_api(&display, profile)
        .map_err(|source| InitError::ApiBindFailed { profile, source })?;

    let attribs = ConfigAttribs::for_profile(profile);
    let mut configs = match platform.choose_configs(&display, &attribs) {
        Ok(configs) => configs,
        Err(e) => {
            log::error!("config query failed ({profile} mode): {e}");
            Vec::new()
        }
    };
    if configs.len() != 1 {
        return Err(InitError::ConfigSelectionFailed {
            profile,
            matches: configs.len(),
        });
    }
    let Some(chosen) = configs.pop() else {
        return Err(InitError::ConfigSelectionFailed { profile, matches: 0 });
    };

    if !platform.has_display_extension(&display, SURFACELESS_EXTENSION) {
        return Err(InitError::SurfacelessUnsupported);
    }

    let shared = platform
        .create_context(&display, &chosen, profile, None, &ContextParams::default())
        .map_err(InitError::ContextCreationFailed)?;
    log::info!("shared {profile} context {shared:?} created");

    Ok(RenderContext::new(platform, display, chosen, profile, shared))
}

fn open_display<P: RenderPlatform>(
    platform: &P,
    config: &HeadlessConfig,
) -> Result<P::Display, InitError> {
    if !platform.supports_device_enumeration() {
        log::info!("device enumeration unavailable, using the default display");
        return platform
            .open_default_display()
            .map_err(InitError::DisplayOpenFailed);
    }

    let devices = platform.query_devices().map_err(InitError::Enumeration)?;
    if devices.is_empty() {
        return Err(InitError::NoDevicesFound);
    }
    log::info!("number of devices is {}", devices.len());

    let summaries: Vec<RenderDevice> = devices
        .iter()
        .enumerate()
        .map(|(index, device)| RenderDevice::probe(platform, index, device))
        .collect();

    for device in &summaries {
        if device.is_eligible() {
            log::info!("{device}");
        } else {
            log::debug!("{device}");
        }
    }

    let index = choose_device(
        &summaries,
        config.rendernode.as_deref(),
        config.rendernode_policy,
    )?;
    log::info!("device {index} chosen");

    platform
        .open_device_display(&devices[index])
        .map_err(InitError::DisplayOpenFailed)
}
