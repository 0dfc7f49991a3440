use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;

use crate::render::RenderCtx;

use super::platform::{
    has_extension, ApiProfile, ApiVersion, ConfigAttribs, ContextId, ContextParams,
    RenderPlatform, SurfaceType, DEVICE_FILE_EXTENSION, SURFACELESS_EXTENSION,
};
use super::PlatformError;

/// Formats usable as scanout configurations, in preference order.
const CONFIG_FORMATS: [wgpu::TextureFormat; 1] = [wgpu::TextureFormat::Bgra8Unorm];

const SYSFS_ROOT: &str = "/sys";

/// Initialization parameters for the wgpu platform.
#[derive(Debug, Clone)]
pub struct WgpuPlatformConfig {
    /// Backends enumerated for devices.
    ///
    /// Defaults to `WGPU_BACKEND` when set, else every native backend.
    pub backends: wgpu::Backends,

    /// Used only when the default display is opened without enumeration.
    pub power_preference: wgpu::PowerPreference,
}

impl Default for WgpuPlatformConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::from_env()
                .unwrap_or(wgpu::Backends::PRIMARY | wgpu::Backends::SECONDARY),
            power_preference: wgpu::PowerPreference::HighPerformance,
        }
    }
}

/// One enumerated adapter.
#[derive(Debug, Clone)]
pub struct WgpuDevice {
    adapter: wgpu::Adapter,
    info: wgpu::AdapterInfo,
    render_node: Option<String>,
}

impl WgpuDevice {
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    pub fn info(&self) -> &wgpu::AdapterInfo {
        &self.info
    }
}

/// [`RenderPlatform`] over wgpu.
///
/// Devices and displays are adapters. A context is a device/queue pair;
/// contexts created with a share context reuse its pair.
pub struct WgpuPlatform {
    instance: wgpu::Instance,
    config: WgpuPlatformConfig,
    contexts: RefCell<HashMap<ContextId, RenderCtx>>,
    next_context: Cell<u32>,
    current: Cell<Option<ContextId>>,
}

impl WgpuPlatform {
    pub fn new(config: WgpuPlatformConfig) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: config.backends,
            ..Default::default()
        });

        Self {
            instance,
            config,
            contexts: RefCell::new(HashMap::new()),
            next_context: Cell::new(1),
            current: Cell::new(None),
        }
    }

    /// Device/queue pair behind `context`.
    pub fn render_ctx(&self, context: ContextId) -> Option<RenderCtx> {
        self.contexts.borrow().get(&context).cloned()
    }

    fn display_extensions(adapter: &wgpu::Adapter) -> String {
        let info = adapter.get_info();
        let mut exts = format!("backend_{}", info.backend.to_str());
        // Browser adapters always render through a canvas.
        if info.backend != wgpu::Backend::BrowserWebGpu {
            exts.push(' ');
            exts.push_str(SURFACELESS_EXTENSION);
        }
        exts
    }

    fn request_device(
        adapter: &wgpu::Adapter,
        profile: ApiProfile,
    ) -> Result<RenderCtx, PlatformError> {
        let required_limits = match profile {
            ApiProfile::Core => wgpu::Limits::default(),
            ApiProfile::Embedded => wgpu::Limits::downlevel_webgl2_defaults(),
        };

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("scanout-engine device"),
            required_features: wgpu::Features::empty(),
            required_limits: required_limits.using_resolution(adapter.limits()),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| PlatformError::new(format!("failed to create wgpu device/queue: {e}")))?;

        Ok(RenderCtx::new(device, queue))
    }
}

impl Default for WgpuPlatform {
    fn default() -> Self {
        Self::new(WgpuPlatformConfig::default())
    }
}

impl RenderPlatform for WgpuPlatform {
    type Device = WgpuDevice;
    type Display = wgpu::Adapter;
    type Config = wgpu::TextureFormat;

    fn supports_device_enumeration(&self) -> bool {
        cfg!(not(target_arch = "wasm32"))
    }

    fn query_devices(&self) -> Result<Vec<WgpuDevice>, PlatformError> {
        let adapters = pollster::block_on(self.instance.enumerate_adapters(self.config.backends));
        let root = Path::new(SYSFS_ROOT);

        Ok(adapters
            .into_iter()
            .map(|adapter| {
                let info = adapter.get_info();
                let render_node = resolve_render_node(root, &info.device_pci_bus_id);
                log::debug!(
                    "adapter {} ({:?}, {}) render node {:?}",
                    info.name,
                    info.backend,
                    info.device_pci_bus_id,
                    render_node
                );
                WgpuDevice { adapter, info, render_node }
            })
            .collect())
    }

    fn device_extensions(&self, device: &WgpuDevice) -> Option<String> {
        let mut exts = format!("backend_{}", device.info.backend.to_str());
        if device.render_node.is_some() {
            exts.push(' ');
            exts.push_str(DEVICE_FILE_EXTENSION);
        }
        Some(exts)
    }

    fn device_file(&self, device: &WgpuDevice) -> Option<String> {
        device.render_node.clone()
    }

    fn open_device_display(&self, device: &WgpuDevice) -> Result<wgpu::Adapter, PlatformError> {
        Ok(device.adapter.clone())
    }

    fn open_default_display(&self) -> Result<wgpu::Adapter, PlatformError> {
        pollster::block_on(self.instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: self.config.power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| PlatformError::new(format!("failed to find a suitable GPU adapter: {e}")))
    }

    fn initialize(&self, display: &wgpu::Adapter) -> Result<ApiVersion, PlatformError> {
        let caps = display.get_downlevel_capabilities();
        let (major, minor) = match caps.shader_model {
            wgpu::ShaderModel::Sm2 => (2, 0),
            wgpu::ShaderModel::Sm4 => (4, 0),
            _ => (5, 0),
        };
        Ok(ApiVersion { major, minor })
    }

    fn bind_api(&self, display: &wgpu::Adapter, profile: ApiProfile) -> Result<(), PlatformError> {
        match profile {
            ApiProfile::Core if !display.get_downlevel_capabilities().is_webgpu_compliant() => {
                Err(PlatformError::new(format!(
                    "adapter {} is not WebGPU compliant",
                    display.get_info().name
                )))
            }
            _ => Ok(()),
        }
    }

    fn choose_configs(
        &self,
        display: &wgpu::Adapter,
        attribs: &ConfigAttribs,
    ) -> Result<Vec<wgpu::TextureFormat>, PlatformError> {
        let mut required =
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        if attribs.surface_type == Some(SurfaceType::Offscreen) {
            required |= wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST;
        }

        Ok(CONFIG_FORMATS
            .into_iter()
            .filter(|format| {
                display
                    .get_texture_format_features(*format)
                    .allowed_usages
                    .contains(required)
            })
            .collect())
    }

    fn has_display_extension(&self, display: &wgpu::Adapter, name: &str) -> bool {
        has_extension(&Self::display_extensions(display), name)
    }

    fn create_context(
        &self,
        display: &wgpu::Adapter,
        config: &wgpu::TextureFormat,
        profile: ApiProfile,
        share: Option<ContextId>,
        params: &ContextParams,
    ) -> Result<ContextId, PlatformError> {
        let ctx = match share {
            Some(share) => self
                .render_ctx(share)
                .ok_or_else(|| PlatformError::new(format!("unknown share context {share:?}")))?,
            None => Self::request_device(display, profile)?,
        };

        let id = ContextId(self.next_context.get());
        self.next_context.set(id.0 + 1);
        self.contexts.borrow_mut().insert(id, ctx);

        log::trace!(
            "context {id:?}: {profile} {}.{}, format {config:?}",
            params.major_ver,
            params.minor_ver
        );
        Ok(id)
    }

    fn destroy_context(&self, _display: &wgpu::Adapter, context: ContextId) {
        if self.contexts.borrow_mut().remove(&context).is_none() {
            log::warn!("destroying unknown context {context:?}");
        }
        if self.current.get() == Some(context) {
            self.current.set(None);
        }
    }

    fn make_current(
        &self,
        _display: &wgpu::Adapter,
        context: Option<ContextId>,
    ) -> Result<(), PlatformError> {
        if let Some(id) = context {
            if !self.contexts.borrow().contains_key(&id) {
                return Err(PlatformError::new(format!("unknown context {id:?}")));
            }
        }
        self.current.set(context);
        Ok(())
    }

    fn current_context(&self) -> Option<ContextId> {
        self.current.get()
    }
}

/// Resolves the DRM render node of the PCI device `pci_bus_id`.
///
/// Looks under `<sysfs_root>/bus/pci/devices/<id>/drm/` for a `renderD*`
/// entry and maps it to `/dev/dri/`. The lowest-numbered node wins.
pub(crate) fn resolve_render_node(sysfs_root: &Path, pci_bus_id: &str) -> Option<String> {
    if pci_bus_id.is_empty() {
        return None;
    }

    let drm_dir = sysfs_root
        .join("bus/pci/devices")
        .join(pci_bus_id)
        .join("drm");
    let entries = std::fs::read_dir(&drm_dir).ok()?;

    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with("renderD"))
        .min_by_key(|name| name["renderD".len()..].parse::<u32>().unwrap_or(u32::MAX))
        .map(|name| format!("/dev/dri/{name}"))
}
