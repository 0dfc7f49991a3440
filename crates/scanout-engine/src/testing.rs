//! Test doubles shared by unit tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config::{GlMode, HeadlessConfig};
use crate::console::{Console, ConsoleId, ConsoleRegistry, DisplayListener};
use crate::coords::{Point, Rect, Size};
use crate::device::{
    select_and_open, ApiProfile, ApiVersion, ConfigAttribs, ContextId, ContextParams,
    PlatformError, RenderContext, RenderPlatform, WgpuPlatform, DEVICE_FILE_EXTENSION,
    SURFACELESS_EXTENSION,
};
use crate::render::{
    wgpu_scanout, WgpuCompositor, WgpuGpu, GUEST_TEXTURE_USAGES, SCANOUT_FORMAT,
};
use crate::scanout::{Compositor, FramebufferBinding, FramebufferOps, TextureId, TextureRef};

// ── platform ──────────────────────────────────────────────────────────────

/// Scripted device description.
#[derive(Debug, Clone)]
pub(crate) struct FakeDevice {
    extensions: Option<String>,
    file: Option<String>,
}

impl FakeDevice {
    /// Device advertising the device-file extension.
    pub(crate) fn drm(file: &str) -> Self {
        Self {
            extensions: Some(format!("ext_a {DEVICE_FILE_EXTENSION}")),
            file: Some(file.to_string()),
        }
    }

    /// Device without the device-file extension.
    pub(crate) fn opaque() -> Self {
        Self { extensions: Some("ext_a ext_b".into()), file: None }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeHandle {
    index: usize,
    device: FakeDevice,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum FakeDisplay {
    Device(usize),
    Default,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum PlatformCall {
    QueryDevices,
    DeviceFile(usize),
    OpenDevice(usize),
    OpenDefault,
    Initialize,
    BindApi(ApiProfile),
    ChooseConfigs(ConfigAttribs),
    CreateContext { share: Option<ContextId> },
    DestroyContext(ContextId),
    MakeCurrent(Option<ContextId>),
}

/// [`RenderPlatform`] whose every step can be scripted to fail.
pub(crate) struct FakePlatform {
    pub(crate) enumeration: bool,
    pub(crate) devices: Result<Vec<FakeDevice>, PlatformError>,
    pub(crate) open_fails: bool,
    pub(crate) init_fails: bool,
    pub(crate) bind_fails: bool,
    pub(crate) configs: Result<Vec<u32>, PlatformError>,
    pub(crate) surfaceless: bool,
    pub(crate) context_fails: bool,

    calls: RefCell<Vec<PlatformCall>>,
    next_context: Cell<u32>,
    current: Cell<Option<ContextId>>,
}

impl FakePlatform {
    pub(crate) fn with_devices(devices: Vec<FakeDevice>) -> Self {
        Self {
            enumeration: true,
            devices: Ok(devices),
            open_fails: false,
            init_fails: false,
            bind_fails: false,
            configs: Ok(vec![1]),
            surfaceless: true,
            context_fails: false,
            calls: RefCell::new(Vec::new()),
            next_context: Cell::new(1),
            current: Cell::new(None),
        }
    }

    pub(crate) fn calls(&self) -> Vec<PlatformCall> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: PlatformCall) {
        self.calls.borrow_mut().push(call);
    }

    fn fail_if(&self, fails: bool, what: &str) -> Result<(), PlatformError> {
        if fails {
            Err(PlatformError::new(format!("{what} failed")))
        } else {
            Ok(())
        }
    }
}

impl RenderPlatform for FakePlatform {
    type Device = FakeHandle;
    type Display = FakeDisplay;
    type Config = u32;

    fn supports_device_enumeration(&self) -> bool {
        self.enumeration
    }

    fn query_devices(&self) -> Result<Vec<FakeHandle>, PlatformError> {
        self.record(PlatformCall::QueryDevices);
        let devices = self.devices.clone()?;
        Ok(devices
            .into_iter()
            .enumerate()
            .map(|(index, device)| FakeHandle { index, device })
            .collect())
    }

    fn device_extensions(&self, device: &FakeHandle) -> Option<String> {
        device.device.extensions.clone()
    }

    fn device_file(&self, device: &FakeHandle) -> Option<String> {
        self.record(PlatformCall::DeviceFile(device.index));
        device.device.file.clone()
    }

    fn open_device_display(&self, device: &FakeHandle) -> Result<FakeDisplay, PlatformError> {
        self.record(PlatformCall::OpenDevice(device.index));
        self.fail_if(self.open_fails, "open")?;
        Ok(FakeDisplay::Device(device.index))
    }

    fn open_default_display(&self) -> Result<FakeDisplay, PlatformError> {
        self.record(PlatformCall::OpenDefault);
        self.fail_if(self.open_fails, "open")?;
        Ok(FakeDisplay::Default)
    }

    fn initialize(&self, _display: &FakeDisplay) -> Result<ApiVersion, PlatformError> {
        self.record(PlatformCall::Initialize);
        self.fail_if(self.init_fails, "initialize")?;
        Ok(ApiVersion { major: 1, minor: 5 })
    }

    fn bind_api(&self, _display: &FakeDisplay, profile: ApiProfile) -> Result<(), PlatformError> {
        self.record(PlatformCall::BindApi(profile));
        self.fail_if(self.bind_fails, "bind")
    }

    fn choose_configs(
        &self,
        _display: &FakeDisplay,
        attribs: &ConfigAttribs,
    ) -> Result<Vec<u32>, PlatformError> {
        self.record(PlatformCall::ChooseConfigs(*attribs));
        self.configs.clone()
    }

    fn has_display_extension(&self, _display: &FakeDisplay, name: &str) -> bool {
        name == SURFACELESS_EXTENSION && self.surfaceless
    }

    fn create_context(
        &self,
        _display: &FakeDisplay,
        _config: &u32,
        _profile: ApiProfile,
        share: Option<ContextId>,
        _params: &ContextParams,
    ) -> Result<ContextId, PlatformError> {
        self.record(PlatformCall::CreateContext { share });
        self.fail_if(self.context_fails, "create context")?;
        let id = ContextId(self.next_context.get());
        self.next_context.set(id.0 + 1);
        Ok(id)
    }

    fn destroy_context(&self, _display: &FakeDisplay, context: ContextId) {
        self.record(PlatformCall::DestroyContext(context));
        if self.current.get() == Some(context) {
            self.current.set(None);
        }
    }

    fn make_current(
        &self,
        _display: &FakeDisplay,
        context: Option<ContextId>,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::MakeCurrent(context));
        self.current.set(context);
        Ok(())
    }

    fn current_context(&self) -> Option<ContextId> {
        self.current.get()
    }
}

// ── gpu ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum GpuOp {
    Create { id: TextureId, size: Size },
    Destroy(TextureId),
    Blit { dst: TextureId, src: TextureId, flip_y: bool },
    Read { src: TextureId, len: usize, stride: usize },
    TextureBlit { dst: TextureId, src: TextureId, flip_y: bool },
    TextureBlend { dst: TextureId, src: TextureId, flip_y: bool, pos: Point },
}

/// Records every framebuffer and compositor call.
pub(crate) struct RecordingGpu {
    ops: RefCell<Vec<GpuOp>>,
    next_texture: Cell<u32>,
}

impl RecordingGpu {
    /// Byte written by `read_pixels`.
    pub(crate) const FILL: u8 = 0xAB;

    pub(crate) fn new() -> Self {
        Self { ops: RefCell::new(Vec::new()), next_texture: Cell::new(1) }
    }

    pub(crate) fn ops(&self) -> Vec<GpuOp> {
        self.ops.borrow().clone()
    }

    pub(crate) fn clear(&self) {
        self.ops.borrow_mut().clear();
    }

    pub(crate) fn count(&self, pred: impl Fn(&GpuOp) -> bool) -> usize {
        self.ops.borrow().iter().filter(|op| pred(op)).count()
    }

    fn record(&self, op: GpuOp) {
        self.ops.borrow_mut().push(op);
    }
}

fn id(fb: &FramebufferBinding) -> TextureId {
    fb.texture()
        .map(TextureRef::id)
        .expect("GPU op on an unbound framebuffer")
}

impl FramebufferOps for RecordingGpu {
    fn create_texture(&self, size: Size) -> TextureId {
        let id = TextureId(self.next_texture.get());
        self.next_texture.set(id.0 + 1);
        self.record(GpuOp::Create { id, size });
        id
    }

    fn destroy_texture(&self, texture: TextureId) {
        self.record(GpuOp::Destroy(texture));
    }

    fn blit(&self, dst: &FramebufferBinding, src: &FramebufferBinding, flip_y: bool) {
        self.record(GpuOp::Blit { dst: id(dst), src: id(src), flip_y });
    }

    fn read_pixels(&self, src: &FramebufferBinding, dst: &mut [u8], stride: usize) {
        self.record(GpuOp::Read { src: id(src), len: dst.len(), stride });
        dst.fill(Self::FILL);
    }
}

impl Compositor for RecordingGpu {
    fn texture_blit(&self, dst: &FramebufferBinding, src: &FramebufferBinding, flip_y: bool) {
        self.record(GpuOp::TextureBlit { dst: id(dst), src: id(src), flip_y });
    }

    fn texture_blend(
        &self,
        dst: &FramebufferBinding,
        src: &FramebufferBinding,
        flip_y: bool,
        pos: Point,
    ) {
        self.record(GpuOp::TextureBlend { dst: id(dst), src: id(src), flip_y, pos });
    }
}

// ── consoles ──────────────────────────────────────────────────────────────

pub(crate) struct FakeConsole {
    index: usize,
    graphic: bool,
    pub(crate) hw_updates: Cell<usize>,
    pub(crate) gfx_updates: RefCell<Vec<Rect>>,
}

impl FakeConsole {
    pub(crate) fn graphic(index: usize) -> Rc<Self> {
        Rc::new(Self::new(index, true))
    }

    pub(crate) fn text(index: usize) -> Rc<Self> {
        Rc::new(Self::new(index, false))
    }

    fn new(index: usize, graphic: bool) -> Self {
        Self {
            index,
            graphic,
            hw_updates: Cell::new(0),
            gfx_updates: RefCell::new(Vec::new()),
        }
    }
}

impl Console for FakeConsole {
    fn id(&self) -> ConsoleId {
        ConsoleId(self.index)
    }

    fn is_graphic(&self) -> bool {
        self.graphic
    }

    fn hw_update(&self) {
        self.hw_updates.set(self.hw_updates.get() + 1);
    }

    fn gfx_update(&self, rect: Rect) {
        self.gfx_updates.borrow_mut().push(rect);
    }
}

/// Console table with holes; `None` entries look up as absent.
pub(crate) struct FakeRegistry {
    consoles: Vec<Option<Rc<FakeConsole>>>,
    pub(crate) listeners: Vec<Box<dyn DisplayListener>>,
}

impl FakeRegistry {
    pub(crate) fn new(consoles: Vec<Option<Rc<FakeConsole>>>) -> Self {
        Self { consoles, listeners: Vec::new() }
    }
}

impl ConsoleRegistry for FakeRegistry {
    fn lookup_console(&self, index: usize) -> Option<Rc<dyn Console>> {
        self.consoles
            .get(index)
            .cloned()
            .flatten()
            .map(|c| c as Rc<dyn Console>)
    }

    fn register_listener(&mut self, listener: Box<dyn DisplayListener>) {
        self.listeners.push(listener);
    }
}

// ── wgpu ──────────────────────────────────────────────────────────────────

/// Byte left in readback padding the GPU must not touch.
pub(crate) const PAD: u8 = 0xEE;

fn require_gpu() -> bool {
    std::env::var("SCANOUT_REQUIRE_GPU").is_ok_and(|v| {
        let v = v.trim();
        v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
    })
}

fn skip_or_panic(test_name: &str, reason: &str) {
    if require_gpu() {
        panic!("SCANOUT_REQUIRE_GPU is set but {test_name} cannot run: {reason}");
    }
    eprintln!("skipping {test_name}: {reason}");
}

pub(crate) struct WgpuScanout {
    pub(crate) ctx: RenderContext<WgpuPlatform>,
    pub(crate) gpu: Rc<WgpuGpu>,
    pub(crate) compositor: Rc<WgpuCompositor>,
}

/// Opens the first adapter with the embedded profile (the one software
/// adapters support). `None` when the host has no usable adapter.
pub(crate) fn wgpu_scanout_or_skip(test_name: &str) -> Option<WgpuScanout> {
    let config = HeadlessConfig { gl: GlMode::Es, ..HeadlessConfig::default() };
    let ctx = match select_and_open(WgpuPlatform::default(), &config) {
        Ok(ctx) => ctx,
        Err(e) => {
            skip_or_panic(test_name, &e.to_string());
            return None;
        }
    };
    let (gpu, compositor) = wgpu_scanout(&ctx).expect("shared context must have a device");
    Some(WgpuScanout { ctx, gpu, compositor })
}

/// Tightly packed BGRA pixels, distinct per row and column.
pub(crate) fn gradient(size: Size) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(size.area() as usize * 4);
    for y in 0..size.height {
        for x in 0..size.width {
            pixels.extend_from_slice(&gradient_px(x, y));
        }
    }
    pixels
}

/// Uploads `pixels` into a new guest texture.
pub(crate) fn guest_texture(gpu: &WgpuGpu, size: Size, pixels: &[u8]) -> TextureId {
    let texture = gpu.ctx().device.create_texture(&wgpu::TextureDescriptor {
        label: Some("test guest"),
        size: wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: SCANOUT_FORMAT,
        usage: GUEST_TEXTURE_USAGES | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let id = gpu.import_texture(texture).unwrap();
    gpu.upload(id, pixels, size.width * 4).unwrap();
    id
}

/// Reads `fb` back into a [`PAD`]-filled buffer with rows `stride` bytes apart.
pub(crate) fn read_back(gpu: &WgpuGpu, fb: &FramebufferBinding, stride: usize) -> Vec<u8> {
    let mut out = vec![PAD; stride * fb.size().height as usize];
    gpu.read_pixels(fb, &mut out, stride);
    out
}

/// Checks every visible row of `out` against `expected(x, y)` and that the
/// stride padding was left alone.
pub(crate) fn assert_pixels(
    out: &[u8],
    stride: usize,
    size: Size,
    expected: impl Fn(u32, u32) -> [u8; 4],
) {
    let row_bytes = size.width as usize * 4;
    for y in 0..size.height {
        let row = &out[y as usize * stride..][..stride];
        for x in 0..size.width {
            let px = &row[x as usize * 4..][..4];
            assert_eq!(px, expected(x, y), "pixel ({x}, {y}) of {size}");
        }
        assert!(
            row[row_bytes..].iter().all(|&b| b == PAD),
            "row {y} padding overwritten ({size})"
        );
    }
}

/// Pixel (`x`, `y`) of [`gradient`].
pub(crate) fn gradient_px(x: u32, y: u32) -> [u8; 4] {
    [x as u8, y as u8, (x >> 8) as u8 ^ 0x5a, 0xff]
}
