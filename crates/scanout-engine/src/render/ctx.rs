/// Device/queue pair a context renders with.
///
/// Contexts sharing with each other hold clones of the same pair, so textures
/// created through one are usable from all of them.
#[derive(Debug, Clone)]
pub struct RenderCtx {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl RenderCtx {
    #[inline]
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }
}
