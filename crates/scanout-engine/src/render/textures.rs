use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::mpsc;

use anyhow::{Context, Result};

use crate::coords::Size;
use crate::scanout::{FramebufferBinding, FramebufferOps, TextureId};

use super::common::{extent, padded_bytes_per_row};
use super::RenderCtx;

/// Texture format of every scanout texture. Reads back as XRGB8888.
pub const SCANOUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;

/// Usages a guest texture needs to be scanned out.
pub const GUEST_TEXTURE_USAGES: wgpu::TextureUsages = wgpu::TextureUsages::TEXTURE_BINDING
    .union(wgpu::TextureUsages::COPY_SRC);

const COMPOSITE_USAGES: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
    .union(wgpu::TextureUsages::TEXTURE_BINDING)
    .union(wgpu::TextureUsages::COPY_SRC)
    .union(wgpu::TextureUsages::COPY_DST);

/// Texture table + framebuffer ops over wgpu.
///
/// Guest textures are imported (and released) by the supplier; composite
/// textures are created and destroyed through [`FramebufferOps`].
pub struct WgpuGpu {
    ctx: RenderCtx,
    textures: RefCell<HashMap<TextureId, wgpu::Texture>>,
    next_texture: Cell<u32>,

    // Grow-only; shared by every readback.
    staging: RefCell<Option<wgpu::Buffer>>,
}

impl WgpuGpu {
    pub fn new(ctx: RenderCtx) -> Self {
        Self {
            ctx,
            textures: RefCell::new(HashMap::new()),
            next_texture: Cell::new(1),
            staging: RefCell::new(None),
        }
    }

    pub fn ctx(&self) -> &RenderCtx {
        &self.ctx
    }

    /// Looks up a texture by handle.
    pub fn texture(&self, id: TextureId) -> Option<wgpu::Texture> {
        self.textures.borrow().get(&id).cloned()
    }

    /// Registers a guest texture and returns its handle.
    pub fn import_texture(&self, texture: wgpu::Texture) -> Result<TextureId> {
        anyhow::ensure!(
            texture.format() == SCANOUT_FORMAT,
            "guest texture format {:?} is not {:?}",
            texture.format(),
            SCANOUT_FORMAT
        );
        anyhow::ensure!(
            texture.usage().contains(GUEST_TEXTURE_USAGES),
            "guest texture usage {:?} lacks {:?}",
            texture.usage(),
            GUEST_TEXTURE_USAGES
        );
        Ok(self.insert(texture))
    }

    /// Forgets a guest texture without destroying it.
    pub fn release_texture(&self, id: TextureId) {
        self.textures.borrow_mut().remove(&id);
    }

    /// Writes tightly or loosely packed rows into a texture.
    pub fn upload(&self, id: TextureId, data: &[u8], bytes_per_row: u32) -> Result<()> {
        let texture = self
            .texture(id)
            .with_context(|| format!("unknown texture {id:?}"))?;
        let size = texture.size();
        anyhow::ensure!(
            bytes_per_row >= size.width * 4,
            "row pitch {bytes_per_row} too small for width {}",
            size.width
        );
        anyhow::ensure!(
            data.len() as u64 >= u64::from(bytes_per_row) * u64::from(size.height),
            "upload of {} bytes too small for {}x{}",
            data.len(),
            size.width,
            size.height
        );

        self.ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(size.height),
            },
            size,
        );
        Ok(())
    }

    fn insert(&self, texture: wgpu::Texture) -> TextureId {
        let id = TextureId(self.next_texture.get());
        self.next_texture.set(id.0 + 1);
        self.textures.borrow_mut().insert(id, texture);
        id
    }

    fn bound_texture(&self, fb: &FramebufferBinding, role: &str) -> Option<wgpu::Texture> {
        let id = fb.texture()?.id();
        let texture = self.texture(id);
        if texture.is_none() {
            log::warn!("{role} texture {id:?} is not registered");
        }
        texture
    }

    fn staging_buffer(&self, size: u64) -> wgpu::Buffer {
        let mut staging = self.staging.borrow_mut();
        match staging.as_ref() {
            Some(buffer) if buffer.size() >= size => buffer.clone(),
            _ => {
                let buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("scanout readback staging"),
                    size: size.next_power_of_two(),
                    usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                    mapped_at_creation: false,
                });
                *staging = Some(buffer.clone());
                buffer
            }
        }
    }

    fn discard_staging(&self) {
        *self.staging.borrow_mut() = None;
    }

    fn submit(&self, encoder: wgpu::CommandEncoder) {
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
    }
}

fn copy_info(texture: &wgpu::Texture, y: u32) -> wgpu::TexelCopyTextureInfo<'_> {
    wgpu::TexelCopyTextureInfo {
        texture,
        mip_level: 0,
        origin: wgpu::Origin3d { x: 0, y, z: 0 },
        aspect: wgpu::TextureAspect::All,
    }
}

impl FramebufferOps for WgpuGpu {
    fn create_texture(&self, size: Size) -> TextureId {
        if size.is_empty() {
            log::warn!("composite texture of size {size} requested, using 1x1");
        }
        let size = Size::new(size.width.max(1), size.height.max(1));

        let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("scanout composite"),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCANOUT_FORMAT,
            usage: COMPOSITE_USAGES,
            view_formats: &[],
        });
        self.insert(texture)
    }

    fn destroy_texture(&self, texture: TextureId) {
        match self.textures.borrow_mut().remove(&texture) {
            Some(t) => t.destroy(),
            None => log::warn!("destroying unknown texture {texture:?}"),
        }
    }

    fn blit(&self, dst: &FramebufferBinding, src: &FramebufferBinding, flip_y: bool) {
        let (Some(dst_tex), Some(src_tex)) = (
            self.bound_texture(dst, "blit destination"),
            self.bound_texture(src, "blit source"),
        ) else {
            return;
        };

        let width = dst.size().width.min(src.size().width);
        let height = dst.size().height.min(src.size().height);
        if width == 0 || height == 0 {
            return;
        }

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scanout blit encoder"),
            });

        if flip_y {
            let row = extent(Size::new(width, 1));
            for y in 0..height {
                encoder.copy_texture_to_texture(
                    copy_info(&src_tex, y),
                    copy_info(&dst_tex, height - 1 - y),
                    row,
                );
            }
        } else {
            encoder.copy_texture_to_texture(
                copy_info(&src_tex, 0),
                copy_info(&dst_tex, 0),
                extent(Size::new(width, height)),
            );
        }

        self.submit(encoder);
    }

    fn read_pixels(&self, src: &FramebufferBinding, dst: &mut [u8], stride: usize) {
        let Some(texture) = self.bound_texture(src, "readback") else {
            return;
        };
        let size = src.size();
        if size.is_empty() {
            return;
        }

        let padded = padded_bytes_per_row(size.width);
        let row_bytes = size.width as usize * 4;
        let total = u64::from(padded) * u64::from(size.height);
        let staging = self.staging_buffer(total);

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scanout readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            copy_info(&texture, 0),
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(size.height),
                },
            },
            extent(size),
        );
        self.submit(encoder);

        let slice = staging.slice(..total);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            tx.send(res).ok();
        });

        let mapped = match self.ctx.device.poll(wgpu::PollType::wait_indefinitely()) {
            Err(e) => Err(format!("readback poll failed: {e}")),
            Ok(_) => match rx.recv() {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(format!("readback map_async failed: {e}")),
                Err(_) => Err("readback map_async callback dropped".to_string()),
            },
        };
        if let Err(msg) = mapped {
            log::error!("{msg}");
            // The map may still be pending; never hand this buffer out again.
            self.discard_staging();
            return;
        }

        {
            let mapped = slice.get_mapped_range();
            for (y, row) in mapped.chunks(padded as usize).enumerate() {
                let start = y * stride;
                let Some(out) = dst.get_mut(start..start + row_bytes) else {
                    log::warn!("host surface too small, readback truncated at row {y}");
                    break;
                };
                out.copy_from_slice(&row[..row_bytes]);
            }
        }
        staging.unmap();
    }
}
