//! wgpu scanout backend.
//!
//! [`WgpuGpu`] owns the texture table and implements the framebuffer ops
//! (texture copies + readback); [`WgpuCompositor`] draws textured quads for
//! the cursor path.
//!
//! Convention:
//! - Texture rows are top-down (row 0 is the top of the image).
//! - Quad placement is in target pixels; the vertex shader converts to NDC.

mod common;
mod compositor;
mod ctx;
mod textures;

use std::rc::Rc;

use anyhow::{Context, Result};

use crate::device::{RenderContext, WgpuPlatform};

pub use compositor::WgpuCompositor;
pub use ctx::RenderCtx;
pub use textures::{WgpuGpu, GUEST_TEXTURE_USAGES, SCANOUT_FORMAT};

/// Builds the framebuffer ops and compositor on the shared context's device.
pub fn wgpu_scanout(ctx: &RenderContext<WgpuPlatform>) -> Result<(Rc<WgpuGpu>, Rc<WgpuCompositor>)> {
    let render = ctx
        .platform()
        .render_ctx(ctx.shared_context())
        .context("shared context has no device")?;

    let gpu = Rc::new(WgpuGpu::new(render));
    let compositor = Rc::new(WgpuCompositor::new(Rc::clone(&gpu)));
    Ok((gpu, compositor))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::console::ConsoleId;
    use crate::coords::{Rect, Size};
    use crate::scanout::{CursorTexture, DisplaySurface, PixelFormat, ScanoutState, SurfaceRef};
    use crate::testing::{gradient, gradient_px, guest_texture, wgpu_scanout_or_skip};

    fn word(px: [u8; 4]) -> u32 {
        u32::from_le_bytes(px)
    }

    #[test]
    fn flush_composites_guest_and_cursor_into_host_surface() {
        let Some(scanout) =
            wgpu_scanout_or_skip("flush_composites_guest_and_cursor_into_host_surface")
        else {
            return;
        };
        let size = Size::new(65, 20);
        let guest = guest_texture(&scanout.gpu, size, &gradient(size));
        let dot = guest_texture(&scanout.gpu, Size::new(1, 1), &[0xff; 4]);

        let host = Rc::new(RefCell::new(DisplaySurface::with_stride(
            size,
            PixelFormat::Xrgb8888,
            65 * 4 + 12,
        )));
        let shared: SurfaceRef = host.clone();

        let mut state =
            ScanoutState::new(ConsoleId(0), scanout.gpu.clone(), scanout.compositor.clone());
        state.switch_surface(Some(shared));

        // Bottom-up guest, copy path.
        state.bind_texture(guest, false, size.width, size.height);
        assert_eq!(state.flush(Rect::from_size(size)), Some(Rect::from_size(size)));
        {
            let surface = host.borrow();
            for y in 0..size.height {
                for x in 0..size.width {
                    let expected = word(gradient_px(x, size.height - 1 - y));
                    assert_eq!(surface.pixel(x, y), Some(expected), "pixel ({x}, {y})");
                }
            }
        }

        // Top-down guest with a one-pixel cursor, composite path.
        state.bind_texture(guest, true, size.width, size.height);
        state.bind_cursor(Some(CursorTexture { texture: dot, width: 1, height: 1 }));
        state.set_cursor_position(3, 4);
        assert_eq!(state.flush(Rect::new(0, 0, 10, 10)), Some(Rect::new(0, 0, 10, 10)));
        {
            let surface = host.borrow();
            assert_eq!(surface.pixel(3, 4), Some(u32::MAX));
            assert_eq!(surface.pixel(4, 4), Some(word(gradient_px(4, 4))));
            assert_eq!(surface.pixel(0, 19), Some(word(gradient_px(0, 19))));
        }

        assert_eq!(state.stats().flushes, 2);
        assert_eq!(state.stats().composite_allocations, 1);
    }
}
