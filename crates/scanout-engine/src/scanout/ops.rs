use crate::coords::{Point, Size};

use super::{FramebufferBinding, TextureId};

/// Low-level framebuffer operations.
///
/// Implementations own the actual textures; bindings only carry handles.
/// Calls are synchronous and never fail observably: GPU-level problems are
/// logged and the operation is dropped.
pub trait FramebufferOps {
    /// Allocates a texture usable as a composite target.
    fn create_texture(&self, size: Size) -> TextureId;

    fn destroy_texture(&self, texture: TextureId);

    /// Copies `src` into `dst`, mirroring rows when `flip_y` is set.
    fn blit(&self, dst: &FramebufferBinding, src: &FramebufferBinding, flip_y: bool);

    /// Reads `src` into `dst`, one row every `stride` bytes.
    ///
    /// Blocks until the data is available.
    fn read_pixels(&self, src: &FramebufferBinding, dst: &mut [u8], stride: usize);
}

/// Textured-quad compositor.
pub trait Compositor {
    /// Draws `src` over the whole of `dst`, replacing its contents.
    fn texture_blit(&self, dst: &FramebufferBinding, src: &FramebufferBinding, flip_y: bool);

    /// Alpha-blends `src` onto `dst` with its top-left corner at `pos`.
    fn texture_blend(
        &self,
        dst: &FramebufferBinding,
        src: &FramebufferBinding,
        flip_y: bool,
        pos: Point,
    );
}
