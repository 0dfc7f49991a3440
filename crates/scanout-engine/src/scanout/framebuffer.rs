use crate::coords::Size;

use super::FramebufferOps;

/// Handle of a GPU texture known to the framebuffer ops.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Texture held by a binding, tagged with who frees it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TextureRef {
    /// Allocated by the pipeline; freed when the binding is destroyed.
    Owned(TextureId),
    /// Supplied by the guest; never freed by the pipeline.
    Borrowed(TextureId),
}

impl TextureRef {
    #[inline]
    pub fn id(self) -> TextureId {
        match self {
            TextureRef::Owned(id) | TextureRef::Borrowed(id) => id,
        }
    }

    #[inline]
    pub fn is_owned(self) -> bool {
        matches!(self, TextureRef::Owned(_))
    }
}

/// A texture plus the dimensions it is used with.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FramebufferBinding {
    texture: Option<TextureRef>,
    size: Size,
}

impl FramebufferBinding {
    pub const fn empty() -> Self {
        Self { texture: None, size: Size::new(0, 0) }
    }

    /// Wraps a texture owned by someone else.
    pub fn borrowed(texture: TextureId, size: Size) -> Self {
        Self { texture: Some(TextureRef::Borrowed(texture)), size }
    }

    /// Allocates a new texture of `size` owned by the binding.
    pub fn allocate(ops: &dyn FramebufferOps, size: Size) -> Self {
        let texture = ops.create_texture(size);
        Self { texture: Some(TextureRef::Owned(texture)), size }
    }

    #[inline]
    pub fn texture(&self) -> Option<TextureRef> {
        self.texture
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.texture.is_some()
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    /// Resets the binding, freeing the texture only if it is owned.
    pub fn destroy(&mut self, ops: &dyn FramebufferOps) {
        if let Some(TextureRef::Owned(id)) = self.texture {
            ops.destroy_texture(id);
        }
        *self = Self::empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{GpuOp, RecordingGpu};

    #[test]
    fn destroying_borrowed_binding_frees_nothing() {
        let gpu = RecordingGpu::new();
        let mut fb = FramebufferBinding::borrowed(TextureId(7), Size::new(64, 64));
        fb.destroy(&gpu);
        assert!(gpu.ops().is_empty());
        assert_eq!(fb, FramebufferBinding::empty());
    }

    #[test]
    fn destroying_owned_binding_frees_texture_once() {
        let gpu = RecordingGpu::new();
        let mut fb = FramebufferBinding::allocate(&gpu, Size::new(32, 16));
        let Some(TextureRef::Owned(id)) = fb.texture() else {
            panic!("allocated binding must own its texture");
        };

        fb.destroy(&gpu);
        fb.destroy(&gpu);
        assert_eq!(
            gpu.ops(),
            vec![GpuOp::Create { id, size: Size::new(32, 16) }, GpuOp::Destroy(id)]
        );
        assert!(!fb.is_bound());
        assert_eq!(fb.size(), Size::new(0, 0));
    }
}
