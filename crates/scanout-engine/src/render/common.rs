//! Shared GPU types and helpers for the scanout renderers.

use bytemuck::{Pod, Zeroable};

use crate::coords::Size;

// ── quad vertex ───────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct QuadVertex {
    pub pos: [f32; 2], // 0..1
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub(super) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

pub(super) const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { pos: [0.0, 0.0] },
    QuadVertex { pos: [1.0, 0.0] },
    QuadVertex { pos: [1.0, 1.0] },
    QuadVertex { pos: [0.0, 1.0] },
];

pub(super) const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

// ── composite uniform ─────────────────────────────────────────────────────

/// Placement of one textured quad, in target pixels.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(super) struct CompositeUniform {
    pub rect: [f32; 4], // x, y, w, h
    pub target_size: [f32; 2],
    pub flip: f32,
    pub _pad: f32, // 16-byte alignment
}

impl CompositeUniform {
    pub(super) fn new(x: u32, y: u32, src: Size, target: Size, flip_y: bool) -> Self {
        Self {
            rect: [x as f32, y as f32, src.width as f32, src.height as f32],
            target_size: [target.width.max(1) as f32, target.height.max(1) as f32],
            flip: if flip_y { 1.0 } else { 0.0 },
            _pad: 0.0,
        }
    }
}

// ── texture helpers ───────────────────────────────────────────────────────

#[inline]
pub(super) fn extent(size: Size) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width,
        height: size.height,
        depth_or_array_layers: 1,
    }
}

/// Bytes per row of a 4-byte-per-pixel copy, rounded up to the row alignment
/// texture-to-buffer copies require.
pub(super) fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(800), 3328);
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(0), 0);
    }

    #[test]
    fn uniform_places_quad_in_pixels() {
        let u = CompositeUniform::new(100, 50, Size::new(64, 32), Size::new(800, 600), true);
        assert_eq!(u.rect, [100.0, 50.0, 64.0, 32.0]);
        assert_eq!(u.target_size, [800.0, 600.0]);
        assert_eq!(u.flip, 1.0);
        assert_eq!(std::mem::size_of::<CompositeUniform>(), 32);
    }
}
