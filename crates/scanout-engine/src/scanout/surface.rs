use std::cell::RefCell;
use std::rc::Rc;

use crate::coords::Size;

/// Host pixel layouts, named by their 32-bit little-endian word.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PixelFormat {
    /// Blue, green, red, unused byte in memory order.
    Xrgb8888,
    /// Blue, green, red, alpha in memory order.
    Argb8888,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        4
    }
}

/// Host-owned pixel buffer the composited frame is read back into.
pub trait HostSurface {
    fn size(&self) -> Size;

    fn format(&self) -> PixelFormat;

    /// Bytes between the starts of two consecutive rows.
    fn stride(&self) -> usize;

    fn data_mut(&mut self) -> &mut [u8];
}

/// Shared reference to a host surface.
pub type SurfaceRef = Rc<RefCell<dyn HostSurface>>;

/// Vec-backed [`HostSurface`].
#[derive(Debug, Clone)]
pub struct DisplaySurface {
    size: Size,
    format: PixelFormat,
    stride: usize,
    data: Vec<u8>,
}

impl DisplaySurface {
    /// Allocates a zeroed surface with tightly packed rows.
    pub fn new(size: Size, format: PixelFormat) -> Self {
        let stride = size.width as usize * format.bytes_per_pixel();
        Self::with_stride(size, format, stride)
    }

    /// Allocates a zeroed surface with a caller-chosen row pitch.
    ///
    /// `stride` is raised to the packed row size if smaller.
    pub fn with_stride(size: Size, format: PixelFormat, stride: usize) -> Self {
        let stride = stride.max(size.width as usize * format.bytes_per_pixel());
        Self {
            size,
            format,
            stride,
            data: vec![0; stride * size.height as usize],
        }
    }

    /// Wraps the surface for sharing with a listener.
    pub fn into_shared(self) -> SurfaceRef {
        Rc::new(RefCell::new(self))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pixel at (`x`, `y`) as a little-endian word, `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let off = y as usize * self.stride + x as usize * self.format.bytes_per_pixel();
        let bytes = self.data.get(off..off + 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Rows of the visible area without stride padding.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        let row_bytes = self.size.width as usize * self.format.bytes_per_pixel();
        self.data
            .chunks(self.stride.max(1))
            .take(self.size.height as usize)
            .map(move |row| &row[..row_bytes])
    }
}

impl HostSurface for DisplaySurface {
    fn size(&self) -> Size {
        self.size
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn stride(&self) -> usize {
        self.stride
    }

    fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}
