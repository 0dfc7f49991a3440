use std::rc::Rc;
use std::time::Instant;

use crate::console::ConsoleId;
use crate::coords::{Point, Rect, Size};

use super::{
    Compositor, FramebufferBinding, FramebufferOps, PixelFormat, ScanoutStats, SurfaceRef,
    TextureId,
};

/// Cursor image supplied by the guest.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CursorTexture {
    pub texture: TextureId,
    pub width: u32,
    pub height: u32,
}

/// Where a pipeline is in its lifecycle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ScanoutPhase {
    /// No guest texture bound.
    Uninitialized,
    /// Guest texture bound, no host surface.
    Bound,
    /// Guest texture bound and host surface present; flushes do work.
    Ready,
}

/// Per-console scanout pipeline.
///
/// Holds the guest, cursor and composite bindings. On flush the guest frame
/// (plus cursor, if any) is composited into the composite texture which is
/// then read back into the host surface.
///
/// Invariant: `composite` always has the size of the latest guest binding
/// and is reallocated only when that size changes.
pub struct ScanoutState {
    console: ConsoleId,
    surface: Option<SurfaceRef>,

    guest: FramebufferBinding,
    cursor: FramebufferBinding,
    composite: FramebufferBinding,

    y_0_top: bool,
    cursor_pos: Point,

    gpu: Rc<dyn FramebufferOps>,
    compositor: Rc<dyn Compositor>,

    stats: ScanoutStats,
}

impl ScanoutState {
    pub fn new(
        console: ConsoleId,
        gpu: Rc<dyn FramebufferOps>,
        compositor: Rc<dyn Compositor>,
    ) -> Self {
        Self {
            console,
            surface: None,
            guest: FramebufferBinding::empty(),
            cursor: FramebufferBinding::empty(),
            composite: FramebufferBinding::empty(),
            y_0_top: false,
            cursor_pos: Point::default(),
            gpu,
            compositor,
            stats: ScanoutStats::default(),
        }
    }

    pub fn console(&self) -> ConsoleId {
        self.console
    }

    pub fn phase(&self) -> ScanoutPhase {
        match (self.guest.is_bound(), self.surface.is_some()) {
            (false, _) => ScanoutPhase::Uninitialized,
            (true, false) => ScanoutPhase::Bound,
            (true, true) => ScanoutPhase::Ready,
        }
    }

    pub fn guest(&self) -> &FramebufferBinding {
        &self.guest
    }

    pub fn cursor(&self) -> &FramebufferBinding {
        &self.cursor
    }

    pub fn composite(&self) -> &FramebufferBinding {
        &self.composite
    }

    pub fn y_0_top(&self) -> bool {
        self.y_0_top
    }

    pub fn cursor_position(&self) -> Point {
        self.cursor_pos
    }

    pub fn stats(&self) -> &ScanoutStats {
        &self.stats
    }

    /// Replaces the host surface reference. No GPU work.
    pub fn switch_surface(&mut self, surface: Option<SurfaceRef>) {
        self.surface = surface;
    }

    /// Drops the guest binding and the composite texture.
    ///
    /// The cursor binding is left alone.
    pub fn scanout_disable(&mut self) {
        self.guest.destroy(&*self.gpu);
        self.composite.destroy(&*self.gpu);
    }

    /// Binds a guest texture as the scanout source.
    pub fn bind_texture(&mut self, texture: TextureId, y_0_top: bool, width: u32, height: u32) {
        let size = Size::new(width, height);
        self.y_0_top = y_0_top;
        self.guest = FramebufferBinding::borrowed(texture, size);

        if self.composite.size() != size {
            self.composite.destroy(&*self.gpu);
            self.composite = FramebufferBinding::allocate(&*self.gpu, size);
            self.stats.record_allocation();
            log::debug!("console {}: composite resized to {size}", self.console.0);
        }
    }

    /// Sets or clears the cursor image.
    pub fn bind_cursor(&mut self, cursor: Option<CursorTexture>) {
        self.cursor = match cursor {
            Some(c) => FramebufferBinding::borrowed(c.texture, Size::new(c.width, c.height)),
            None => FramebufferBinding::empty(),
        };
    }

    pub fn set_cursor_position(&mut self, x: u32, y: u32) {
        self.cursor_pos = Point::new(x, y);
    }

    /// Composites the current frame into the host surface.
    ///
    /// Returns the dirty rectangle to report (`rect` clipped to the
    /// surface), or `None` when there is no guest texture or no host surface.
    ///
    /// # Panics
    ///
    /// If the host surface size differs from the guest binding or its format
    /// is not [`PixelFormat::Xrgb8888`].
    pub fn flush(&mut self, rect: Rect) -> Option<Rect> {
        let surface = match (&self.surface, self.guest.is_bound()) {
            (Some(surface), true) => Rc::clone(surface),
            _ => {
                self.stats.record_skip();
                log::trace!("console {}: flush skipped", self.console.0);
                return None;
            }
        };
        let mut surface = surface.borrow_mut();

        assert_eq!(
            surface.size(),
            self.guest.size(),
            "host surface size does not match the guest scanout"
        );
        assert_eq!(
            surface.format(),
            PixelFormat::Xrgb8888,
            "host surface must be XRGB8888"
        );

        let started = Instant::now();
        let flip_y = !self.y_0_top;

        if self.cursor.is_bound() {
            self.compositor
                .texture_blit(&self.composite, &self.guest, flip_y);
            self.compositor
                .texture_blend(&self.composite, &self.cursor, flip_y, self.cursor_pos);
        } else {
            self.gpu.blit(&self.composite, &self.guest, flip_y);
        }

        let stride = surface.stride();
        self.gpu
            .read_pixels(&self.composite, surface.data_mut(), stride);

        // The whole surface was rewritten; an out-of-range rect reports all of it.
        let size = self.guest.size();
        let dirty = rect.clamp_to(size).unwrap_or(Rect::from_size(size));

        let bytes = stride * size.height as usize;
        let elapsed = started.elapsed().as_micros() as u64;
        self.stats.record_flush(bytes, elapsed);
        log::trace!(
            "console {}: flushed {dirty} ({bytes} bytes, {elapsed}us)",
            self.console.0
        );

        Some(dirty)
    }
}

impl Drop for ScanoutState {
    fn drop(&mut self) {
        self.composite.destroy(&*self.gpu);
    }
}
