use std::rc::Rc;

use crate::coords::Rect;
use crate::device::{ContextId, ContextParams, PlatformError, RenderContext, RenderPlatform};
use crate::scanout::{
    Compositor, CursorTexture, FramebufferOps, ScanoutState, ScanoutStats, SurfaceRef,
};

use super::{Console, ConsoleId, DisplayListener, ScanoutTexture};

/// Headless listener for one graphic console.
pub struct HeadlessDisplay<P: RenderPlatform> {
    console: Rc<dyn Console>,
    ctx: Rc<RenderContext<P>>,
    scanout: ScanoutState,
}

impl<P: RenderPlatform> HeadlessDisplay<P> {
    pub fn new(
        console: Rc<dyn Console>,
        ctx: Rc<RenderContext<P>>,
        gpu: Rc<dyn FramebufferOps>,
        compositor: Rc<dyn Compositor>,
    ) -> Self {
        let scanout = ScanoutState::new(console.id(), gpu, compositor);
        Self { console, ctx, scanout }
    }

    pub fn scanout(&self) -> &ScanoutState {
        &self.scanout
    }
}

impl<P: RenderPlatform> DisplayListener for HeadlessDisplay<P> {
    fn console(&self) -> ConsoleId {
        self.console.id()
    }

    fn on_refresh_request(&mut self) {
        self.console.hw_update();
    }

    fn on_surface_switch(&mut self, surface: Option<SurfaceRef>) {
        self.scanout.switch_surface(surface);
    }

    fn on_context_create(&mut self, params: &ContextParams) -> Result<ContextId, PlatformError> {
        self.ctx.create_context_for_console(params)
    }

    fn on_context_destroy(&mut self, context: ContextId) {
        self.ctx.destroy_context(context);
    }

    fn on_context_make_current(
        &mut self,
        context: Option<ContextId>,
    ) -> Result<(), PlatformError> {
        self.ctx.make_current(context)
    }

    fn on_context_get_current(&self) -> Option<ContextId> {
        self.ctx.current_context()
    }

    fn on_scanout_disable(&mut self) {
        self.scanout.scanout_disable();
    }

    fn on_scanout_bind_texture(&mut self, scanout: ScanoutTexture) {
        log::trace!(
            "console {}: scanout texture {:?}, visible {}",
            self.console.id().0,
            scanout.texture,
            scanout.rect
        );
        self.scanout.bind_texture(
            scanout.texture,
            scanout.y_0_top,
            scanout.backing_width,
            scanout.backing_height,
        );
    }

    fn on_cursor_texture(&mut self, cursor: Option<CursorTexture>) {
        self.scanout.bind_cursor(cursor);
    }

    fn on_cursor_move(&mut self, x: u32, y: u32) {
        self.scanout.set_cursor_position(x, y);
    }

    fn on_scanout_flush(&mut self, rect: Rect) {
        if let Some(dirty) = self.scanout.flush(rect) {
            self.console.gfx_update(dirty);
        }
    }

    fn stats(&self) -> Option<ScanoutStats> {
        Some(*self.scanout.stats())
    }
}
