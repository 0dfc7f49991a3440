//! Console registry glue.
//!
//! The front end owns consoles and dispatches display events to registered
//! listeners. This module defines that contract and the headless listener
//! that drives one [`ScanoutState`](crate::scanout::ScanoutState) per
//! graphic console.

mod init;
mod listener;

use std::rc::Rc;

use crate::coords::Rect;
use crate::device::{ContextId, ContextParams, PlatformError};
use crate::scanout::{CursorTexture, ScanoutStats, SurfaceRef, TextureId};

pub use init::{graphic_consoles, init_headless, register_headless_displays};
pub use listener::HeadlessDisplay;

/// Index of a console in the registry.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ConsoleId(pub usize);

/// A virtual display owned by the front end.
pub trait Console {
    fn id(&self) -> ConsoleId;

    fn is_graphic(&self) -> bool;

    /// Asks the emulated display hardware to refresh its state.
    fn hw_update(&self);

    /// Notifies consumers that `rect` of the host surface changed.
    fn gfx_update(&self, rect: Rect);
}

/// The front end's console table and listener list.
pub trait ConsoleRegistry {
    fn lookup_console(&self, index: usize) -> Option<Rc<dyn Console>>;

    fn register_listener(&mut self, listener: Box<dyn DisplayListener>);
}

/// Guest scanout texture announced through
/// [`DisplayListener::on_scanout_bind_texture`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ScanoutTexture {
    pub texture: TextureId,
    /// Row 0 of the texture is the top row.
    pub y_0_top: bool,
    pub backing_width: u32,
    pub backing_height: u32,
    /// Visible region inside the backing texture.
    pub rect: Rect,
}

/// Display event callbacks.
pub trait DisplayListener {
    fn console(&self) -> ConsoleId;

    fn on_refresh_request(&mut self);

    /// 2D update of the host surface.
    fn on_gfx_update(&mut self, _rect: Rect) {}

    fn on_surface_switch(&mut self, surface: Option<SurfaceRef>);

    fn on_context_create(&mut self, params: &ContextParams) -> Result<ContextId, PlatformError>;

    fn on_context_destroy(&mut self, context: ContextId);

    fn on_context_make_current(&mut self, context: Option<ContextId>)
        -> Result<(), PlatformError>;

    fn on_context_get_current(&self) -> Option<ContextId>;

    fn on_scanout_disable(&mut self);

    fn on_scanout_bind_texture(&mut self, scanout: ScanoutTexture);

    fn on_cursor_texture(&mut self, cursor: Option<CursorTexture>);

    fn on_cursor_move(&mut self, x: u32, y: u32);

    fn on_scanout_flush(&mut self, rect: Rect);

    fn stats(&self) -> Option<ScanoutStats> {
        None
    }
}

/// Static description of a display backend.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DisplayBackendInfo {
    pub name: &'static str,
    /// The front end must enable GL for guests before devices are created.
    pub requires_gl: bool,
}

pub const HEADLESS_BACKEND: DisplayBackendInfo = DisplayBackendInfo {
    name: "gpu-headless",
    requires_gl: true,
};
