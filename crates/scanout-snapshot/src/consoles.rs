//! In-process console table standing in for a VM front end.

use std::cell::RefCell;
use std::rc::Rc;

use scanout_engine::console::{Console, ConsoleId, ConsoleRegistry, DisplayListener};
use scanout_engine::coords::{Rect, Size};

pub struct DemoConsole {
    id: ConsoleId,
    size: Size,
    graphic: bool,
    dirty: RefCell<Vec<Rect>>,
}

impl DemoConsole {
    pub fn size(&self) -> Size {
        self.size
    }

    /// Dirty rectangles reported since the last call.
    pub fn take_dirty(&self) -> Vec<Rect> {
        std::mem::take(&mut *self.dirty.borrow_mut())
    }
}

impl Console for DemoConsole {
    fn id(&self) -> ConsoleId {
        self.id
    }

    fn is_graphic(&self) -> bool {
        self.graphic
    }

    fn hw_update(&self) {
        log::trace!("console {}: hardware update", self.id.0);
    }

    fn gfx_update(&self, rect: Rect) {
        log::debug!("console {}: dirty {rect}", self.id.0);
        self.dirty.borrow_mut().push(rect);
    }
}

/// Graphic consoles followed by one text console, so enumeration stops
/// after the graphic ones.
pub struct DemoRegistry {
    consoles: Vec<Rc<DemoConsole>>,
    pub listeners: Vec<Box<dyn DisplayListener>>,
}

impl DemoRegistry {
    pub fn new(sizes: &[Size]) -> Self {
        let text = DemoConsole {
            id: ConsoleId(sizes.len()),
            size: Size::new(0, 0),
            graphic: false,
            dirty: RefCell::new(Vec::new()),
        };

        let consoles = sizes
            .iter()
            .enumerate()
            .map(|(index, size)| DemoConsole {
                id: ConsoleId(index),
                size: *size,
                graphic: true,
                dirty: RefCell::new(Vec::new()),
            })
            .chain(std::iter::once(text))
            .map(Rc::new)
            .collect();

        Self { consoles, listeners: Vec::new() }
    }

    pub fn console(&self, id: ConsoleId) -> Option<Rc<DemoConsole>> {
        self.consoles.get(id.0).cloned()
    }
}

impl ConsoleRegistry for DemoRegistry {
    fn lookup_console(&self, index: usize) -> Option<Rc<dyn Console>> {
        self.consoles.get(index).map(|c| Rc::clone(c) as Rc<dyn Console>)
    }

    fn register_listener(&mut self, listener: Box<dyn DisplayListener>) {
        self.listeners.push(listener);
    }
}
