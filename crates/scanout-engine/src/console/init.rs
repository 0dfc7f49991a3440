use std::rc::Rc;

use anyhow::{Context, Result};

use crate::config::HeadlessConfig;
use crate::device::{select_and_open, RenderContext, RenderPlatform};
use crate::scanout::{Compositor, FramebufferOps};

use super::{Console, ConsoleRegistry, HeadlessDisplay, HEADLESS_BACKEND};

/// Graphic consoles in index order.
///
/// Stops at the first index that is absent or not graphic; later consoles
/// are never visited.
pub fn graphic_consoles<R>(registry: &R) -> impl Iterator<Item = Rc<dyn Console>> + '_
where
    R: ConsoleRegistry + ?Sized,
{
    (0..).map_while(move |index| registry.lookup_console(index).filter(|c| c.is_graphic()))
}

/// Registers one [`HeadlessDisplay`] per graphic console.
///
/// All listeners share `gpu` and `compositor`. Returns how many were
/// registered.
pub fn register_headless_displays<P, R>(
    ctx: &Rc<RenderContext<P>>,
    gpu: Rc<dyn FramebufferOps>,
    compositor: Rc<dyn Compositor>,
    registry: &mut R,
) -> usize
where
    P: RenderPlatform + 'static,
    R: ConsoleRegistry + ?Sized,
{
    let consoles: Vec<Rc<dyn Console>> = graphic_consoles(registry).collect();

    for console in &consoles {
        log::debug!(
            "registering {} listener for console {}",
            HEADLESS_BACKEND.name,
            console.id().0
        );
        let listener = HeadlessDisplay::new(
            Rc::clone(console),
            Rc::clone(ctx),
            Rc::clone(&gpu),
            Rc::clone(&compositor),
        );
        registry.register_listener(Box::new(listener));
    }

    consoles.len()
}

/// Brings the headless backend up.
///
/// Opens the rendering device, builds the shared framebuffer ops and
/// compositor with `make_gpu`, then registers a listener per graphic console.
pub fn init_headless<P, R, F>(
    platform: P,
    config: &HeadlessConfig,
    make_gpu: F,
    registry: &mut R,
) -> Result<Rc<RenderContext<P>>>
where
    P: RenderPlatform + 'static,
    R: ConsoleRegistry + ?Sized,
    F: FnOnce(&RenderContext<P>) -> Result<(Rc<dyn FramebufferOps>, Rc<dyn Compositor>)>,
{
    let ctx = select_and_open(platform, config).context("render node init failed")?;
    let (gpu, compositor) = make_gpu(&ctx).context("failed to set up scanout rendering")?;
    let ctx = Rc::new(ctx);

    let count = register_headless_displays(&ctx, gpu, compositor, registry);
    log::info!("{}: {count} graphic console(s)", HEADLESS_BACKEND.name);

    Ok(ctx)
}
