//! Drives the headless scanout engine without a VM.
//!
//! Renders every graphic console of an in-process console table and writes
//! PNG snapshots of the results.

mod consoles;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;

use scanout_engine::config::HeadlessConfig;
use scanout_engine::console::{init_headless, DisplayListener, ScanoutTexture};
use scanout_engine::coords::{Rect, Size};
use scanout_engine::device::{ContextParams, WgpuPlatform, WgpuPlatformConfig};
use scanout_engine::logging::{init_logging, LoggingConfig};
use scanout_engine::render::{wgpu_scanout, WgpuGpu, GUEST_TEXTURE_USAGES, SCANOUT_FORMAT};
use scanout_engine::scanout::{
    Compositor, CursorTexture, DisplaySurface, FramebufferOps, HostSurface, PixelFormat,
    SurfaceRef, TextureId,
};

use consoles::{DemoConsole, DemoRegistry};

/// Headless scanout snapshot tool
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Backend options, e.g. `rendernode=/dev/dri/renderD128,gl=es`
    #[arg(env = "SCANOUT_OPTS", default_value = "")]
    options: String,

    /// Directory the PNG snapshots are written to
    #[arg(env = "SCANOUT_OUT", default_value = ".")]
    out_dir: PathBuf,
}

const CONSOLE_SIZES: [Size; 2] = [Size::new(640, 480), Size::new(320, 200)];
const CURSOR_SIZE: Size = Size::new(32, 32);

fn main() {
    let args = Args::parse();
    init_logging(LoggingConfig::default());

    if let Err(e) = run(args) {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let Args { options, out_dir } = args;

    let config: HeadlessConfig = options
        .parse()
        .with_context(|| format!("invalid backend options {options:?}"))?;

    let mut registry = DemoRegistry::new(&CONSOLE_SIZES);
    let mut shared_gpu = None;

    let ctx = init_headless(
        WgpuPlatform::new(WgpuPlatformConfig::default()),
        &config,
        |ctx| {
            let (gpu, compositor) = wgpu_scanout(ctx)?;
            shared_gpu = Some(Rc::clone(&gpu));
            let gpu: Rc<dyn FramebufferOps> = gpu;
            let compositor: Rc<dyn Compositor> = compositor;
            Ok((gpu, compositor))
        },
        &mut registry,
    )?;
    let gpu = shared_gpu.context("scanout rendering was not set up")?;
    log::info!("rendering with the {} profile", ctx.profile());

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let cursor = cursor_texture(&gpu)?;

    for index in 0..registry.listeners.len() {
        let id = registry.listeners[index].console();
        let console = registry
            .console(id)
            .with_context(|| format!("listener for unknown console {}", id.0))?;
        snapshot_console(registry.listeners[index].as_mut(), &console, &gpu, cursor, &out_dir)?;
    }

    gpu.release_texture(cursor.texture);
    Ok(())
}

/// Runs two frames on one console and writes both to disk.
///
/// The first frame is top-down with a cursor (composited path), the second
/// bottom-up without one (copy path).
fn snapshot_console(
    listener: &mut dyn DisplayListener,
    console: &DemoConsole,
    gpu: &WgpuGpu,
    cursor: CursorTexture,
    out_dir: &Path,
) -> Result<()> {
    let id = listener.console().0;
    let size = console.size();
    let full = Rect::from_size(size);

    let surface = Rc::new(std::cell::RefCell::new(DisplaySurface::new(
        size,
        PixelFormat::Xrgb8888,
    )));
    let shared: SurfaceRef = surface.clone();
    listener.on_surface_switch(Some(shared));

    let context = listener.on_context_create(&ContextParams::default())?;
    listener.on_context_make_current(Some(context))?;
    listener.on_refresh_request();

    let guest = guest_texture(gpu, size, id as u8)?;
    let scanout = |y_0_top| ScanoutTexture {
        texture: guest,
        y_0_top,
        backing_width: size.width,
        backing_height: size.height,
        rect: full,
    };

    listener.on_scanout_bind_texture(scanout(true));
    listener.on_cursor_texture(Some(cursor));
    listener.on_cursor_move(size.width / 3, size.height / 3);
    listener.on_scanout_flush(full);
    write_png(&surface.borrow(), &out_dir.join(format!("console-{id}.png")))?;

    listener.on_cursor_texture(None);
    listener.on_scanout_bind_texture(scanout(false));
    listener.on_scanout_flush(full);
    write_png(&surface.borrow(), &out_dir.join(format!("console-{id}-flipped.png")))?;

    let dirty = console.take_dirty();
    if let Some(stats) = listener.stats() {
        log::info!(
            "console {id}: {} flushes, {} dirty rects, {} bytes read back, avg {}us",
            stats.flushes,
            dirty.len(),
            stats.bytes_read_back,
            stats.average_flush_time_us()
        );
    }

    listener.on_scanout_disable();
    listener.on_context_make_current(None)?;
    listener.on_context_destroy(context);
    listener.on_surface_switch(None);
    gpu.release_texture(guest);
    Ok(())
}

fn new_texture(gpu: &WgpuGpu, label: &str, size: Size) -> wgpu::Texture {
    gpu.ctx().device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: SCANOUT_FORMAT,
        usage: GUEST_TEXTURE_USAGES | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

/// Guest frame: blue/green gradient, red channel keyed by console.
fn guest_texture(gpu: &WgpuGpu, size: Size, seed: u8) -> Result<TextureId> {
    let mut pixels = Vec::with_capacity(size.area() as usize * 4);
    for y in 0..size.height {
        for x in 0..size.width {
            let b = (x * 255 / size.width.max(1)) as u8;
            let g = (y * 255 / size.height.max(1)) as u8;
            pixels.extend_from_slice(&[b, g, seed.wrapping_mul(96), 0xff]);
        }
    }

    let id = gpu.import_texture(new_texture(gpu, "guest scanout", size))?;
    gpu.upload(id, &pixels, size.width * 4)?;
    Ok(id)
}

/// Cursor image: opaque white triangle on a transparent square.
fn cursor_texture(gpu: &WgpuGpu) -> Result<CursorTexture> {
    let mut pixels = Vec::with_capacity(CURSOR_SIZE.area() as usize * 4);
    for y in 0..CURSOR_SIZE.height {
        for x in 0..CURSOR_SIZE.width {
            let px = if x <= y { [0xff; 4] } else { [0; 4] };
            pixels.extend_from_slice(&px);
        }
    }

    let texture = gpu.import_texture(new_texture(gpu, "guest cursor", CURSOR_SIZE))?;
    gpu.upload(texture, &pixels, CURSOR_SIZE.width * 4)?;
    Ok(CursorTexture {
        texture,
        width: CURSOR_SIZE.width,
        height: CURSOR_SIZE.height,
    })
}

/// Saves an XRGB8888 surface as an opaque RGBA PNG.
fn write_png(surface: &DisplaySurface, path: &Path) -> Result<()> {
    let size = surface.size();
    let mut rgba = Vec::with_capacity(size.area() as usize * 4);
    for row in surface.rows() {
        for px in row.chunks_exact(4) {
            rgba.extend_from_slice(&[px[2], px[1], px[0], 0xff]);
        }
    }

    let image = image::RgbaImage::from_raw(size.width, size.height, rgba)
        .context("surface buffer does not match its size")?;
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("wrote {}", path.display());
    Ok(())
}
