use std::ffi::CString;
use std::num::NonZeroU32;

use anyhow::{anyhow, Context, Result};
use glow::HasContext;
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version,
};
use glutin::display::{Display, DisplayApiPreference, GetGlDisplay};
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopBuilder};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Fullscreen, Window, WindowBuilder};

use crate::context::{ExitStrategy, HostKey, KeyAction, ReloadOutcome, RenderContext};
use crate::types::{RendererConfig, SurfaceDimensions, WindowOptions};
use crate::watch::ReloadWatcher;

/// Events posted into the host loop from other threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HostEvent {
    /// The watched fragment shader settled after an edit.
    FragmentChanged,
}

/// Window plus the GL context current on it.
struct GlWindow {
    window: Window,
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    gl: glow::Context,
}

impl GlWindow {
    fn new(event_loop: &EventLoop<HostEvent>, options: &WindowOptions) -> Result<Self> {
        let (width, height) = options.size;
        let mut builder = WindowBuilder::new()
            .with_title(options.title.clone())
            .with_inner_size(PhysicalSize::new(width, height));
        if options.fullscreen {
            builder = builder.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let display = open_display(event_loop)?;
        let template = ConfigTemplateBuilder::new().with_depth_size(0).build();
        let configs = unsafe { display.find_configs(template) }
            .context("failed to query GL configs")?;
        let gl_config = pick_config(configs, |config| config.num_samples())?;
        let window = glutin_winit::finalize_window(event_loop, builder, &gl_config)
            .map_err(|err| anyhow!("failed to create window: {err}"))?;

        let raw_window_handle = window.raw_window_handle();
        let gl_display = gl_config.display();
        let context_attributes = ContextAttributesBuilder::new()
            .with_profile(GlProfile::Core)
            .with_context_api(ContextApi::OpenGl(Some(Version::new(4, 5))))
            .build(Some(raw_window_handle));
        let not_current = unsafe { gl_display.create_context(&gl_config, &context_attributes) }
            .context("failed to create OpenGL 4.5 core context")?;

        let size = window.inner_size();
        let attrs = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            raw_window_handle,
            non_zero(size.width),
            non_zero(size.height),
        );
        let surface = unsafe { gl_display.create_window_surface(&gl_config, &attrs) }
            .context("failed to create window surface")?;
        let context = not_current
            .make_current(&surface)
            .context("failed to make GL context current")?;

        if let Err(err) =
            surface.set_swap_interval(&context, SwapInterval::Wait(NonZeroU32::MIN))
        {
            warn!("vsync unavailable: {err}");
        }

        let gl = unsafe {
            glow::Context::from_loader_function(|symbol| match CString::new(symbol) {
                Ok(symbol) => gl_display.get_proc_address(&symbol) as *const _,
                Err(_) => std::ptr::null(),
            })
        };
        debug!(version = %gl.version().major, "loaded GL entry points");

        Ok(Self {
            window,
            surface,
            context,
            gl,
        })
    }

    fn dimensions(&self) -> SurfaceDimensions {
        let size = self.window.inner_size();
        SurfaceDimensions::new(size.width, size.height)
    }

    fn resize(&self, size: PhysicalSize<u32>) {
        self.surface
            .resize(&self.context, non_zero(size.width), non_zero(size.height));
        unsafe {
            self.gl
                .viewport(0, 0, size.width.max(1) as i32, size.height.max(1) as i32);
        }
    }

    fn present(&self) -> Result<()> {
        self.surface
            .swap_buffers(&self.context)
            .context("failed to swap buffers")
    }
}

fn open_display(event_loop: &EventLoop<HostEvent>) -> Result<Display> {
    #[cfg(target_os = "macos")]
    let preference = DisplayApiPreference::Cgl;
    #[cfg(not(target_os = "macos"))]
    let preference = DisplayApiPreference::Egl;
    // The event loop outlives every window and context made from it.
    unsafe { Display::new(event_loop.raw_display_handle(), preference) }
        .map_err(|err| anyhow!("failed to open GL display: {err}"))
}

/// Prefers the config with the most samples per pixel.
fn pick_config<C>(configs: impl Iterator<Item = C>, samples: impl Fn(&C) -> u8) -> Result<C> {
    configs
        .max_by_key(|config| samples(config))
        .ok_or_else(|| anyhow!("display offers no GL config for the window"))
}

/// Opens the window, realizes the render context with `fragment`, and runs
/// the event loop until the user quits.
pub(crate) fn run_window(config: RendererConfig, fragment: &str) -> Result<()> {
    let event_loop = EventLoopBuilder::<HostEvent>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let host = GlWindow::new(&event_loop, &config.window)?;

    let mut render = Some(
        RenderContext::realize(&host.gl, config.mode, fragment)
            .context("failed to create shader program")?,
    );

    let watcher = match config.fragment.watched_path() {
        Some(path) if config.mode.watches_source() => {
            let proxy = event_loop.create_proxy();
            let watcher = ReloadWatcher::start(path, config.debounce, move || {
                let _ = proxy.send_event(HostEvent::FragmentChanged);
            })
            .with_context(|| format!("failed to watch {}", path.display()))?;
            info!(path = %path.display(), "hot reload enabled");
            Some(watcher)
        }
        _ => None,
    };

    host.window.request_redraw();

    let run_result = event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Wait);
        match event {
            Event::UserEvent(HostEvent::FragmentChanged) => {
                let Some(context) = render.as_mut() else {
                    return;
                };
                match context.reload(&host.gl, &config.fragment) {
                    ReloadOutcome::Redraw => host.window.request_redraw(),
                    ReloadOutcome::Keep => {}
                    ReloadOutcome::Fatal(err) => {
                        error!("{err}");
                        std::process::exit(1);
                    }
                }
            }
            Event::WindowEvent { window_id, event } if window_id == host.window.id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                    WindowEvent::KeyboardInput { event, .. } => {
                        let (Some(context), Some(key)) = (render.as_ref(), pressed_key(&event))
                        else {
                            return;
                        };
                        match context.on_key_press(key) {
                            KeyAction::Ignore => {}
                            KeyAction::Quit(ExitStrategy::Cooperative) => elwt.exit(),
                            KeyAction::Quit(ExitStrategy::Immediate) => std::process::exit(0),
                        }
                    }
                    WindowEvent::Resized(size) => {
                        host.resize(size);
                        host.window.request_redraw();
                    }
                    WindowEvent::RedrawRequested => {
                        if let Some(context) = render.as_ref() {
                            context.render(&host.gl, host.dimensions());
                            if let Err(err) = host.present() {
                                error!("{err:#}");
                                elwt.exit();
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::LoopExiting => {
                if let Some(context) = render.take() {
                    context.destroy(&host.gl);
                }
            }
            _ => {}
        }
    });

    drop(watcher);
    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

/// Maps a key press onto the keys the render context understands. Releases
/// and auto-repeats are ignored.
fn pressed_key(event: &KeyEvent) -> Option<HostKey> {
    if event.state != ElementState::Pressed || event.repeat {
        return None;
    }
    Some(host_key(&event.logical_key))
}

fn host_key(key: &Key) -> HostKey {
    match key {
        Key::Named(NamedKey::Escape) => HostKey::Escape,
        _ => HostKey::Other,
    }
}

fn non_zero(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
}
