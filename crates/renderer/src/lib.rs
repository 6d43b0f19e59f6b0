//! Renderer crate for fragview.
//!
//! Draws one fragment shader over the whole window. The window owns a single
//! GL program made of a fixed empty vertex stage, a geometry stage that turns
//! one point into a clip-space quad, and the user's fragment stage. The
//! surface size reaches the fragment stage through the uniforms at locations
//! `0` (width) and `1` (height).
//!
//! ```text
//!   fragview CLI
//!        │ RendererConfig
//!        ▼
//!   Renderer::run ──▶ FragmentSource::load ──▶ RenderContext::realize
//!                                                   │
//!   winit loop ◀── HostEvent::FragmentChanged ◀── ReloadWatcher (development)
//!        │
//!        └─▶ RenderContext::render ─▶ glDrawArrays(POINTS, 0, 1)
//! ```
//!
//! Everything that touches GL goes through [`GlApi`], so the program
//! lifecycle can be driven by a recording fake in tests. Only [`window`]
//! talks to a real context.

mod compile;
mod context;
mod gl;
mod program;
mod source;
mod types;
mod watch;
mod window;

use anyhow::{Context, Result};
use tracing::info;

pub use compile::{
    ShaderError, StageSources, GEOMETRY_SHADER_GLSL, MAX_LOG_BYTES, VERTEX_SHADER_GLSL,
};
pub use context::{ExitStrategy, HostKey, KeyAction, ReloadOutcome, RenderContext};
pub use gl::{GlApi, GlError};
pub use program::{ProgramManager, ProgramState, HEIGHT_UNIFORM_LOCATION, WIDTH_UNIFORM_LOCATION};
pub use source::{regenerate, same_file, FragmentSource, SourceError};
pub use types::{
    BuildMode, DebounceConfig, Diagnostics, RendererConfig, StageKind, SurfaceDimensions,
    WindowOptions,
};
pub use watch::{classify, Debouncer, RawChange, ReloadWatcher, WatchError, WatchState};

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Loads the fragment shader, opens the window and blocks until the user
    /// quits.
    ///
    /// The shader is loaded before any window exists, so a missing file fails
    /// without flashing an empty window.
    pub fn run(self) -> Result<()> {
        let fragment = self
            .config
            .fragment
            .load()
            .context("failed to load fragment shader")?;
        info!(
            mode = %self.config.mode,
            watched = ?self.config.fragment.watched_path(),
            "starting renderer"
        );
        window::run_window(self.config, &fragment)
    }
}
