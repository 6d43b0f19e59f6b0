use tracing::{info, warn};

use crate::compile::{ShaderError, StageSources};
use crate::gl::{GlApi, GlError};
use crate::program::{ProgramManager, ProgramState};
use crate::source::{FragmentSource, SourceError};
use crate::types::{BuildMode, SurfaceDimensions};

/// Keys the host forwards to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKey {
    Escape,
    Other,
}

/// How the process should end when asked to quit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStrategy {
    /// Leave the event loop and unwind normally.
    Cooperative,
    /// Terminate every thread on the spot. Nothing needs an orderly shutdown:
    /// no open files, sockets, or persisted state.
    Immediate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Ignore,
    Quit(ExitStrategy),
}

/// What the host should do after a change notification.
#[derive(Debug)]
pub enum ReloadOutcome {
    /// New source reached the GPU, whether or not it built; repaint.
    Redraw,
    /// The source could not be prepared; the current frame stands.
    Keep,
    /// The shader is gone or cannot be regenerated; end the process.
    Fatal(SourceError),
}

/// Per-surface owner of the GPU program.
///
/// Created when the host realizes its surface and dropped (after
/// [`RenderContext::destroy`]) when it goes away. All methods run on the
/// thread that owns the GL context, which is what serializes reloads against
/// draws.
pub struct RenderContext<G: GlApi> {
    program: ProgramManager<G>,
    mode: BuildMode,
    reloads: u64,
}

impl<G: GlApi> RenderContext<G> {
    pub fn realize(gl: &G, mode: BuildMode, fragment: &str) -> Result<Self, GlError> {
        let sources = StageSources::fullscreen(fragment);
        let program = ProgramManager::build(gl, &sources, mode.diagnostics())?;
        info!(%mode, state = ?program.state(), "realized render context");
        Ok(Self {
            program,
            mode,
            reloads: 0,
        })
    }

    pub fn render(&self, gl: &G, surface: SurfaceDimensions) {
        self.program.draw(gl, surface);
    }

    /// Applies freshly loaded fragment source. Failures are logged and
    /// returned; the previous program keeps rendering either way.
    pub fn on_file_changed(&mut self, gl: &G, content: &str) -> Result<(), ShaderError> {
        self.reloads += 1;
        match self.program.rebuild_fragment(gl, content) {
            Ok(()) => {
                info!(reload = self.reloads, "fragment shader reloaded");
                Ok(())
            }
            Err(err) => {
                warn!(
                    reload = self.reloads,
                    state = ?self.program.state(),
                    "keeping previous fragment shader: {err}"
                );
                Err(err)
            }
        }
    }

    /// Reloads `source` after a change notification.
    pub fn reload(&mut self, gl: &G, source: &FragmentSource) -> ReloadOutcome {
        match source.load() {
            Ok(content) => {
                // Build failures are logged and the last good program stays bound.
                let _ = self.on_file_changed(gl, &content);
                ReloadOutcome::Redraw
            }
            Err(err) if err.is_fatal() => ReloadOutcome::Fatal(err),
            Err(err) => {
                warn!("keeping previous fragment shader: {err}");
                ReloadOutcome::Keep
            }
        }
    }

    pub fn on_key_press(&self, key: HostKey) -> KeyAction {
        match (key, self.mode) {
            (HostKey::Escape, BuildMode::Development) => {
                KeyAction::Quit(ExitStrategy::Cooperative)
            }
            (HostKey::Escape, BuildMode::Release) => KeyAction::Quit(ExitStrategy::Immediate),
            (HostKey::Other, _) => KeyAction::Ignore,
        }
    }

    pub fn state(&self) -> ProgramState {
        self.program.state()
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Number of reload attempts delivered so far.
    pub fn reloads(&self) -> u64 {
        self.reloads
    }

    pub fn destroy(self, gl: &G) {
        self.program.delete(gl);
    }
}
