use tracing::{debug, warn};

use crate::compile::{compile_or_report, compile_stage, truncate_log, ShaderError, StageSources};
use crate::gl::{GlApi, GlError};
use crate::types::{Diagnostics, StageKind, SurfaceDimensions};

/// `layout(location = 0) uniform float` receiving the surface width.
pub const WIDTH_UNIFORM_LOCATION: u32 = 0;
/// `layout(location = 1) uniform float` receiving the surface height.
pub const HEIGHT_UNIFORM_LOCATION: u32 = 1;

/// Link outcome of the program object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgramState {
    #[default]
    Uninitialized,
    Linked,
    LinkFailed,
}

/// Owns the program object, its stages, and the empty vertex array it draws
/// with.
///
/// The vertex and geometry stages are attached once and never touched again.
/// The fragment stage can be swapped any number of times through
/// [`ProgramManager::rebuild_fragment`]; the stage that produced the current
/// executable is kept alive until its replacement links, which is what makes
/// rolling back after a bad edit possible.
pub struct ProgramManager<G: GlApi> {
    program: G::Program,
    vertex_array: G::VertexArray,
    vertex: Option<G::Shader>,
    geometry: Option<G::Shader>,
    fragment: Option<G::Shader>,
    state: ProgramState,
}

impl<G: GlApi> ProgramManager<G> {
    /// Compiles all three stages, links them, and allocates the vertex array.
    ///
    /// Compile and link problems never fail this call: the program is returned
    /// either way and [`ProgramManager::state`] tells whether it linked. The
    /// only error is the driver refusing to create objects.
    pub fn build(
        gl: &G,
        sources: &StageSources<'_>,
        diagnostics: Diagnostics,
    ) -> Result<Self, GlError> {
        let program = gl.create_program()?;
        let mut manager = Self {
            program,
            vertex_array: match gl.create_vertex_array() {
                Ok(vertex_array) => vertex_array,
                Err(err) => {
                    gl.delete_program(program);
                    return Err(err);
                }
            },
            vertex: None,
            geometry: None,
            fragment: None,
            state: ProgramState::Uninitialized,
        };

        let stages = [
            (StageKind::Vertex, sources.vertex),
            (StageKind::Geometry, sources.geometry),
            (StageKind::Fragment, sources.fragment),
        ];
        for (kind, source) in stages {
            let shader = match compile_or_report(gl, kind, source, diagnostics) {
                Ok(shader) => shader,
                Err(err) => {
                    manager.delete(gl);
                    return Err(err);
                }
            };
            if let Some(shader) = shader {
                gl.attach_shader(program, shader);
            }
            *manager.slot_mut(kind) = shader;
        }

        gl.link_program(program);
        manager.state = if gl.program_link_status(program) {
            ProgramState::Linked
        } else {
            if diagnostics == Diagnostics::Full {
                let err = ShaderError::Link {
                    log: truncate_log(gl.program_info_log(program)),
                };
                warn!("{err}");
            }
            ProgramState::LinkFailed
        };
        debug!(state = ?manager.state, "built fullscreen program");
        Ok(manager)
    }

    /// Swaps in a new fragment stage and relinks the same program object.
    ///
    /// * Compile failure: the new stage is deleted and the program is left
    ///   exactly as it was, so its previous executable keeps rendering.
    /// * Link failure: the new stage is removed and the last stage that
    ///   linked is attached and linked again.
    ///
    /// Status is always queried here regardless of diagnostics level, since
    /// the rollback depends on it. Must run on the thread that owns the
    /// context, never interleaved with [`ProgramManager::draw`].
    pub fn rebuild_fragment(&mut self, gl: &G, source: &str) -> Result<(), ShaderError> {
        let replacement = compile_stage(gl, StageKind::Fragment, source, Diagnostics::Full)?;
        let previous = self.fragment.take();
        if let Some(previous) = previous {
            gl.detach_shader(self.program, previous);
        }
        gl.attach_shader(self.program, replacement);
        gl.link_program(self.program);

        if gl.program_link_status(self.program) {
            if let Some(previous) = previous {
                gl.delete_shader(previous);
            }
            self.fragment = Some(replacement);
            self.state = ProgramState::Linked;
            return Ok(());
        }

        let log = truncate_log(gl.program_info_log(self.program));
        gl.detach_shader(self.program, replacement);
        gl.delete_shader(replacement);
        self.fragment = previous;
        self.state = match previous {
            Some(previous) => {
                gl.attach_shader(self.program, previous);
                gl.link_program(self.program);
                if gl.program_link_status(self.program) {
                    ProgramState::Linked
                } else {
                    ProgramState::LinkFailed
                }
            }
            None => ProgramState::LinkFailed,
        };
        Err(ShaderError::Link { log })
    }

    /// Draws one point that the geometry stage expands into the fullscreen
    /// quad, with the surface size in uniform locations 0 and 1.
    pub fn draw(&self, gl: &G, surface: SurfaceDimensions) {
        gl.use_program(self.program);
        gl.bind_vertex_array(self.vertex_array);
        gl.uniform_f32(WIDTH_UNIFORM_LOCATION, surface.width as f32);
        gl.uniform_f32(HEIGHT_UNIFORM_LOCATION, surface.height as f32);
        gl.draw_arrays(glow::POINTS, 0, 1);
    }

    pub fn state(&self) -> ProgramState {
        self.state
    }

    pub fn program(&self) -> G::Program {
        self.program
    }

    /// Releases every GL object owned by the manager.
    pub fn delete(mut self, gl: &G) {
        for kind in [StageKind::Vertex, StageKind::Geometry, StageKind::Fragment] {
            if let Some(shader) = self.slot_mut(kind).take() {
                gl.detach_shader(self.program, shader);
                gl.delete_shader(shader);
            }
        }
        gl.delete_vertex_array(self.vertex_array);
        gl.delete_program(self.program);
    }

    fn slot_mut(&mut self, kind: StageKind) -> &mut Option<G::Shader> {
        match kind {
            StageKind::Vertex => &mut self.vertex,
            StageKind::Geometry => &mut self.geometry,
            StageKind::Fragment => &mut self.fragment,
        }
    }
}
