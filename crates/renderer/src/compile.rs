use tracing::warn;

use crate::gl::{GlApi, GlError};
use crate::types::{Diagnostics, StageKind};

/// Compiler and linker logs are cut to this many bytes before reporting.
pub const MAX_LOG_BYTES: usize = 4095;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShaderError {
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: StageKind, log: String },
    #[error("program failed to link:\n{log}")]
    Link { log: String },
    #[error(transparent)]
    Gl(#[from] GlError),
}

/// Source text for the three stages of the fullscreen program.
#[derive(Debug, Clone, Copy)]
pub struct StageSources<'a> {
    pub vertex: &'a str,
    pub geometry: &'a str,
    pub fragment: &'a str,
}

impl<'a> StageSources<'a> {
    /// Pairs `fragment` with the fixed vertex and geometry stages.
    pub fn fullscreen(fragment: &'a str) -> Self {
        Self {
            vertex: VERTEX_SHADER_GLSL,
            geometry: GEOMETRY_SHADER_GLSL,
            fragment,
        }
    }
}

/// Compiles one stage.
///
/// With [`Diagnostics::Full`] the compile status is queried; a failed stage is
/// deleted on the spot and its log returned as [`ShaderError::Compile`]. With
/// [`Diagnostics::Off`] the handle is returned unchecked and a broken stage
/// only shows up when the program links.
pub(crate) fn compile_stage<G: GlApi>(
    gl: &G,
    kind: StageKind,
    source: &str,
    diagnostics: Diagnostics,
) -> Result<G::Shader, ShaderError> {
    let shader = gl.create_shader(kind)?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);

    if diagnostics == Diagnostics::Full && !gl.shader_compile_status(shader) {
        let log = truncate_log(gl.shader_info_log(shader));
        gl.delete_shader(shader);
        return Err(ShaderError::Compile { stage: kind, log });
    }
    Ok(shader)
}

/// Like [`compile_stage`] but reports compile errors through `tracing` and
/// yields `None`; only a lost context is returned as an error.
pub(crate) fn compile_or_report<G: GlApi>(
    gl: &G,
    kind: StageKind,
    source: &str,
    diagnostics: Diagnostics,
) -> Result<Option<G::Shader>, GlError> {
    match compile_stage(gl, kind, source, diagnostics) {
        Ok(shader) => Ok(Some(shader)),
        Err(ShaderError::Gl(err)) => Err(err),
        Err(err) => {
            warn!(stage = %kind, "{err}");
            Ok(None)
        }
    }
}

/// Cuts `log` to [`MAX_LOG_BYTES`] on a character boundary.
pub(crate) fn truncate_log(log: String) -> String {
    let mut log = log;
    if log.len() > MAX_LOG_BYTES {
        let mut end = MAX_LOG_BYTES;
        while !log.is_char_boundary(end) {
            end -= 1;
        }
        log.truncate(end);
    }
    let trimmed = log.trim_end().len();
    log.truncate(trimmed);
    log
}

/// Empty vertex stage; all geometry comes from the geometry stage.
pub const VERTEX_SHADER_GLSL: &str = "#version 450
void main() {}
";

/// Expands the single input point into a triangle strip covering clip space.
///
/// Each corner carries `coord = position + 1`, so the fragment stage sees
/// `coord` spanning `[0, 2]` on both axes.
pub const GEOMETRY_SHADER_GLSL: &str = r"#version 450
layout(points) in;
layout(triangle_strip, max_vertices = 4) out;

out vec2 coord;

void corner(float x, float y) {
    coord = vec2(x + 1.0, y + 1.0);
    gl_Position = vec4(x, y, 0.0, 1.0);
    EmitVertex();
}

void main() {
    corner(-1.0, -1.0);
    corner(1.0, -1.0);
    corner(-1.0, 1.0);
    corner(1.0, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::mock::MockGl;

    #[test]
    fn failed_compile_is_reported_and_deleted() {
        let gl = MockGl::new();
        let err = compile_stage(
            &gl,
            StageKind::Fragment,
            "void main() { broken",
            Diagnostics::Full,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ShaderError::Compile {
                stage: StageKind::Fragment,
                ..
            }
        ));
        assert_eq!(gl.live_shaders(), 0);
    }

    #[test]
    fn unchecked_compile_keeps_the_handle() {
        let gl = MockGl::new();
        let shader = compile_stage(&gl, StageKind::Fragment, "nonsense", Diagnostics::Off);
        assert!(shader.is_ok());
        assert_eq!(gl.live_shaders(), 1);
    }

    #[test]
    fn lost_context_is_not_a_compile_error() {
        let gl = MockGl::new();
        gl.lose_context();
        let result = compile_or_report(&gl, StageKind::Vertex, VERTEX_SHADER_GLSL, Diagnostics::Full);
        assert!(result.is_err());
    }

    #[test]
    fn fixed_stages_compile() {
        let gl = MockGl::new();
        for (kind, source) in [
            (StageKind::Vertex, VERTEX_SHADER_GLSL),
            (StageKind::Geometry, GEOMETRY_SHADER_GLSL),
        ] {
            assert!(compile_stage(&gl, kind, source, Diagnostics::Full).is_ok());
        }
    }

    #[test]
    fn geometry_stage_emits_four_corners_of_clip_space() {
        assert!(GEOMETRY_SHADER_GLSL.contains("layout(points) in;"));
        assert!(GEOMETRY_SHADER_GLSL.contains("max_vertices = 4"));
        assert_eq!(GEOMETRY_SHADER_GLSL.matches("corner(").count(), 5);
        for corner in [
            "corner(-1.0, -1.0)",
            "corner(1.0, -1.0)",
            "corner(-1.0, 1.0)",
            "corner(1.0, 1.0)",
        ] {
            assert!(GEOMETRY_SHADER_GLSL.contains(corner), "missing {corner}");
        }
    }

    #[test]
    fn truncates_long_logs_on_char_boundary() {
        let log = "é".repeat(MAX_LOG_BYTES);
        let truncated = truncate_log(log);
        assert!(truncated.len() <= MAX_LOG_BYTES);
        assert_eq!(truncated.len(), MAX_LOG_BYTES - 1);

        assert_eq!(truncate_log("short\n".to_string()), "short");
    }
}
