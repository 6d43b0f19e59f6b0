//! The slice of OpenGL the shader pipeline needs.
//!
//! `GlApi` exists so the program lifecycle can run against a real `glow`
//! context on the event-loop thread and against a recording double in tests.
//! Object creation is fallible (it only fails when the context is gone); every
//! other call mirrors the GL entry point one to one.

use std::fmt;

use glow::HasContext;

use crate::types::StageKind;

#[cfg(test)]
pub(crate) mod mock;

/// The driver refused to hand out a new object, usually because the context
/// was lost.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to create {object}: {message}")]
pub struct GlError {
    pub object: &'static str,
    pub message: String,
}

pub trait GlApi {
    type Shader: Copy + Eq + fmt::Debug;
    type Program: Copy + Eq + fmt::Debug;
    type VertexArray: Copy + Eq + fmt::Debug;

    fn create_shader(&self, kind: StageKind) -> Result<Self::Shader, GlError>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, GlError>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn program_link_status(&self, program: Self::Program) -> bool;
    fn program_info_log(&self, program: Self::Program) -> String;
    fn use_program(&self, program: Self::Program);
    fn delete_program(&self, program: Self::Program);

    fn create_vertex_array(&self) -> Result<Self::VertexArray, GlError>;
    fn bind_vertex_array(&self, vertex_array: Self::VertexArray);
    fn delete_vertex_array(&self, vertex_array: Self::VertexArray);

    /// Sets a float uniform at a fixed `layout(location = N)` slot.
    fn uniform_f32(&self, location: u32, value: f32);
    fn draw_arrays(&self, mode: u32, first: i32, count: i32);
}

fn shader_type(kind: StageKind) -> u32 {
    match kind {
        StageKind::Vertex => glow::VERTEX_SHADER,
        StageKind::Geometry => glow::GEOMETRY_SHADER,
        StageKind::Fragment => glow::FRAGMENT_SHADER,
    }
}

// SAFETY (all blocks below): the host only hands out a `glow::Context` after
// making it current on the event-loop thread, and every handle passed in was
// created by that same context.
impl GlApi for glow::Context {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type VertexArray = glow::VertexArray;

    fn create_shader(&self, kind: StageKind) -> Result<Self::Shader, GlError> {
        unsafe { HasContext::create_shader(self, shader_type(kind)) }.map_err(|message| GlError {
            object: "shader",
            message,
        })
    }

    fn shader_source(&self, shader: Self::Shader, source: &str) {
        unsafe { HasContext::shader_source(self, shader, source) }
    }

    fn compile_shader(&self, shader: Self::Shader) {
        unsafe { HasContext::compile_shader(self, shader) }
    }

    fn shader_compile_status(&self, shader: Self::Shader) -> bool {
        unsafe { HasContext::get_shader_compile_status(self, shader) }
    }

    fn shader_info_log(&self, shader: Self::Shader) -> String {
        unsafe { HasContext::get_shader_info_log(self, shader) }
    }

    fn delete_shader(&self, shader: Self::Shader) {
        unsafe { HasContext::delete_shader(self, shader) }
    }

    fn create_program(&self) -> Result<Self::Program, GlError> {
        unsafe { HasContext::create_program(self) }.map_err(|message| GlError {
            object: "program",
            message,
        })
    }

    fn attach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { HasContext::attach_shader(self, program, shader) }
    }

    fn detach_shader(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { HasContext::detach_shader(self, program, shader) }
    }

    fn link_program(&self, program: Self::Program) {
        unsafe { HasContext::link_program(self, program) }
    }

    fn program_link_status(&self, program: Self::Program) -> bool {
        unsafe { HasContext::get_program_link_status(self, program) }
    }

    fn program_info_log(&self, program: Self::Program) -> String {
        unsafe { HasContext::get_program_info_log(self, program) }
    }

    fn use_program(&self, program: Self::Program) {
        unsafe { HasContext::use_program(self, Some(program)) }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { HasContext::delete_program(self, program) }
    }

    fn create_vertex_array(&self) -> Result<Self::VertexArray, GlError> {
        unsafe { HasContext::create_vertex_array(self) }.map_err(|message| GlError {
            object: "vertex array",
            message,
        })
    }

    fn bind_vertex_array(&self, vertex_array: Self::VertexArray) {
        unsafe { HasContext::bind_vertex_array(self, Some(vertex_array)) }
    }

    fn delete_vertex_array(&self, vertex_array: Self::VertexArray) {
        unsafe { HasContext::delete_vertex_array(self, vertex_array) }
    }

    fn uniform_f32(&self, location: u32, value: f32) {
        let location = glow::NativeUniformLocation(location);
        unsafe { HasContext::uniform_1_f32(self, Some(&location), value) }
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        unsafe { HasContext::draw_arrays(self, mode, first, count) }
    }
}
