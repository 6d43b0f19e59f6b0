use std::cell::RefCell;
use std::collections::BTreeMap;

use super::{GlApi, GlError};
use crate::types::StageKind;

/// Recorded side effects that tests assert on.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Link(u32),
    UseProgram(u32),
    BindVertexArray(u32),
    Uniform { location: u32, value: f32 },
    DrawArrays { mode: u32, first: i32, count: i32 },
}

#[derive(Debug)]
struct Shader {
    kind: StageKind,
    source: String,
    compiled: Option<Result<(), String>>,
}

#[derive(Debug, Default)]
struct Program {
    attached: Vec<u32>,
    linked: bool,
    log: String,
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,
    shaders: BTreeMap<u32, Shader>,
    programs: BTreeMap<u32, Program>,
    vertex_arrays: Vec<u32>,
    calls: Vec<Call>,
    lost: bool,
}

impl State {
    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// GL double with just enough of a compiler to tell good sources from bad.
///
/// A stage compiles when it has a `main` and balanced braces and carries no
/// `#error`. A program links when it has exactly one compiled stage of each
/// kind and every `in vec2 name;` of the fragment stage is an `out` of the
/// geometry stage.
#[derive(Debug, Default)]
pub(crate) struct MockGl {
    state: RefCell<State>,
}

impl MockGl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent object creation fail as if the context was lost.
    pub fn lose_context(&self) {
        self.state.borrow_mut().lost = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn link_count(&self) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| matches!(call, Call::Link(_)))
            .count()
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.state.borrow().vertex_arrays.len()
    }

    pub fn is_linked(&self, program: u32) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|program| program.linked)
    }

    /// Sources attached to `program`, in attachment order.
    pub fn attached_sources(&self, program: u32) -> Vec<(StageKind, String)> {
        let state = self.state.borrow();
        state
            .programs
            .get(&program)
            .map(|program| {
                program
                    .attached
                    .iter()
                    .filter_map(|id| state.shaders.get(id))
                    .map(|shader| (shader.kind, shader.source.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn created(&self, object: &'static str) -> Result<u32, GlError> {
        let mut state = self.state.borrow_mut();
        if state.lost {
            return Err(GlError {
                object,
                message: "context lost".to_string(),
            });
        }
        Ok(state.allocate())
    }
}

fn compile(source: &str) -> Result<(), String> {
    if let Some(line) = source.lines().position(|line| line.trim_start().starts_with("#error")) {
        return Err(format!("0:{}: error: #error directive", line + 1));
    }
    if !source.contains("main") {
        return Err("0:1: error: no definition of main".to_string());
    }
    let opened = source.matches('{').count();
    let closed = source.matches('}').count();
    if opened != closed {
        return Err(format!(
            "0:{}: error: syntax error, unexpected end of file",
            source.lines().count()
        ));
    }
    Ok(())
}

fn declared(source: &str, qualifier: &str) -> Vec<String> {
    source
        .lines()
        .filter_map(|line| line.trim().strip_prefix(qualifier))
        .filter_map(|rest| rest.trim().strip_suffix(';'))
        .filter_map(|decl| decl.split_whitespace().last().map(str::to_string))
        .collect()
}

fn link(shaders: &BTreeMap<u32, Shader>, attached: &[u32]) -> Result<(), String> {
    let stages: Vec<&Shader> = attached.iter().filter_map(|id| shaders.get(id)).collect();
    for kind in [StageKind::Vertex, StageKind::Geometry, StageKind::Fragment] {
        let count = stages.iter().filter(|shader| shader.kind == kind).count();
        if count != 1 {
            return Err(format!("error: expected one {kind} shader, found {count}"));
        }
    }
    if let Some(shader) = stages
        .iter()
        .find(|shader| !matches!(shader.compiled, Some(Ok(()))))
    {
        return Err(format!("error: {} shader is not compiled", shader.kind));
    }

    let geometry = stages
        .iter()
        .find(|shader| shader.kind == StageKind::Geometry)
        .map(|shader| declared(&shader.source, "out "))
        .unwrap_or_default();
    let fragment = stages
        .iter()
        .find(|shader| shader.kind == StageKind::Fragment)
        .map(|shader| declared(&shader.source, "in "))
        .unwrap_or_default();
    for input in fragment {
        if !geometry.contains(&input) {
            return Err(format!(
                "error: fragment input '{input}' is not written by the previous stage"
            ));
        }
    }
    Ok(())
}

impl GlApi for MockGl {
    type Shader = u32;
    type Program = u32;
    type VertexArray = u32;

    fn create_shader(&self, kind: StageKind) -> Result<u32, GlError> {
        let id = self.created("shader")?;
        self.state.borrow_mut().shaders.insert(
            id,
            Shader {
                kind,
                source: String::new(),
                compiled: None,
            },
        );
        Ok(id)
    }

    fn shader_source(&self, shader: u32, source: &str) {
        if let Some(shader) = self.state.borrow_mut().shaders.get_mut(&shader) {
            shader.source = source.to_string();
        }
    }

    fn compile_shader(&self, shader: u32) {
        if let Some(shader) = self.state.borrow_mut().shaders.get_mut(&shader) {
            shader.compiled = Some(compile(&shader.source));
        }
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .is_some_and(|shader| matches!(shader.compiled, Some(Ok(()))))
    }

    fn shader_info_log(&self, shader: u32) -> String {
        match self.state.borrow().shaders.get(&shader) {
            Some(Shader {
                compiled: Some(Err(log)),
                ..
            }) => log.clone(),
            _ => String::new(),
        }
    }

    fn delete_shader(&self, shader: u32) {
        self.state.borrow_mut().shaders.remove(&shader);
    }

    fn create_program(&self) -> Result<u32, GlError> {
        let id = self.created("program")?;
        self.state
            .borrow_mut()
            .programs
            .insert(id, Program::default());
        Ok(id)
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        if let Some(program) = self.state.borrow_mut().programs.get_mut(&program) {
            if !program.attached.contains(&shader) {
                program.attached.push(shader);
            }
        }
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        if let Some(program) = self.state.borrow_mut().programs.get_mut(&program) {
            program.attached.retain(|id| *id != shader);
        }
    }

    fn link_program(&self, program: u32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Link(program));
        let State {
            shaders, programs, ..
        } = &mut *state;
        if let Some(program) = programs.get_mut(&program) {
            match link(shaders, &program.attached) {
                Ok(()) => {
                    program.linked = true;
                    program.log.clear();
                }
                Err(log) => {
                    program.linked = false;
                    program.log = log;
                }
            }
        }
    }

    fn program_link_status(&self, program: u32) -> bool {
        self.is_linked(program)
    }

    fn program_info_log(&self, program: u32) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|program| program.log.clone())
            .unwrap_or_default()
    }

    fn use_program(&self, program: u32) {
        self.state.borrow_mut().calls.push(Call::UseProgram(program));
    }

    fn delete_program(&self, program: u32) {
        self.state.borrow_mut().programs.remove(&program);
    }

    fn create_vertex_array(&self) -> Result<u32, GlError> {
        let id = self.created("vertex array")?;
        self.state.borrow_mut().vertex_arrays.push(id);
        Ok(id)
    }

    fn bind_vertex_array(&self, vertex_array: u32) {
        self.state
            .borrow_mut()
            .calls
            .push(Call::BindVertexArray(vertex_array));
    }

    fn delete_vertex_array(&self, vertex_array: u32) {
        self.state
            .borrow_mut()
            .vertex_arrays
            .retain(|id| *id != vertex_array);
    }

    fn uniform_f32(&self, location: u32, value: f32) {
        self.state
            .borrow_mut()
            .calls
            .push(Call::Uniform { location, value });
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        self.state
            .borrow_mut()
            .calls
            .push(Call::DrawArrays { mode, first, count });
    }
}
