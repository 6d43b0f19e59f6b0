//! Conditional-region stripping for GLSL sources.
//!
//! Shader files carry `#ifdef DEBUG` style regions that vary behaviour between
//! development and release builds. The GLSL compiler could evaluate them, but
//! release binaries embed the source as a constant, so the build script
//! resolves the regions ahead of time and keeps only the live branch.
//!
//! Only symbols registered through [`Preprocessor::define`] or
//! [`Preprocessor::undefine`] are resolved. Conditionals on anything else
//! (`#ifdef GL_ES`, arithmetic `#if` expressions) pass through untouched, so
//! the output stays a valid input for the real preprocessor.
//!
//! ```text
//!   #ifdef DEBUG           ──▶  (removed)
//!   color = debugTint;     ──▶  color = debugTint;   (DEBUG defined)
//!   #else                  ──▶  (removed)
//!   color = finalTint;     ──▶  (removed)
//!   #endif                 ──▶  (removed)
//! ```

use std::collections::BTreeMap;

/// Symbol that separates development-only shader code from release code.
pub const DEBUG_SYMBOL: &str = "DEBUG";

/// What happens to lines that fall inside a dead branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StripStyle {
    /// Drop the lines entirely; used for embedded release sources.
    #[default]
    Remove,
    /// Replace each line with an empty one so compiler diagnostics keep
    /// pointing at the right line of the input.
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreprocessError {
    #[error("line {line}: #{directive} without a matching #if")]
    Unmatched { line: usize, directive: &'static str },
    #[error("line {line}: duplicate #else for the conditional opened on line {opened}")]
    DuplicateElse { line: usize, opened: usize },
    #[error("line {line}: #elif is not supported inside a resolved conditional")]
    UnsupportedElif { line: usize },
    #[error("line {line}: conditional is never closed")]
    Unterminated { line: usize },
}

/// Resolves conditional regions for a fixed set of symbols.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    symbols: BTreeMap<String, bool>,
    style: StripStyle,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treats `symbol` as defined.
    pub fn define(mut self, symbol: impl Into<String>) -> Self {
        self.symbols.insert(symbol.into(), true);
        self
    }

    /// Treats `symbol` as explicitly undefined.
    pub fn undefine(mut self, symbol: impl Into<String>) -> Self {
        self.symbols.insert(symbol.into(), false);
        self
    }

    pub fn strip_style(mut self, style: StripStyle) -> Self {
        self.style = style;
        self
    }

    /// Runs the transform over `source`, preserving its line endings.
    pub fn process(&self, source: &str) -> Result<String, PreprocessError> {
        let mut output = String::with_capacity(source.len());
        let mut frames: Vec<Frame> = Vec::new();

        for (index, raw) in source.split_inclusive('\n').enumerate() {
            let line_no = index + 1;
            let body = raw.trim_end_matches(['\n', '\r']);
            let active = frames.last().map_or(true, Frame::active);

            let emit = match parse_directive(body) {
                Directive::If(condition) => match self.resolve(condition) {
                    Some(keep) => {
                        frames.push(Frame::resolved(line_no, keep, active));
                        false
                    }
                    None => {
                        frames.push(Frame::passthrough(line_no, active));
                        active
                    }
                },
                Directive::Elif => match frames.last() {
                    None => {
                        return Err(PreprocessError::Unmatched {
                            line: line_no,
                            directive: "elif",
                        })
                    }
                    Some(frame) if frame.resolved => {
                        return Err(PreprocessError::UnsupportedElif { line: line_no })
                    }
                    Some(frame) => frame.outer_active,
                },
                Directive::Else => {
                    let frame = frames.last_mut().ok_or(PreprocessError::Unmatched {
                        line: line_no,
                        directive: "else",
                    })?;
                    if frame.in_else {
                        return Err(PreprocessError::DuplicateElse {
                            line: line_no,
                            opened: frame.opened,
                        });
                    }
                    frame.in_else = true;
                    !frame.resolved && frame.outer_active
                }
                Directive::Endif => {
                    let frame = frames.pop().ok_or(PreprocessError::Unmatched {
                        line: line_no,
                        directive: "endif",
                    })?;
                    !frame.resolved && frame.outer_active
                }
                Directive::None => active,
            };

            if emit {
                output.push_str(raw);
            } else if self.style == StripStyle::Blank {
                output.push_str(&raw[body.len()..]);
            }
        }

        match frames.last() {
            Some(frame) => Err(PreprocessError::Unterminated { line: frame.opened }),
            None => Ok(output),
        }
    }

    fn resolve(&self, condition: Condition<'_>) -> Option<bool> {
        match condition {
            Condition::Defined(symbol) => self.symbols.get(symbol).copied(),
            Condition::NotDefined(symbol) => self.symbols.get(symbol).map(|defined| !defined),
            Condition::Opaque => None,
        }
    }
}

#[derive(Debug)]
struct Frame {
    opened: usize,
    resolved: bool,
    keep: bool,
    in_else: bool,
    outer_active: bool,
}

impl Frame {
    fn resolved(opened: usize, keep: bool, outer_active: bool) -> Self {
        Self {
            opened,
            resolved: true,
            keep,
            in_else: false,
            outer_active,
        }
    }

    fn passthrough(opened: usize, outer_active: bool) -> Self {
        Self {
            opened,
            resolved: false,
            keep: true,
            in_else: false,
            outer_active,
        }
    }

    fn active(&self) -> bool {
        if !self.outer_active {
            return false;
        }
        if !self.resolved {
            return true;
        }
        self.keep != self.in_else
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Directive<'a> {
    If(Condition<'a>),
    Elif,
    Else,
    Endif,
    None,
}

#[derive(Debug, PartialEq, Eq)]
enum Condition<'a> {
    Defined(&'a str),
    NotDefined(&'a str),
    Opaque,
}

fn parse_directive(line: &str) -> Directive<'_> {
    let Some(rest) = line.trim_start().strip_prefix('#') else {
        return Directive::None;
    };
    let rest = rest.split("//").next().unwrap_or_default().trim();
    let (keyword, argument) = match rest.find(char::is_whitespace) {
        Some(split) => (&rest[..split], rest[split..].trim()),
        None => (rest, ""),
    };

    match keyword {
        "ifdef" => Directive::If(symbol(argument).map_or(Condition::Opaque, Condition::Defined)),
        "ifndef" => {
            Directive::If(symbol(argument).map_or(Condition::Opaque, Condition::NotDefined))
        }
        "if" => Directive::If(parse_if_expression(argument)),
        "elif" => Directive::Elif,
        "else" => Directive::Else,
        "endif" => Directive::Endif,
        _ => Directive::None,
    }
}

/// Understands `defined(X)`, `defined X` and their `!` negations.
fn parse_if_expression(expression: &str) -> Condition<'_> {
    let (negated, expression) = match expression.strip_prefix('!') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, expression),
    };
    let Some(operand) = expression.strip_prefix("defined") else {
        return Condition::Opaque;
    };
    // `definedX` is an identifier of its own, not the operator.
    if !operand.is_empty() && !operand.starts_with(|c: char| c.is_whitespace() || c == '(') {
        return Condition::Opaque;
    }
    let operand = operand.trim();
    let name = match operand.strip_prefix('(') {
        Some(inner) => match inner.strip_suffix(')') {
            Some(name) => name.trim(),
            None => return Condition::Opaque,
        },
        None => operand,
    };
    match symbol(name) {
        Some(name) if negated => Condition::NotDefined(name),
        Some(name) => Condition::Defined(name),
        None => Condition::Opaque,
    }
}

fn symbol(text: &str) -> Option<&str> {
    let valid = !text.is_empty()
        && !text.starts_with(|c: char| c.is_ascii_digit())
        && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some(text)
}
