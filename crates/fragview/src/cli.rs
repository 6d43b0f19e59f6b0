use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "fragview",
    author,
    version,
    about = "Render a GLSL fragment shader over the whole screen",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// TOML configuration file (defaults to `fragview.toml` when it exists).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Load the shader from disk and reload it whenever it changes.
    #[arg(long, conflicts_with = "release")]
    pub dev: bool,

    /// Render the shader compiled into this binary.
    #[arg(long)]
    pub release: bool,

    /// Fragment shader to load in development mode.
    #[arg(long, value_name = "PATH")]
    pub shader: Option<PathBuf>,

    /// Where the debug-resolved copy of the shader is written.
    #[arg(long, value_name = "PATH")]
    pub generated: Option<PathBuf>,

    /// Open a regular window instead of covering the screen.
    #[arg(long)]
    pub windowed: bool,

    /// Window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = viewconfig::parse_size)]
    pub size: Option<(u32, u32)>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve `#ifdef`-style regions of a shader and print the result.
    Preprocess(PreprocessArgs),
}

#[derive(Args, Debug)]
pub struct PreprocessArgs {
    /// Shader file to transform.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Write the result here instead of stdout.
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Treat SYMBOL as defined (repeatable).
    #[arg(long = "define", value_name = "SYMBOL")]
    pub defines: Vec<String>,

    /// Treat SYMBOL as undefined (repeatable).
    #[arg(long = "undefine", value_name = "SYMBOL")]
    pub undefines: Vec<String>,

    /// Blank removed lines so line numbers match the input.
    #[arg(long)]
    pub keep_lines: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}
