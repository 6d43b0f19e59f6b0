use std::fs;

use anyhow::{Context, Result};
use renderer::Renderer;
use shaderprep::{Preprocessor, StripStyle};
use tracing_subscriber::EnvFilter;

use crate::bootstrap::{load_view_config, resolve_renderer_config};
use crate::cli::{PreprocessArgs, RunArgs};

/// Fragment shader resolved by the build script with the debug regions removed.
pub const EMBEDDED_SHADER: &str =
    include_str!(concat!(env!("OUT_DIR"), "/fshader-release.glsl"));

pub fn run(args: RunArgs) -> Result<()> {
    let file = load_view_config(&args)?;
    let config = resolve_renderer_config(&args, &file, EMBEDDED_SHADER)?;
    tracing::info!(
        mode = %config.mode,
        fullscreen = config.window.fullscreen,
        width = config.window.size.0,
        height = config.window.size.1,
        "bootstrapping fragview"
    );
    Renderer::new(config).run()
}

pub fn preprocess(args: PreprocessArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let mut preprocessor = Preprocessor::new();
    for symbol in args.defines {
        preprocessor = preprocessor.define(symbol);
    }
    for symbol in args.undefines {
        preprocessor = preprocessor.undefine(symbol);
    }
    if args.keep_lines {
        preprocessor = preprocessor.strip_style(StripStyle::Blank);
    }
    let resolved = preprocessor
        .process(&raw)
        .with_context(|| format!("failed to preprocess {}", args.input.display()))?;

    match args.output {
        Some(path) => {
            fs::write(&path, resolved)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::debug!(
                input = %args.input.display(),
                output = %path.display(),
                "wrote preprocessed shader"
            );
        }
        None => print!("{resolved}"),
    }
    Ok(())
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
