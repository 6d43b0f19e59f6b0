use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use renderer::{BuildMode, DebounceConfig, FragmentSource, RendererConfig, WindowOptions};
use tracing::{debug, warn};
use viewconfig::{ModeSetting, ViewConfig};

use crate::cli::RunArgs;

pub const DEFAULT_CONFIG_FILE: &str = "fragview.toml";
pub const DEFAULT_SHADER_PATH: &str = "shaders/fshader.glsl";
pub const DEFAULT_GENERATED_PATH: &str = "gen/fshader-debug.glsl";

/// Reads the config named on the command line, or `fragview.toml` in the
/// working directory when present.
pub fn load_view_config(args: &RunArgs) -> Result<ViewConfig> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => {
            let fallback = Path::new(DEFAULT_CONFIG_FILE);
            if !fallback.is_file() {
                return Ok(ViewConfig::default());
            }
            fallback.to_path_buf()
        }
    };
    let config = ViewConfig::load(&path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    debug!(path = %path.display(), "loaded view config");
    Ok(config)
}

/// Merges command line flags over the config file over built-in defaults.
pub fn resolve_renderer_config(
    args: &RunArgs,
    file: &ViewConfig,
    embedded: &'static str,
) -> Result<RendererConfig> {
    let mode = if args.dev {
        BuildMode::Development
    } else if args.release {
        BuildMode::Release
    } else {
        match file.mode {
            Some(ModeSetting::Development) => BuildMode::Development,
            Some(ModeSetting::Release) => BuildMode::Release,
            None => BuildMode::default(),
        }
    };

    let defaults = WindowOptions::default();
    let window = WindowOptions {
        title: file.window.title.clone().unwrap_or(defaults.title),
        size: args.size.or(file.window.size).unwrap_or(defaults.size),
        fullscreen: !args.windowed && file.window.fullscreen.unwrap_or(defaults.fullscreen),
    };

    let fragment = match mode {
        BuildMode::Development => {
            let path = pick_path(&args.shader, &file.shader.path, DEFAULT_SHADER_PATH);
            let generated =
                pick_path(&args.generated, &file.shader.generated, DEFAULT_GENERATED_PATH);
            if renderer::same_file(&path, &generated) {
                bail!(
                    "generated shader path must differ from the source ({})",
                    path.display()
                );
            }
            FragmentSource::File { path, generated }
        }
        BuildMode::Release => {
            if args.shader.is_some() {
                warn!("--shader is ignored in release mode; rendering the embedded shader");
            }
            FragmentSource::Embedded(embedded)
        }
    };

    let fallback = DebounceConfig::default();
    let quiet = file.watch.quiet.unwrap_or(fallback.quiet);
    let debounce = DebounceConfig {
        quiet,
        hint_grace: file.watch.hint_grace.unwrap_or(fallback.hint_grace).min(quiet),
    };

    Ok(RendererConfig {
        mode,
        window,
        fragment,
        debounce,
    })
}

fn pick_path(flag: &Option<PathBuf>, file: &Option<PathBuf>, default: &str) -> PathBuf {
    flag.clone()
        .or_else(|| file.clone())
        .unwrap_or_else(|| PathBuf::from(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    const EMBEDDED: &str = "void main() {}\n";

    #[test]
    fn defaults_without_flags_or_file() {
        let config =
            resolve_renderer_config(&RunArgs::default(), &ViewConfig::default(), EMBEDDED)
                .unwrap();
        assert_eq!(config.mode, BuildMode::default());
        assert_eq!(config.window, WindowOptions::default());
        assert_eq!(config.debounce, DebounceConfig::default());
    }

    #[test]
    fn cli_overrides_file() {
        let file = ViewConfig::from_toml_str(
            r#"
mode = "release"
[window]
title = "plasma"
size = "640x480"
fullscreen = true
[shader]
path = "art/plasma.glsl"
"#,
        )
        .unwrap();
        let args = RunArgs {
            dev: true,
            windowed: true,
            size: Some((800, 600)),
            ..RunArgs::default()
        };

        let config = resolve_renderer_config(&args, &file, EMBEDDED).unwrap();
        assert_eq!(config.mode, BuildMode::Development);
        assert_eq!(config.window.title, "plasma");
        assert_eq!(config.window.size, (800, 600));
        assert!(!config.window.fullscreen);
        match config.fragment {
            FragmentSource::File { path, generated } => {
                assert_eq!(path, PathBuf::from("art/plasma.glsl"));
                assert_eq!(generated, PathBuf::from(DEFAULT_GENERATED_PATH));
            }
            other => panic!("unexpected fragment source {other:?}"),
        }
    }

    #[test]
    fn file_mode_applies_without_flags() {
        let file = ViewConfig::from_toml_str("mode = \"release\"\n").unwrap();
        let config = resolve_renderer_config(&RunArgs::default(), &file, EMBEDDED).unwrap();
        assert_eq!(config.mode, BuildMode::Release);
        assert!(matches!(config.fragment, FragmentSource::Embedded(EMBEDDED)));
    }

    #[test]
    fn rejects_generated_path_matching_source() {
        let args = RunArgs {
            dev: true,
            shader: Some(PathBuf::from("same.glsl")),
            generated: Some(PathBuf::from("same.glsl")),
            ..RunArgs::default()
        };
        assert!(resolve_renderer_config(&args, &ViewConfig::default(), EMBEDDED).is_err());

        let args = RunArgs {
            dev: true,
            shader: Some(PathBuf::from("shaders/fshader.glsl")),
            generated: Some(PathBuf::from("./shaders/fshader.glsl")),
            ..RunArgs::default()
        };
        assert!(resolve_renderer_config(&args, &ViewConfig::default(), EMBEDDED).is_err());
    }

    #[test]
    fn hint_grace_never_exceeds_quiet_period() {
        let file = ViewConfig::from_toml_str("[watch]\nquiet = \"10ms\"\n").unwrap();
        let config = resolve_renderer_config(&RunArgs::default(), &file, EMBEDDED).unwrap();
        assert_eq!(config.debounce.quiet, Duration::from_millis(10));
        assert_eq!(config.debounce.hint_grace, Duration::from_millis(10));
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = TempDir::new().unwrap();
        let args = RunArgs {
            config: Some(dir.path().join("missing.toml")),
            ..RunArgs::default()
        };
        let err = load_view_config(&args).unwrap_err();
        assert!(format!("{err:#}").contains("missing.toml"));
    }

    #[test]
    fn explicit_config_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fragview.toml");
        std::fs::write(&path, "[window]\nfullscreen = false\n").unwrap();
        let args = RunArgs {
            config: Some(path),
            ..RunArgs::default()
        };
        let config = load_view_config(&args).unwrap();
        assert_eq!(config.window.fullscreen, Some(false));
    }
}
