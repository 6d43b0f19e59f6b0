use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which set of collaborators the viewer wires up at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeSetting {
    Development,
    Release,
}

/// Top-level `fragview.toml` document. Every section is optional so command
/// line flags can fill in whatever the file leaves out.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ViewConfig {
    #[serde(default)]
    pub mode: Option<ModeSetting>,
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub shader: ShaderSection,
    #[serde(default)]
    pub watch: WatchSection,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WindowSection {
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_size_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub size: Option<(u32, u32)>,
    pub fullscreen: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ShaderSection {
    /// Fragment shader edited by hand; only read in development mode.
    pub path: Option<PathBuf>,
    /// Where the regenerated debug source is written before each load.
    pub generated: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub quiet: Option<Duration>,
    #[serde(
        default,
        deserialize_with = "deserialize_duration_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub hint_grace: Option<Duration>,
}

impl ViewConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: ViewConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(title) = &self.window.title {
            if title.trim().is_empty() {
                return Err(ConfigError::Invalid("window.title may not be empty".into()));
            }
        }

        for (key, path) in [
            ("shader.path", &self.shader.path),
            ("shader.generated", &self.shader.generated),
        ] {
            if let Some(path) = path {
                if path.as_os_str().is_empty() {
                    return Err(ConfigError::Invalid(format!("{key} may not be empty")));
                }
            }
        }

        if let (Some(path), Some(generated)) = (&self.shader.path, &self.shader.generated) {
            if lexical(path) == lexical(generated) {
                return Err(ConfigError::Invalid(format!(
                    "shader.generated must differ from shader.path ({})",
                    path.display()
                )));
            }
        }

        if let Some(quiet) = self.watch.quiet {
            if quiet.is_zero() {
                return Err(ConfigError::Invalid(
                    "watch.quiet must be greater than zero".into(),
                ));
            }
            if let Some(grace) = self.watch.hint_grace {
                if grace > quiet {
                    return Err(ConfigError::Invalid(
                        "watch.hint_grace may not exceed watch.quiet".into(),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Parses `WIDTHxHEIGHT` into a non-zero pixel size.
pub fn parse_size(raw: &str) -> Result<(u32, u32), String> {
    let normalized = raw.trim().to_ascii_lowercase();
    let (width, height) = normalized
        .split_once('x')
        .ok_or_else(|| format!("invalid size '{raw}'; expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in size '{raw}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in size '{raw}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("size '{raw}' must be non-zero in both dimensions"));
    }
    Ok((width, height))
}

fn deserialize_size_opt<'de, D>(deserializer: D) -> Result<Option<(u32, u32)>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|value| parse_size(&value).map_err(de::Error::custom))
        .transpose()
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of milliseconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_millis(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_millis(v as u64)))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

// Paths in the file are not resolved yet, so only `.` components can be
// folded away here.
fn lexical(path: &Path) -> PathBuf {
    path.components()
        .filter(|part| !matches!(part, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
mode = "development"

[window]
title = "plasma"
size = "1280x720"
fullscreen = false

[shader]
path = "shaders/plasma.glsl"
generated = "gen/plasma-debug.glsl"

[watch]
quiet = "200ms"
hint_grace = 10
"#;

    #[test]
    fn parses_sample_config() {
        let config = ViewConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.mode, Some(ModeSetting::Development));
        assert_eq!(config.window.title.as_deref(), Some("plasma"));
        assert_eq!(config.window.size, Some((1280, 720)));
        assert_eq!(config.window.fullscreen, Some(false));
        assert_eq!(
            config.shader.path.as_deref(),
            Some(Path::new("shaders/plasma.glsl"))
        );
        assert_eq!(config.watch.quiet, Some(Duration::from_millis(200)));
        assert_eq!(config.watch.hint_grace, Some(Duration::from_millis(10)));
    }

    #[test]
    fn empty_document_is_valid() {
        let config = ViewConfig::from_toml_str("").unwrap();
        assert!(config.mode.is_none());
        assert!(config.window.size.is_none());
        assert!(config.watch.quiet.is_none());
    }

    #[test]
    fn rejects_unknown_mode() {
        let err = ViewConfig::from_toml_str("mode = \"profile\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_zero_size() {
        let err = ViewConfig::from_toml_str("[window]\nsize = \"0x720\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_generated_path_equal_to_source() {
        let err = ViewConfig::from_toml_str(
            r#"
[shader]
path = "fshader.glsl"
generated = "fshader.glsl"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = ViewConfig::from_toml_str(
            r#"
[shader]
path = "shaders/fshader.glsl"
generated = "./shaders/fshader.glsl"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_grace_longer_than_quiet_period() {
        let err = ViewConfig::from_toml_str("[watch]\nquiet = \"50ms\"\nhint_grace = \"80ms\"")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("1920x1080").unwrap(), (1920, 1080));
        assert_eq!(parse_size(" 800X600 ").unwrap(), (800, 600));
        assert!(parse_size("800").is_err());
        assert!(parse_size("axb").is_err());
        assert!(parse_size("800x0").is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ViewConfig::load(Path::new("/nonexistent/fragview.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
