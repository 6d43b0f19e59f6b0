use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Selects which collaborators are wired up at startup.
///
/// * `Development` loads the fragment shader from disk, runs every compile
///   and link diagnostic, watches the file for edits, and leaves the event
///   loop cooperatively on Escape.
/// * `Release` renders the compiled-in fragment source, skips diagnostics,
///   never watches the filesystem, and terminates the process immediately on
///   Escape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Development,
    Release,
}

impl BuildMode {
    pub fn diagnostics(self) -> Diagnostics {
        match self {
            BuildMode::Development => Diagnostics::Full,
            BuildMode::Release => Diagnostics::Off,
        }
    }

    pub fn watches_source(self) -> bool {
        matches!(self, BuildMode::Development)
    }
}

impl Default for BuildMode {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            BuildMode::Development
        } else {
            BuildMode::Release
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Development => f.write_str("development"),
            BuildMode::Release => f.write_str("release"),
        }
    }
}

/// Whether compile and link status is queried and their logs reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostics {
    Full,
    Off,
}

/// One unit of the GPU program pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Vertex,
    Geometry,
    Fragment,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Vertex => f.write_str("vertex"),
            StageKind::Geometry => f.write_str("geometry"),
            StageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Current surface allocation in pixels, read once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceDimensions {
    pub width: u32,
    pub height: u32,
}

impl SurfaceDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Timing knobs for collapsing filesystem event bursts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Silence required after the last raw change before it counts as settled.
    pub quiet: Duration,
    /// Shorter silence accepted once the "changes done" hint has arrived.
    pub hint_grace: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            quiet: Duration::from_millis(150),
            hint_grace: Duration::from_millis(20),
        }
    }
}

/// Window presentation settings handed to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowOptions {
    pub title: String,
    /// Initial size in physical pixels; also used when leaving fullscreen.
    pub size: (u32, u32),
    pub fullscreen: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "fragview".to_string(),
            size: (1280, 720),
            fullscreen: true,
        }
    }
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub mode: BuildMode,
    pub window: WindowOptions,
    /// Fragment source strategy selected for `mode`.
    pub fragment: crate::source::FragmentSource,
    /// Watcher timings; ignored outside development mode.
    pub debounce: DebounceConfig,
}

impl RendererConfig {
    /// Development configuration reading `path` and regenerating into `generated`.
    pub fn development(path: impl Into<PathBuf>, generated: impl Into<PathBuf>) -> Self {
        Self {
            mode: BuildMode::Development,
            window: WindowOptions::default(),
            fragment: crate::source::FragmentSource::File {
                path: path.into(),
                generated: generated.into(),
            },
            debounce: DebounceConfig::default(),
        }
    }

    /// Release configuration rendering a compiled-in fragment source.
    pub fn release(source: &'static str) -> Self {
        Self {
            mode: BuildMode::Release,
            window: WindowOptions::default(),
            fragment: crate::source::FragmentSource::Embedded(source),
            debounce: DebounceConfig::default(),
        }
    }
}
