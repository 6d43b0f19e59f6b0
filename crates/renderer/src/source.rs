use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use shaderprep::{PreprocessError, Preprocessor, StripStyle, DEBUG_SYMBOL};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to open {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to preprocess {}: {source}", path.display())]
    Preprocess {
        path: PathBuf,
        #[source]
        source: PreprocessError,
    },
    #[error("failed to write generated shader {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(
        "generated shader {} would overwrite its source {}",
        generated.display(),
        path.display()
    )]
    Aliased { path: PathBuf, generated: PathBuf },
}

impl SourceError {
    /// Whether the shader can no longer be loaded at all.
    ///
    /// A missing or unwritable file ends the process; a malformed
    /// conditional region is just another bad edit to report.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SourceError::Preprocess { .. })
    }
}

/// Where the fragment stage's text comes from.
#[derive(Debug, Clone)]
pub enum FragmentSource {
    /// Release builds: the source was resolved at build time and embedded.
    Embedded(&'static str),
    /// Development builds: `path` is regenerated into `generated` with the
    /// debug regions kept, and the generated file is what gets compiled.
    File { path: PathBuf, generated: PathBuf },
}

impl FragmentSource {
    pub fn load(&self) -> Result<Cow<'static, str>, SourceError> {
        match self {
            FragmentSource::Embedded(source) => Ok(Cow::Borrowed(*source)),
            FragmentSource::File { path, generated } => {
                regenerate(path, generated).map(Cow::Owned)
            }
        }
    }

    /// The file to watch for edits, if any.
    pub fn watched_path(&self) -> Option<&Path> {
        match self {
            FragmentSource::Embedded(_) => None,
            FragmentSource::File { path, .. } => Some(path),
        }
    }
}

/// Resolves the debug regions of `path` into `generated` and reads it back.
///
/// Removed lines are blanked so compiler diagnostics line up with the file
/// being edited.
pub fn regenerate(path: &Path, generated: &Path) -> Result<String, SourceError> {
    let raw = fs::read_to_string(path).map_err(|source| SourceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if same_file(path, generated) {
        return Err(SourceError::Aliased {
            path: path.to_path_buf(),
            generated: generated.to_path_buf(),
        });
    }
    let resolved = Preprocessor::new()
        .define(DEBUG_SYMBOL)
        .strip_style(StripStyle::Blank)
        .process(&raw)
        .map_err(|source| SourceError::Preprocess {
            path: path.to_path_buf(),
            source,
        })?;

    let write_error = |source: io::Error| SourceError::Write {
        path: generated.to_path_buf(),
        source,
    };
    if let Some(parent) = generated.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(generated, &resolved).map_err(write_error)?;
    debug!(
        source = %path.display(),
        generated = %generated.display(),
        "regenerated debug fragment shader"
    );

    fs::read_to_string(generated).map_err(|source| SourceError::Read {
        path: generated.to_path_buf(),
        source,
    })
}

/// Whether writing `generated` would land on `path`.
///
/// Existing files are compared after resolving `.`, `..` and symlinks. When
/// nothing resolves the comparison is lexical with `.` components dropped.
pub fn same_file(path: &Path, generated: &Path) -> bool {
    match (fs::canonicalize(path), resolve_target(generated)) {
        (Ok(source), Some(target)) => source == target,
        _ => lexical(path) == lexical(generated),
    }
}

// The generated file may not exist yet, so fall back to its parent.
fn resolve_target(path: &Path) -> Option<PathBuf> {
    if let Ok(resolved) = fs::canonicalize(path) {
        return Some(resolved);
    }
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::canonicalize(parent).ok().map(|dir| dir.join(name))
}

fn lexical(path: &Path) -> PathBuf {
    path.components()
        .filter(|part| !matches!(part, Component::CurDir))
        .collect()
}
