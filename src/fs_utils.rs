use crate::error::{LlmcatError, Result};
use regex::{Captures, Regex};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};

/// Expands a user-supplied path the way the shell would have
///
/// A leading `~` becomes the invoking user's home directory, `$NAME` and
/// `${NAME}` are replaced from the process environment and relative results
/// are joined onto `cwd`. The returned path is absolute and lexically
/// normalized.
///
/// # Errors
///
/// - `LlmcatError::PathExpansion` if the home directory cannot be determined.
/// - `LlmcatError::Regex` if the variable pattern fails to compile.
pub fn expand_path(raw: &str, cwd: &Path) -> Result<PathBuf> {
    expand_path_with(raw, cwd, dirs::home_dir, |name| std::env::var(name).ok())
}

/// Same as [`expand_path`] with injectable home and environment lookups
///
/// # Errors
///
/// See [`expand_path`].
pub fn expand_path_with<H, E>(raw: &str, cwd: &Path, home_dir: H, lookup: E) -> Result<PathBuf>
where
    H: FnOnce() -> Option<PathBuf>,
    E: Fn(&str) -> Option<String>,
{
    let (home, rest) = split_home(raw);

    let expanded = PathBuf::from(expand_env_vars(rest, lookup)?);
    let path = if home {
        let home = home_dir().ok_or_else(|| LlmcatError::PathExpansion {
            path: raw.to_string(),
            message: "could not determine home directory".to_string(),
        })?;
        home.join(expanded)
    } else {
        expanded
    };

    let absolute = if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    };

    Ok(normalize_lexically(&absolute))
}

/// Splits off a leading `~` or `~/`. `~user` is left untouched.
fn split_home(raw: &str) -> (bool, &str) {
    if raw == "~" {
        return (true, "");
    }
    match raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        Some(rest) => (true, rest.trim_start_matches(['/', '\\'])),
        None => (false, raw),
    }
}

/// Substitutes `$NAME` and `${NAME}` references. Unset variables expand to
/// the empty string.
///
/// # Errors
///
/// Returns `LlmcatError::Regex` if there's an error compiling the regex pattern.
pub fn expand_env_vars<E>(raw: &str, lookup: E) -> Result<String>
where
    E: Fn(&str) -> Option<String>,
{
    let pattern = Regex::new(r"\$(?:\{([^}]*)\}|([A-Za-z_][A-Za-z0-9_]*))")?;

    let expanded = pattern.replace_all(raw, |caps: &Captures| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str());
        lookup(name).unwrap_or_default()
    });

    Ok(expanded.into_owned())
}

/// Removes `.` components and folds `..` into its parent without touching
/// the filesystem. `..` above the root is dropped.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Checks that `path` still exists and is not a directory
///
/// # Errors
///
/// `LlmcatError::FileAccess` naming the path if either check fails.
pub fn check_regular_file(path: &Path) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|e| LlmcatError::FileAccess {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if metadata.is_dir() {
        return Err(LlmcatError::FileAccess {
            path: path.to_path_buf(),
            message: "is a directory, not a file".to_string(),
        });
    }

    Ok(())
}

/// Reads the raw bytes of a file. The handle is closed before returning,
/// on success and on failure alike.
///
/// # Errors
///
/// `LlmcatError::FileRead` if the file cannot be opened or read.
pub fn read_file_bytes(path: &Path) -> Result<Vec<u8>> {
    let read_error = |source| LlmcatError::FileRead {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(read_error)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents).map_err(read_error)?;
    Ok(contents)
}

/// Renders `path` relative to `base_dir`, falling back to `path` itself
/// when no relative form exists.
pub fn display_path(path: &Path, base_dir: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base_dir)
        .filter(|relative| !relative.as_os_str().is_empty())
        .unwrap_or_else(|| path.to_path_buf())
}
