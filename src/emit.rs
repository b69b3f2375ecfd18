use crate::error::{LlmcatError, Result};
use crate::fs_utils::{check_regular_file, display_path, read_file_bytes};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Width of the dashed separator line
pub const SEPARATOR_WIDTH: usize = 80;

/// Decoration applied around every emitted file
#[derive(Debug, Clone)]
pub struct ConcatConfig {
    /// Print a banner line with the file name before its content
    pub show_file_name: bool,
    /// Surround every file with dashed separator lines
    pub use_dashes: bool,
    /// Text written before each file's content, already unescaped
    pub content_prefix: String,
    /// Text written after each file's content, already unescaped
    pub content_suffix: String,
    /// Text written before the file name in the banner
    pub file_name_prefix: String,
    /// Text written after the file name in the banner
    pub file_name_suffix: String,
    /// Directory that banner paths are shown relative to
    pub base_dir: PathBuf,
}

impl Default for ConcatConfig {
    fn default() -> Self {
        Self {
            show_file_name: false,
            use_dashes: false,
            content_prefix: String::new(),
            content_suffix: String::new(),
            file_name_prefix: String::new(),
            file_name_suffix: String::new(),
            base_dir: PathBuf::from("."),
        }
    }
}

/// Interprets the escape tokens accepted in prefix and suffix flags
///
/// `\n` becomes a line feed and `\t` a tab. Any other backslash is kept as is.
pub fn unescape_flag(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.peek() {
            Some('n') => {
                chars.next();
                result.push('\n');
            }
            Some('t') => {
                chars.next();
                result.push('\t');
            }
            _ => result.push('\\'),
        }
    }

    result
}

/// Writer that remembers whether the last byte written ended a line
struct LineTracker<W> {
    inner: W,
    at_line_start: bool,
}

impl<W: Write> LineTracker<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            at_line_start: true,
        }
    }

    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.inner
            .write_all(bytes)
            .map_err(LlmcatError::OutputWrite)?;
        self.at_line_start = bytes.ends_with(b"\n");
        Ok(())
    }

    fn finish_line(&mut self) -> Result<()> {
        if self.at_line_start {
            return Ok(());
        }
        self.emit(b"\n")
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(LlmcatError::OutputWrite)
    }
}

/// Writes every file in `files`, in order, decorated per `config`
///
/// A single line break is written after the last file. Output already
/// written stays in place when an error aborts the run.
///
/// # Errors
///
/// - `LlmcatError::FileAccess` if a file vanished or became a directory.
/// - `LlmcatError::FileRead` if a file cannot be opened or read.
/// - `LlmcatError::OutputWrite` if writing to `out` fails.
pub fn concat_files<W: Write>(files: &[PathBuf], config: &ConcatConfig, out: W) -> Result<()> {
    let mut out = LineTracker::new(out);
    let separator = format!("{}\n", "-".repeat(SEPARATOR_WIDTH));

    for path in files {
        emit_file(&mut out, path, config, separator.as_bytes())?;
    }

    out.emit(b"\n")?;
    out.flush()
}

fn emit_file<W: Write>(
    out: &mut LineTracker<W>,
    path: &Path,
    config: &ConcatConfig,
    separator: &[u8],
) -> Result<()> {
    check_regular_file(path)?;
    let contents = read_file_bytes(path)?;
    log::debug!("Emitting {} ({} bytes)", path.display(), contents.len());

    if config.use_dashes {
        out.finish_line()?;
        out.emit(separator)?;
    }

    if config.show_file_name {
        let banner = format!(
            "{}{}{}\n",
            config.file_name_prefix,
            display_path(path, &config.base_dir).display(),
            config.file_name_suffix
        );
        out.emit(banner.as_bytes())?;
    }

    out.emit(config.content_prefix.as_bytes())?;
    out.emit(&contents)?;
    out.emit(config.content_suffix.as_bytes())?;

    if config.use_dashes {
        out.finish_line()?;
        out.emit(separator)?;
    }

    Ok(())
}
