use crate::error::{LlmcatError, Result};
use crate::fs_utils::expand_path;
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Characters that make a pattern segment non-literal
const GLOB_META: &[char] = &['*', '?', '[', '{', '\\'];

/// Expands glob patterns against a fixed base directory
#[derive(Debug)]
pub struct Resolver {
    base_dir: PathBuf,
    exclude: GlobSet,
}

impl Resolver {
    /// Creates a resolver rooted at `base_dir`
    ///
    /// `base_dir` may use `~` and environment variables; relative values are
    /// taken from the current working directory.
    ///
    /// # Errors
    ///
    /// - `LlmcatError::PathExpansion` if `~` or the working directory cannot be resolved.
    /// - `LlmcatError::InvalidBaseDirectory` if the expanded path is not an existing directory.
    /// - `LlmcatError::PatternExpansion` if an exclude pattern is malformed.
    pub fn new(base_dir: &str, exclude: &[String]) -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| LlmcatError::PathExpansion {
            path: base_dir.to_string(),
            message: format!("cannot determine current directory: {e}"),
        })?;
        let base_dir = expand_path(base_dir, &cwd)?;

        match fs::metadata(&base_dir) {
            Ok(metadata) if metadata.is_dir() => {}
            _ => return Err(LlmcatError::InvalidBaseDirectory { path: base_dir }),
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in exclude {
            builder.add(
                GlobBuilder::new(pattern)
                    .literal_separator(true)
                    .build()
                    .map_err(|e| pattern_error(pattern, &e))?,
            );
        }
        let exclude = builder.build().map_err(|e| LlmcatError::PatternExpansion {
            pattern: exclude.join(" "),
            message: e.to_string(),
        })?;

        Ok(Self { base_dir, exclude })
    }

    /// The expanded, absolute base directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Expands every pattern in order and returns the matched files,
    /// deduplicated and sorted byte-wise by absolute path
    ///
    /// # Errors
    ///
    /// - `LlmcatError::PatternExpansion` for malformed patterns, patterns that
    ///   leave the base directory and traversal failures.
    /// - `LlmcatError::PathExpansion` if `~` cannot be expanded in a pattern.
    pub fn resolve(&self, patterns: &[String]) -> Result<Vec<PathBuf>> {
        log::debug!("Base directory: {}", self.base_dir.display());

        let mut files = Vec::new();
        for source in patterns {
            log::debug!("Resolving pattern: {source}");
            let pattern = CompiledPattern::compile(source, &self.base_dir)?;
            log::debug!("Relative pattern: {}", pattern.relative);

            let matches = self.walk(&pattern)?;
            if matches.is_empty() {
                log::debug!("No matches found");
            } else {
                log::debug!("Matches found:");
                for path in &matches {
                    log::debug!("  {}", path.display());
                }
            }
            files.extend(matches);
        }

        files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
        files.dedup();
        Ok(files)
    }

    fn walk(&self, pattern: &CompiledPattern) -> Result<Vec<PathBuf>> {
        let root = self.base_dir.join(&pattern.walk_prefix);
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut walker = WalkDir::new(&root).min_depth(1).follow_links(false);
        if let Some(depth) = pattern.max_depth {
            walker = walker.max_depth(depth);
        }

        let mut matches = Vec::new();
        let entries = walker
            .into_iter()
            .filter_entry(|entry| pattern.allows_name(entry.file_name(), entry.depth()));

        for entry in entries {
            let entry = entry.map_err(|e| LlmcatError::PatternExpansion {
                pattern: pattern.source.clone(),
                message: e.to_string(),
            })?;

            let Ok(relative) = entry.path().strip_prefix(&self.base_dir) else {
                continue;
            };
            if !pattern.matcher.is_match(relative) || self.exclude.is_match(relative) {
                continue;
            }
            // follows symlinks: links to directories and dangling links are dropped
            match fs::metadata(entry.path()) {
                Ok(metadata) if !metadata.is_dir() => {}
                _ => continue,
            }

            matches.push(entry.into_path());
        }

        Ok(matches)
    }
}

/// Resolves `patterns` against `base_dir` without exclusions
///
/// # Errors
///
/// See [`Resolver::new`] and [`Resolver::resolve`].
pub fn resolve_files(base_dir: &str, patterns: &[String]) -> Result<Vec<PathBuf>> {
    Resolver::new(base_dir, &[])?.resolve(patterns)
}

/// A pattern rewritten relative to the base directory and compiled
#[derive(Debug)]
struct CompiledPattern {
    source: String,
    relative: String,
    matcher: GlobMatcher,
    /// Segments spelled with a leading dot, keyed by segment index;
    /// hidden names must match one
    dot_segments: Vec<(usize, GlobMatcher)>,
    /// Number of segments folded into `walk_prefix`
    prefix_len: usize,
    /// Leading wildcard-free directories, walked from instead of the base
    walk_prefix: PathBuf,
    max_depth: Option<usize>,
}

impl CompiledPattern {
    fn compile(source: &str, base_dir: &Path) -> Result<Self> {
        let absolute = expand_path(source, base_dir)?;
        let relative_path =
            absolute
                .strip_prefix(base_dir)
                .map_err(|_| LlmcatError::PatternExpansion {
                    pattern: source.to_string(),
                    message: format!("resolves outside base directory {}", base_dir.display()),
                })?;

        let mut segments = Vec::new();
        for component in relative_path.components() {
            let Component::Normal(segment) = component else {
                continue;
            };
            let segment = segment.to_str().ok_or_else(|| LlmcatError::PatternExpansion {
                pattern: source.to_string(),
                message: "pattern is not valid UTF-8".to_string(),
            })?;
            segments.push(segment);
        }
        let relative = segments.join("/");

        let matcher = build_matcher(source, &relative)?;
        let dot_segments = segments
            .iter()
            .enumerate()
            .filter(|(_, segment)| segment.starts_with('.'))
            .map(|(index, segment)| build_matcher(source, segment).map(|m| (index, m)))
            .collect::<Result<Vec<_>>>()?;

        // the last segment always names the entries being matched
        let literal_len = segments
            .iter()
            .take(segments.len().saturating_sub(1))
            .take_while(|segment| !segment.contains(GLOB_META))
            .count();
        let walk_prefix: PathBuf = segments[..literal_len].iter().collect();

        let rest = &segments[literal_len..];
        let unbounded = rest
            .iter()
            .any(|segment| segment.contains("**") || segment.contains('{'));
        let max_depth = (!unbounded).then_some(rest.len());

        Ok(Self {
            source: source.to_string(),
            relative,
            matcher,
            dot_segments,
            prefix_len: literal_len,
            walk_prefix,
            max_depth,
        })
    }

    /// Hidden names pass only when the pattern spells out a dot segment for them
    ///
    /// `depth` is counted from the walk root. Depth-bounded patterns map every
    /// depth to exactly one segment, so the dot segment must sit at that
    /// position. Under `**` or brace alternation no such mapping exists and
    /// any dot segment of the pattern will do.
    fn allows_name(&self, name: &OsStr, depth: usize) -> bool {
        if !name.to_string_lossy().starts_with('.') {
            return true;
        }
        let position = self
            .max_depth
            .map(|_| self.prefix_len + depth.saturating_sub(1));
        self.dot_segments
            .iter()
            .filter(|(index, _)| position.is_none_or(|p| p == *index))
            .any(|(_, m)| m.is_match(name))
    }
}

fn build_matcher(source: &str, glob: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(glob)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| pattern_error(source, &e))
}

fn pattern_error(pattern: &str, err: &globset::Error) -> LlmcatError {
    LlmcatError::PatternExpansion {
        pattern: pattern.to_string(),
        message: err.to_string(),
    }
}
