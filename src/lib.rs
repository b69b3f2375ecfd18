//! # llmcat
//!
//! Concatenates files selected by glob patterns into a single text stream,
//! with optional file name banners, dashed separators and content
//! prefixes/suffixes. Designed to prepare multi-file context for Large
//! Language Model prompts.
//!
//! ## Features
//!
//! - Glob patterns with `*`, `?`, `{a,b}` and recursive `**`
//! - `~` and `$VAR` expansion in the base directory and patterns
//! - Deterministic, deduplicated output order
//! - Byte-for-byte passthrough of file contents
//!
//! ## Usage
//!
//! ### As a Library
//!
//! ```no_run
//! use llmcat::{ConcatConfig, Resolver, concat_files};
//!
//! let resolver = Resolver::new("~/project", &[]).unwrap();
//! let files = resolver.resolve(&["**/*.md".to_string()]).unwrap();
//!
//! let config = ConcatConfig {
//!     show_file_name: true,
//!     file_name_prefix: "### ".to_string(),
//!     base_dir: resolver.base_dir().to_path_buf(),
//!     ..ConcatConfig::default()
//! };
//!
//! if let Err(e) = concat_files(&files, &config, std::io::stdout().lock()) {
//!     eprintln!("Error: {e}");
//! }
//! ```
//!
//! ### As a CLI Tool
//!
//! ```bash
//! # Every Markdown file below the current directory
//! llmcat '**/*.md'
//!
//! # Banners and separators, relative to another directory
//! llmcat -f -d -b ~/project 'src/**/*.rs'
//! ```

pub mod emit;
pub mod error;
pub mod fs_utils;
pub mod resolve;

// Re-export main types and functions for convenience
pub use emit::{ConcatConfig, SEPARATOR_WIDTH, concat_files, unescape_flag};
pub use error::{LlmcatError, Result};
pub use resolve::{Resolver, resolve_files};
