use clap::{Parser, Subcommand, ValueEnum};
use llmcat::fs_utils::display_path;
use llmcat::{ConcatConfig, LlmcatError, Resolver, Result, concat_files, unescape_flag};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

const LONG_HELP: &str = r#"
Patterns:
  *.md                 - Markdown files directly in the base directory
  **/*.rs              - Rust files at any depth
  src/?.rs             - Single-character file names under src/
  .github/**/*.yml     - Hidden paths must be spelled with a leading dot
  ~/notes/$PROJECT/*   - Home and environment variables are expanded

Examples:
  # Concatenate every Markdown file below the current directory
  llmcat '**/*.md'
  # Banner each file and fence its content
  llmcat -f --filename-prefix '### ' --content-prefix '```\n' --content-suffix '```\n' 'src/**/*.rs'
  # Separate files with dashed lines, relative to another directory
  llmcat -d -b ~/projects/app 'docs/*.md' README.md
  # Show which files would be included
  llmcat --list=json '**/*.toml'
  # Trace pattern resolution on stderr
  llmcat --debug '**/*.md' > context.txt
"#;

/// Concatenate files for LLM input.
#[derive(Parser, Debug)]
#[command(
    name = "llmcat",
    version,
    about = "Concatenate files selected by glob patterns, suitable for LLM input.",
    after_long_help = LONG_HELP,
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Glob patterns selecting the files, relative to the base directory
    #[arg(value_name = "PATTERNS", required = true)]
    patterns: Vec<String>,

    /// Show the file name before each file's content
    #[arg(short = 'f', long)]
    show_filename: bool,

    /// Add dashed lines before and after each file
    #[arg(short = 'd', long)]
    show_dashes: bool,

    /// Text to print before file contents ('\n' and '\t' are interpreted)
    #[arg(long, value_name = "TEXT", default_value = "", allow_hyphen_values = true)]
    content_prefix: String,

    /// Text to print after file contents ('\n' and '\t' are interpreted)
    #[arg(long, value_name = "TEXT", default_value = "", allow_hyphen_values = true)]
    content_suffix: String,

    /// Text to print before the file name
    #[arg(long, value_name = "TEXT", default_value = "", allow_hyphen_values = true)]
    filename_prefix: String,

    /// Text to print after the file name
    #[arg(long, value_name = "TEXT", default_value = "", allow_hyphen_values = true)]
    filename_suffix: String,

    /// Base directory for glob matching and displayed file names
    #[arg(
        short,
        long,
        value_name = "DIR",
        env = "LLMCAT_BASE_DIR",
        default_value = "."
    )]
    base_dir: String,

    /// Exclude glob patterns (repeatable), relative to the base directory
    #[arg(short = 'x', long = "exclude", value_name = "GLOB", action = clap::ArgAction::Append)]
    exclude: Vec<String>,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// List resolved files instead of their contents (plain or json)
    #[arg(
        long,
        value_name = "FORMAT",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "plain"
    )]
    list: Option<ListFormat>,

    /// Print pattern resolution details to stderr
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the version number
    Version,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum ListFormat {
    /// One relative path per line
    Plain,
    /// JSON array with paths and sizes
    Json,
}

#[derive(Serialize)]
struct FileInfo {
    path: String,
    absolute: String,
    size: u64,
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    if let Some(Command::Version) = cli.command {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return;
    }

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn setup_logging(debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_env("LLMCAT_LOG")
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let resolver = Resolver::new(&cli.base_dir, &cli.exclude)?;
    let files = resolver.resolve(&cli.patterns)?;
    log::debug!("Resolved {} file(s)", files.len());

    // opened only after resolution so a failed run leaves no output file behind
    let sink = open_output(cli.output.as_deref())?;
    let files = skip_output_file(files, cli.output.as_deref());

    if let Some(format) = cli.list {
        return list_files(&files, resolver.base_dir(), format, sink);
    }

    let config = ConcatConfig {
        show_file_name: cli.show_filename,
        use_dashes: cli.show_dashes,
        content_prefix: unescape_flag(&cli.content_prefix),
        content_suffix: unescape_flag(&cli.content_suffix),
        file_name_prefix: cli.filename_prefix.clone(),
        file_name_suffix: cli.filename_suffix.clone(),
        base_dir: resolver.base_dir().to_path_buf(),
    };

    concat_files(&files, &config, sink)
}

fn open_output(output: Option<&Path>) -> Result<Box<dyn Write>> {
    match output {
        Some(path) => {
            log::debug!("Writing output to {}", path.display());
            let file = File::create(path).map_err(LlmcatError::OutputWrite)?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

/// Drops the output file from the list so a rerun never reads its own output
fn skip_output_file(files: Vec<PathBuf>, output: Option<&Path>) -> Vec<PathBuf> {
    let Some(output) = output.and_then(|path| fs::canonicalize(path).ok()) else {
        return files;
    };

    files
        .into_iter()
        .filter(|file| {
            let is_output = fs::canonicalize(file).is_ok_and(|path| path == output);
            if is_output {
                log::debug!("Skipping output file {}", file.display());
            }
            !is_output
        })
        .collect()
}

fn list_files(
    files: &[PathBuf],
    base_dir: &Path,
    format: ListFormat,
    mut out: Box<dyn Write>,
) -> Result<()> {
    match format {
        ListFormat::Plain => {
            for file in files {
                writeln!(out, "{}", display_path(file, base_dir).display())
                    .map_err(LlmcatError::OutputWrite)?;
            }
        }
        ListFormat::Json => {
            let mut infos = Vec::with_capacity(files.len());
            for file in files {
                let metadata = fs::metadata(file).map_err(|e| LlmcatError::FileAccess {
                    path: file.clone(),
                    message: e.to_string(),
                })?;
                infos.push(FileInfo {
                    path: display_path(file, base_dir).display().to_string(),
                    absolute: file.display().to_string(),
                    size: metadata.len(),
                });
            }

            let json = serde_json::to_string_pretty(&infos)?;
            writeln!(out, "{json}").map_err(LlmcatError::OutputWrite)?;
        }
    }

    out.flush().map_err(LlmcatError::OutputWrite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    use tempfile::TempDir;

    fn write_file(base: &Path, relative: &str, contents: &str) -> PathBuf {
        let path = base.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("llmcat").chain(args.iter().copied())).unwrap()
    }

    fn path_arg(path: &Path) -> &str {
        path.to_str().unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "llmcat",
            "-f",
            "-d",
            "--content-prefix",
            "---\\n",
            "--filename-prefix",
            "### ",
            "-b",
            "docs",
            "-x",
            "drafts/**",
            "*.md",
            "**/*.md",
        ])
        .unwrap();

        assert!(cli.show_filename);
        assert!(cli.show_dashes);
        assert_eq!(cli.content_prefix, "---\\n");
        assert_eq!(cli.filename_prefix, "### ");
        assert_eq!(cli.base_dir, "docs");
        assert_eq!(cli.exclude, vec!["drafts/**"]);
        assert_eq!(cli.patterns, vec!["*.md", "**/*.md"]);
        assert!(cli.list.is_none());
    }

    #[test]
    fn test_patterns_required() {
        assert!(Cli::try_parse_from(["llmcat", "-f"]).is_err());
    }

    #[test]
    fn test_version_subcommand() {
        let cli = Cli::try_parse_from(["llmcat", "version"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Version)));
        assert!(cli.patterns.is_empty());
    }

    #[test]
    fn test_list_does_not_swallow_patterns() {
        let cli = Cli::try_parse_from(["llmcat", "--list", "*.md"]).unwrap();
        assert_eq!(cli.list, Some(ListFormat::Plain));
        assert_eq!(cli.patterns, vec!["*.md"]);

        let cli = Cli::try_parse_from(["llmcat", "--list=json", "*.md"]).unwrap();
        assert_eq!(cli.list, Some(ListFormat::Json));
    }

    #[test]
    fn test_run_writes_output_file_without_reading_it_back() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        write_file(base, "a.txt", "alpha\n");
        let output = base.join("out.txt");

        let cli = parse(&["-b", path_arg(base), "-o", path_arg(&output), "*.txt"]);
        run(&cli).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "alpha\n\n");

        // out.txt now matches *.txt as well
        run(&cli).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "alpha\n\n");
    }

    #[test]
    fn test_run_decorates_output() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        write_file(base, "docs/readme.md", "# Readme\n");
        let output = temp_dir.path().join("context.txt");

        let cli = parse(&[
            "-f",
            "--filename-prefix",
            "### ",
            "--content-suffix",
            "\\n",
            "-b",
            path_arg(base),
            "-o",
            path_arg(&output),
            "**/*.md",
        ]);
        run(&cli).unwrap();

        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "### docs/readme.md\n# Readme\n\n\n"
        );
    }

    #[test]
    fn test_run_invalid_base_dir_creates_no_output() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        let output = temp_dir.path().join("out.txt");

        let cli = parse(&["-b", path_arg(&missing), "-o", path_arg(&output), "*"]);
        let result = run(&cli);

        assert!(matches!(
            result,
            Err(LlmcatError::InvalidBaseDirectory { .. })
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_run_list_plain() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        write_file(base, "src/main.rs", "fn main() {}\n");
        write_file(base, "src/lib.rs", "");
        let output = base.join("files.txt");

        let cli = parse(&[
            "--list",
            "-b",
            path_arg(base),
            "-o",
            path_arg(&output),
            "src/*.rs",
        ]);
        run(&cli).unwrap();

        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "src/lib.rs\nsrc/main.rs\n"
        );
    }

    #[test]
    fn test_run_list_json() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        let main_rs = write_file(base, "src/main.rs", "fn main() {}\n");
        let output = base.join("files.json");

        let cli = parse(&[
            "--list=json",
            "-b",
            path_arg(base),
            "-o",
            path_arg(&output),
            "**/*.rs",
        ]);
        run(&cli).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["path"], "src/main.rs");
        assert_eq!(entries[0]["absolute"], main_rs.display().to_string());
        assert_eq!(entries[0]["size"], 13);
    }

    #[test]
    fn test_skip_output_file() {
        let temp_dir = TempDir::new().unwrap();
        let kept = write_file(temp_dir.path(), "a.txt", "a");
        let output = write_file(temp_dir.path(), "out.txt", "");
        let files = vec![kept.clone(), output.clone()];

        assert_eq!(skip_output_file(files.clone(), None), files);
        assert_eq!(skip_output_file(files, Some(&output)), vec![kept]);
    }
}
