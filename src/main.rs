//! Purpose: `capdiff` CLI entry point.
//! Role: Binary crate root; parses args, runs one diff, renders the report on stdout.
//! Invariants: Reports go to stdout; errors and tracing output go to stderr.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Exit code is 0 when everything matched, 1 on divergence, else `to_exit_code`.
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod color_json;
mod report;

use capdiff::core::compare::IgnoreFields;
use capdiff::core::diff::{DiffOptions, PairingPolicy, diff_paths};
use capdiff::core::error::{DIFFERENCES_EXIT_CODE, Error, ErrorKind, to_exit_code};
use report::{AnsiColor, TextContext, colorize_label, outcome_json, render_text};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

#[derive(Parser, Debug)]
#[command(
    name = "capdiff",
    version,
    about = "Compare two captured API-response logs URL by URL",
    long_about = None,
    after_help = r#"EXAMPLES
  $ capdiff before.log after.log
  $ capdiff before.log after.log timestamp,request_id
  $ capdiff before.log after.log --ignore etag --format json

CAPTURE LOG FORMAT
  URL:
  http://api.example.com/users/1
  CONTENTS:
  {"id": 1, "name": "Ada"}

Exit status is 0 when every URL matched, 1 when any URL differed."#
)]
struct Cli {
    #[arg(help = "Left (baseline) capture log", value_hint = ValueHint::FilePath)]
    left: PathBuf,
    #[arg(help = "Right (candidate) capture log", value_hint = ValueHint::FilePath)]
    right: PathBuf,
    #[arg(
        value_name = "IGNORE_FIELDS",
        help = "Comma-separated field names to ignore at every nesting level"
    )]
    ignore_fields: Option<String>,
    #[arg(
        long = "ignore",
        value_name = "FIELD",
        value_delimiter = ',',
        help = "Additional field to ignore (repeatable, comma lists allowed)"
    )]
    ignore: Vec<String>,
    #[arg(long = "ignore-env", env = "CAPDIFF_IGNORE", hide = true)]
    ignore_env: Option<String>,
    #[arg(
        long,
        default_value = "text",
        value_enum,
        help = "Report format: text|json"
    )]
    format: OutputFormat,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize report labels and payload dumps: auto|always|never"
    )]
    color: ColorMode,
    #[arg(
        long,
        help = "Fail when a left URL is missing from the right log instead of reporting it"
    )]
    strict_pairing: bool,
    #[arg(long, help = "Omit payload dumps from text mismatch reports")]
    no_payloads: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                return Ok(RunOutcome::ok());
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `capdiff --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();
    let color_mode = cli.color;
    execute(cli)
        .map_err(add_default_hint)
        .map_err(|err| (err, color_mode))
}

fn execute(cli: Cli) -> Result<RunOutcome, Error> {
    let ignore = ignore_fields(
        cli.ignore_fields.as_deref(),
        &cli.ignore,
        cli.ignore_env.as_deref(),
    );
    let pairing = if cli.strict_pairing {
        PairingPolicy::Strict
    } else {
        PairingPolicy::Lenient
    };
    tracing::debug!(
        left = %cli.left.display(),
        right = %cli.right.display(),
        ignored = ignore.len(),
        ?pairing,
        "starting capture diff"
    );

    let options = DiffOptions { ignore, pairing };
    let outcome = diff_paths(&cli.left, &cli.right, &options)?;

    match cli.format {
        OutputFormat::Text => {
            let left_name = display_name(&cli.left);
            let right_name = display_name(&cli.right);
            let ctx = TextContext {
                left_name: &left_name,
                right_name: &right_name,
                use_color: cli.color.use_color(io::stdout().is_terminal()),
                show_payloads: !cli.no_payloads,
                ignore: &options.ignore,
            };
            print!("{}", render_text(&outcome, &ctx));
        }
        OutputFormat::Json => emit_json(outcome_json(&outcome)),
    }

    if outcome.is_match() {
        Ok(RunOutcome::ok())
    } else {
        Ok(RunOutcome::with_code(DIFFERENCES_EXIT_CODE))
    }
}

/// Union of the positional list, every `--ignore` flag and `CAPDIFF_IGNORE`.
fn ignore_fields(positional: Option<&str>, flags: &[String], env: Option<&str>) -> IgnoreFields {
    let mut fields: IgnoreFields = flags.iter().collect();
    for list in [positional, env].into_iter().flatten() {
        fields.extend_from_list(list);
    }
    fields
}

fn display_name(path: &Path) -> String {
    path.display().to_string()
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_env("CAPDIFF_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn emit_json(value: Value) {
    let encoded = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    };
    let json = encoded.unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn add_default_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::NotFound => err.with_hint("Check that both capture log paths exist."),
        ErrorKind::Io => err.with_hint("Check the path and file permissions."),
        _ => err,
    }
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
    } else {
        eprintln!("{}", error_json(err));
    }
}

/// Labelled context lines shared by the text and JSON error forms, causes last.
fn error_details(err: &Error) -> Vec<(&'static str, String)> {
    use std::error::Error as _;

    let mut details = Vec::new();
    if let Some(hint) = err.hint() {
        details.push(("hint", hint.to_string()));
    }
    if let Some(path) = err.path() {
        details.push(("path", path.display().to_string()));
    }
    if let Some(url) = err.url() {
        details.push(("url", url.to_string()));
    }
    let mut cause = err.source();
    while let Some(source) = cause {
        details.push(("caused by", source.to_string()));
        cause = source.source();
    }
    details
}

fn error_message(err: &Error) -> String {
    err.message()
        .map_or_else(|| format!("{:?} error", err.kind()), str::to_string)
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    let mut causes = Vec::new();
    for (label, text) in error_details(err) {
        if label == "caused by" {
            causes.push(text);
        } else {
            inner.insert(label.to_string(), json!(text));
        }
    }
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }
    json!({ "error": inner })
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = vec![format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    )];
    for (label, text) in error_details(err) {
        let label = colorize_label(&format!("{label}:"), use_color, AnsiColor::Yellow);
        lines.push(format!("{label} {text}"));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first = rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("invalid arguments");
    first.strip_prefix("error:").unwrap_or(first).trim().to_string()
}
