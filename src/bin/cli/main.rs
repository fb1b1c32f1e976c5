//! CLI tool for tarpatch archive rewrites.

mod commands;
mod exit_codes;
mod output;
mod progress;

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use serde_json::Value;
use std::path::PathBuf;

use exit_codes::ExitCode;

/// Rewrite entries inside tar and tar.gz archives
#[derive(Parser)]
#[command(name = "tarpatch")]
#[command(author, version, about = "Rewrite entries inside tar and tar.gz archives", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Suppress progress output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Log more (-v debug, -vv trace); RUST_LOG overrides
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite an archive (alias: r)
    #[command(alias = "r")]
    Rewrite {
        /// Archive to read (.tgz, .tar.gz or .tar)
        input: PathBuf,

        /// Where to write the result; defaults to rewriting INPUT in place
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        rules: RuleArgs,

        /// Indentation of rewritten JSON, in spaces (0 = compact)
        #[arg(long, default_value = "2")]
        indent: u8,

        /// Output compression
        #[arg(short = 'm', long, value_enum, default_value = "gzip")]
        compression: CompressionMode,

        /// Gzip level (0-9)
        #[arg(short = 'l', long, default_value = "6", value_parser = clap::value_parser!(u32).range(0..=9))]
        level: u32,

        /// Delete INPUT after a successful rewrite to a different path
        #[arg(long)]
        remove_input: bool,

        /// Run decompression and compression on the calling thread
        #[arg(long)]
        no_pipeline: bool,

        /// Show what would change without writing anything
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// List entries with the action a rewrite would apply (alias: p)
    #[command(alias = "p")]
    Plan {
        /// Archive to inspect
        input: PathBuf,

        #[command(flatten)]
        rules: RuleArgs,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Rule selection shared by `rewrite` and `plan`.
///
/// Rules from the command line come first, in the order suppress then
/// manifest patch, followed by the rules file.
#[derive(Args)]
pub struct RuleArgs {
    /// Entry patched by --remove and --replace
    #[arg(long, default_value = "package/package.json")]
    manifest: String,

    /// Dotted JSON path to delete from the manifest (repeatable)
    #[arg(long = "remove", value_name = "PATH")]
    remove: Vec<String>,

    /// Set a manifest field; VALUE is parsed as JSON, else taken as a string
    #[arg(long = "replace", value_name = "PATH=VALUE", value_parser = parse_replace)]
    replace: Vec<(String, Value)>,

    /// Glob of entries to leave out (repeatable)
    #[arg(short = 's', long = "suppress", value_name = "GLOB")]
    suppress: Vec<String>,

    /// JSON file with a list of rules
    #[arg(long, value_name = "FILE")]
    rules: Option<PathBuf>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum CompressionMode {
    Gzip,
    None,
    /// Gzip for .tgz/.gz outputs, plain tar otherwise
    Auto,
}

fn parse_replace(arg: &str) -> Result<(String, Value), String> {
    let (path, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected PATH=VALUE, got '{}'", arg))?;
    if path.is_empty() {
        return Err("empty path in --replace".to_string());
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((path.to_string(), value))
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted");
        commands::remove_pending_temp();
        std::process::exit(exit_codes::USER_INTERRUPT);
    })
    .ok();

    let exit_code = match cli.command {
        Commands::Rewrite {
            input,
            output,
            rules,
            indent,
            compression,
            level,
            remove_input,
            no_pipeline,
            dry_run,
        } => commands::rewrite(&commands::RewriteConfig {
            input: &input,
            output: output.as_deref(),
            rules: &rules,
            indent,
            compression,
            level,
            remove_input,
            no_pipeline,
            dry_run,
            format: cli.format,
            quiet: cli.quiet,
        }),

        Commands::Plan { input, rules } => commands::plan(&input, &rules, cli.format),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    std::process::exit(exit_code.code());
}
