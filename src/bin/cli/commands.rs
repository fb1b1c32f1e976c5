//! Command implementations for the CLI tool.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tarpatch::patch::JsonPatch;
use tarpatch::{
    Action, Error, Indent, OutputCompression, PipelineConfig, Rule, RuleSpec, TransformConfig,
    TransformOptions,
};

use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::create_formatter;
use crate::progress::CliProgress;
use crate::{CompressionMode, OutputFormat, RuleArgs};

/// Temp archive of the rewrite in flight, removed on Ctrl+C.
static PENDING_TEMP: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Configuration for the rewrite command.
pub struct RewriteConfig<'a> {
    pub input: &'a Path,
    pub output: Option<&'a Path>,
    pub rules: &'a RuleArgs,
    pub indent: u8,
    pub compression: CompressionMode,
    pub level: u32,
    pub remove_input: bool,
    pub no_pipeline: bool,
    pub dry_run: bool,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Rewrite command implementation
pub fn rewrite(config: &RewriteConfig<'_>) -> ExitCode {
    let formatter = create_formatter(config.format);
    let output = config.output.unwrap_or(config.input);

    let rules = match build_rules(config.rules) {
        Ok(rules) => rules,
        Err(e) => return fail(&e),
    };
    if rules.is_empty() {
        eprintln!("Warning: no rules given, the archive will be copied unchanged");
    }

    let transform_config = TransformConfig::new(config.input, output)
        .rules(rules)
        .remove_input_on_success(config.remove_input);

    if config.dry_run {
        return match tarpatch::plan(&transform_config) {
            Ok(planned) => {
                println!("{}", formatter.format_plan(&planned));
                ExitCode::Success
            }
            Err(e) => fail(&e),
        };
    }

    let compression = match config.compression {
        CompressionMode::Gzip => OutputCompression::Gzip(config.level),
        CompressionMode::None => OutputCompression::None,
        CompressionMode::Auto => OutputCompression::Auto,
    };
    let pipeline = if config.no_pipeline {
        PipelineConfig::inline()
    } else {
        PipelineConfig::default()
    };
    let progress = CliProgress::new(config.quiet);
    let options = TransformOptions::new()
        .indent(Indent::Spaces(config.indent))
        .compression(compression)
        .pipeline(pipeline)
        .progress(progress.clone());
    let transform_config = transform_config.options(options);

    set_pending_temp(Some(transform_config.temp_path()));
    let result = tarpatch::transform(&transform_config);
    set_pending_temp(None);
    progress.finish();

    match result {
        Ok(report) => {
            if !config.quiet || config.format == OutputFormat::Json {
                println!("{}", formatter.format_report(&report, output));
            }
            ExitCode::Success
        }
        Err(e) => fail(&e),
    }
}

/// Plan command implementation
pub fn plan(input: &Path, rules: &RuleArgs, format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);

    let rules = match build_rules(rules) {
        Ok(rules) => rules,
        Err(e) => return fail(&e),
    };
    let config = TransformConfig::new(input, input).rules(rules);

    match tarpatch::plan(&config) {
        Ok(planned) => {
            println!("{}", formatter.format_plan(&planned));
            ExitCode::Success
        }
        Err(e) => fail(&e),
    }
}

/// Removes the temp archive of an interrupted rewrite, if one is in flight.
pub fn remove_pending_temp() {
    let pending = match PENDING_TEMP.lock() {
        Ok(mut guard) => guard.take(),
        Err(_) => return,
    };
    if let Some(path) = pending {
        let _ = std::fs::remove_file(path);
    }
}

fn set_pending_temp(path: Option<PathBuf>) {
    if let Ok(mut guard) = PENDING_TEMP.lock() {
        *guard = path;
    }
}

/// Builds the ordered rule list from command-line flags.
fn build_rules(args: &RuleArgs) -> tarpatch::Result<Vec<Rule>> {
    let mut rules = Vec::new();

    if !args.suppress.is_empty() {
        rules.push(Rule::suppress(&args.suppress)?);
    }

    let patch = args
        .remove
        .iter()
        .fold(JsonPatch::new(), |patch, path| patch.remove(path.as_str()));
    let patch = args
        .replace
        .iter()
        .fold(patch, |patch, (path, value)| patch.replace(path.as_str(), value.clone()));
    if !patch.is_empty() {
        rules.push(Rule::matching([&args.manifest], Action::JsonPatch(patch))?);
    }

    if let Some(path) = &args.rules {
        let specs = RuleSpec::load_json(path).map_err(|e| match e {
            Error::Io(source) => Error::InvalidConfig(format!(
                "cannot read rules file '{}': {}",
                path.display(),
                source
            )),
            other => other,
        })?;
        rules.extend(RuleSpec::compile_all(specs)?);
    }

    Ok(rules)
}

fn fail(error: &Error) -> ExitCode {
    eprintln!("Error: {}", error);
    error_to_exit_code(error)
}
