// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gmv_align::{CorrelationCurve, LagMode, cross_correlation};
use gmv_cli::arrays::{DEFAULT_NPZ_ENTRY, InputSummary, LoadedArray, load_array, load_pair};
use gmv_cli::{CliError, FileConfig, init_tracing, load_config, write_npy, write_npz};
use gmv_core::{ExecutionContext, Operand, TelemetrySink};
use gmv_preprocess::{
    AdaptiveNormalizer, BoundaryPolicy, NormalizedSignal, NormalizerConfig, periodic_unwrap,
};
use gmv_validate::{
    ArtifactPolicy, FailureArtifacts, ValidationConfig, ValidationReport, Validator,
};
use serde::Serialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

/// Exit status for a validation that ran but did not pass.
const EXIT_VALIDATION_FAILED: i32 = 2;

struct Cli {
    command: Command,
}

enum Command {
    Validate(ValidateArgs),
    Lag(LagArgs),
    Normalize(NormalizeArgs),
    Unwrap(UnwrapArgs),
}

#[derive(Debug, Default)]
struct PairArgs {
    pair: Option<PathBuf>,
    candidate: Option<String>,
    reference: Option<String>,
}

#[derive(Debug, Default)]
struct ValidateArgs {
    inputs: PairArgs,
    threshold: Option<f64>,
    lag_mode: Option<LagMode>,
    artifact_policy: Option<ArtifactPolicy>,
    config: Option<PathBuf>,
    artifacts_dir: Option<PathBuf>,
    output: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct LagArgs {
    inputs: PairArgs,
    lag_mode: Option<LagMode>,
    include_curve: bool,
    output: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct NormalizeArgs {
    input: String,
    period: Option<usize>,
    overflow_limit: Option<f64>,
    underflow_limit: Option<f64>,
    step: Option<f64>,
    initial_factor: Option<f64>,
    boundary: Option<BoundaryPolicy>,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct UnwrapArgs {
    input: String,
    period: usize,
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct ValidateOutput {
    command: &'static str,
    candidate: InputSummary,
    reference: InputSummary,
    config: ValidationConfig,
    report: ValidationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifacts_dir: Option<String>,
}

#[derive(Serialize)]
struct LagOutput {
    command: &'static str,
    candidate: InputSummary,
    reference: InputSummary,
    lag_mode: LagMode,
    lag: isize,
    peak: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    curve: Option<CorrelationCurve>,
}

#[derive(Serialize)]
struct NormalizeOutput {
    command: &'static str,
    input: InputSummary,
    config: NormalizerConfig,
    result: NormalizedSignal,
}

#[derive(Serialize)]
struct UnwrapOutput {
    command: &'static str,
    input: InputSummary,
    period: usize,
    values: Vec<f64>,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

/// Forwards run telemetry to the log.
struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn record_scalar(&self, key: &'static str, value: f64) {
        tracing::info!(key, value, "telemetry");
    }
}

fn main() {
    init_tracing();
    match run() {
        Ok(0) => {}
        Ok(code) => process::exit(code),
        Err(err) => {
            emit_structured_error(&err);
            process::exit(1);
        }
    }
}

fn run() -> Result<i32, CliError> {
    let Some(cli) = parse_cli_from_env()? else {
        return Ok(0);
    };

    match cli.command {
        Command::Validate(args) => handle_validate(args),
        Command::Lag(args) => handle_lag(args),
        Command::Normalize(args) => handle_normalize(args),
        Command::Unwrap(args) => handle_unwrap(args),
    }
}

fn parse_cli_from_env() -> Result<Option<Cli>, CliError> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    parse_cli(args.as_slice())
}

fn parse_cli(args: &[String]) -> Result<Option<Cli>, CliError> {
    if args.is_empty() {
        print_root_help();
        return Ok(None);
    }

    if matches!(args[0].as_str(), "-h" | "--help") {
        print_root_help();
        return Ok(None);
    }
    if matches!(args[0].as_str(), "-V" | "--version") {
        print_version();
        return Ok(None);
    }

    let command_name = args[0].as_str();
    let rest = &args[1..];

    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print_command_help(command_name)?;
        return Ok(None);
    }
    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-V" | "--version"))
    {
        print_version();
        return Ok(None);
    }

    let command = match command_name {
        "validate" => Command::Validate(parse_validate_args(rest)?),
        "lag" => Command::Lag(parse_lag_args(rest)?),
        "normalize" => Command::Normalize(parse_normalize_args(rest)?),
        "unwrap" => Command::Unwrap(parse_unwrap_args(rest)?),
        _ => {
            return Err(CliError::invalid_input(format!(
                "unknown command '{command_name}'; expected one of: validate, lag, normalize, unwrap"
            )));
        }
    };

    Ok(Some(Cli { command }))
}

/// Consumes `--pair`, `--candidate` and `--reference`; returns false for any other flag.
fn parse_pair_flag(
    inputs: &mut PairArgs,
    flag: &str,
    inline_value: &mut Option<String>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<bool, CliError> {
    let slot = match flag {
        "--pair" => {
            let raw = take_flag_value(flag, inline_value.take(), tokens, idx)?;
            inputs.pair = Some(PathBuf::from(raw));
            return Ok(true);
        }
        "--candidate" => &mut inputs.candidate,
        "--reference" => &mut inputs.reference,
        _ => return Ok(false),
    };
    *slot = Some(take_flag_value(flag, inline_value.take(), tokens, idx)?);
    Ok(true)
}

fn ensure_pair_inputs(inputs: &PairArgs, command: &str) -> Result<(), CliError> {
    match (&inputs.pair, &inputs.candidate, &inputs.reference) {
        (Some(_), None, None) | (None, Some(_), Some(_)) => Ok(()),
        (Some(_), _, _) => Err(CliError::invalid_input(format!(
            "{command} accepts either --pair or --candidate/--reference, not both"
        ))),
        _ => Err(CliError::invalid_input(format!(
            "{command} requires --pair <file.npz> or both --candidate <path> and --reference <path>"
        ))),
    }
}

fn parse_validate_args(tokens: &[String]) -> Result<ValidateArgs, CliError> {
    let mut args = ValidateArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, mut inline_value) = split_flag(tokens[idx].as_str())?;
        if parse_pair_flag(&mut args.inputs, flag, &mut inline_value, tokens, &mut idx)? {
            idx += 1;
            continue;
        }
        match flag {
            "--threshold" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.threshold = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--lag-mode" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.lag_mode = Some(parse_lag_mode(raw.as_str())?);
            }
            "--artifact-policy" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.artifact_policy = Some(parse_artifact_policy(raw.as_str())?);
            }
            "--config" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.config = Some(PathBuf::from(raw));
            }
            "--artifacts" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.artifacts_dir = Some(PathBuf::from(raw));
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.output = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown validate option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    ensure_pair_inputs(&args.inputs, "validate")?;
    Ok(args)
}

fn parse_lag_args(tokens: &[String]) -> Result<LagArgs, CliError> {
    let mut args = LagArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, mut inline_value) = split_flag(tokens[idx].as_str())?;
        if parse_pair_flag(&mut args.inputs, flag, &mut inline_value, tokens, &mut idx)? {
            idx += 1;
            continue;
        }
        match flag {
            "--lag-mode" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.lag_mode = Some(parse_lag_mode(raw.as_str())?);
            }
            "--curve" => {
                ensure_no_inline_value(flag, inline_value)?;
                args.include_curve = true;
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.output = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!("unknown lag option '{other}'")));
            }
        }
        idx += 1;
    }

    ensure_pair_inputs(&args.inputs, "lag")?;
    Ok(args)
}

fn parse_normalize_args(tokens: &[String]) -> Result<NormalizeArgs, CliError> {
    let mut args = NormalizeArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--input" => {
                args.input = take_flag_value(flag, inline_value, tokens, &mut idx)?;
            }
            "--period" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.period = Some(parse_usize_arg(raw.as_str(), flag)?);
            }
            "--overflow-limit" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.overflow_limit = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--underflow-limit" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.underflow_limit = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--step" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.step = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--initial-factor" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.initial_factor = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--boundary" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.boundary = Some(parse_boundary(raw.as_str())?);
            }
            "--config" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.config = Some(PathBuf::from(raw));
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.output = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown normalize option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if args.input.is_empty() {
        return Err(CliError::invalid_input("normalize requires --input <path>"));
    }
    Ok(args)
}

fn parse_unwrap_args(tokens: &[String]) -> Result<UnwrapArgs, CliError> {
    let mut input = String::new();
    let mut period: Option<usize> = None;
    let mut output: Option<PathBuf> = None;

    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--input" => {
                input = take_flag_value(flag, inline_value, tokens, &mut idx)?;
            }
            "--period" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                period = Some(parse_usize_arg(raw.as_str(), flag)?);
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                output = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown unwrap option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if input.is_empty() {
        return Err(CliError::invalid_input("unwrap requires --input <path>"));
    }
    let period =
        period.ok_or_else(|| CliError::invalid_input("unwrap requires --period <usize>"))?;

    Ok(UnwrapArgs {
        input,
        period,
        output,
    })
}

fn split_flag(token: &str) -> Result<(&str, Option<String>), CliError> {
    if !token.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "unexpected positional argument '{token}'; expected --flag value"
        )));
    }
    if let Some((flag, value)) = token.split_once('=') {
        return Ok((flag, Some(value.to_string())));
    }
    Ok((token, None))
}

fn take_flag_value(
    flag: &str,
    inline_value: Option<String>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<String, CliError> {
    if let Some(value) = inline_value {
        return Ok(value);
    }

    *idx += 1;
    let value = tokens
        .get(*idx)
        .ok_or_else(|| CliError::invalid_input(format!("{flag} requires a value")))?;
    if value.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "{flag} requires a value, but got option '{value}'"
        )));
    }
    Ok(value.clone())
}

fn ensure_no_inline_value(flag: &str, inline_value: Option<String>) -> Result<(), CliError> {
    if inline_value.is_some() {
        return Err(CliError::invalid_input(format!(
            "{flag} does not accept a value"
        )));
    }
    Ok(())
}

fn parse_usize_arg(raw: &str, flag: &str) -> Result<usize, CliError> {
    raw.parse::<usize>().map_err(|_| {
        CliError::invalid_input(format!(
            "{flag} expects a non-negative integer, got '{raw}'"
        ))
    })
}

fn parse_f64_arg(raw: &str, flag: &str) -> Result<f64, CliError> {
    raw.parse::<f64>()
        .map_err(|_| CliError::invalid_input(format!("{flag} expects a number, got '{raw}'")))
}

fn parse_lag_mode(raw: &str) -> Result<LagMode, CliError> {
    match raw.to_ascii_lowercase().as_str() {
        "cyclic" => Ok(LagMode::Cyclic),
        "linear" | "full" => Ok(LagMode::Linear),
        _ => Err(CliError::invalid_input(format!(
            "invalid --lag-mode '{raw}'; expected one of: cyclic, linear"
        ))),
    }
}

fn parse_boundary(raw: &str) -> Result<BoundaryPolicy, CliError> {
    match raw.to_ascii_lowercase().as_str() {
        "window_end" | "window-end" => Ok(BoundaryPolicy::WindowEnd),
        "leading_sample" | "leading-sample" => Ok(BoundaryPolicy::LeadingSample),
        _ => Err(CliError::invalid_input(format!(
            "invalid --boundary '{raw}'; expected one of: window_end, leading_sample"
        ))),
    }
}

fn parse_artifact_policy(raw: &str) -> Result<ArtifactPolicy, CliError> {
    match raw.to_ascii_lowercase().as_str() {
        "on_failure" | "on-failure" => Ok(ArtifactPolicy::OnFailure),
        "always" => Ok(ArtifactPolicy::Always),
        "never" => Ok(ArtifactPolicy::Never),
        _ => Err(CliError::invalid_input(format!(
            "invalid --artifact-policy '{raw}'; expected one of: on_failure, always, never"
        ))),
    }
}

fn print_version() {
    println!("gmv {}", env!("CARGO_PKG_VERSION"));
}

fn print_root_help() {
    println!(
        "gmv {}\n\nUSAGE:\n  gmv <COMMAND> [OPTIONS]\n\nCOMMANDS:\n  validate   Compare a candidate trace with a golden reference trace\n  lag        Report the lag between two traces\n  normalize  Rescale a trace with the adaptive normalizer\n  unwrap     Unwrap phase across periodic frames\n\nGLOBAL OPTIONS:\n  -h, --help      Show help\n  -V, --version   Show version\n\nSet GMV_LOG (e.g. GMV_LOG=debug) to control log output on stderr.\nRun 'gmv <COMMAND> --help' for subcommand options.",
        env!("CARGO_PKG_VERSION")
    );
}

fn print_command_help(command: &str) -> Result<(), CliError> {
    match command {
        "validate" => {
            println!(
                "USAGE:\n  gmv validate (--pair <file.npz> | --candidate <path> --reference <path>) [OPTIONS]\n\nOPTIONS:\n  --pair <path>                              .npz with arr_0 (candidate) and arr_1 (reference)\n  --candidate <path>                         .npy, .csv or .npz[#key]\n  --reference <path>                         .npy, .csv or .npz[#key]\n  --threshold <float>                        Default: 0.9\n  --lag-mode <cyclic|linear>                 Default: cyclic\n  --artifact-policy <on_failure|always|never>  Default: on_failure\n  --config <path>                            Settings JSON ({{\"validation\": {{...}}}})\n  --artifacts <dir>                          Write raw/aligned pairs as .npy when present\n  --output <path>                            Write JSON output to file\n\nExit status is 2 when the validation runs but does not pass."
            );
            Ok(())
        }
        "lag" => {
            println!(
                "USAGE:\n  gmv lag (--pair <file.npz> | --candidate <path> --reference <path>) [OPTIONS]\n\nOPTIONS:\n  --lag-mode <cyclic|linear>   Default: cyclic\n  --curve                      Include the full correlation curve\n  --output <path>              Write JSON output to file"
            );
            Ok(())
        }
        "normalize" => {
            println!(
                "USAGE:\n  gmv normalize --input <path> [OPTIONS]\n\nOPTIONS:\n  --period <usize>                          Default: 10\n  --overflow-limit <float>                  Default: 0.1\n  --underflow-limit <float>                 Default: 0.9\n  --step <float>                            Default: 0.01\n  --initial-factor <float>                  Default: 1.0\n  --boundary <window_end|leading_sample>    Default: window_end\n  --config <path>                           Settings JSON ({{\"normalize\": {{...}}}})\n  --output <path>                           JSON, or .npy/.npz for the normalized samples only"
            );
            Ok(())
        }
        "unwrap" => {
            println!(
                "USAGE:\n  gmv unwrap --input <path> --period <usize> [OPTIONS]\n\nOPTIONS:\n  --output <path>   JSON, or .npy/.npz for the unwrapped samples only"
            );
            Ok(())
        }
        _ => Err(CliError::invalid_input(format!(
            "unknown command '{command}'; expected one of: validate, lag, normalize, unwrap"
        ))),
    }
}

fn load_file_config(path: Option<&Path>) -> Result<FileConfig, CliError> {
    path.map(load_config)
        .transpose()
        .map(Option::unwrap_or_default)
}

fn load_pair_inputs(inputs: &PairArgs) -> Result<(LoadedArray, LoadedArray), CliError> {
    match (&inputs.pair, &inputs.candidate, &inputs.reference) {
        (Some(pair), _, _) => load_pair(pair),
        (None, Some(candidate), Some(reference)) => {
            Ok((load_array(candidate)?, load_array(reference)?))
        }
        _ => Err(CliError::invalid_input(
            "both --candidate and --reference are required",
        )),
    }
}

fn resolve_validation_config(args: &ValidateArgs, file: FileConfig) -> ValidationConfig {
    let mut config = file.validation.unwrap_or_default();
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if let Some(lag_mode) = args.lag_mode {
        config.lag_mode = lag_mode;
    }
    if let Some(policy) = args.artifact_policy {
        config.artifacts = policy;
    }
    config
}

fn resolve_normalizer_config(args: &NormalizeArgs, file: FileConfig) -> NormalizerConfig {
    let mut config = file.normalize.unwrap_or_default();
    if let Some(period) = args.period {
        config.period = period;
    }
    if let Some(limit) = args.overflow_limit {
        config.overflow_limit = limit;
    }
    if let Some(limit) = args.underflow_limit {
        config.underflow_limit = limit;
    }
    if let Some(step) = args.step {
        config.step = step;
    }
    if let Some(factor) = args.initial_factor {
        config.initial_factor = factor;
    }
    if let Some(boundary) = args.boundary {
        config.boundary = boundary;
    }
    config
}

fn handle_validate(args: ValidateArgs) -> Result<i32, CliError> {
    let file = load_file_config(args.config.as_deref())?;
    let config = resolve_validation_config(&args, file);
    let validator = Validator::new(config)?;

    let (candidate, reference) = load_pair_inputs(&args.inputs)?;
    let telemetry = TracingTelemetry;
    let ctx = ExecutionContext::new().with_telemetry_sink(&telemetry);
    let mut report = validator.run(
        &candidate.as_view(Operand::Candidate)?,
        &reference.as_view(Operand::Reference)?,
        &ctx,
    )?;
    report.diagnostics.params_json = Some(
        serde_json::to_value(config)
            .map_err(|source| CliError::json("failed to serialize validation config", source))?,
    );

    let artifacts_dir = match (&args.artifacts_dir, &report.artifacts) {
        (Some(dir), Some(artifacts)) => {
            write_artifacts(dir, artifacts)?;
            Some(dir.display().to_string())
        }
        _ => None,
    };

    let passed = report.passed;
    let output = ValidateOutput {
        command: "validate",
        candidate: candidate.summary(),
        reference: reference.summary(),
        config,
        report,
        artifacts_dir,
    };
    write_json_output(&output, args.output.as_deref())?;

    Ok(if passed { 0 } else { EXIT_VALIDATION_FAILED })
}

fn write_artifacts(dir: &Path, artifacts: &FailureArtifacts) -> Result<(), CliError> {
    fs::create_dir_all(dir)
        .map_err(|source| CliError::io(format!("failed to create '{}'", dir.display()), source))?;
    for (name, values) in [
        ("candidate_raw.npy", &artifacts.candidate_raw),
        ("reference_raw.npy", &artifacts.reference_raw),
        ("candidate_aligned.npy", &artifacts.candidate_aligned),
        ("reference_aligned.npy", &artifacts.reference_aligned),
    ] {
        write_npy(dir.join(name).as_path(), values.as_slice())?;
    }
    tracing::info!(dir = %dir.display(), "validation artifacts written");
    Ok(())
}

fn handle_lag(args: LagArgs) -> Result<i32, CliError> {
    let (candidate, reference) = load_pair_inputs(&args.inputs)?;
    let lag_mode = args.lag_mode.unwrap_or_default();
    let curve = cross_correlation(
        &candidate.as_view(Operand::Candidate)?,
        &reference.as_view(Operand::Reference)?,
        lag_mode,
    )?;
    let (lag, peak) = curve
        .peak()
        .ok_or_else(|| CliError::invalid_input("cross-correlation produced no lags"))?;

    let output = LagOutput {
        command: "lag",
        candidate: candidate.summary(),
        reference: reference.summary(),
        lag_mode,
        lag,
        peak,
        curve: args.include_curve.then_some(curve),
    };
    write_json_output(&output, args.output.as_deref())?;
    Ok(0)
}

fn handle_normalize(args: NormalizeArgs) -> Result<i32, CliError> {
    let file = load_file_config(args.config.as_deref())?;
    let config = resolve_normalizer_config(&args, file);
    let normalizer = AdaptiveNormalizer::new(config)?;

    let input = load_array(args.input.as_str())?;
    let telemetry = TracingTelemetry;
    let ctx = ExecutionContext::new().with_telemetry_sink(&telemetry);
    let mut result = normalizer.apply(&input.as_view(Operand::Data)?, &ctx)?;
    result.diagnostics.params_json = Some(
        serde_json::to_value(config)
            .map_err(|source| CliError::json("failed to serialize normalizer config", source))?,
    );

    if let Some(path) = array_output_path(args.output.as_deref()) {
        write_array_output(path, result.values.as_slice())?;
        return Ok(0);
    }

    let output = NormalizeOutput {
        command: "normalize",
        input: input.summary(),
        config,
        result,
    };
    write_json_output(&output, args.output.as_deref())?;
    Ok(0)
}

fn handle_unwrap(args: UnwrapArgs) -> Result<i32, CliError> {
    let input = load_array(args.input.as_str())?;
    let values = periodic_unwrap(&input.as_view(Operand::Data)?, args.period)?;

    if let Some(path) = array_output_path(args.output.as_deref()) {
        write_array_output(path, values.as_slice())?;
        return Ok(0);
    }

    let output = UnwrapOutput {
        command: "unwrap",
        input: input.summary(),
        period: args.period,
        values,
    };
    write_json_output(&output, args.output.as_deref())?;
    Ok(0)
}

/// Returns `path` when it names a `.npy` or `.npz` file.
fn array_output_path(path: Option<&Path>) -> Option<&Path> {
    path.filter(|path| {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("npy") || ext.eq_ignore_ascii_case("npz"))
    })
}

fn write_array_output(path: &Path, values: &[f64]) -> Result<(), CliError> {
    let is_npz = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("npz"));
    if is_npz {
        write_npz(path, &[(DEFAULT_NPZ_ENTRY, values)])
    } else {
        write_npy(path, values)
    }
}

fn write_json_output<T: Serialize>(
    payload: &T,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let encoded = serde_json::to_string_pretty(payload)
        .map_err(|source| CliError::json("failed to serialize JSON output", source))?;

    if let Some(path) = output_path {
        fs::write(path, format!("{encoded}\n"))
            .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source))
    } else {
        println!("{encoded}");
        Ok(())
    }
}

fn emit_structured_error(err: &CliError) {
    let envelope = ErrorEnvelope {
        error: ErrorPayload {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    };

    match serde_json::to_string_pretty(&envelope) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!(
            "{{\"error\":{{\"code\":\"{}\",\"message\":\"{}\"}}}}",
            err.code(),
            err
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Command, EXIT_VALIDATION_FAILED, PairArgs, ValidateArgs, array_output_path,
        handle_unwrap, handle_validate, parse_cli, parse_lag_args, parse_normalize_args,
        parse_unwrap_args, parse_validate_args, resolve_normalizer_config,
        resolve_validation_config,
    };
    use gmv_align::LagMode;
    use gmv_cli::arrays::{load_array, parse_npy_bytes};
    use gmv_cli::config::parse_config;
    use gmv_cli::write_npz;
    use gmv_preprocess::BoundaryPolicy;
    use gmv_validate::ArtifactPolicy;
    use std::path::{Path, PathBuf};

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|token| token.to_string()).collect()
    }

    #[test]
    fn validate_args_accept_pair_and_inline_values() {
        let args = parse_validate_args(&tokens(&[
            "--pair",
            "traces.npz",
            "--threshold=0.8",
            "--lag-mode",
            "linear",
            "--artifacts",
            "out",
        ]))
        .expect("validate args should parse");
        assert_eq!(args.inputs.pair, Some(PathBuf::from("traces.npz")));
        assert_eq!(args.threshold, Some(0.8));
        assert_eq!(args.lag_mode, Some(LagMode::Linear));
        assert_eq!(args.artifacts_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn validate_args_require_exactly_one_input_form() {
        let err = parse_validate_args(&tokens(&["--candidate", "a.npy"]))
            .expect_err("missing reference must fail");
        assert!(err.to_string().contains("--candidate"), "{err}");

        let err = parse_validate_args(&tokens(&[
            "--pair",
            "p.npz",
            "--candidate",
            "a.npy",
            "--reference",
            "b.npy",
        ]))
        .expect_err("both input forms must fail");
        assert!(err.to_string().contains("not both"), "{err}");
    }

    #[test]
    fn flag_values_cannot_be_other_flags() {
        let err = parse_lag_args(&tokens(&["--candidate", "--reference", "b.npy"]))
            .expect_err("missing value must fail");
        assert!(err.to_string().contains("requires a value"), "{err}");

        let err = parse_lag_args(&tokens(&["--pair", "p.npz", "--curve=yes"]))
            .expect_err("--curve takes no value");
        assert!(err.to_string().contains("does not accept a value"), "{err}");
    }

    #[test]
    fn unknown_commands_and_options_are_rejected() {
        let err = parse_cli(&tokens(&["detect"])).err().expect("unknown command must fail");
        assert!(err.to_string().contains("unknown command 'detect'"), "{err}");

        let err = parse_normalize_args(&tokens(&["--input", "x.npy", "--gain", "2"]))
            .expect_err("unknown option must fail");
        assert!(err.to_string().contains("unknown normalize option '--gain'"));

        let err = parse_unwrap_args(&tokens(&["--input", "x.npy"]))
            .expect_err("period is required");
        assert!(err.to_string().contains("--period"), "{err}");
    }

    #[test]
    fn parse_cli_routes_subcommands() {
        let cli = parse_cli(&tokens(&["unwrap", "--input", "x.npz#arr_2", "--period", "4"]))
            .expect("cli should parse")
            .expect("command expected");
        match cli.command {
            Command::Unwrap(args) => {
                assert_eq!(args.input, "x.npz#arr_2");
                assert_eq!(args.period, 4);
            }
            _ => panic!("expected unwrap command"),
        }
    }

    #[test]
    fn flags_override_config_file_values() {
        let file = parse_config(
            r#"{"validation": {"threshold": 0.5, "lag_mode": "linear", "artifacts": "never"},
                "normalize": {"period": 8, "step": 0.05}}"#,
        )
        .expect("config should parse");

        let args = ValidateArgs {
            inputs: PairArgs::default(),
            threshold: Some(0.75),
            artifact_policy: Some(ArtifactPolicy::Always),
            ..ValidateArgs::default()
        };
        let config = resolve_validation_config(&args, file.clone());
        assert_eq!(config.threshold, 0.75);
        assert_eq!(config.lag_mode, LagMode::Linear);
        assert_eq!(config.artifacts, ArtifactPolicy::Always);

        let args = parse_normalize_args(&tokens(&[
            "--input",
            "x.npy",
            "--period",
            "5",
            "--boundary",
            "leading_sample",
        ]))
        .expect("normalize args should parse");
        let config = resolve_normalizer_config(&args, file);
        assert_eq!(config.period, 5);
        assert_eq!(config.step, 0.05);
        assert_eq!(config.boundary, BoundaryPolicy::LeadingSample);
    }

    #[test]
    fn array_outputs_are_selected_by_extension() {
        assert!(array_output_path(Some(Path::new("out.npy"))).is_some());
        assert!(array_output_path(Some(Path::new("out.NPZ"))).is_some());
        assert!(array_output_path(Some(Path::new("out.json"))).is_none());
        assert!(array_output_path(None).is_none());
    }

    #[test]
    fn failing_validation_writes_artifacts_and_exits_two() {
        let dir = tempfile::tempdir().expect("temp dir");
        let pair = dir.path().join("pair.npz");
        let candidate = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let reference = [1.0, 3.0, 2.0, 4.0, 6.0, 5.0];
        write_npz(
            &pair,
            &[("arr_0", candidate.as_slice()), ("arr_1", reference.as_slice())],
        )
        .expect("npz writes");

        let artifacts = dir.path().join("artifacts");
        let output = dir.path().join("report.json");
        let args = parse_validate_args(&tokens(&[
            "--pair",
            pair.to_str().expect("utf-8 path"),
            "--threshold",
            "0.99",
            "--artifacts",
            artifacts.to_str().expect("utf-8 path"),
            "--output",
            output.to_str().expect("utf-8 path"),
        ]))
        .expect("validate args should parse");

        let code = handle_validate(args).expect("validation should run");
        assert_eq!(code, EXIT_VALIDATION_FAILED);

        let raw = std::fs::read(artifacts.join("reference_raw.npy")).expect("artifact exists");
        assert_eq!(parse_npy_bytes(&raw).expect("artifact parses"), reference.to_vec());
        assert!(artifacts.join("candidate_aligned.npy").exists());

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).expect("report written"))
                .expect("report is JSON");
        assert_eq!(report["command"], "validate");
        assert_eq!(report["report"]["passed"], false);
        assert_eq!(report["report"]["diagnostics"]["params_json"]["threshold"], 0.99);
    }

    #[test]
    fn unwrap_writes_npz_output() {
        let dir = tempfile::tempdir().expect("temp dir");
        let input = dir.path().join("input.npz");
        write_npz(&input, &[("arr_0", [0.0, 0.1, 6.0, 0.2].as_slice())]).expect("npz writes");
        let output = dir.path().join("output.npz");

        let args = parse_unwrap_args(&tokens(&[
            "--input",
            input.to_str().expect("utf-8 path"),
            "--period",
            "2",
            "--output",
            output.to_str().expect("utf-8 path"),
        ]))
        .expect("unwrap args should parse");
        assert_eq!(handle_unwrap(args).expect("unwrap should run"), 0);

        let loaded = load_array(output.to_str().expect("utf-8 path")).expect("output loads");
        assert_eq!(loaded.values.len(), 4);
        assert!((loaded.values[2] - (6.0 - std::f64::consts::TAU)).abs() < 1e-12);
        assert_eq!(loaded.values[3], 0.2);
    }
}
