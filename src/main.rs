//! Aligerar CLI
//!
//! # Usage
//!
//! ```bash
//! # Convert model/cnn1d_model.safetensors into cnn1d_model.lite
//! aligerar
//!
//! # Convert with explicit paths and options
//! aligerar model.json model.lite --precision float32 --no-optimize
//!
//! # Inspect a source model or an artifact
//! aligerar inspect model.lite
//!
//! # Check an artifact against its source model
//! aligerar verify model.json model.lite --tolerance 0.01
//! ```

use aligerar::config::{
    resolve_convert, validate_verify, Cli, Command, ConvertArgs, InspectArgs, VerifyArgs,
};
use aligerar::convert::convert_file;
use aligerar::inspect::inspect_model;
use aligerar::io::load_model;
use aligerar::lite::read_lite_model;
use aligerar::logging::init_cli_logger;
use aligerar::output::{to_json, OutputFormat};
use aligerar::runtime::{verify, VerifyReport};
use aligerar::{Error, Result};
use clap::Parser;
use std::process::ExitCode;

/// Exit code when an artifact disagrees with its source beyond tolerance
const EXIT_VERIFY_FAILED: u8 = 7;

/// Exit code for command line usage errors (sysexits `EX_USAGE`)
const EXIT_USAGE: u8 = 64;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version also arrive here, on stdout
            return if e.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    let quiet = cli.quiet;
    init_cli_logger(cli.verbose, quiet);

    let result = match cli.into_command() {
        Command::Convert(args) => run_convert(&args, quiet),
        Command::Inspect(args) => run_inspect(&args),
        Command::Verify(args) => run_verify(&args, quiet),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_VERIFY_FAILED),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run_convert(args: &ConvertArgs, quiet: bool) -> Result<bool> {
    let spec = resolve_convert(args)?;
    let options = spec.options()?;

    let report = convert_file(&spec.input, &spec.output, &options, spec.overwrite)?;

    if !quiet {
        println!("{report}");
    }
    Ok(true)
}

fn run_inspect(args: &InspectArgs) -> Result<bool> {
    let info = inspect_model(&args.model)?;
    match args.format {
        OutputFormat::Text => print!("{}", info.render()),
        OutputFormat::Json => println!("{}", to_json(&info)?),
    }
    Ok(true)
}

fn run_verify(args: &VerifyArgs, quiet: bool) -> Result<bool> {
    validate_verify(args.samples, args.tolerance)
        .map_err(|e| Error::Config(e.to_string()))?;

    let source = load_model(&args.source)?;
    let lite = read_lite_model(&args.lite)?;
    let report = verify(&source, &lite, args.samples, args.seed, args.tolerance)?;

    match args.format {
        OutputFormat::Json => println!("{}", to_json(&report)?),
        OutputFormat::Text if !quiet => println!("{}", summarize(args, &report)),
        OutputFormat::Text => {}
    }

    if !report.passed() {
        eprintln!(
            "Error: max difference {:.3e} exceeds tolerance {:.3e}",
            report.max_abs_diff, report.tolerance
        );
    }
    Ok(report.passed())
}

fn summarize(args: &VerifyArgs, report: &VerifyReport) -> String {
    format!(
        "{} {} against {}\n  samples: {}\n  max |diff|: {:.3e}\n  mean |diff|: {:.3e}\n  argmax agreement: {:.1}%",
        if report.passed() { "PASS" } else { "FAIL" },
        args.lite.display(),
        args.source.display(),
        report.samples,
        report.max_abs_diff,
        report.mean_abs_diff,
        report.argmax_agreement * 100.0,
    )
}
