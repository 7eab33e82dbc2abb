//! Top-level application orchestration.
//!
//! `src/main.rs` is tiny; this module is the real main that:
//! - loads `.env` and installs the log subscriber
//! - parses CLI arguments
//! - runs the requested workflow (`pipeline`)
//! - prints the terminal summary

use clap::Parser;

use crate::cli::{AdjustArgs, Cli, Command, ResponseArgs, SweepArgs, SynthArgs, TransformArgs};
use crate::data::NoiseConfig;
use crate::domain::AdjustConfig;
use crate::error::AppError;
use crate::spectral::FftSettings;

pub mod pipeline;

/// Entry point for the `calstrain` binary.
pub fn run() -> Result<(), AppError> {
    // Optional: `.env` may set CALSTRAIN_LOG / CALSTRAIN_FFT_CACHE.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    crate::logging::init(cli.log_level.as_deref())?;

    match cli.command {
        Command::Adjust(args) => handle_adjust(&args),
        Command::Response(args) => handle_response(&args),
        Command::Sweep(args) => handle_sweep(&args),
        Command::Synth(args) => handle_synth(&args),
    }
}

fn handle_adjust(args: &AdjustArgs) -> Result<(), AppError> {
    let config = adjust_config_from_args(args);
    let run = pipeline::run_adjust(&config)?;
    println!("{}", crate::report::format_run_summary(&run.report));
    Ok(())
}

fn handle_response(args: &ResponseArgs) -> Result<(), AppError> {
    let params = args.params.to_params();
    let out = pipeline::run_response(&args.model, &params, args.export.as_deref())?;
    println!(
        "{}",
        crate::report::format_response_summary(&out.model, &params, &out.rows, &out.stats)
    );
    Ok(())
}

fn handle_sweep(args: &SweepArgs) -> Result<(), AppError> {
    let options = pipeline::adjust_options(args.transform.grid_policy(), cache_plans(&args.transform));
    let sweep = pipeline::run_parameter_sweep(&args.model, &args.strain, &args.axes(), options)?;
    println!("{}", crate::report::format_sweep_table(&sweep.outcomes, &sweep.input));
    Ok(())
}

fn handle_synth(args: &SynthArgs) -> Result<(), AppError> {
    let config = NoiseConfig {
        sample_rate: args.sample_rate,
        duration: args.duration,
        start_time: args.start,
        sigma: args.sigma,
        seed: args.seed,
    };
    let series = pipeline::run_synth(&config, &args.out)?;
    println!(
        "Wrote {} samples ({:.3} s at {} Hz) to {}",
        series.len(),
        series.duration(),
        series.sample_rate(),
        args.out.display()
    );
    Ok(())
}

pub fn adjust_config_from_args(args: &AdjustArgs) -> AdjustConfig {
    AdjustConfig {
        model_path: args.model.clone(),
        strain_path: args.strain.clone(),
        out_path: args.out.clone(),
        params: args.params.to_params(),
        grid_policy: args.transform.grid_policy(),
        cache_plans: cache_plans(&args.transform),
        report_path: args.report.clone(),
    }
}

/// `--no-fft-cache` wins over `CALSTRAIN_FFT_CACHE`.
fn cache_plans(args: &TransformArgs) -> bool {
    !args.no_fft_cache && FftSettings::from_env().cache_plans
}
