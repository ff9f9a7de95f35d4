//! Command line front end estimating qPCR amplification efficiency from a dilution series.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use pcr_efficiency::{
    CalibrationInput, EfficiencyEstimator, EstimatorConfig, OrdinaryLeastSquares, Report,
};

#[derive(Parser)]
#[command(name = "pcr-efficiency")]
#[command(about = "Estimate real-time PCR amplification efficiency from a calibration curve")]
#[command(version)]
struct Cli {
    /// CSV with a header row; each record is a quantity followed by its replicate Ct values
    calibration: PathBuf,

    /// TOML file with estimator settings (verbose, confidence_level)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the confidence level of the efficiency interval, e.g. 0.99
    #[arg(long)]
    confidence: Option<f64>,

    /// Suppress the regression diagnostics
    #[arg(long, short)]
    quiet: bool,

    /// Print the fitted calibration line below the table
    #[arg(long)]
    fit: bool,
}

fn run(cli: &Cli) -> pcr_efficiency::Result<()> {
    let mut config = match &cli.config {
        Some(path) => EstimatorConfig::from_file(path)?,
        None => EstimatorConfig::default(),
    };
    if let Some(level) = cli.confidence {
        config = config.with_confidence_level(level);
    }
    if cli.quiet {
        config = config.with_verbose(false);
    }

    let input = CalibrationInput::from_file(&cli.calibration)?;
    log::info!(
        "{} calibration points with {} replicates from {}",
        input.points(),
        input.replicates(),
        cli.calibration.display()
    );

    let estimate = EfficiencyEstimator::new(OrdinaryLeastSquares, config).estimate(&input)?;
    if !estimate.is_good() {
        log::warn!(
            "quality index {:.4} is at or above the threshold, check the replicates",
            estimate.quality_index
        );
    }

    println!("{}", Report::new(&estimate).with_fit(cli.fit));
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
