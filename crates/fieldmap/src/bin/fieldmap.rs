use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use fieldmap::{FieldMapConfig, FieldMapper, FieldSurvey, PipelineError};
use log::{error, info};

#[derive(Parser)]
#[command(name = "fieldmap")]
#[command(about = "Build an ordered field map from geo-referenced code and plant detections")]
#[command(version)]
struct Cli {
    /// Survey JSON: images and detections.
    #[arg(long)]
    survey: PathBuf,

    /// Pipeline configuration JSON; defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the report JSON.
    #[arg(long, default_value = "field_map.json")]
    output: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit tracing output as JSON lines.
    #[cfg(feature = "tracing")]
    #[arg(long)]
    json_logs: bool,
}

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) {
    let _ = tracing_log::LogTracer::init();
    fieldmap::core::init_tracing(
        cli.json_logs,
        fieldmap::core::level_for_verbosity(cli.verbose),
    );
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) {
    let _ = fieldmap::core::init_with_level(fieldmap::core::level_for_verbosity(cli.verbose));
}

fn run(cli: &Cli) -> Result<(), PipelineError> {
    let config = match &cli.config {
        Some(path) => FieldMapConfig::load_json(path)?,
        None => FieldMapConfig::default(),
    };
    let survey = FieldSurvey::load_json(&cli.survey)?;
    info!(
        "loaded {} images and {} detections",
        survey.images.len(),
        survey.detections.len()
    );

    let map = FieldMapper::new(config).run(survey)?;
    let report = map.report();
    for group in report.mismatched_groups() {
        info!(
            "group {} has {} plants, listed with {:?}",
            group.id, group.num_plants, group.expected_num_plants
        );
    }
    report.write_json(&cli.output)?;
    info!("report written to {}", cli.output.display());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
