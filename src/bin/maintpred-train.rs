//! Trains the maintenance task model on synthetic data and writes the artifact.

use std::path::PathBuf;

use maintpred::logging::{self, LogOptions};
use maintpred::{config, train};

fn main() {
    if let Err(err) = logging::init(LogOptions {
        file_prefix: "maintpred-train",
        default_filter: "info",
        log_file: true,
    }) {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let mut config = config::load(options.config.as_deref()).map_err(|err| err.to_string())?;
    if let Some(model_out) = options.model_out {
        config.model_path = model_out;
    }

    let summary = train::train_and_save(&config).map_err(|err| err.to_string())?;
    tracing::info!(
        train_rows = summary.train_rows,
        holdout_rows = summary.holdout_rows,
        "Training finished"
    );
    println!(
        "Multi-label model trained and saved to '{}'",
        summary.model_path.display()
    );
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    model_out: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                options.model_out = Some(PathBuf::from(value));
            }
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                options.config = Some(PathBuf::from(value));
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "maintpred-train",
        "",
        "Synthesizes a vehicle dataset, fits one forest per maintenance task and saves the model.",
        "",
        "Usage:",
        "  maintpred-train [--model <file>] [--config <file>]",
        "",
        "Options:",
        "  --model <file>   Output artifact path (default: model_path from config, hhmodel.json).",
        "  --config <file>  Settings file (default: maintpred.toml in the app directory).",
    ]
    .join("\n")
}
