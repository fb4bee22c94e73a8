//! Predicts maintenance tasks for one vehicle and prints them as JSON.
//!
//! Usage: `maintpred-predict <mileage> <year> <f1> <f2> <f3>`. Stdout carries
//! only the JSON result, e.g. `[[1,0,1,0]]` for Oil Change, Belt Change,
//! Brake Change and Tire Replacement.

use std::path::PathBuf;

use maintpred::logging::{self, LogOptions};
use maintpred::{config, predict};

fn main() {
    // Callers parse stdout and treat stderr output as failure, so a logging
    // setup problem is not reported here. The predictor writes no log file.
    let _ = logging::init(LogOptions {
        file_prefix: "maintpred-predict",
        default_filter: "warn",
        log_file: false,
    });
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let features =
        predict::parse_features(options.values.as_slice()).map_err(|err| err.to_string())?;
    let model_path = match options.model {
        Some(path) => path,
        None => {
            config::load(options.config.as_deref())
                .map_err(|err| err.to_string())?
                .model_path
        }
    };

    let predictions =
        predict::predict_from_path(&model_path, &features).map_err(|err| err.to_string())?;
    let output = predict::render_output(&predictions).map_err(|err| err.to_string())?;
    tracing::debug!(model = %model_path.display(), %output, "Prediction done");
    println!("{output}");
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    model: Option<PathBuf>,
    values: Vec<String>,
}

/// Options are matched exactly; every other token, including negative
/// numbers, is a feature value.
fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                options.model = Some(PathBuf::from(value));
            }
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                options.config = Some(PathBuf::from(value));
            }
            value => options.values.push(value.to_string()),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "maintpred-predict",
        "",
        "Prints the predicted maintenance tasks for one vehicle as a JSON array of 0/1 flags.",
        "",
        "Usage:",
        "  maintpred-predict [--model <file>] [--config <file>] <mileage> <year> <f1> <f2> <f3>",
        "",
        "Output order: Oil Change, Belt Change, Brake Change, Tire Replacement.",
        "",
        "Options:",
        "  --model <file>   Model artifact (default: model_path from config, hhmodel.json).",
        "  --config <file>  Settings file (default: maintpred.toml in the app directory).",
    ]
    .join("\n")
}
