//! Trains the dev-doc-needed classifier from a JSON-lines bug dump, prints the
//! held-out metrics and saves the fitted model.

use std::path::{Path, PathBuf};

use bugtriage::app_dirs;
use bugtriage::bugzilla::{Bug, read_bugs};
use bugtriage::config::{self, TriageConfig};
use bugtriage::labeling::InvalidBugPolicy;
use bugtriage::logging::{self, LogOptions};
use bugtriage::models::{DevDocNeededModel, TrainReport};
use tracing::warn;

const DEFAULT_MODEL_FILE: &str = "devdocneeded.json";

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init(&LogOptions {
        level: options.log_level.clone(),
        log_file: options.log_file,
    }) {
        eprintln!("Logging disabled: {err}");
    }

    let mut settings = match &options.config_path {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    apply_overrides(&mut settings, &options);
    settings.validate().map_err(|err| err.to_string())?;

    let bugs = load_bugs(&options.bugs_path, settings.labels.on_invalid_bug)?;
    if bugs.is_empty() {
        return Err(format!("No bugs found in {}", options.bugs_path.display()));
    }

    let mut model = DevDocNeededModel::new(settings);
    let report = model.train(&bugs).map_err(|err| err.to_string())?;
    print_report(&report);

    let model_out = match &options.model_out {
        Some(path) => path.clone(),
        None => app_dirs::models_dir()
            .map_err(|err| err.to_string())?
            .join(DEFAULT_MODEL_FILE),
    };
    model.save_json(&model_out).map_err(|err| err.to_string())?;
    println!("model written to {}", model_out.display());
    Ok(())
}

fn load_bugs(path: &Path, policy: InvalidBugPolicy) -> Result<Vec<Bug>, String> {
    let mut bugs = Vec::new();
    for record in read_bugs(path).map_err(|err| err.to_string())? {
        match (record, policy) {
            (Ok(bug), _) => bugs.push(bug),
            (Err(err), InvalidBugPolicy::SkipAndLog) => warn!("Skipping bug record: {err}"),
            (Err(err), InvalidBugPolicy::FailFast) => return Err(err.to_string()),
        }
    }
    Ok(bugs)
}

fn apply_overrides(settings: &mut TriageConfig, options: &CliOptions) {
    if let Some(rounds) = options.rounds {
        settings.training.rounds = rounds;
    }
    if let Some(learning_rate) = options.learning_rate {
        settings.training.learning_rate = learning_rate;
    }
    if let Some(n_jobs) = options.n_jobs {
        settings.training.n_jobs = Some(n_jobs);
    }
}

fn print_report(report: &TrainReport) {
    println!(
        "labels: {}",
        report
            .label_counts
            .iter()
            .enumerate()
            .map(|(label, count)| format!("{label}={count}"))
            .collect::<Vec<_>>()
            .join(" ")
    );
    println!(
        "rows: train={} sampled={} test={}  features={}",
        report.train_rows, report.sampled_rows, report.test_rows, report.feature_len
    );
    let Some(evaluation) = &report.evaluation else {
        println!("test split is empty; no evaluation");
        return;
    };
    println!("test accuracy: {:.4}", evaluation.accuracy);
    for stats in &evaluation.per_class {
        println!(
            "label {}  precision={:.3}  recall={:.3}  f1={:.3}  support={}",
            stats.label, stats.precision, stats.recall, stats.f1, stats.support
        );
    }
    let cm = &evaluation.confusion;
    println!("confusion matrix (rows=true, cols=pred):");
    for truth in 0..cm.n_classes {
        let row: String = (0..cm.n_classes)
            .map(|pred| format!("{:6}", cm.get(truth, pred)))
            .collect();
        println!("{row}");
    }
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    bugs_path: PathBuf,
    model_out: Option<PathBuf>,
    config_path: Option<PathBuf>,
    rounds: Option<usize>,
    learning_rate: Option<f32>,
    n_jobs: Option<usize>,
    log_level: Option<String>,
    log_file: bool,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut bugs_path: Option<PathBuf> = None;
    let mut options = CliOptions::default();

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--bugs" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--bugs requires a value".to_string())?;
                bugs_path = Some(PathBuf::from(value));
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                options.model_out = Some(PathBuf::from(value));
            }
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                options.config_path = Some(PathBuf::from(value));
            }
            "--rounds" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--rounds requires a value".to_string())?;
                options.rounds = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --rounds value: {value}"))?,
                );
            }
            "--learning-rate" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--learning-rate requires a value".to_string())?;
                options.learning_rate = Some(
                    value
                        .parse::<f32>()
                        .map_err(|_| format!("Invalid --learning-rate value: {value}"))?,
                );
            }
            "--n-jobs" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--n-jobs requires a value".to_string())?;
                options.n_jobs = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --n-jobs value: {value}"))?,
                );
            }
            "--log-level" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--log-level requires a value".to_string())?;
                options.log_level = Some(value.clone());
            }
            "--log-file" => options.log_file = true,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    options.bugs_path = bugs_path.ok_or_else(help_text)?;
    Ok(options)
}

fn help_text() -> String {
    [
        "devdoc-train",
        "",
        "Trains the dev-doc-needed classifier from a Bugzilla JSON-lines dump.",
        "",
        "Usage:",
        "  devdoc-train --bugs <bugs.jsonl> [--out model.json] [options]",
        "",
        "Options:",
        "  --bugs <file>          JSON-lines bug dump, one bug per line (required).",
        "  --out <file>           Output model path (default: <app root>/models/devdocneeded.json).",
        "  --config <file>        Settings file (default: <app root>/config.toml).",
        "  --rounds <n>           Boosting rounds (overrides [training] rounds).",
        "  --learning-rate <f32>  Learning rate (overrides [training] learning_rate).",
        "  --n-jobs <n>           Split-search threads (default: physical cores).",
        "  --log-level <filter>   Tracing filter when RUST_LOG is unset (default: info).",
        "  --log-file             Also write logs under <app root>/logs.",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn cli_overrides_take_precedence_over_settings() {
        let options = parse_args(args(&[
            "--bugs",
            "bugs.jsonl",
            "--rounds",
            "7",
            "--learning-rate",
            "0.5",
        ]))
        .unwrap();
        let mut settings = TriageConfig::default();
        apply_overrides(&mut settings, &options);
        assert_eq!(settings.training.rounds, 7);
        assert_eq!(settings.training.learning_rate, 0.5);
        assert_eq!(settings.training.n_jobs, None);
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = parse_args(args(&["--bugs", "b", "--rounds", "many"])).unwrap_err();
        assert_eq!(err, "Invalid --rounds value: many");
    }
}
