//! Derives dev-doc-needed labels from a JSON-lines bug dump and prints the
//! class counts.

use std::path::PathBuf;

use bugtriage::bugzilla::read_bugs;
use bugtriage::config;
use bugtriage::logging::{self, LogOptions};
use bugtriage::models::DevDocNeededModel;

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
        log_file: false,
    }) {
        eprintln!("Logging disabled: {err}");
    }

    let settings = match &options.config_path {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    let model = DevDocNeededModel::new(settings);

    let source = read_bugs(&options.bugs_path).map_err(|err| err.to_string())?;
    let labels = model.get_labels(source).map_err(|err| err.to_string())?;

    println!("labeled bugs: {}", labels.classes.len());
    for (label, count) in labels.domain.iter().zip(labels.counts()) {
        println!("label {label}: {count}");
    }
    if options.list {
        for (bug_id, label) in &labels.classes {
            println!("{bug_id}\t{label}");
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    bugs_path: PathBuf,
    config_path: Option<PathBuf>,
    log_level: Option<String>,
    list: bool,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut bugs_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut log_level: Option<String> = None;
    let mut list = false;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--bugs" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--bugs requires a value".to_string())?;
                bugs_path = Some(PathBuf::from(value));
            }
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                config_path = Some(PathBuf::from(value));
            }
            "--log-level" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--log-level requires a value".to_string())?;
                log_level = Some(value.clone());
            }
            "--list" => list = true,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let bugs_path = bugs_path.ok_or_else(help_text)?;
    Ok(CliOptions {
        bugs_path,
        config_path,
        log_level,
        list,
    })
}

fn help_text() -> String {
    [
        "devdoc-labels",
        "",
        "Derives dev-doc-needed labels from a Bugzilla JSON-lines dump.",
        "",
        "Usage:",
        "  devdoc-labels --bugs <bugs.jsonl> [options]",
        "",
        "Options:",
        "  --bugs <file>        JSON-lines bug dump, one bug per line (required).",
        "  --config <file>      Settings file (default: <app root>/config.toml).",
        "  --log-level <filter> Tracing filter when RUST_LOG is unset (default: info).",
        "  --list               Print every bug id with its label.",
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
    fn parses_required_and_optional_flags() {
        let options = parse_args(args(&["--bugs", "bugs.jsonl", "--list", "--config", "c.toml"])).unwrap();
        assert_eq!(options.bugs_path, PathBuf::from("bugs.jsonl"));
        assert_eq!(options.config_path, Some(PathBuf::from("c.toml")));
        assert!(options.list);
    }

    #[test]
    fn missing_bugs_prints_help() {
        let err = parse_args(args(&["--list"])).unwrap_err();
        assert!(err.starts_with("devdoc-labels"));
        assert!(parse_args(args(&["--bogus"])).unwrap_err().contains("Unknown argument"));
    }
}
