use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Lines};
use std::path::{Path, PathBuf};

use super::{Bug, BugDataError};

/// Lazily reads bugs from a JSON-lines dump, one record per line.
pub struct BugSource {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line: usize,
    done: bool,
}

/// Open a JSON-lines bug dump for iteration.
pub fn read_bugs(path: &Path) -> Result<BugSource, BugDataError> {
    let file = File::open(path).map_err(|source| BugDataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BugSource {
        path: path.to_path_buf(),
        lines: BufReader::new(file).lines(),
        line: 0,
        done: false,
    })
}

impl Iterator for BugSource {
    type Item = Result<Bug, BugDataError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let read = self.lines.next()?;
            self.line += 1;
            let text = match read {
                Ok(text) => text,
                // The undecodable line is already consumed, so reading can go on.
                Err(source) if source.kind() == ErrorKind::InvalidData => {
                    return Some(Err(BugDataError::Decode {
                        line: self.line,
                        source,
                    }));
                }
                Err(source) => {
                    self.done = true;
                    return Some(Err(BugDataError::Io {
                        path: self.path.clone(),
                        source,
                    }));
                }
            };
            if text.trim().is_empty() {
                continue;
            }
            let value = match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(value) => value,
                Err(source) => {
                    return Some(Err(BugDataError::Json {
                        line: self.line,
                        source,
                    }));
                }
            };
            return Some(Bug::from_value(&value));
        }
    }
}
