//! Text cleanup applied to titles and comments before vectorization.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const FILE_REFERENCE_TOKEN: &str = "__FILE_REFERENCE__";
const URL_TOKEN: &str = "__URL__";

/// Canonical word followed by the phrases that collapse into it.
const SYNONYM_GROUPS: &[(&str, &[&str])] = &[
    ("safemode", &["safemode", "safe mode"]),
    ("str", &["str", "steps to reproduce", "repro steps"]),
    ("uaf", &["uaf", "use after free", "use-after-free"]),
    ("asan", &["asan", "address sanitizer", "addresssanitizer"]),
    (
        "permafailure",
        &[
            "permafailure",
            "permafailing",
            "permafail",
            "perma failure",
            "perma failing",
            "perma fail",
            "perma-failure",
            "perma-failing",
            "perma-fail",
        ],
    ),
    ("spec", &["spec", "specification"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupFunction {
    /// Replace source file references with a placeholder token.
    FileRef,
    /// Replace URLs with a placeholder token.
    Url,
    /// Collapse known synonym phrases into one canonical word.
    Synonyms,
}

impl CleanupFunction {
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match self {
            Self::FileRef => file_ref_regex().replace_all(text, FILE_REFERENCE_TOKEN),
            Self::Url => url_regex().replace_all(text, URL_TOKEN),
            Self::Synonyms => {
                let mut out = Cow::Borrowed(text);
                for (canonical, regex) in synonym_rules() {
                    let replaced = match regex.replace_all(&out, *canonical) {
                        Cow::Borrowed(_) => None,
                        Cow::Owned(replaced) => Some(replaced),
                    };
                    if let Some(replaced) = replaced {
                        out = Cow::Owned(replaced);
                    }
                }
                out
            }
        }
    }
}

/// Apply `functions` in order.
pub(crate) fn clean_text(functions: &[CleanupFunction], text: &str) -> String {
    functions
        .iter()
        .fold(text.to_string(), |acc, function| function.apply(&acc).into_owned())
}

fn file_ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b\w+\.(?:py|json|js|jsm|mjs|html|xhtml|css|c|cc|cpp|h|rs|java|idl|webidl|xul)\b")
            .expect("file reference regex must compile")
    })
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("url regex must compile")
    })
}

fn synonym_rules() -> &'static [(&'static str, Regex)] {
    static RULES: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    RULES.get_or_init(|| {
        SYNONYM_GROUPS
            .iter()
            .map(|(canonical, phrases)| {
                let mut phrases: Vec<&str> = phrases.to_vec();
                // Longest first so "perma-failure" is not cut short by "perma-fail".
                phrases.sort_by_key(|phrase| std::cmp::Reverse(phrase.len()));
                let alternation = phrases
                    .iter()
                    .map(|phrase| regex::escape(phrase))
                    .collect::<Vec<_>>()
                    .join("|");
                let regex = Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))
                    .expect("synonym regex must compile");
                (*canonical, regex)
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_file_references() {
        assert_eq!(
            CleanupFunction::FileRef.apply("Crash in nsDocShell.cpp and browser.js"),
            "Crash in __FILE_REFERENCE__ and __FILE_REFERENCE__"
        );
    }

    #[test]
    fn replaces_urls() {
        assert_eq!(
            CleanupFunction::Url.apply("See https://example.com/a?b=c and www.mozilla.org now"),
            "See __URL__ and __URL__ now"
        );
    }

    #[test]
    fn collapses_synonyms_case_insensitively() {
        assert_eq!(
            CleanupFunction::Synonyms.apply("Steps To Reproduce: a Use-After-Free in Safe Mode"),
            "str: a uaf in safemode"
        );
        assert_eq!(
            CleanupFunction::Synonyms.apply("perma-failing test"),
            "permafailure test"
        );
    }

    #[test]
    fn leaves_text_without_matches_borrowed() {
        assert!(matches!(
            CleanupFunction::Synonyms.apply("nothing to see"),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn applies_functions_in_order() {
        let cleaned = clean_text(
            &[
                CleanupFunction::FileRef,
                CleanupFunction::Url,
                CleanupFunction::Synonyms,
            ],
            "asan report for https://example.com/page.html",
        );
        assert_eq!(cleaned, "asan report for __URL__");
    }
}
