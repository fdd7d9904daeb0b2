//! Parsing and validation of model answers.

use super::FixError;
use crate::context::RepositorySnapshot;
use crate::patch::{is_safe_relative_path, FileEdit};
use serde::Deserialize;
use std::collections::BTreeSet;

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Answer {
    Fix {
        #[serde(default)]
        summary: Option<String>,
        #[serde(default)]
        edits: Vec<RawEdit>,
    },
    NoFix {
        #[serde(default)]
        reason: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct RawEdit {
    path: String,
    content: String,
}

/// A validated answer.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ParsedAnswer {
    Edits {
        summary: Option<String>,
        edits: Vec<FileEdit>,
    },
    NoFix {
        reason: String,
    },
}

/// Parses `text` and checks every edit against `snapshot`.
///
/// Edits that would leave a file unchanged are dropped; if none remain the
/// answer counts as no fix.
pub(crate) fn parse_answer(
    text: &str,
    snapshot: &RepositorySnapshot,
) -> Result<ParsedAnswer, FixError> {
    let answer = first_answer(text)?;

    let (summary, raw_edits) = match answer {
        Answer::NoFix { reason } => {
            return Ok(ParsedAnswer::NoFix {
                reason: non_empty(reason).unwrap_or_else(|| "model found no fix".to_string()),
            })
        }
        Answer::Fix { summary, edits } => (non_empty(summary), edits),
    };
    if raw_edits.is_empty() {
        return Err(FixError::malformed("fix answer has no edits"));
    }

    let mut seen = BTreeSet::new();
    let mut edits = Vec::new();
    for raw in raw_edits {
        let path = raw.path.trim();
        let path = path.strip_prefix("./").unwrap_or(path).to_string();
        if !is_safe_relative_path(&path) {
            return Err(FixError::malformed(format!("unsafe edit path '{}'", raw.path)));
        }
        if !seen.insert(path.clone()) {
            return Err(FixError::malformed(format!("duplicate edit for '{path}'")));
        }

        let old_hash = match snapshot.file(&path) {
            Some(file) if file.content == raw.content => continue,
            Some(file) => Some(file.hash.clone()),
            None if snapshot.contains_path(&path) => {
                return Err(FixError::malformed(format!(
                    "edit to '{path}' whose content was not provided"
                )))
            }
            None => None,
        };
        edits.push(FileEdit {
            path,
            old_hash,
            new_content: raw.content,
        });
    }

    if edits.is_empty() {
        return Ok(ParsedAnswer::NoFix {
            reason: "proposed edits do not change any file".to_string(),
        });
    }
    Ok(ParsedAnswer::Edits { summary, edits })
}

/// Parses the first JSON answer object in `text`, ignoring fences and prose
/// on either side of it.
fn first_answer(text: &str) -> Result<Answer, FixError> {
    let mut first_error = None;
    for (start, _) in text.match_indices('{') {
        let mut objects = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Answer>();
        match objects.next() {
            Some(Ok(answer)) => return Ok(answer),
            Some(Err(e)) => {
                first_error.get_or_insert(e);
            }
            None => {}
        }
    }
    Err(match first_error {
        Some(e) => FixError::malformed(format!("invalid answer JSON: {e}")),
        None => FixError::malformed("response contains no JSON object"),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{content_hash, SnapshotFile};

    fn snapshot() -> RepositorySnapshot {
        RepositorySnapshot::from_parts(
            vec![SnapshotFile {
                path: "README.md".to_string(),
                content: "Helllo World\n".to_string(),
                hash: content_hash(b"Helllo World\n"),
            }],
            vec!["README.md".to_string(), "src/lib.rs".to_string()],
        )
    }

    #[test]
    fn parses_fenced_fix() {
        let text = "Here is the fix:\n```json\n{\"status\":\"fix\",\"summary\":\"Fix typo\",\
                    \"edits\":[{\"path\":\"README.md\",\"content\":\"Hello World\\n\"}]}\n```";

        let answer = parse_answer(text, &snapshot()).unwrap();

        assert_eq!(
            answer,
            ParsedAnswer::Edits {
                summary: Some("Fix typo".to_string()),
                edits: vec![FileEdit {
                    path: "README.md".to_string(),
                    old_hash: Some(content_hash(b"Helllo World\n")),
                    new_content: "Hello World\n".to_string(),
                }],
            }
        );
    }

    #[test]
    fn ignores_braces_in_surrounding_prose() {
        let text = "Use {braces} sparingly.\n\
                    {\"status\":\"no_fix\",\"reason\":\"unclear\"}\n\
                    Let me know if you need more details on `fn main() {}`.";

        assert_eq!(
            parse_answer(text, &snapshot()).unwrap(),
            ParsedAnswer::NoFix {
                reason: "unclear".to_string()
            }
        );
    }

    #[test]
    fn new_files_have_no_old_hash() {
        let text = r#"{"status":"fix","edits":[{"path":"./docs/typo.md","content":"x"}]}"#;

        let ParsedAnswer::Edits { summary, edits } = parse_answer(text, &snapshot()).unwrap() else {
            panic!("expected edits");
        };
        assert_eq!(summary, None);
        assert_eq!(edits[0].path, "docs/typo.md");
        assert_eq!(edits[0].old_hash, None);
    }

    #[test]
    fn parses_no_fix() {
        let text = r#"{"status":"no_fix","reason":"needs a design decision"}"#;
        assert_eq!(
            parse_answer(text, &snapshot()).unwrap(),
            ParsedAnswer::NoFix {
                reason: "needs a design decision".to_string()
            }
        );
    }

    #[test]
    fn unchanged_edits_become_no_fix() {
        let text = r#"{"status":"fix","edits":[{"path":"README.md","content":"Helllo World\n"}]}"#;
        assert!(matches!(
            parse_answer(text, &snapshot()).unwrap(),
            ParsedAnswer::NoFix { .. }
        ));
    }

    #[test]
    fn rejects_malformed_answers() {
        let cases = [
            "I could not find anything.",
            "{not json}",
            r#"{"status":"maybe"}"#,
            r#"{"status":"fix","edits":[]}"#,
            r#"{"status":"fix","edits":[{"path":"../etc/passwd","content":"x"}]}"#,
            r#"{"status":"fix","edits":[{"path":".git/config","content":"x"}]}"#,
            r#"{"status":"fix","edits":[{"path":"a.md","content":"x"},{"path":"a.md","content":"y"}]}"#,
            r#"{"status":"fix","edits":[{"path":"src/lib.rs","content":"x"}]}"#,
        ];
        for text in cases {
            assert!(
                matches!(
                    parse_answer(text, &snapshot()),
                    Err(FixError::MalformedResponse { .. })
                ),
                "{text}"
            );
        }
    }
}
