//! Prompt construction.

use crate::context::RepositorySnapshot;
use crate::issues::Issue;
use std::fmt::Write as _;

/// Version of the prompt and answer format below. Bump when either changes.
pub const PROMPT_VERSION: u32 = 1;

pub(crate) const SYSTEM_PROMPT: &str = "\
You are a precise patch generator for a source repository. You are given one \
issue, a listing of the repository tree and the full content of the files most \
likely to be involved.

Answer with exactly one JSON object and nothing else.

If you can fix the issue, answer:
{\"status\": \"fix\", \"summary\": \"<one or two sentences>\", \"edits\": [{\"path\": \"<relative path>\", \"content\": \"<complete new file content>\"}]}

Every edit replaces the whole file. Only edit files whose content is shown, or \
create new files. Keep unrelated content unchanged. Do not touch .git.

If the issue cannot be fixed from the information given, answer:
{\"status\": \"no_fix\", \"reason\": \"<why>\"}";

pub(crate) const PROBE_SYSTEM_PROMPT: &str = "You are a connectivity check.";

pub(crate) const PROBE_PROMPT: &str = "Reply with the words: API test successful";

/// Lowercased words a healthy model echoes back to [`PROBE_PROMPT`].
pub(crate) const PROBE_MARKER: &str = "api test successful";

/// Renders the user prompt for `issue`.
pub(crate) fn build_prompt(issue: &Issue, snapshot: &RepositorySnapshot) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Issue #{}: {}", issue.number, issue.title);
    if !issue.labels.is_empty() {
        let labels: Vec<&str> = issue.labels.iter().map(String::as_str).collect();
        let _ = writeln!(prompt, "Labels: {}", labels.join(", "));
    }
    prompt.push('\n');
    if issue.body.trim().is_empty() {
        prompt.push_str("(no description)\n");
    } else {
        prompt.push_str(issue.body.trim_end());
        prompt.push('\n');
    }

    prompt.push_str("\nRepository tree:\n");
    for path in snapshot.tree() {
        let _ = writeln!(prompt, "  {path}");
    }
    if snapshot.tree_truncated() {
        prompt.push_str("  ...\n");
    }

    if snapshot.files().is_empty() {
        prompt.push_str("\nNo file contents are available.\n");
    }
    for file in snapshot.files() {
        let _ = write!(prompt, "\n=== {} ===\n{}", file.path, file.content);
        if !file.content.ends_with('\n') {
            prompt.push('\n');
        }
        let _ = writeln!(prompt, "=== end {} ===", file.path);
    }
    prompt
}
