//! Template renderer.

use super::TemplateError;
use crate::config::TemplateSettings;
use crate::issues::Issue;
use crate::patch::PatchCandidate;
use crate::proposals::{Proposal, ProposalDraft};
use bstr::ByteSlice;
use handlebars::{no_escape, Context, Handlebars, Helper, HelperResult, Output, RenderContext};
use serde_json::{json, Value};

/// Creates a configured Handlebars registry with custom helpers.
///
/// The registry is configured with:
/// - No HTML escaping (for markdown output)
/// - Strict mode (catches missing variables)
/// - `eq` helper for equality comparisons
#[must_use]
pub fn create_handlebars_registry() -> Handlebars<'static> {
    let mut hbs = Handlebars::new();

    // Disable HTML escaping for markdown output
    hbs.register_escape_fn(no_escape);

    // Enable strict mode to catch missing variables
    hbs.set_strict_mode(true);

    hbs.register_helper("eq", Box::new(eq_helper));

    hbs
}

/// Helper function for equality comparison in templates.
///
/// Usage: `{{#if (eq variable "value")}}...{{/if}}`
fn eq_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let param1 = h.param(0).map(|v| v.value());
    let param2 = h.param(1).map(|v| v.value());

    let result = match (param1, param2) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };

    out.write(if result { "true" } else { "" })?;
    Ok(())
}

/// Renders branch names, commit messages, review requests and issue comments
/// from the configured formats.
pub struct TemplateRenderer {
    handlebars: Handlebars<'static>,
    templates: TemplateSettings,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new(TemplateSettings::default())
    }
}

impl TemplateRenderer {
    /// Creates a renderer for `templates`.
    #[must_use]
    pub fn new(templates: TemplateSettings) -> Self {
        Self {
            handlebars: create_handlebars_registry(),
            templates,
        }
    }

    /// Renders the branch name for an issue.
    ///
    /// The name depends on the issue number only, so reruns claim the same branch.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::InvalidBranchName`] if the result is not a valid
    /// git branch name.
    pub fn branch_name(&self, issue_number: u64) -> Result<String, TemplateError> {
        let name = self.render(
            &self.templates.branch_name_format,
            &json!({ "number": issue_number }),
        )?;
        let name = name.trim().to_string();
        let full = format!("refs/heads/{name}");
        gix_validate::reference::name(full.as_bytes().as_bstr()).map_err(|e| {
            TemplateError::InvalidBranchName {
                name: name.clone(),
                message: e.to_string(),
            }
        })?;
        Ok(name)
    }

    /// Renders the commit message for a candidate.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn commit_message(
        &self,
        issue: &Issue,
        candidate: &PatchCandidate,
    ) -> Result<String, TemplateError> {
        let title = self.render(
            &self.templates.commit_title_format,
            &json!({ "number": issue.number, "title": issue.title }),
        )?;
        let mut message = single_line(&title);
        if let Some(summary) = &candidate.summary {
            message.push_str("\n\n");
            message.push_str(summary.trim());
        }
        message.push_str(&format!(
            "\n\nRefs #{}\nGenerated-by: {} (prompt {})",
            issue.number, candidate.metadata.model, candidate.metadata.prompt_version
        ));
        Ok(message)
    }

    /// Renders the review request title.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn pr_title(&self, draft: &ProposalDraft) -> Result<String, TemplateError> {
        let title = self.render(&self.templates.pr_title_format, &draft_data(draft))?;
        Ok(single_line(&title))
    }

    /// Renders the review request body.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn pr_body(&self, draft: &ProposalDraft) -> Result<String, TemplateError> {
        self.render(&self.templates.pr_body, &draft_data(draft))
    }

    /// Renders the comment left on the issue once a review request is open.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn issue_comment(&self, proposal: &Proposal) -> Result<String, TemplateError> {
        self.render(
            &self.templates.issue_comment,
            &json!({
                "number": proposal.issue_number,
                "branch": proposal.branch,
                "pr_number": proposal.number,
                "pr_url": proposal.url,
            }),
        )
    }

    fn render(&self, template: &str, data: &Value) -> Result<String, TemplateError> {
        Ok(self.handlebars.render_template(template, data)?)
    }
}

fn draft_data(draft: &ProposalDraft) -> Value {
    json!({
        "number": draft.issue.number,
        "title": draft.issue.title,
        "issue_url": draft.issue.url,
        "branch": draft.branch,
        "base_branch": draft.base_branch,
        "commit": draft.commit_id,
        "summary": draft.summary.as_deref().unwrap_or(""),
        "files": draft.paths,
        "model": draft.metadata.model,
        "prompt_version": draft.metadata.prompt_version,
    })
}

/// Collapses line breaks so titles stay on one line.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::{IssueState, RepositoryId};
    use crate::patch::{FileEdit, GenerationMetadata};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    fn issue() -> Issue {
        Issue {
            number: 42,
            title: "Fix typo in README".to_string(),
            body: "typo in README line 10".to_string(),
            labels: BTreeSet::new(),
            state: IssueState::Open,
            url: "https://github.com/o/r/issues/42".to_string(),
        }
    }

    fn metadata() -> GenerationMetadata {
        GenerationMetadata {
            model: "openai:grok-3-latest".to_string(),
            prompt_version: 1,
            generated_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    fn draft(summary: Option<&str>) -> ProposalDraft {
        ProposalDraft {
            issue: issue(),
            repository: RepositoryId::new("o", "r"),
            branch: "issuefix/42".to_string(),
            base_branch: "main".to_string(),
            base_revision: "abc".to_string(),
            commit_id: "def".to_string(),
            paths: vec!["README.md".to_string()],
            summary: summary.map(str::to_string),
            metadata: metadata(),
        }
    }

    #[test]
    fn renders_default_branch_name() {
        let renderer = TemplateRenderer::default();
        assert_eq!(renderer.branch_name(42).unwrap(), "issuefix/42");
    }

    #[test]
    fn rejects_invalid_branch_names() {
        let renderer = TemplateRenderer::new(TemplateSettings {
            branch_name_format: "fix {{number}}..x".to_string(),
            ..TemplateSettings::default()
        });
        assert!(matches!(
            renderer.branch_name(42),
            Err(TemplateError::InvalidBranchName { .. })
        ));
    }

    #[test]
    fn commit_message_references_issue() {
        let renderer = TemplateRenderer::default();
        let candidate = PatchCandidate {
            issue_number: 42,
            edits: vec![FileEdit {
                path: "README.md".to_string(),
                old_hash: None,
                new_content: String::new(),
            }],
            summary: Some("Correct spelling.".to_string()),
            metadata: metadata(),
        };

        let message = renderer.commit_message(&issue(), &candidate).unwrap();

        assert_eq!(
            message,
            "Fix: Fix typo in README (Issue #42)\n\nCorrect spelling.\n\n\
             Refs #42\nGenerated-by: openai:grok-3-latest (prompt 1)"
        );
    }

    #[test]
    fn pr_body_lists_files_and_closes_issue() {
        let renderer = TemplateRenderer::default();

        let body = renderer.pr_body(&draft(Some("Correct spelling."))).unwrap();

        assert!(body.starts_with("Automated fix for issue #42.\n\nCorrect spelling.\n\n"));
        assert!(body.contains("- `README.md`\n"));
        assert!(body.contains("Generated by `openai:grok-3-latest` (prompt 1)."));
        assert!(body.ends_with("Closes #42\n"));
        assert_eq!(
            renderer.pr_title(&draft(None)).unwrap(),
            "Fix: Fix typo in README"
        );
    }

    #[test]
    fn pr_body_without_summary() {
        let renderer = TemplateRenderer::default();
        let body = renderer.pr_body(&draft(None)).unwrap();
        assert!(body.starts_with("Automated fix for issue #42.\n\nChanged files:\n"));
    }

    #[test]
    fn eq_helper_and_no_escaping() {
        let renderer = TemplateRenderer::new(TemplateSettings {
            pr_title_format: r#"{{#if (eq base_branch "main")}}<main>{{else}}other{{/if}} {{title}}"#
                .to_string(),
            ..TemplateSettings::default()
        });
        assert_eq!(
            renderer.pr_title(&draft(None)).unwrap(),
            "<main> Fix typo in README"
        );
    }

    #[test]
    fn strict_mode_rejects_unknown_variables() {
        let renderer = TemplateRenderer::new(TemplateSettings {
            pr_body: "{{no_such_field}}".to_string(),
            ..TemplateSettings::default()
        });
        assert!(matches!(
            renderer.pr_body(&draft(None)),
            Err(TemplateError::RenderError(_))
        ));
    }
}
