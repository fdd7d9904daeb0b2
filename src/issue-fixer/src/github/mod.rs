//! GitHub implementation of the issue source and forge seams.

use crate::config::Secret;
use crate::issues::{Issue, IssuePage, IssueSource, IssueState, RepositoryId};
use crate::proposals::{ExistingProposal, Forge, OpenedReviewRequest, ReviewRequest};
use crate::rate_limit::{ensure_core_rate_limit, RateLimitError};
use crate::remote::RemoteError;
use futures::future::BoxFuture;
use futures::FutureExt;
use octocrab::params::repos::Reference;
use octocrab::params::State;
use octocrab::Octocrab;
use tracing::debug;

/// Issues requested per page.
const ISSUES_PER_PAGE: u8 = 100;

/// GitHub REST client authenticated with the source token.
#[derive(Clone)]
pub struct GitHubClient {
    octocrab: Octocrab,
}

impl GitHubClient {
    /// Builds a client authenticated with `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(token: &Secret) -> Result<Self, octocrab::Error> {
        let octocrab = Octocrab::builder()
            .personal_token(token.expose().to_string())
            .build()?;
        Ok(Self { octocrab })
    }

    async fn rate_limited(&self) -> Result<(), RemoteError> {
        ensure_core_rate_limit(&self.octocrab)
            .await
            .map_err(|e| match e {
                RateLimitError::GitHubError(e) => classify(&e),
                e @ RateLimitError::RateLimitExceeded { .. } => {
                    RemoteError::Transient(e.to_string())
                }
            })
    }

    async fn list_issues(
        &self,
        repository: &RepositoryId,
        labels: &[String],
        page: u32,
    ) -> Result<IssuePage, RemoteError> {
        self.rate_limited().await?;
        let issues = self.octocrab.issues(&repository.owner, &repository.name);
        let mut request = issues
            .list()
            .state(State::Open)
            .per_page(ISSUES_PER_PAGE)
            .page(page);
        if !labels.is_empty() {
            request = request.labels(labels);
        }
        let listed = request.send().await.map_err(|e| classify(&e))?;

        let next_page = listed.next.as_ref().map(|_| page + 1);
        let issues = listed
            .items
            .into_iter()
            .filter(|issue| issue.pull_request.is_none())
            .map(|issue| Issue {
                number: issue.number,
                title: issue.title,
                body: issue.body.unwrap_or_default(),
                labels: issue.labels.into_iter().map(|l| l.name).collect(),
                state: match issue.state {
                    octocrab::models::IssueState::Open => IssueState::Open,
                    _ => IssueState::Closed,
                },
                url: issue.html_url.to_string(),
            })
            .collect();
        Ok(IssuePage { issues, next_page })
    }

    async fn lookup_proposal(
        &self,
        repository: &RepositoryId,
        branch: &str,
    ) -> Result<Option<ExistingProposal>, RemoteError> {
        self.rate_limited().await?;
        let open = self
            .octocrab
            .pulls(&repository.owner, &repository.name)
            .list()
            .state(State::Open)
            .head(format!("{}:{branch}", repository.owner))
            .per_page(1)
            .send()
            .await
            .map_err(|e| classify(&e))?;
        if let Some(pr) = open.items.into_iter().next() {
            let url = pr
                .html_url
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| pull_url(repository, pr.number));
            return Ok(Some(ExistingProposal {
                branch: branch.to_string(),
                url: Some(url),
            }));
        }

        self.rate_limited().await?;
        match self
            .octocrab
            .repos(&repository.owner, &repository.name)
            .get_ref(&Reference::Branch(branch.to_string()))
            .await
        {
            Ok(_) => Ok(Some(ExistingProposal {
                branch: branch.to_string(),
                url: None,
            })),
            Err(e) if status_code(&e) == Some(404) => Ok(None),
            Err(e) => Err(classify(&e)),
        }
    }

    async fn create_pull(&self, request: &ReviewRequest) -> Result<OpenedReviewRequest, RemoteError> {
        self.rate_limited().await?;
        let repository = &request.repository;
        let pr = self
            .octocrab
            .pulls(&repository.owner, &repository.name)
            .create(&request.title, &request.head, &request.base)
            .body(&request.body)
            .send()
            .await
            .map_err(|e| classify(&e))?;
        let url = pr
            .html_url
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| pull_url(repository, pr.number));
        Ok(OpenedReviewRequest {
            number: pr.number,
            url,
        })
    }
}

impl IssueSource for GitHubClient {
    fn fetch_open_issues<'a>(
        &'a self,
        repository: &'a RepositoryId,
        labels: &'a [String],
        page: u32,
    ) -> BoxFuture<'a, Result<IssuePage, RemoteError>> {
        self.list_issues(repository, labels, page).boxed()
    }
}

impl Forge for GitHubClient {
    fn default_branch<'a>(
        &'a self,
        repository: &'a RepositoryId,
    ) -> BoxFuture<'a, Result<String, RemoteError>> {
        async move {
            self.rate_limited().await?;
            let repo = self
                .octocrab
                .repos(&repository.owner, &repository.name)
                .get()
                .await
                .map_err(|e| classify(&e))?;
            Ok(repo.default_branch.unwrap_or_else(|| "main".to_string()))
        }
        .boxed()
    }

    fn find_proposal<'a>(
        &'a self,
        repository: &'a RepositoryId,
        branch: &'a str,
    ) -> BoxFuture<'a, Result<Option<ExistingProposal>, RemoteError>> {
        self.lookup_proposal(repository, branch).boxed()
    }

    fn open_review_request<'a>(
        &'a self,
        request: &'a ReviewRequest,
    ) -> BoxFuture<'a, Result<OpenedReviewRequest, RemoteError>> {
        self.create_pull(request).boxed()
    }

    fn delete_branch<'a>(
        &'a self,
        repository: &'a RepositoryId,
        branch: &'a str,
    ) -> BoxFuture<'a, Result<(), RemoteError>> {
        async move {
            self.rate_limited().await?;
            match self
                .octocrab
                .repos(&repository.owner, &repository.name)
                .delete_ref(&Reference::Branch(branch.to_string()))
                .await
            {
                Ok(()) => {
                    debug!(repo = %repository, branch, "Deleted branch");
                    Ok(())
                }
                Err(e) if status_code(&e) == Some(404) || status_code(&e) == Some(422) => Ok(()),
                Err(e) => Err(classify(&e)),
            }
        }
        .boxed()
    }

    fn comment_on_issue<'a>(
        &'a self,
        repository: &'a RepositoryId,
        issue_number: u64,
        body: &'a str,
    ) -> BoxFuture<'a, Result<(), RemoteError>> {
        async move {
            self.rate_limited().await?;
            self.octocrab
                .issues(&repository.owner, &repository.name)
                .create_comment(issue_number, body)
                .await
                .map_err(|e| classify(&e))?;
            debug!(repo = %repository, issue = issue_number, "Commented on issue");
            Ok(())
        }
        .boxed()
    }

    fn add_label<'a>(
        &'a self,
        repository: &'a RepositoryId,
        issue_number: u64,
        label: &'a str,
    ) -> BoxFuture<'a, Result<(), RemoteError>> {
        async move {
            self.rate_limited().await?;
            self.octocrab
                .issues(&repository.owner, &repository.name)
                .add_labels(issue_number, &[label.to_string()])
                .await
                .map_err(|e| classify(&e))?;
            debug!(repo = %repository, issue = issue_number, label, "Labelled issue");
            Ok(())
        }
        .boxed()
    }
}

fn pull_url(repository: &RepositoryId, number: u64) -> String {
    format!("https://github.com/{}/pull/{number}", repository.full_name())
}

fn status_code(error: &octocrab::Error) -> Option<u16> {
    match error {
        octocrab::Error::GitHub { source, .. } => Some(source.status_code.as_u16()),
        _ => None,
    }
}

/// Maps an API error onto retryable and permanent failures.
fn classify(error: &octocrab::Error) -> RemoteError {
    let message = error.to_string();
    match error {
        octocrab::Error::GitHub { source, .. } => {
            let lowered = source.message.to_lowercase();
            if is_transient_status(source.status_code.as_u16(), &lowered) {
                RemoteError::Transient(message)
            } else {
                RemoteError::Rejected(message)
            }
        }
        // Transport-level failures.
        _ => RemoteError::Transient(message),
    }
}

fn is_transient_status(status: u16, message: &str) -> bool {
    status >= 500
        || status == 429
        || (status == 403 && (message.contains("rate limit") || message.contains("abuse")))
}
