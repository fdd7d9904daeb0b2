//! Open issue listing.
//!
//! This module exposes the hosting-repository seam for reading issues and a
//! lazy, paginated, retrying stream over it.

mod error;
mod issue;
mod repository;

pub use error::IssueError;
pub use issue::{Issue, IssuePage, IssueState};
pub use repository::RepositoryId;

use crate::remote::{with_timeout, RemoteError};
use crate::retry::{RetryPolicy, Sleeper};
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::time::Duration;
use tracing::debug;

/// First page number used by the hosting API.
const FIRST_PAGE: u32 = 1;

/// Hard cap on pages read in one listing.
const MAX_PAGES: u32 = 100;

/// Issues from one page, ready to be flattened into the listing.
type IssueChunk = stream::Iter<std::vec::IntoIter<Result<Issue, IssueError>>>;

/// Reads issues from a hosting repository.
pub trait IssueSource: Send + Sync {
    /// Fetches one page of open issues carrying all of `labels`.
    ///
    /// Pull requests must not be returned.
    fn fetch_open_issues<'a>(
        &'a self,
        repository: &'a RepositoryId,
        labels: &'a [String],
        page: u32,
    ) -> BoxFuture<'a, Result<IssuePage, RemoteError>>;
}

/// Lists open issues lazily, one page at a time.
#[derive(Clone, Copy)]
pub struct IssueLister<'a> {
    source: &'a dyn IssueSource,
    repository: &'a RepositoryId,
    labels: &'a [String],
    policy: &'a RetryPolicy,
    sleeper: &'a dyn Sleeper,
    request_timeout: Duration,
}

impl<'a> IssueLister<'a> {
    /// Creates a lister for `repository`.
    pub fn new(
        source: &'a dyn IssueSource,
        repository: &'a RepositoryId,
        labels: &'a [String],
        policy: &'a RetryPolicy,
        sleeper: &'a dyn Sleeper,
        request_timeout: Duration,
    ) -> Self {
        Self {
            source,
            repository,
            labels,
            policy,
            sleeper,
            request_timeout,
        }
    }

    /// Returns a stream of open issues, starting from the first page.
    ///
    /// Each call starts a fresh listing. The stream ends after the last page,
    /// or yields [`IssueError::SourceUnavailable`] once retries are spent.
    pub fn stream(self) -> BoxStream<'a, Result<Issue, IssueError>> {
        stream::try_unfold(Some(FIRST_PAGE), move |cursor| self.next_chunk(cursor))
            .try_flatten()
            .boxed()
    }

    async fn next_chunk(
        self,
        cursor: Option<u32>,
    ) -> Result<Option<(IssueChunk, Option<u32>)>, IssueError> {
        let Some(page) = cursor else {
            return Ok(None);
        };
        let fetched = self.fetch_page(page).await?;
        // A successor that does not advance would never terminate.
        let next = fetched
            .next_page
            .filter(|next| *next > page && *next <= MAX_PAGES);
        debug!(
            repo = %self.repository,
            page,
            count = fetched.issues.len(),
            has_next = next.is_some(),
            "Fetched issue page"
        );
        let issues: Vec<Result<Issue, IssueError>> = fetched
            .issues
            .into_iter()
            .filter(Issue::is_open)
            .map(Ok)
            .collect();
        Ok(Some((stream::iter(issues), next)))
    }

    async fn fetch_page(&self, page: u32) -> Result<IssuePage, IssueError> {
        self.policy
            .run(
                self.sleeper,
                "list_open_issues",
                RemoteError::is_retryable,
                |_| {
                    with_timeout(
                        self.request_timeout,
                        self.source
                            .fetch_open_issues(self.repository, self.labels, page),
                    )
                },
            )
            .await
            .map_err(|exhausted| IssueError::SourceUnavailable {
                attempts: exhausted.attempts,
                message: exhausted.error.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::tests::RecordingSleeper;
    use futures::FutureExt;
    use std::collections::{BTreeSet, VecDeque};
    use std::sync::Mutex;

    fn issue(number: u64, state: IssueState) -> Issue {
        Issue {
            number,
            title: format!("Issue {number}"),
            body: String::new(),
            labels: BTreeSet::new(),
            state,
            url: format!("https://github.com/o/r/issues/{number}"),
        }
    }

    /// Serves scripted responses and records requested pages.
    #[derive(Default)]
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<IssuePage, RemoteError>>>,
        pages: Mutex<Vec<u32>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<IssuePage, RemoteError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                pages: Mutex::new(Vec::new()),
            }
        }
    }

    impl IssueSource for ScriptedSource {
        fn fetch_open_issues<'a>(
            &'a self,
            _repository: &'a RepositoryId,
            _labels: &'a [String],
            page: u32,
        ) -> BoxFuture<'a, Result<IssuePage, RemoteError>> {
            self.pages.lock().unwrap().push(page);
            let response = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(IssuePage::default()));
            futures::future::ready(response).boxed()
        }
    }

    fn page(issues: Vec<Issue>, next_page: Option<u32>) -> Result<IssuePage, RemoteError> {
        Ok(IssuePage { issues, next_page })
    }

    async fn collect(source: &ScriptedSource, policy: &RetryPolicy) -> Result<Vec<u64>, IssueError> {
        let repository = RepositoryId::new("o", "r");
        let sleeper = RecordingSleeper::default();
        let lister = IssueLister::new(
            source,
            &repository,
            &[],
            policy,
            &sleeper,
            Duration::from_secs(5),
        );
        let issues: Vec<Issue> = lister.stream().try_collect().await?;
        Ok(issues.into_iter().map(|i| i.number).collect())
    }

    #[tokio::test]
    async fn follows_pages_and_drops_closed_issues() {
        let source = ScriptedSource::new(vec![
            page(vec![issue(1, IssueState::Open), issue(2, IssueState::Closed)], Some(2)),
            page(vec![issue(3, IssueState::Open)], None),
        ]);

        let numbers = collect(&source, &RetryPolicy::no_retry()).await.unwrap();

        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(*source.pages.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn stops_when_next_page_does_not_advance() {
        let source = ScriptedSource::new(vec![
            page(vec![issue(1, IssueState::Open)], Some(2)),
            page(vec![issue(2, IssueState::Open)], Some(2)),
        ]);

        let numbers = collect(&source, &RetryPolicy::no_retry()).await.unwrap();

        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(source.pages.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let source = ScriptedSource::new(vec![
            Err(RemoteError::Transient("502 Bad Gateway".to_string())),
            page(vec![issue(7, IssueState::Open)], None),
        ]);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));

        let numbers = collect(&source, &policy).await.unwrap();

        assert_eq!(numbers, vec![7]);
        assert_eq!(*source.pages.lock().unwrap(), vec![1, 1]);
    }

    #[tokio::test]
    async fn reports_source_unavailable_after_retries() {
        let source = ScriptedSource::new(vec![
            Err(RemoteError::Transient("rate limited".to_string())),
            Err(RemoteError::Transient("rate limited".to_string())),
            Err(RemoteError::Transient("rate limited".to_string())),
        ]);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));

        let error = collect(&source, &policy).await.unwrap_err();

        match error {
            IssueError::SourceUnavailable { attempts, message } => {
                assert_eq!(attempts, 3);
                assert!(message.contains("rate limited"));
            }
        }
    }

    #[tokio::test]
    async fn does_not_retry_rejected_requests() {
        let source = ScriptedSource::new(vec![Err(RemoteError::Rejected(
            "401 Bad credentials".to_string(),
        ))]);
        let policy = RetryPolicy::new(5, Duration::from_millis(1));

        let error = collect(&source, &policy).await.unwrap_err();

        assert!(matches!(error, IssueError::SourceUnavailable { attempts: 1, .. }));
        assert_eq!(source.pages.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stream_is_restartable() {
        let source = ScriptedSource::new(vec![
            page(vec![issue(1, IssueState::Open)], None),
            page(vec![issue(1, IssueState::Open)], None),
        ]);
        let policy = RetryPolicy::no_retry();

        assert_eq!(collect(&source, &policy).await.unwrap(), vec![1]);
        assert_eq!(collect(&source, &policy).await.unwrap(), vec![1]);
        assert_eq!(*source.pages.lock().unwrap(), vec![1, 1]);
    }
}
