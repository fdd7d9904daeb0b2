//! In-memory backends shared by the integration tests.

#![allow(dead_code)]

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use issue_fixer::{
    CredentialInputs, ExistingProposal, FixerConfig, Forge, GitBackend, GitError, Issue,
    IssuePage, IssueSource, IssueState, LlmError, ModelBackend, ModelRequest,
    OpenedReviewRequest, RemoteError, RepositoryId, ReviewRequest, Sleeper, Workspace,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn repository() -> RepositoryId {
    RepositoryId::new("octo", "widgets")
}

pub fn credentials() -> CredentialInputs {
    CredentialInputs {
        source_token: Some("ghp_test_token".to_string()),
        model_key: Some("sk-test-key".to_string()),
    }
}

/// Defaults with a single pipeline in flight so call order is stable.
pub fn config() -> FixerConfig {
    let mut config = FixerConfig::default();
    config.run.concurrency = 1;
    config.run.retry.max_attempts = 2;
    config
}

pub fn issue(number: u64, title: &str, body: &str) -> Issue {
    Issue {
        number,
        title: title.to_string(),
        body: body.to_string(),
        labels: BTreeSet::new(),
        state: IssueState::Open,
        url: format!("https://github.com/octo/widgets/issues/{number}"),
    }
}

/// Serves a fixed list of issues, or a permanent failure.
pub struct FakeSource {
    issues: Vec<Issue>,
    failure: Option<RemoteError>,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self {
            issues,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: RemoteError) -> Self {
        Self {
            issues: Vec::new(),
            failure: Some(error),
            calls: AtomicUsize::new(0),
        }
    }
}

impl IssueSource for FakeSource {
    fn fetch_open_issues<'a>(
        &'a self,
        _repository: &'a RepositoryId,
        _labels: &'a [String],
        _page: u32,
    ) -> BoxFuture<'a, Result<IssuePage, RemoteError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(IssuePage {
                issues: self.issues.clone(),
                next_page: None,
            }),
        };
        future::ready(response).boxed()
    }
}

/// A commit made in a fake workspace.
#[derive(Debug, Clone)]
pub struct Commit {
    pub branch: String,
    pub message: String,
    pub paths: Vec<String>,
}

/// A review request opened on the fake forge.
#[derive(Debug, Clone)]
pub struct PullRequest {
    pub number: u64,
    pub head: String,
    pub base: String,
    pub title: String,
    pub body: String,
}

/// Remote state seen by both the forge and git fakes.
#[derive(Default)]
pub struct RemoteState {
    pub branches: BTreeSet<String>,
    /// Branches another writer claims between the pre-check and the push.
    pub racing: BTreeSet<String>,
    pub pulls: Vec<PullRequest>,
    /// Review request opens that fail with a server error before one succeeds.
    pub failing_opens: usize,
    pub deleted_branches: Vec<String>,
    pub commits: Vec<Commit>,
    pub comments: Vec<(u64, String)>,
    pub labels: Vec<(u64, String)>,
    pub checkouts: usize,
}

/// Forge and git backend over one shared [`RemoteState`].
#[derive(Clone)]
pub struct FakeRemote {
    pub state: Arc<Mutex<RemoteState>>,
    files: Arc<BTreeMap<String, String>>,
    local_branches: Arc<Mutex<HashMap<std::path::PathBuf, String>>>,
}

impl FakeRemote {
    /// A remote whose base branch holds `files`.
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self {
            state: Arc::default(),
            files: Arc::new(
                files
                    .iter()
                    .map(|(path, content)| ((*path).to_string(), (*content).to_string()))
                    .collect(),
            ),
            local_branches: Arc::default(),
        }
    }

    pub fn with_state<T>(&self, f: impl FnOnce(&mut RemoteState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }
}

impl Forge for FakeRemote {
    fn default_branch<'a>(
        &'a self,
        _repository: &'a RepositoryId,
    ) -> BoxFuture<'a, Result<String, RemoteError>> {
        future::ready(Ok("main".to_string())).boxed()
    }

    fn find_proposal<'a>(
        &'a self,
        _repository: &'a RepositoryId,
        branch: &'a str,
    ) -> BoxFuture<'a, Result<Option<ExistingProposal>, RemoteError>> {
        let state = self.state.lock().unwrap();
        let found = if let Some(pr) = state.pulls.iter().find(|pr| pr.head == branch) {
            Some(ExistingProposal {
                branch: branch.to_string(),
                url: Some(format!("https://github.com/octo/widgets/pull/{}", pr.number)),
            })
        } else if state.branches.contains(branch) {
            Some(ExistingProposal {
                branch: branch.to_string(),
                url: None,
            })
        } else {
            None
        };
        future::ready(Ok(found)).boxed()
    }

    fn open_review_request<'a>(
        &'a self,
        request: &'a ReviewRequest,
    ) -> BoxFuture<'a, Result<OpenedReviewRequest, RemoteError>> {
        let mut state = self.state.lock().unwrap();
        if state.failing_opens > 0 {
            state.failing_opens -= 1;
            return future::ready(Err(RemoteError::Transient("502 Bad Gateway".to_string())))
                .boxed();
        }
        let number = 100 + state.pulls.len() as u64;
        state.pulls.push(PullRequest {
            number,
            head: request.head.clone(),
            base: request.base.clone(),
            title: request.title.clone(),
            body: request.body.clone(),
        });
        future::ready(Ok(OpenedReviewRequest {
            number,
            url: format!("https://github.com/octo/widgets/pull/{number}"),
        }))
        .boxed()
    }

    fn delete_branch<'a>(
        &'a self,
        _repository: &'a RepositoryId,
        branch: &'a str,
    ) -> BoxFuture<'a, Result<(), RemoteError>> {
        self.with_state(|state| {
            state.branches.remove(branch);
            state.deleted_branches.push(branch.to_string());
        });
        future::ready(Ok(())).boxed()
    }

    fn comment_on_issue<'a>(
        &'a self,
        _repository: &'a RepositoryId,
        issue_number: u64,
        body: &'a str,
    ) -> BoxFuture<'a, Result<(), RemoteError>> {
        self.with_state(|state| state.comments.push((issue_number, body.to_string())));
        future::ready(Ok(())).boxed()
    }

    fn add_label<'a>(
        &'a self,
        _repository: &'a RepositoryId,
        issue_number: u64,
        label: &'a str,
    ) -> BoxFuture<'a, Result<(), RemoteError>> {
        self.with_state(|state| state.labels.push((issue_number, label.to_string())));
        future::ready(Ok(())).boxed()
    }
}

impl GitBackend for FakeRemote {
    fn checkout<'a>(
        &'a self,
        repository: &'a RepositoryId,
        base_branch: &'a str,
    ) -> BoxFuture<'a, Result<Workspace, GitError>> {
        async move {
            let dir = tempfile::TempDir::new().map_err(GitError::TempDir)?;
            for (path, content) in self.files.iter() {
                let full = dir.path().join(path);
                if let Some(parent) = full.parent() {
                    std::fs::create_dir_all(parent).map_err(GitError::TempDir)?;
                }
                std::fs::write(full, content).map_err(GitError::TempDir)?;
            }
            self.with_state(|state| state.checkouts += 1);
            Ok(Workspace::new(dir, repository.clone(), base_branch, "base0"))
        }
        .boxed()
    }

    fn create_branch<'a>(
        &'a self,
        workspace: &'a Workspace,
        branch: &'a str,
    ) -> BoxFuture<'a, Result<(), GitError>> {
        self.local_branches
            .lock()
            .unwrap()
            .insert(workspace.path().to_path_buf(), branch.to_string());
        future::ready(Ok(())).boxed()
    }

    fn commit<'a>(
        &'a self,
        workspace: &'a Workspace,
        message: &'a str,
        paths: &'a [String],
    ) -> BoxFuture<'a, Result<String, GitError>> {
        let branch = self
            .local_branches
            .lock()
            .unwrap()
            .get(workspace.path())
            .cloned()
            .unwrap_or_default();
        let id = self.with_state(|state| {
            state.commits.push(Commit {
                branch,
                message: message.to_string(),
                paths: paths.to_vec(),
            });
            format!("c0ffee{}", state.commits.len())
        });
        future::ready(Ok(id)).boxed()
    }

    fn push<'a>(
        &'a self,
        _workspace: &'a Workspace,
        branch: &'a str,
    ) -> BoxFuture<'a, Result<(), GitError>> {
        let result = self.with_state(|state| {
            if state.branches.contains(branch) || state.racing.contains(branch) {
                return Err(GitError::Rejected {
                    message: format!("! [rejected] HEAD -> {branch} (fetch first)"),
                });
            }
            state.branches.insert(branch.to_string());
            Ok(())
        });
        future::ready(result).boxed()
    }
}

/// What the fake model does for one issue.
#[derive(Clone)]
pub enum Reply {
    Answer(String),
    Fail,
    Hang,
}

/// Answers prompts by issue number.
#[derive(Default)]
pub struct FakeModel {
    replies: HashMap<u64, Reply>,
    pub calls: AtomicUsize,
}

impl FakeModel {
    pub fn reply(mut self, issue: u64, reply: Reply) -> Self {
        self.replies.insert(issue, reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ModelBackend for FakeModel {
    fn model_id(&self) -> &str {
        "fake:model-1"
    }

    fn complete<'a>(&'a self, request: &'a ModelRequest) -> BoxFuture<'a, Result<String, LlmError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .iter()
            .find(|(number, _)| request.prompt.starts_with(&format!("Issue #{number}:")))
            .map(|(_, reply)| reply.clone());
        async move {
            match reply {
                Some(Reply::Answer(text)) => Ok(text),
                Some(Reply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(LlmError::Timeout(3600))
                }
                Some(Reply::Fail) | None => {
                    Err(LlmError::Backend("503 service unavailable".to_string()))
                }
            }
        }
        .boxed()
    }
}

/// Returns immediately.
#[derive(Default)]
pub struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _duration: Duration) -> BoxFuture<'_, ()> {
        future::ready(()).boxed()
    }
}

/// A model answer replacing each `(path, content)` pair.
pub fn fix_answer(summary: &str, edits: &[(&str, &str)]) -> String {
    let edits: Vec<serde_json::Value> = edits
        .iter()
        .map(|(path, content)| serde_json::json!({ "path": path, "content": content }))
        .collect();
    serde_json::json!({ "status": "fix", "summary": summary, "edits": edits }).to_string()
}
