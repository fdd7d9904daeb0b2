//! Repository context shown to the model.
//!
//! A [`RepositorySnapshot`] is a read-only, bounded view of a working copy:
//! the files an issue refers to, with their content hashes, plus a listing
//! of the tree.

mod error;

pub use error::ContextError;

use crate::config::ContextSettings;
use crate::issues::Issue;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::{Component, Path};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

/// Directories never walked.
const IGNORED_DIRS: &[&str] = &[".git", "node_modules", "target", "vendor", "dist", "build"];

/// Stems shorter than this are too generic to match by name.
const MIN_STEM_MATCH_LEN: usize = 4;

/// Returns the lowercase hex SHA-256 of `content`.
#[must_use]
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// A file included verbatim in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
    /// File content.
    pub content: String,
    /// [`content_hash`] of the content at capture time.
    pub hash: String,
}

/// Read-only view of the repository files relevant to one issue.
#[derive(Debug, Clone, Default)]
pub struct RepositorySnapshot {
    files: Vec<SnapshotFile>,
    tree: Vec<String>,
    tree_truncated: bool,
    all_paths: BTreeSet<String>,
}

impl RepositorySnapshot {
    /// Builds a snapshot from explicit parts.
    #[must_use]
    pub fn from_parts(files: Vec<SnapshotFile>, tree: Vec<String>) -> Self {
        let all_paths = tree
            .iter()
            .cloned()
            .chain(files.iter().map(|f| f.path.clone()))
            .collect();
        Self {
            files,
            tree,
            tree_truncated: false,
            all_paths,
        }
    }

    /// Captures the files of the working copy at `root` that `issue` refers to.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError`] if the tree cannot be walked or a selected
    /// file cannot be read.
    pub fn capture(
        root: &Path,
        issue: &Issue,
        settings: &ContextSettings,
    ) -> Result<Self, ContextError> {
        let paths = list_files(root)?;
        let selected = select_paths(&paths, &format!("{}\n{}", issue.title, issue.body));

        let mut files = Vec::new();
        let mut total_bytes: u64 = 0;
        for path in selected {
            if files.len() >= settings.max_files {
                break;
            }
            let full_path = root.join(&path);
            let metadata = std::fs::metadata(&full_path).map_err(|source| ContextError::Io {
                path: path.clone(),
                source,
            })?;
            if metadata.len() > settings.max_file_bytes
                || total_bytes + metadata.len() > settings.max_total_bytes
            {
                debug!(path = %path, size = metadata.len(), "Skipping file over context budget");
                continue;
            }
            let bytes = std::fs::read(&full_path).map_err(|source| ContextError::Io {
                path: path.clone(),
                source,
            })?;
            let Ok(content) = String::from_utf8(bytes) else {
                debug!(path = %path, "Skipping non-UTF-8 file");
                continue;
            };
            total_bytes += metadata.len();
            files.push(SnapshotFile {
                hash: content_hash(content.as_bytes()),
                path,
                content,
            });
        }

        let tree_truncated = paths.len() > settings.max_tree_entries;
        let tree: Vec<String> = paths
            .iter()
            .take(settings.max_tree_entries)
            .cloned()
            .collect();

        info!(
            issue = issue.number,
            files = files.len(),
            bytes = total_bytes,
            tree_entries = paths.len(),
            "Captured repository context"
        );

        Ok(Self {
            files,
            tree,
            tree_truncated,
            all_paths: paths.into_iter().collect(),
        })
    }

    /// Files included verbatim, most relevant first.
    #[must_use]
    pub fn files(&self) -> &[SnapshotFile] {
        &self.files
    }

    /// Looks up an included file by path.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&SnapshotFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Bounded listing of repository paths.
    #[must_use]
    pub fn tree(&self) -> &[String] {
        &self.tree
    }

    /// Whether the tree listing was cut short.
    #[must_use]
    pub fn tree_truncated(&self) -> bool {
        self.tree_truncated
    }

    /// Returns true if `path` exists in the working copy.
    #[must_use]
    pub fn contains_path(&self, path: &str) -> bool {
        self.all_paths.contains(path)
    }
}

/// Lists every tracked-looking file under `root`, sorted, `/`-separated.
fn list_files(root: &Path) -> Result<Vec<String>, ContextError> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_ignored(e))
    {
        let entry = entry.map_err(|e| ContextError::Walk {
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if let Some(path) = to_slash_path(relative) {
            paths.push(path);
        }
    }
    Ok(paths)
}

fn is_ignored(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    entry.file_type().is_dir() && IGNORED_DIRS.contains(&&*name)
}

fn to_slash_path(path: &Path) -> Option<String> {
    let parts: Option<Vec<&str>> = path
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();
    parts.map(|p| p.join("/"))
}

/// Picks the paths an issue text refers to, most specific match first.
///
/// Exact path or path-suffix mentions rank before file-stem mentions; when
/// nothing matches, root README files are used.
fn select_paths(paths: &[String], text: &str) -> Vec<String> {
    let tokens: BTreeSet<String> = text
        .split(|c: char| {
            c.is_whitespace()
                || matches!(c, '`' | '"' | '\'' | '(' | ')' | '[' | ']' | ',' | ';' | '<' | '>')
        })
        .map(|t| t.trim_start_matches("./"))
        .map(|t| {
            t.trim_start_matches('#')
                .trim_end_matches(|c: char| matches!(c, '.' | ':' | '!' | '?'))
        })
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    let lowered: BTreeSet<String> = tokens.iter().map(|t| t.to_lowercase()).collect();

    let mut selected = Vec::new();
    for path in paths {
        let mentioned = tokens
            .iter()
            .any(|t| path == t || (t.contains('/') && path.ends_with(&format!("/{t}"))));
        let name = path.rsplit('/').next().unwrap_or(path);
        if mentioned || (tokens.contains(name) && name.contains('.')) {
            selected.push(path.clone());
        }
    }

    for path in paths {
        if selected.contains(path) {
            continue;
        }
        let name = path.rsplit('/').next().unwrap_or(path);
        let stem = name.split('.').next().unwrap_or(name).to_lowercase();
        if stem.len() >= MIN_STEM_MATCH_LEN && lowered.contains(&stem) {
            selected.push(path.clone());
        }
    }

    if selected.is_empty() {
        selected.extend(
            paths
                .iter()
                .filter(|p| !p.contains('/') && p.to_lowercase().starts_with("readme"))
                .cloned(),
        );
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::IssueState;
    use std::fs;
    use tempfile::TempDir;

    fn issue(title: &str, body: &str) -> Issue {
        Issue {
            number: 42,
            title: title.to_string(),
            body: body.to_string(),
            labels: BTreeSet::new(),
            state: IssueState::Open,
            url: "https://github.com/o/r/issues/42".to_string(),
        }
    }

    fn repo() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("README.md"), "Helllo World\n").unwrap();
        fs::create_dir_all(temp.path().join("src/net")).unwrap();
        fs::write(temp.path().join("src/main.rs"), "fn main() {}\n").unwrap();
        fs::write(temp.path().join("src/net/client.rs"), "pub struct Client;\n").unwrap();
        fs::create_dir_all(temp.path().join(".git")).unwrap();
        fs::write(temp.path().join(".git/config"), "[core]\n").unwrap();
        fs::create_dir_all(temp.path().join("target")).unwrap();
        fs::write(temp.path().join("target/out.rs"), "junk\n").unwrap();
        temp
    }

    #[test]
    fn content_hash_is_hex_sha256() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn selects_readme_from_issue_text() {
        let temp = repo();
        let snapshot = RepositorySnapshot::capture(
            temp.path(),
            &issue("Fix typo", "typo in README line 10"),
            &ContextSettings::default(),
        )
        .unwrap();

        assert_eq!(snapshot.files().len(), 1);
        let readme = snapshot.file("README.md").unwrap();
        assert_eq!(readme.content, "Helllo World\n");
        assert_eq!(readme.hash, content_hash(b"Helllo World\n"));
    }

    #[test]
    fn exact_paths_rank_before_name_mentions() {
        let temp = repo();
        let snapshot = RepositorySnapshot::capture(
            temp.path(),
            &issue("Crash in client", "Panics in `src/main.rs`; the README is fine."),
            &ContextSettings::default(),
        )
        .unwrap();

        let paths: Vec<&str> = snapshot.files().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/main.rs", "README.md", "src/net/client.rs"]);
    }

    #[test]
    fn skips_git_and_build_directories() {
        let temp = repo();
        let snapshot = RepositorySnapshot::capture(
            temp.path(),
            &issue("Something", "nothing specific"),
            &ContextSettings::default(),
        )
        .unwrap();

        assert!(snapshot.contains_path("src/net/client.rs"));
        assert!(!snapshot.contains_path(".git/config"));
        assert!(!snapshot.contains_path("target/out.rs"));
        // Falls back to the README when nothing is mentioned.
        assert!(snapshot.file("README.md").is_some());
    }

    #[test]
    fn keeps_dot_files_outside_git() {
        let temp = repo();
        fs::write(temp.path().join(".gitignore"), "/target\n").unwrap();
        fs::create_dir_all(temp.path().join(".github/workflows")).unwrap();
        fs::write(temp.path().join(".github/workflows/ci.yml"), "on: push\n").unwrap();

        let snapshot = RepositorySnapshot::capture(
            temp.path(),
            &issue("Ignore build output", "`.gitignore` misses the dist folder"),
            &ContextSettings::default(),
        )
        .unwrap();

        assert!(snapshot.contains_path(".github/workflows/ci.yml"));
        assert!(!snapshot.contains_path(".git/config"));
        let ignore = snapshot.file(".gitignore").unwrap();
        assert_eq!(ignore.hash, content_hash(b"/target\n"));
    }

    #[test]
    fn respects_file_and_byte_budgets() {
        let temp = repo();
        let settings = ContextSettings {
            max_files: 1,
            max_tree_entries: 2,
            ..ContextSettings::default()
        };
        let snapshot = RepositorySnapshot::capture(
            temp.path(),
            &issue("x", "src/main.rs and src/net/client.rs"),
            &settings,
        )
        .unwrap();
        assert_eq!(snapshot.files().len(), 1);
        assert_eq!(snapshot.tree().len(), 2);
        assert!(snapshot.tree_truncated());

        let settings = ContextSettings {
            max_file_bytes: 4,
            ..ContextSettings::default()
        };
        let snapshot =
            RepositorySnapshot::capture(temp.path(), &issue("x", "README.md"), &settings).unwrap();
        assert!(snapshot.files().is_empty());
    }

    #[test]
    fn skips_binary_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("logo.png"), [0x89, 0x50, 0xff, 0xfe]).unwrap();
        let snapshot = RepositorySnapshot::capture(
            temp.path(),
            &issue("x", "logo.png is broken"),
            &ContextSettings::default(),
        )
        .unwrap();
        assert!(snapshot.files().is_empty());
        assert!(snapshot.contains_path("logo.png"));
    }
}
