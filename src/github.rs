//! GitHub REST client: repository tree traversal, commit listing, and
//! per-commit diffs.
//!
//! Implements both [`RepositorySource`] and [`CommitSource`] against the
//! v3 REST API. All responses are deserialized into typed payload structs
//! at this boundary; nothing untyped flows downstream.
//!
//! Error mapping follows the run/item split: 401/404/403 on the
//! repository itself become [`Error::Auth`] / [`Error::RepoNotFound`] /
//! [`Error::Forbidden`] and abort the run, while a failed fetch of one
//! blob is logged and skipped.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::time::Duration;

use crate::config::GithubConfig;
use crate::error::{Error, Result};
use crate::models::{CommitInfo, RepoDocument};
use crate::traits::{CommitSource, RepositorySource};

const USER_AGENT: &str = "repolore";
const CLIENT_TIMEOUT_SECS: u64 = 30;

/// Split a GitHub URL into `(owner, repo)`.
///
/// Accepts the usual shapes (`https://github.com/owner/repo`, with or
/// without a trailing slash or `.git` suffix). The last two non-empty
/// path segments are taken as owner and repo, matching how project URLs
/// are entered by hand.
pub fn parse_owner_repo(github_url: &str) -> Result<(String, String)> {
    let trimmed = github_url
        .trim()
        .trim_end_matches('/')
        .trim_end_matches(".git");

    let mut segments = trimmed.split('/').rev().filter(|s| !s.is_empty());
    let repo = segments.next();
    let owner = segments.next();

    match (owner, repo) {
        (Some(owner), Some(repo)) if !owner.contains(':') && !owner.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(Error::InvalidRepoUrl(github_url.to_string())),
    }
}

// ─── Typed API payloads ───

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct BlobResponse {
    content: String,
    encoding: String,
}

#[derive(Debug, Deserialize)]
struct CommitItem {
    sha: String,
    commit: CommitDetail,
    author: Option<AccountInfo>,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    #[serde(default)]
    message: String,
    author: Option<GitSignature>,
}

#[derive(Debug, Deserialize)]
struct GitSignature {
    name: Option<String>,
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    avatar_url: Option<String>,
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| Error::Config(format!("Invalid ignore glob '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::Config(format!("Failed to build ignore globs: {}", e)))
}

fn decode_blob_content(blob: &BlobResponse) -> Result<String> {
    match blob.encoding.as_str() {
        "base64" => {
            // GitHub wraps blob base64 at 60 columns
            let stripped: String = blob
                .content
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            let bytes = STANDARD
                .decode(stripped.as_bytes())
                .map_err(|e| Error::bad_response("GitHub blob", format!("invalid base64: {}", e)))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        "utf-8" => Ok(blob.content.clone()),
        other => Err(Error::bad_response(
            "GitHub blob",
            format!("unknown encoding '{}'", other),
        )),
    }
}

fn map_commit_item(item: CommitItem) -> CommitInfo {
    let signature = item.commit.author;
    CommitInfo {
        commit_hash: item.sha,
        commit_message: item.commit.message,
        commit_author_name: signature
            .as_ref()
            .and_then(|s| s.name.clone())
            .unwrap_or_default(),
        commit_author_avatar: item
            .author
            .and_then(|a| a.avatar_url)
            .unwrap_or_default(),
        commit_date: signature
            .and_then(|s| s.date)
            .unwrap_or(DateTime::UNIX_EPOCH),
    }
}

/// Newest first; equal dates fall back to hash order so repeated calls
/// agree on the sequence.
fn order_newest_first(commits: &mut [CommitInfo]) {
    commits.sort_by(|a, b| {
        b.commit_date
            .cmp(&a.commit_date)
            .then_with(|| a.commit_hash.cmp(&b.commit_hash))
    });
}

/// GitHub REST API client.
///
/// One instance serves any number of repositories; per-project tokens are
/// passed through [`RepositorySource::fetch_documents`], everything else
/// uses the configured/environment token.
pub struct GithubClient {
    http: reqwest::Client,
    config: GithubConfig,
    ignore: GlobSet,
}

impl GithubClient {
    pub fn new(config: GithubConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(CLIENT_TIMEOUT_SECS))
            .build()?;
        let ignore = build_globset(&config.ignore_globs)?;
        Ok(Self {
            http,
            config,
            ignore,
        })
    }

    /// Map a non-success status on a whole-repository request to the
    /// fail-fast taxonomy.
    async fn repo_error(&self, resp: reqwest::Response, repo: &str) -> Error {
        let status = resp.status();
        match status.as_u16() {
            401 => Error::Auth(format!("token rejected for {}", repo)),
            404 => Error::RepoNotFound(repo.to_string()),
            403 => Error::Forbidden(repo.to_string()),
            _ => {
                let detail = resp.text().await.unwrap_or_default();
                Error::bad_response("GitHub API", format!("HTTP {} for {}: {}", status, repo, detail))
            }
        }
    }

    async fn fetch_tree(&self, owner: &str, repo: &str, token: &str) -> Result<TreeResponse> {
        let url = format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.config.api_base, owner, repo, self.config.branch
        );
        let resp = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(self.repo_error(resp, &format!("{}/{}", owner, repo)).await);
        }

        resp.json::<TreeResponse>()
            .await
            .map_err(|e| Error::bad_response("GitHub tree", e.to_string()))
    }

    async fn fetch_blob(&self, owner: &str, repo: &str, sha: &str, token: &str) -> Result<String> {
        let url = format!(
            "{}/repos/{}/{}/git/blobs/{}",
            self.config.api_base, owner, repo, sha
        );
        let resp = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?;

        let blob: BlobResponse = resp
            .json()
            .await
            .map_err(|e| Error::bad_response("GitHub blob", e.to_string()))?;
        decode_blob_content(&blob)
    }
}

#[async_trait]
impl RepositorySource for GithubClient {
    async fn fetch_documents(
        &self,
        github_url: &str,
        token: Option<&str>,
    ) -> Result<Vec<RepoDocument>> {
        let (owner, repo) = parse_owner_repo(github_url)?;
        let token = self.config.resolve_token(token)?;

        let tree = self.fetch_tree(&owner, &repo, &token).await?;
        if tree.truncated {
            tracing::warn!(
                repo = %format!("{}/{}", owner, repo),
                "tree listing truncated by GitHub; large repositories are partially ingested"
            );
        }

        let blobs: Vec<TreeEntry> = tree
            .tree
            .into_iter()
            .filter(|e| e.kind == "blob" && !self.ignore.is_match(&e.path))
            .collect();
        tracing::info!(
            repo = %format!("{}/{}", owner, repo),
            files = blobs.len(),
            "repository tree listed"
        );

        let results: Vec<Option<RepoDocument>> = futures::stream::iter(blobs)
            .map(|entry| {
                let owner = owner.clone();
                let repo = repo.clone();
                let token = token.clone();
                async move {
                    match self.fetch_blob(&owner, &repo, &entry.sha, &token).await {
                        Ok(content) => Some(RepoDocument {
                            path: entry.path,
                            content,
                        }),
                        Err(e) => {
                            tracing::warn!(path = %entry.path, error = %e, "skipping file: content fetch failed");
                            None
                        }
                    }
                }
            })
            .buffer_unordered(self.config.max_concurrency)
            .collect()
            .await;

        let mut docs: Vec<RepoDocument> = results.into_iter().flatten().collect();
        docs.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(docs)
    }
}

#[async_trait]
impl CommitSource for GithubClient {
    async fn recent_commits(&self, github_url: &str) -> Result<Vec<CommitInfo>> {
        let (owner, repo) = parse_owner_repo(github_url)?;
        let url = format!(
            "{}/repos/{}/{}/commits?per_page={}",
            self.config.api_base, owner, repo, self.config.commit_limit
        );

        let mut req = self.http.get(&url).header("User-Agent", USER_AGENT);
        // Public repositories list fine without credentials
        if let Ok(token) = self.config.resolve_token(None) {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;

        if !resp.status().is_success() {
            return Err(self.repo_error(resp, &format!("{}/{}", owner, repo)).await);
        }

        let items: Vec<CommitItem> = resp
            .json()
            .await
            .map_err(|e| Error::bad_response("GitHub commits", e.to_string()))?;

        let mut commits: Vec<CommitInfo> = items.into_iter().map(map_commit_item).collect();
        order_newest_first(&mut commits);
        commits.truncate(self.config.commit_limit);
        Ok(commits)
    }

    async fn commit_diff(&self, github_url: &str, commit_hash: &str) -> Result<String> {
        let (owner, repo) = parse_owner_repo(github_url)?;
        let url = format!(
            "{}/repos/{}/{}/commits/{}",
            self.config.api_base, owner, repo, commit_hash
        );

        let mut req = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github.v3.diff")
            .header("User-Agent", USER_AGENT)
            .timeout(Duration::from_secs(self.config.diff_timeout_secs));
        if let Ok(token) = self.config.resolve_token(None) {
            req = req.bearer_auth(token);
        }

        // Item-level path: callers absorb any error here into a sentinel
        let resp = req.send().await?.error_for_status()?;
        Ok(resp.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GithubConfig;
    use chrono::TimeZone;

    #[test]
    fn test_parse_owner_repo() {
        let (owner, repo) = parse_owner_repo("https://github.com/rust-lang/cargo").unwrap();
        assert_eq!(owner, "rust-lang");
        assert_eq!(repo, "cargo");
    }

    #[test]
    fn test_parse_trailing_slash_and_git_suffix() {
        let (owner, repo) = parse_owner_repo("https://github.com/rust-lang/cargo.git/").unwrap();
        assert_eq!(owner, "rust-lang");
        assert_eq!(repo, "cargo");
    }

    #[test]
    fn test_parse_rejects_bare_host() {
        assert!(parse_owner_repo("https://github.com/").is_err());
        assert!(parse_owner_repo("").is_err());
    }

    #[test]
    fn test_default_ignore_globs() {
        let config = GithubConfig::default();
        let set = build_globset(&config.ignore_globs).unwrap();
        assert!(set.is_match("node_modules/lodash/index.js"));
        assert!(set.is_match("package-lock.json"));
        assert!(set.is_match("assets/img/logo.png"));
        assert!(set.is_match(".git/config"));
        assert!(!set.is_match("src/lib.rs"));
        assert!(!set.is_match("README.md"));
    }

    #[test]
    fn test_decode_blob_with_line_wraps() {
        let blob = BlobResponse {
            // "hello world" wrapped the way the API returns it
            content: "aGVsbG8g\nd29ybGQ=\n".to_string(),
            encoding: "base64".to_string(),
        };
        assert_eq!(decode_blob_content(&blob).unwrap(), "hello world");
    }

    #[test]
    fn test_decode_blob_unknown_encoding() {
        let blob = BlobResponse {
            content: "x".to_string(),
            encoding: "utf-16".to_string(),
        };
        assert!(decode_blob_content(&blob).is_err());
    }

    #[test]
    fn test_commit_item_deserializes_with_null_author() {
        let json = r#"{
            "sha": "abc123",
            "commit": {
                "message": "Fix parser",
                "author": { "name": "Dev One", "date": "2024-06-01T12:00:00Z" }
            },
            "author": null
        }"#;
        let item: CommitItem = serde_json::from_str(json).unwrap();
        let info = map_commit_item(item);
        assert_eq!(info.commit_hash, "abc123");
        assert_eq!(info.commit_message, "Fix parser");
        assert_eq!(info.commit_author_name, "Dev One");
        assert_eq!(info.commit_author_avatar, "");
        assert_eq!(info.commit_date.timestamp(), 1717243200);
    }

    #[test]
    fn test_tree_response_deserializes() {
        let json = r#"{
            "sha": "root",
            "tree": [
                { "path": "src/main.rs", "mode": "100644", "type": "blob", "sha": "b1" },
                { "path": "src", "mode": "040000", "type": "tree", "sha": "t1" }
            ],
            "truncated": false
        }"#;
        let tree: TreeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(tree.tree.len(), 2);
        assert_eq!(tree.tree[0].kind, "blob");
        assert!(!tree.truncated);
    }

    #[test]
    fn test_order_newest_first_with_hash_tiebreak() {
        let date = |s: i64| Utc.timestamp_opt(s, 0).unwrap();
        let commit = |hash: &str, ts: i64| CommitInfo {
            commit_hash: hash.to_string(),
            commit_message: String::new(),
            commit_author_name: String::new(),
            commit_author_avatar: String::new(),
            commit_date: date(ts),
        };

        let mut commits = vec![commit("bbb", 100), commit("aaa", 100), commit("zzz", 200)];
        order_newest_first(&mut commits);

        let hashes: Vec<&str> = commits.iter().map(|c| c.commit_hash.as_str()).collect();
        assert_eq!(hashes, vec!["zzz", "aaa", "bbb"]);
    }
}
