//! Hosting service client
//!
//! Provides the boundary to the remote source-code-hosting API. The
//! convergence verifier and the merge-gate engine consume this trait; they
//! never talk HTTP themselves, so any implementation (including test
//! fakes) slots in.

mod rest;

pub use rest::RestHostingService;

use crate::error::Result;
use crate::gate::CodeOwnersFile;
use crate::types::{
    Branch, CommitFilesRequest, CommitInfo, ImportRequest, MergeMethod, MergeOutcome,
    ProtectionRule, PullRequest, RepositorySnapshot, ReviewDecision, ReviewState, Tag,
};
use async_trait::async_trait;
use url::Url;

/// Connection and identity context for one repository
///
/// Credentials are carried here explicitly rather than read from ambient
/// process state; loading them from the environment is the caller's
/// concern.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the hosting API (e.g. `https://host/api/v1`)
    pub base_url: Url,
    /// Bearer token for API calls
    pub token: String,
    /// Repository identifier the service is bound to
    pub repo: String,
}

impl ApiConfig {
    /// Build a config from a raw base URL
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        repo: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            token: token.into(),
            repo: repo.into(),
        })
    }
}

/// Hosting service trait for repository and pull-request operations
///
/// One instance is bound to one repository. All operations are plain
/// request/response; the asynchronous behaviors (import) are observed via
/// [`get_repository`] and the convergence verifier.
///
/// [`get_repository`]: Self::get_repository
#[async_trait]
pub trait HostingService: Send + Sync {
    /// Fetch the repository status snapshot
    ///
    /// The snapshot's `importing` flag distinguishes in-progress from done;
    /// this is the poll function for import convergence.
    async fn get_repository(&self) -> Result<RepositorySnapshot>;

    /// Start importing this repository from an upstream provider
    async fn import_repository(&self, request: &ImportRequest) -> Result<()>;

    /// Delete the repository
    async fn delete_repository(&self) -> Result<()>;

    /// Create a branch pointing at `target` (a ref or commit SHA)
    async fn create_branch(&self, name: &str, target: &str) -> Result<Branch>;

    /// Fetch a branch by name
    async fn get_branch(&self, name: &str) -> Result<Branch>;

    /// Delete a branch
    async fn delete_branch(&self, name: &str) -> Result<()>;

    /// Create a tag pointing at `target` (a ref or commit SHA)
    async fn create_tag(&self, name: &str, target: &str) -> Result<Tag>;

    /// List tags, optionally filtered by a name query
    async fn list_tags(&self, query: Option<&str>) -> Result<Vec<Tag>>;

    /// Delete a tag
    async fn delete_tag(&self, name: &str) -> Result<()>;

    /// Commit file changes, optionally onto a new branch
    async fn commit_files(&self, request: &CommitFilesRequest) -> Result<CommitInfo>;

    /// Create a pull request from `source_branch` into `target_branch`
    async fn create_pull_request(
        &self,
        source_branch: &str,
        target_branch: &str,
        title: &str,
    ) -> Result<PullRequest>;

    /// Submit a review decision on a pull request at a specific commit
    async fn review_pull_request(
        &self,
        number: u64,
        commit_sha: &str,
        state: ReviewState,
    ) -> Result<()>;

    /// Fetch all review decisions on a pull request
    ///
    /// May contain multiple decisions per reviewer; callers fold them into
    /// a [`crate::types::PullRequestState`] which keeps the latest.
    async fn get_pull_request_reviews(&self, number: u64) -> Result<Vec<ReviewDecision>>;

    /// List the protection rules configured on the repository
    async fn list_protection_rules(&self) -> Result<Vec<ProtectionRule>>;

    /// Create a protection rule
    async fn create_protection_rule(&self, rule: &ProtectionRule) -> Result<()>;

    /// Resolve the ownership file on a branch
    ///
    /// A repository without a CODEOWNERS file resolves to an empty
    /// [`CodeOwnersFile`] (nothing owned, nothing blocked).
    async fn resolve_code_owners(&self, branch: &str) -> Result<CodeOwnersFile>;

    /// Attempt to merge a pull request
    ///
    /// The remote service is the final authority and may reject a merge
    /// the gate engine locally permitted; rejection comes back as
    /// `MergeOutcome { merged: false, .. }`, not as an error.
    async fn attempt_merge(
        &self,
        number: u64,
        method: MergeMethod,
        source_sha: &str,
    ) -> Result<MergeOutcome>;

    /// Get the service configuration
    fn config(&self) -> &ApiConfig;
}
