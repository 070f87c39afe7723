//! Core types for gitgate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;

/// Terminal status of one observation of an asynchronous operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    /// The operation is still in progress
    Pending,
    /// The awaited condition holds
    Converged,
    /// The budget was exhausted (or errors recurred) before convergence
    Failed,
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Converged => write!(f, "converged"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result of one verification call
///
/// Owned by the caller; the verifier holds no state between calls.
#[derive(Debug, Clone)]
pub struct Convergence<S> {
    /// Last snapshot observed from a successful poll
    ///
    /// `None` only if every poll errored before a snapshot arrived.
    pub final_state: Option<S>,
    /// Number of poll calls performed
    pub attempts: u32,
    /// Wall-clock time spent in the verification loop
    pub elapsed: Duration,
    /// How the loop ended
    pub outcome: OperationStatus,
    /// Last transport error observed, if any
    pub last_error: Option<String>,
}

impl<S> Convergence<S> {
    /// Check whether the awaited condition was reached
    pub const fn is_converged(&self) -> bool {
        matches!(self.outcome, OperationStatus::Converged)
    }
}

/// Whether a protection rule participates in evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleState {
    /// Rule is enforced
    Active,
    /// Rule exists but is ignored during evaluation
    Disabled,
}

/// A branch protection rule
///
/// Created by an administrator; immutable during a single merge evaluation.
/// Multiple rules may match one branch and each must be satisfied
/// independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionRule {
    /// Rule identifier (unique within a repository)
    pub id: String,
    /// Branch name glob this rule applies to (e.g. `develop`, `release/*`)
    pub target_pattern: String,
    /// Whether every owned changed file needs an owner's approval
    #[serde(default)]
    pub require_code_owner_review: bool,
    /// Minimum count of approving reviewers (bypass users excluded)
    #[serde(default)]
    pub required_approval_count: u32,
    /// Identities exempt from the approval-count requirement
    #[serde(default)]
    pub bypass_users: HashSet<String>,
    /// Whether the rule is enforced
    pub state: RuleState,
}

/// One line of a CODEOWNERS-style ownership file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeOwnerEntry {
    /// Path glob the entry covers (e.g. `*`, `docs/*`, `src/api.rs`)
    pub file_pattern: String,
    /// Identities responsible for matching files
    ///
    /// An empty set is valid and un-owns matching files.
    pub owners: HashSet<String>,
}

/// A reviewer's decision on a pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewState {
    /// Reviewer approved the changes
    Approved,
    /// Reviewer requested changes (blocking)
    ChangesRequested,
    /// Review requested but not yet given
    Pending,
}

impl std::fmt::Display for ReviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => write!(f, "approved"),
            Self::ChangesRequested => write!(f, "changereq"),
            Self::Pending => write!(f, "pending"),
        }
    }
}

/// One review decision by one reviewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDecision {
    /// Identity of the reviewer
    pub reviewer: String,
    /// The decision given
    pub state: ReviewState,
    /// When the decision was submitted
    pub submitted_at: DateTime<Utc>,
}

/// Review-relevant state of a pull request at one point in time
///
/// Read-only to the merge-gate engine; callers must re-fetch and rebuild
/// after any external mutation before re-evaluating.
#[derive(Debug, Clone, Default)]
pub struct PullRequestState {
    /// Branch the pull request merges into
    pub target_branch: String,
    /// Paths changed by the pull request
    pub changed_files: BTreeSet<String>,
    /// Latest decision per reviewer
    pub reviews: HashMap<String, ReviewDecision>,
}

impl PullRequestState {
    /// Create a state for a pull request targeting `target_branch`
    pub fn new(target_branch: impl Into<String>) -> Self {
        Self {
            target_branch: target_branch.into(),
            changed_files: BTreeSet::new(),
            reviews: HashMap::new(),
        }
    }

    /// Record a changed file path
    pub fn add_changed_file(&mut self, path: impl Into<String>) {
        self.changed_files.insert(path.into());
    }

    /// Record a review decision, keeping only the latest per reviewer
    ///
    /// An older decision for the same reviewer is discarded
    /// (last-write-wins by `submitted_at`).
    pub fn record_review(&mut self, decision: ReviewDecision) {
        match self.reviews.get(&decision.reviewer) {
            Some(existing) if existing.submitted_at > decision.submitted_at => {}
            _ => {
                self.reviews.insert(decision.reviewer.clone(), decision);
            }
        }
    }
}

/// A rule that blocked a merge, with the reasons it was unsatisfied
#[derive(Debug, Clone)]
pub struct UnmetRule {
    /// The unsatisfied rule
    pub rule: ProtectionRule,
    /// Human-readable reasons, each naming the offending file or reviewer
    pub reasons: Vec<String>,
}

/// Outcome of one merge-gate evaluation
///
/// A pure function of the inputs at the moment of evaluation; never cached
/// across mutations.
#[derive(Debug, Clone)]
pub struct MergeVerdict {
    /// Whether merge is currently permitted
    pub permitted: bool,
    /// Unsatisfied rules in declaration order (empty when permitted)
    pub unmet_rules: Vec<UnmetRule>,
}

impl MergeVerdict {
    /// Verdict that permits the merge unconditionally
    pub const fn permitted() -> Self {
        Self {
            permitted: true,
            unmet_rules: Vec::new(),
        }
    }

    /// All blocking reasons across unmet rules, in rule order
    pub fn blocking_reasons(&self) -> Vec<&str> {
        self.unmet_rules
            .iter()
            .flat_map(|u| u.reasons.iter().map(String::as_str))
            .collect()
    }
}

/// Repository status snapshot returned by the hosting service
///
/// The poll target for import convergence: `importing` clears once the
/// server-side import finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    /// Repository identifier
    pub identifier: String,
    /// Whether a server-side import is still running
    #[serde(default)]
    pub importing: bool,
    /// Default branch name (e.g. "main", "develop")
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// A branch on the remote repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    /// Branch name
    pub name: String,
    /// Commit SHA the branch points at
    pub sha: String,
}

/// A tag on the remote repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name
    pub name: String,
    /// Commit SHA the tag points at
    pub sha: Option<String>,
}

/// Result of committing files to the repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitInfo {
    /// SHA of the created commit
    pub commit_id: String,
}

/// A pull request as returned by the hosting service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    /// Pull request number
    pub number: u64,
    /// Source (head) branch name
    pub source_branch: String,
    /// Target (base) branch name
    pub target_branch: String,
    /// Pull request title
    pub title: String,
}

/// Merge strategy/method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMethod {
    /// Create a merge commit
    Merge,
    /// Squash all commits into one
    Squash,
    /// Rebase commits onto the target branch
    Rebase,
}

impl std::fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Merge => write!(f, "merge"),
            Self::Squash => write!(f, "squash"),
            Self::Rebase => write!(f, "rebase"),
        }
    }
}

/// Result of a merge attempt against the remote service
///
/// The service is the final authority: it may reject a merge the gate
/// engine locally permitted (race with concurrent rule changes). That is
/// reported here, not as an `Error`.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Whether the merge happened
    pub merged: bool,
    /// SHA of the merge commit (if successful)
    pub sha: Option<String>,
    /// Message from the service (especially on rejection)
    pub message: Option<String>,
}

/// Upstream provider credentials for a repository import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportProvider {
    /// Provider kind (e.g. "github", "gitlab")
    #[serde(rename = "type")]
    pub kind: String,
    /// Custom provider host (None for the provider's public host)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Username on the provider (may be empty for token auth)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Access token for the provider
    pub password: String,
}

/// Request to import a repository from an upstream provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRequest {
    /// Provider credentials
    pub provider: ImportProvider,
    /// Repository path on the provider (e.g. "owner/name")
    pub provider_repo: String,
}

/// Action kind for one file in a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileActionKind {
    /// Create a new file
    Create,
    /// Update an existing file
    Update,
    /// Delete an existing file
    Delete,
}

/// One file change within a commit request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAction {
    /// What to do with the file
    pub action: FileActionKind,
    /// Path of the file
    pub path: String,
    /// New content (empty for deletes)
    #[serde(default)]
    pub payload: String,
}

/// Request to commit one or more file changes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitFilesRequest {
    /// Branch to commit on
    pub branch: String,
    /// New branch to create from `branch` for this commit, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_branch: Option<String>,
    /// Commit message
    pub message: String,
    /// File changes in this commit
    pub actions: Vec<FileAction>,
}
