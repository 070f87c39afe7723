//! Mock hosting service for testing
//!
//! These are test utilities - not all may be used in current tests but are
//! available for future test development.

#![allow(dead_code)]

use async_trait::async_trait;
use gitgate::client::{ApiConfig, HostingService};
use gitgate::error::{Error, Result};
use gitgate::gate::CodeOwnersFile;
use gitgate::types::{
    Branch, CommitFilesRequest, CommitInfo, ImportRequest, MergeMethod, MergeOutcome,
    ProtectionRule, PullRequest, RepositorySnapshot, ReviewDecision, ReviewState, Tag,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Call record for `attempt_merge`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCall {
    pub number: u64,
    pub method: MergeMethod,
    pub source_sha: String,
}

/// Call record for `review_pull_request`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewCall {
    pub number: u64,
    pub commit_sha: String,
    pub state: ReviewState,
}

/// Simple mock hosting service for testing
///
/// Features:
/// - Scripted sequence of repository snapshots (for convergence tests)
/// - Configurable responses for rules, reviews, owners, and merges
/// - Call tracking for verification
/// - Error injection for failure path testing
pub struct MockHostingService {
    config: ApiConfig,
    next_pr_number: AtomicU64,
    // Scripted responses
    repo_responses: Mutex<VecDeque<std::result::Result<RepositorySnapshot, String>>>,
    repeat_last_repo: Mutex<Option<RepositorySnapshot>>,
    rules: Mutex<Vec<ProtectionRule>>,
    codeowners_content: Mutex<Option<String>>,
    reviews: Mutex<HashMap<u64, Vec<ReviewDecision>>>,
    merge_responses: Mutex<HashMap<u64, MergeOutcome>>,
    // Call tracking
    get_repository_calls: Mutex<u32>,
    review_calls: Mutex<Vec<ReviewCall>>,
    merge_calls: Mutex<Vec<MergeCall>>,
    // Error injection
    error_on_merge: Mutex<Option<String>>,
}

impl MockHostingService {
    /// Create a new mock with the given config
    pub fn with_config(config: ApiConfig) -> Self {
        Self {
            config,
            next_pr_number: AtomicU64::new(1),
            repo_responses: Mutex::new(VecDeque::new()),
            repeat_last_repo: Mutex::new(None),
            rules: Mutex::new(Vec::new()),
            codeowners_content: Mutex::new(None),
            reviews: Mutex::new(HashMap::new()),
            merge_responses: Mutex::new(HashMap::new()),
            get_repository_calls: Mutex::new(0),
            review_calls: Mutex::new(Vec::new()),
            merge_calls: Mutex::new(Vec::new()),
            error_on_merge: Mutex::new(None),
        }
    }

    /// Queue a repository snapshot for the next `get_repository` call
    ///
    /// Once the queue drains, the last queued snapshot keeps repeating.
    pub fn push_repo_snapshot(&self, importing: bool) {
        let snapshot = RepositorySnapshot {
            identifier: self.config.repo.clone(),
            importing,
            default_branch: Some("develop".to_string()),
        };
        *self.repeat_last_repo.lock().unwrap() = Some(snapshot.clone());
        self.repo_responses.lock().unwrap().push_back(Ok(snapshot));
    }

    /// Queue a transport error for the next `get_repository` call
    pub fn push_repo_error(&self, msg: &str) {
        self.repo_responses
            .lock()
            .unwrap()
            .push_back(Err(msg.to_string()));
    }

    /// Set the protection rules the repository reports
    pub fn set_rules(&self, rules: Vec<ProtectionRule>) {
        *self.rules.lock().unwrap() = rules;
    }

    /// Set the CODEOWNERS content (None means no file)
    pub fn set_codeowners(&self, content: Option<&str>) {
        *self.codeowners_content.lock().unwrap() = content.map(ToString::to_string);
    }

    /// Set the reviews reported for a pull request
    pub fn set_reviews(&self, number: u64, reviews: Vec<ReviewDecision>) {
        self.reviews.lock().unwrap().insert(number, reviews);
    }

    /// Set the response for `attempt_merge` on a pull request
    pub fn set_merge_response(&self, number: u64, outcome: MergeOutcome) {
        self.merge_responses.lock().unwrap().insert(number, outcome);
    }

    /// Make `attempt_merge` return an error
    pub fn fail_merge(&self, msg: &str) {
        *self.error_on_merge.lock().unwrap() = Some(msg.to_string());
    }

    /// Number of `get_repository` calls made
    pub fn get_repository_call_count(&self) -> u32 {
        *self.get_repository_calls.lock().unwrap()
    }

    /// All `attempt_merge` calls made
    pub fn get_merge_calls(&self) -> Vec<MergeCall> {
        self.merge_calls.lock().unwrap().clone()
    }

    /// All `review_pull_request` calls made
    pub fn get_review_calls(&self) -> Vec<ReviewCall> {
        self.review_calls.lock().unwrap().clone()
    }

    /// Assert that `attempt_merge` was called for a specific pull request
    pub fn assert_merge_called(&self, number: u64) {
        let calls = self.get_merge_calls();
        assert!(
            calls.iter().any(|c| c.number == number),
            "Expected attempt_merge({number}) but got: {calls:?}"
        );
    }

    /// Assert that `attempt_merge` was never called
    pub fn assert_merge_not_called(&self) {
        let calls = self.get_merge_calls();
        assert!(
            calls.is_empty(),
            "Expected no attempt_merge calls but got: {calls:?}"
        );
    }
}

#[async_trait]
impl HostingService for MockHostingService {
    async fn get_repository(&self) -> Result<RepositorySnapshot> {
        *self.get_repository_calls.lock().unwrap() += 1;

        let next = self.repo_responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(snapshot)) => Ok(snapshot),
            Some(Err(msg)) => Err(Error::Api(msg)),
            None => self
                .repeat_last_repo
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| Error::Api("no repository response configured".to_string())),
        }
    }

    async fn import_repository(&self, _request: &ImportRequest) -> Result<()> {
        Ok(())
    }

    async fn delete_repository(&self) -> Result<()> {
        Ok(())
    }

    async fn create_branch(&self, name: &str, target: &str) -> Result<Branch> {
        Ok(Branch {
            name: name.to_string(),
            sha: format!("sha_{target}"),
        })
    }

    async fn get_branch(&self, name: &str) -> Result<Branch> {
        Ok(Branch {
            name: name.to_string(),
            sha: "sha_head".to_string(),
        })
    }

    async fn delete_branch(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn create_tag(&self, name: &str, target: &str) -> Result<Tag> {
        Ok(Tag {
            name: name.to_string(),
            sha: Some(format!("sha_{target}")),
        })
    }

    async fn list_tags(&self, _query: Option<&str>) -> Result<Vec<Tag>> {
        Ok(Vec::new())
    }

    async fn delete_tag(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn commit_files(&self, request: &CommitFilesRequest) -> Result<CommitInfo> {
        Ok(CommitInfo {
            commit_id: format!("commit_on_{}", request.branch),
        })
    }

    async fn create_pull_request(
        &self,
        source_branch: &str,
        target_branch: &str,
        title: &str,
    ) -> Result<PullRequest> {
        let number = self.next_pr_number.fetch_add(1, Ordering::SeqCst);
        Ok(PullRequest {
            number,
            source_branch: source_branch.to_string(),
            target_branch: target_branch.to_string(),
            title: title.to_string(),
        })
    }

    async fn review_pull_request(
        &self,
        number: u64,
        commit_sha: &str,
        state: ReviewState,
    ) -> Result<()> {
        self.review_calls.lock().unwrap().push(ReviewCall {
            number,
            commit_sha: commit_sha.to_string(),
            state,
        });
        Ok(())
    }

    async fn get_pull_request_reviews(&self, number: u64) -> Result<Vec<ReviewDecision>> {
        Ok(self
            .reviews
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_protection_rules(&self) -> Result<Vec<ProtectionRule>> {
        Ok(self.rules.lock().unwrap().clone())
    }

    async fn create_protection_rule(&self, rule: &ProtectionRule) -> Result<()> {
        self.rules.lock().unwrap().push(rule.clone());
        Ok(())
    }

    async fn resolve_code_owners(&self, _branch: &str) -> Result<CodeOwnersFile> {
        match self.codeowners_content.lock().unwrap().as_deref() {
            Some(content) => CodeOwnersFile::parse(content),
            None => Ok(CodeOwnersFile::empty()),
        }
    }

    async fn attempt_merge(
        &self,
        number: u64,
        method: MergeMethod,
        source_sha: &str,
    ) -> Result<MergeOutcome> {
        self.merge_calls.lock().unwrap().push(MergeCall {
            number,
            method,
            source_sha: source_sha.to_string(),
        });

        if let Some(msg) = self.error_on_merge.lock().unwrap().as_ref() {
            return Err(Error::Api(msg.clone()));
        }

        let responses = self.merge_responses.lock().unwrap();
        responses.get(&number).cloned().ok_or_else(|| {
            Error::Api(format!(
                "attempt_merge: no response configured for PR #{number}"
            ))
        })
    }

    fn config(&self) -> &ApiConfig {
        &self.config
    }
}
