//! REST hosting service implementation
//!
//! Talks to a Harness-code-style repository API using reqwest. Wire DTOs
//! stay private to this module and convert into crate types.

use crate::client::{ApiConfig, HostingService};
use crate::error::{Error, Result};
use crate::gate::CodeOwnersFile;
use crate::types::{
    Branch, CommitFilesRequest, CommitInfo, ImportRequest, MergeMethod, MergeOutcome,
    ProtectionRule, PullRequest, RepositorySnapshot, ReviewDecision, ReviewState, RuleState, Tag,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Path of the ownership file within the repository
const CODEOWNERS_PATH: &str = "CODEOWNERS";

/// REST hosting service using reqwest
pub struct RestHostingService {
    client: Client,
    config: ApiConfig,
}

#[derive(Deserialize)]
struct RepoResponse {
    identifier: String,
    #[serde(default)]
    importing: bool,
    #[serde(default)]
    default_branch: Option<String>,
}

#[derive(Serialize)]
struct ImportPayload<'a> {
    identifier: &'a str,
    #[serde(flatten)]
    request: &'a ImportRequest,
}

#[derive(Serialize)]
struct CreateBranchPayload<'a> {
    name: &'a str,
    target: &'a str,
}

#[derive(Deserialize)]
struct BranchResponse {
    name: String,
    sha: String,
}

#[derive(Serialize)]
struct CreateTagPayload<'a> {
    name: &'a str,
    target: &'a str,
}

#[derive(Deserialize)]
struct TagResponse {
    name: String,
    #[serde(default)]
    sha: Option<String>,
}

#[derive(Deserialize)]
struct CommitResponse {
    commit_id: String,
}

#[derive(Serialize)]
struct CreatePullReqPayload<'a> {
    source_branch: &'a str,
    target_branch: &'a str,
    title: &'a str,
}

#[derive(Deserialize)]
struct PullReqResponse {
    number: u64,
    source_branch: String,
    target_branch: String,
    #[serde(default)]
    title: String,
}

#[derive(Serialize)]
struct ReviewPayload<'a> {
    commit_sha: &'a str,
    decision: &'a str,
}

#[derive(Deserialize)]
struct ReviewResponse {
    reviewer: ReviewerIdentity,
    decision: String,
    #[serde(default)]
    created: Option<i64>,
}

#[derive(Deserialize)]
struct ReviewerIdentity {
    #[serde(alias = "uid", alias = "email")]
    display_name: String,
}

#[derive(Serialize)]
struct MergePayload<'a> {
    method: &'a str,
    source_sha: &'a str,
}

#[derive(Deserialize)]
struct MergeResponse {
    #[serde(default)]
    sha: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct RuleResponse {
    identifier: String,
    state: String,
    pattern: RulePatternResponse,
    #[serde(default)]
    definition: RuleDefinition,
}

#[derive(Deserialize)]
struct RulePatternResponse {
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    default_branch: bool,
}

#[derive(Deserialize, Default)]
struct RuleDefinition {
    #[serde(default)]
    pullreq: PullReqRuleDef,
    #[serde(default)]
    bypass: BypassDef,
}

#[derive(Deserialize, Default)]
struct PullReqRuleDef {
    #[serde(default)]
    approvals: ApprovalsDef,
}

#[derive(Deserialize, Default)]
struct ApprovalsDef {
    #[serde(default)]
    require_code_owners: bool,
    #[serde(default)]
    require_minimum_count: u32,
}

#[derive(Deserialize, Default)]
struct BypassDef {
    #[serde(default)]
    user_ids: Vec<String>,
}

#[derive(Serialize)]
struct CreateRulePayload<'a> {
    identifier: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    state: &'a str,
    pattern: CreateRulePattern<'a>,
    definition: serde_json::Value,
}

#[derive(Serialize)]
struct CreateRulePattern<'a> {
    include: Vec<&'a str>,
    default_branch: bool,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl From<RepoResponse> for RepositorySnapshot {
    fn from(r: RepoResponse) -> Self {
        Self {
            identifier: r.identifier,
            importing: r.importing,
            default_branch: r.default_branch,
        }
    }
}

impl From<BranchResponse> for Branch {
    fn from(b: BranchResponse) -> Self {
        Self {
            name: b.name,
            sha: b.sha,
        }
    }
}

impl From<TagResponse> for Tag {
    fn from(t: TagResponse) -> Self {
        Self {
            name: t.name,
            sha: t.sha,
        }
    }
}

impl From<PullReqResponse> for PullRequest {
    fn from(pr: PullReqResponse) -> Self {
        Self {
            number: pr.number,
            source_branch: pr.source_branch,
            target_branch: pr.target_branch,
            title: pr.title,
        }
    }
}

impl From<RuleResponse> for ProtectionRule {
    fn from(r: RuleResponse) -> Self {
        // The wire format carries a pattern list; a rule flagged for the
        // default branch with no explicit includes covers every branch.
        let target_pattern = r
            .pattern
            .include
            .first()
            .cloned()
            .unwrap_or_else(|| if r.pattern.default_branch { "**" } else { "" }.to_string());
        Self {
            id: r.identifier,
            target_pattern,
            require_code_owner_review: r.definition.pullreq.approvals.require_code_owners,
            required_approval_count: r.definition.pullreq.approvals.require_minimum_count,
            bypass_users: r.definition.bypass.user_ids.into_iter().collect(),
            state: if r.state == "active" {
                RuleState::Active
            } else {
                RuleState::Disabled
            },
        }
    }
}

fn review_state_from_wire(decision: &str) -> ReviewState {
    match decision {
        "approved" => ReviewState::Approved,
        "changereq" => ReviewState::ChangesRequested,
        _ => ReviewState::Pending,
    }
}

const fn review_state_to_wire(state: ReviewState) -> &'static str {
    match state {
        ReviewState::Approved => "approved",
        ReviewState::ChangesRequested => "changereq",
        ReviewState::Pending => "pending",
    }
}

fn review_timestamp(unix_ms: Option<i64>) -> DateTime<Utc> {
    unix_ms
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_else(Utc::now)
}

impl RestHostingService {
    /// Create a new REST hosting service bound to one repository
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Api(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        let base = self.config.base_url.as_str().trim_end_matches('/');
        format!("{base}{path}")
    }

    fn encoded_repo(&self) -> String {
        urlencoding::encode(&self.config.repo).into_owned()
    }

    fn repo_url(&self, suffix: &str) -> String {
        self.api_url(&format!("/repos/{}{suffix}", self.encoded_repo()))
    }

    /// Surface non-success responses as `Error::Api` with the service's
    /// message when one is present.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.json::<ApiErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status.to_string(),
        };
        Err(Error::Api(format!("{status}: {message}")))
    }
}

#[async_trait]
impl HostingService for RestHostingService {
    async fn get_repository(&self) -> Result<RepositorySnapshot> {
        debug!(repo = %self.config.repo, "getting repository");
        let response = self
            .client
            .get(self.repo_url(""))
            .bearer_auth(&self.config.token)
            .send()
            .await?;

        let repo: RepoResponse = Self::check(response).await?.json().await?;
        debug!(importing = repo.importing, "got repository");
        Ok(repo.into())
    }

    async fn import_repository(&self, request: &ImportRequest) -> Result<()> {
        debug!(repo = %self.config.repo, provider_repo = %request.provider_repo, "importing repository");
        let payload = ImportPayload {
            identifier: &self.config.repo,
            request,
        };
        let response = self
            .client
            .post(self.api_url("/repos/import"))
            .bearer_auth(&self.config.token)
            .json(&payload)
            .send()
            .await?;

        Self::check(response).await?;
        debug!("import started");
        Ok(())
    }

    async fn delete_repository(&self) -> Result<()> {
        debug!(repo = %self.config.repo, "deleting repository");
        let response = self
            .client
            .delete(self.repo_url(""))
            .bearer_auth(&self.config.token)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn create_branch(&self, name: &str, target: &str) -> Result<Branch> {
        debug!(name, target, "creating branch");
        let response = self
            .client
            .post(self.repo_url("/branches"))
            .bearer_auth(&self.config.token)
            .json(&CreateBranchPayload { name, target })
            .send()
            .await?;

        let branch: BranchResponse = Self::check(response).await?.json().await?;
        Ok(branch.into())
    }

    async fn get_branch(&self, name: &str) -> Result<Branch> {
        debug!(name, "getting branch");
        let response = self
            .client
            .get(self.repo_url(&format!("/branches/{}", urlencoding::encode(name))))
            .bearer_auth(&self.config.token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::BranchNotFound(name.to_string()));
        }
        let branch: BranchResponse = Self::check(response).await?.json().await?;
        Ok(branch.into())
    }

    async fn delete_branch(&self, name: &str) -> Result<()> {
        debug!(name, "deleting branch");
        let response = self
            .client
            .delete(self.repo_url(&format!("/branches/{}", urlencoding::encode(name))))
            .bearer_auth(&self.config.token)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn create_tag(&self, name: &str, target: &str) -> Result<Tag> {
        debug!(name, target, "creating tag");
        let response = self
            .client
            .post(self.repo_url("/tags"))
            .bearer_auth(&self.config.token)
            .json(&CreateTagPayload { name, target })
            .send()
            .await?;

        let tag: TagResponse = Self::check(response).await?.json().await?;
        Ok(tag.into())
    }

    async fn list_tags(&self, query: Option<&str>) -> Result<Vec<Tag>> {
        debug!(query, "listing tags");
        let mut request = self
            .client
            .get(self.repo_url("/tags"))
            .bearer_auth(&self.config.token);
        if let Some(q) = query {
            request = request.query(&[("query", q)]);
        }
        let response = request.send().await?;

        let tags: Vec<TagResponse> = Self::check(response).await?.json().await?;
        debug!(count = tags.len(), "listed tags");
        Ok(tags.into_iter().map(Into::into).collect())
    }

    async fn delete_tag(&self, name: &str) -> Result<()> {
        debug!(name, "deleting tag");
        let response = self
            .client
            .delete(self.repo_url(&format!("/tags/{}", urlencoding::encode(name))))
            .bearer_auth(&self.config.token)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn commit_files(&self, request: &CommitFilesRequest) -> Result<CommitInfo> {
        debug!(
            branch = %request.branch,
            new_branch = ?request.new_branch,
            actions = request.actions.len(),
            "committing files"
        );
        let response = self
            .client
            .post(self.repo_url("/commits"))
            .bearer_auth(&self.config.token)
            .json(request)
            .send()
            .await?;

        let commit: CommitResponse = Self::check(response).await?.json().await?;
        debug!(commit_id = %commit.commit_id, "committed files");
        Ok(CommitInfo {
            commit_id: commit.commit_id,
        })
    }

    async fn create_pull_request(
        &self,
        source_branch: &str,
        target_branch: &str,
        title: &str,
    ) -> Result<PullRequest> {
        debug!(source_branch, target_branch, "creating pull request");
        let response = self
            .client
            .post(self.repo_url("/pullreq"))
            .bearer_auth(&self.config.token)
            .json(&CreatePullReqPayload {
                source_branch,
                target_branch,
                title,
            })
            .send()
            .await?;

        let pr: PullReqResponse = Self::check(response).await?.json().await?;
        debug!(number = pr.number, "created pull request");
        Ok(pr.into())
    }

    async fn review_pull_request(
        &self,
        number: u64,
        commit_sha: &str,
        state: ReviewState,
    ) -> Result<()> {
        debug!(number, %state, "reviewing pull request");
        let response = self
            .client
            .post(self.repo_url(&format!("/pullreq/{number}/reviews")))
            .bearer_auth(&self.config.token)
            .json(&ReviewPayload {
                commit_sha,
                decision: review_state_to_wire(state),
            })
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn get_pull_request_reviews(&self, number: u64) -> Result<Vec<ReviewDecision>> {
        debug!(number, "getting pull request reviews");
        let response = self
            .client
            .get(self.repo_url(&format!("/pullreq/{number}/reviews")))
            .bearer_auth(&self.config.token)
            .send()
            .await?;

        let reviews: Vec<ReviewResponse> = Self::check(response).await?.json().await?;
        debug!(count = reviews.len(), "got reviews");
        Ok(reviews
            .into_iter()
            .map(|r| ReviewDecision {
                reviewer: r.reviewer.display_name,
                state: review_state_from_wire(&r.decision),
                submitted_at: review_timestamp(r.created),
            })
            .collect())
    }

    async fn list_protection_rules(&self) -> Result<Vec<ProtectionRule>> {
        debug!(repo = %self.config.repo, "listing protection rules");
        let response = self
            .client
            .get(self.repo_url("/rules"))
            .bearer_auth(&self.config.token)
            .send()
            .await?;

        let rules: Vec<RuleResponse> = Self::check(response).await?.json().await?;
        debug!(count = rules.len(), "listed protection rules");
        Ok(rules.into_iter().map(Into::into).collect())
    }

    async fn create_protection_rule(&self, rule: &ProtectionRule) -> Result<()> {
        debug!(rule_id = %rule.id, "creating protection rule");
        let definition = serde_json::json!({
            "pullreq": {
                "approvals": {
                    "require_code_owners": rule.require_code_owner_review,
                    "require_minimum_count": rule.required_approval_count,
                }
            },
            "bypass": {
                "user_ids": rule.bypass_users.iter().collect::<Vec<_>>(),
            }
        });
        let payload = CreateRulePayload {
            identifier: &rule.id,
            kind: "branch",
            state: match rule.state {
                RuleState::Active => "active",
                RuleState::Disabled => "disabled",
            },
            pattern: CreateRulePattern {
                include: vec![&rule.target_pattern],
                default_branch: false,
            },
            definition,
        };
        let response = self
            .client
            .post(self.repo_url("/rules"))
            .bearer_auth(&self.config.token)
            .json(&payload)
            .send()
            .await?;

        Self::check(response).await?;
        debug!(rule_id = %rule.id, "created protection rule");
        Ok(())
    }

    async fn resolve_code_owners(&self, branch: &str) -> Result<CodeOwnersFile> {
        debug!(branch, "resolving code owners");
        let response = self
            .client
            .get(self.repo_url(&format!("/raw/{CODEOWNERS_PATH}")))
            .bearer_auth(&self.config.token)
            .query(&[("git_ref", format!("refs/heads/{branch}"))])
            .send()
            .await?;

        // A repository without an ownership file owns nothing.
        if response.status() == StatusCode::NOT_FOUND {
            debug!("no CODEOWNERS file on branch");
            return Ok(CodeOwnersFile::empty());
        }

        let content = Self::check(response).await?.text().await?;
        let owners = CodeOwnersFile::parse(&content)?;
        debug!(entries = owners.len(), "resolved code owners");
        Ok(owners)
    }

    async fn attempt_merge(
        &self,
        number: u64,
        method: MergeMethod,
        source_sha: &str,
    ) -> Result<MergeOutcome> {
        debug!(number, %method, "attempting merge");
        let response = self
            .client
            .post(self.repo_url(&format!("/pullreq/{number}/merge")))
            .bearer_auth(&self.config.token)
            .json(&MergePayload {
                method: match method {
                    MergeMethod::Merge => "merge",
                    MergeMethod::Squash => "squash",
                    MergeMethod::Rebase => "rebase",
                },
                source_sha,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: MergeResponse = response.json().await?;
            debug!(number, sha = ?body.sha, "merged");
            return Ok(MergeOutcome {
                merged: true,
                sha: body.sha,
                message: body.message,
            });
        }

        // The service is the final authority: a policy rejection (e.g. a
        // rule changed since the local verdict) is a normal negative
        // outcome, not a transport error.
        if status.is_client_error() {
            let message = match response.json::<ApiErrorBody>().await {
                Ok(body) => Some(body.message),
                Err(_) => Some(status.to_string()),
            };
            debug!(number, ?message, "merge rejected by service");
            return Ok(MergeOutcome {
                merged: false,
                sha: None,
                message,
            });
        }

        Err(Error::Api(format!("merge failed: {status}")))
    }

    fn config(&self) -> &ApiConfig {
        &self.config
    }
}
