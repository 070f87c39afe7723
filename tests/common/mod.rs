//! Shared fixtures for gitgate tests

pub mod mock_service;

pub use mock_service::MockHostingService;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use gitgate::client::ApiConfig;
use gitgate::types::{
    ProtectionRule, PullRequestState, ReviewDecision, ReviewState, RuleState,
};
use std::collections::HashSet;

/// Config pointing at a dummy host, for mocks that never hit the network
pub fn test_config() -> ApiConfig {
    ApiConfig::new("https://code.example.test/api/v1", "test-token", "testrepo").unwrap()
}

/// An Active rule requiring `count` approvals on branches matching `pattern`
pub fn approval_rule(id: &str, pattern: &str, count: u32) -> ProtectionRule {
    ProtectionRule {
        id: id.to_string(),
        target_pattern: pattern.to_string(),
        require_code_owner_review: false,
        required_approval_count: count,
        bypass_users: HashSet::new(),
        state: RuleState::Active,
    }
}

/// An Active rule requiring code-owner review on branches matching `pattern`
pub fn code_owner_rule(id: &str, pattern: &str) -> ProtectionRule {
    ProtectionRule {
        id: id.to_string(),
        target_pattern: pattern.to_string(),
        require_code_owner_review: true,
        required_approval_count: 0,
        bypass_users: HashSet::new(),
        state: RuleState::Active,
    }
}

/// A review decision submitted `minutes` minutes after a fixed epoch
///
/// The fixed base makes supersession tests deterministic.
pub fn review_at(reviewer: &str, state: ReviewState, minutes: i64) -> ReviewDecision {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    ReviewDecision {
        reviewer: reviewer.to_string(),
        state,
        submitted_at: base + ChronoDuration::minutes(minutes),
    }
}

/// A pull request state with the given changed files and reviews recorded
pub fn pr_state(
    target_branch: &str,
    files: &[&str],
    reviews: Vec<ReviewDecision>,
) -> PullRequestState {
    let mut pr = PullRequestState::new(target_branch);
    for file in files {
        pr.add_changed_file(*file);
    }
    for review in reviews {
        pr.record_review(review);
    }
    pr
}
