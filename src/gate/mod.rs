//! Merge-gate rule engine
//!
//! Pure evaluation of whether a pull request may merge, given the
//! protection rules bound to its target branch and the repository's
//! ownership file. No I/O happens here - all data is passed in, making it
//! easy to unit test. Re-evaluation after any review mutation must be
//! recomputed from a fresh [`PullRequestState`]; verdicts are never cached.

mod owners;
mod pattern;

pub use owners::CodeOwnersFile;
pub use pattern::{BranchPattern, PathPattern};

use crate::error::{Error, Result};
use crate::types::{
    MergeVerdict, ProtectionRule, PullRequestState, ReviewState, RuleState, UnmetRule,
};
use tracing::debug;

/// A protection rule with its target pattern compiled
///
/// Produced by [`compile_rules`]; compilation is the load-time boundary
/// where malformed patterns are rejected, so evaluation itself never
/// parses patterns.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// The rule as configured
    pub rule: ProtectionRule,
    pattern: BranchPattern,
}

impl CompiledRule {
    /// Whether this rule applies to the given target branch
    pub fn applies_to(&self, target_branch: &str) -> bool {
        self.rule.state == RuleState::Active && self.pattern.matches(target_branch)
    }
}

/// Compile a set of protection rules, validating their target patterns
///
/// A malformed pattern is reported with the offending rule id and pattern
/// (a configuration error, spec'd to fail here rather than during
/// evaluation). Declaration order is preserved.
pub fn compile_rules(rules: Vec<ProtectionRule>) -> Result<Vec<CompiledRule>> {
    rules
        .into_iter()
        .map(|rule| {
            let pattern =
                BranchPattern::compile(&rule.target_pattern).map_err(|_| {
                    Error::InvalidRulePattern {
                        rule_id: rule.id.clone(),
                        pattern: rule.target_pattern.clone(),
                    }
                })?;
            Ok(CompiledRule { rule, pattern })
        })
        .collect()
}

/// Evaluate whether a pull request may merge (PURE - no I/O)
///
/// Selects the Active rules matching `pr.target_branch` and requires every
/// one of them to be satisfied independently. With no matching rule, merge
/// is permitted unconditionally. The verdict is deterministic given
/// identical inputs; unmet rules are listed in declaration order.
///
/// Returns `Err` only for malformed input (empty target branch, a reviews
/// map whose key disagrees with the decision it holds) - a blocked merge
/// is a normal negative verdict, not an error.
pub fn evaluate_merge(
    pr: &PullRequestState,
    rules: &[CompiledRule],
    owners: &CodeOwnersFile,
) -> Result<MergeVerdict> {
    validate_input(pr)?;

    let selected: Vec<&CompiledRule> = rules
        .iter()
        .filter(|r| r.applies_to(&pr.target_branch))
        .collect();

    if selected.is_empty() {
        debug!(target = %pr.target_branch, "no active rules match; merge permitted");
        return Ok(MergeVerdict::permitted());
    }

    let mut unmet_rules = Vec::new();
    for compiled in selected {
        let reasons = evaluate_rule(pr, &compiled.rule, owners);
        if !reasons.is_empty() {
            unmet_rules.push(UnmetRule {
                rule: compiled.rule.clone(),
                reasons,
            });
        }
    }

    let permitted = unmet_rules.is_empty();
    debug!(
        target = %pr.target_branch,
        permitted,
        unmet = unmet_rules.len(),
        "merge evaluated"
    );
    Ok(MergeVerdict {
        permitted,
        unmet_rules,
    })
}

fn validate_input(pr: &PullRequestState) -> Result<()> {
    if pr.target_branch.is_empty() {
        return Err(Error::Validation(
            "pull request has no target branch".to_string(),
        ));
    }
    for (key, decision) in &pr.reviews {
        if *key != decision.reviewer {
            return Err(Error::Validation(format!(
                "review map key '{key}' does not match reviewer '{}'",
                decision.reviewer
            )));
        }
    }
    Ok(())
}

/// Evaluate one rule; an empty reason list means satisfied
fn evaluate_rule(
    pr: &PullRequestState,
    rule: &ProtectionRule,
    owners: &CodeOwnersFile,
) -> Vec<String> {
    let mut reasons = Vec::new();

    // An outstanding ChangesRequested (latest decision per reviewer) makes
    // the rule unsatisfied regardless of approval count. Bypass membership
    // exempts only the count, not a blocking review.
    let mut blockers: Vec<&str> = pr
        .reviews
        .values()
        .filter(|d| d.state == ReviewState::ChangesRequested)
        .map(|d| d.reviewer.as_str())
        .collect();
    blockers.sort_unstable();
    for reviewer in blockers {
        reasons.push(format!("changes requested by '{reviewer}'"));
    }

    let approvals = pr
        .reviews
        .values()
        .filter(|d| d.state == ReviewState::Approved)
        .filter(|d| !rule.bypass_users.contains(&d.reviewer))
        .count();
    if approvals < rule.required_approval_count as usize {
        reasons.push(format!(
            "requires {} approval(s), have {approvals}",
            rule.required_approval_count
        ));
    }

    if rule.require_code_owner_review {
        for file in &pr.changed_files {
            let Some(entry) = owners.owners_for(file) else {
                // Unowned files never block.
                continue;
            };
            if entry.owners.is_empty() {
                continue;
            }
            let approved_by_owner = entry.owners.iter().any(|owner| {
                pr.reviews
                    .get(owner)
                    .is_some_and(|d| d.state == ReviewState::Approved)
            });
            if !approved_by_owner {
                let mut names: Vec<&str> = entry.owners.iter().map(String::as_str).collect();
                names.sort_unstable();
                reasons.push(format!(
                    "missing approval from an owner of '{file}' (owners: {})",
                    names.join(", ")
                ));
            }
        }
    }

    reasons
}
