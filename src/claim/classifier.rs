//! Failure classification.
//!
//! The chain libraries hand back free-form error text rather than structured
//! codes, so classification is an ordered list of substring rules: the first
//! rule with a matching pattern wins and anything unmatched is `Unknown`.
//! Raw text never reaches the user; each category carries one fixed message.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::blockchain::submitter::SubmissionError;
use crate::blockchain::tracker::TrackingError;
use crate::config::schema::ClassifierRuleConfig;

/// User-facing failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureCategory {
    /// The code is invalid or was already redeemed.
    CodeAlreadyClaimed,
    /// Generic on-chain or pre-flight revert.
    TransactionReverted,
    /// The signing prompt was declined.
    UserRejected,
    /// The transaction did not reach finality before the deadline.
    TrackingTimeout,
    /// Anything else.
    Unknown,
}

impl FailureCategory {
    /// The one message shown for this category.
    pub const fn message(self) -> &'static str {
        match self {
            Self::CodeAlreadyClaimed => "QR Code has already been claimed.",
            Self::TransactionReverted => {
                "The transaction failed. Ensure you have sufficient funds and try again."
            }
            Self::UserRejected => "The signature request was declined in your wallet.",
            Self::TrackingTimeout => {
                "The transaction was not confirmed in time. Check the block explorer before trying again."
            }
            Self::Unknown => "An unexpected error occurred. Please try again later.",
        }
    }

    /// Label used for metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CodeAlreadyClaimed => "code_already_claimed",
            Self::TransactionReverted => "transaction_reverted",
            Self::UserRejected => "user_rejected",
            Self::TrackingTimeout => "tracking_timeout",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure, as carried by a `Failed` attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub category: FailureCategory,
    pub message: String,
}

impl From<FailureCategory> for ClassifiedError {
    fn from(category: FailureCategory) -> Self {
        Self {
            category,
            message: category.message().to_string(),
        }
    }
}

/// One classification rule: any pattern matching assigns `category`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRule {
    category: FailureCategory,
    /// Lowercased needles.
    patterns: Vec<String>,
}

impl ClassificationRule {
    pub fn new<I, S>(category: FailureCategory, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            category,
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    fn matches(&self, haystack: &str) -> bool {
        self.patterns.iter().any(|p| haystack.contains(p.as_str()))
    }
}

impl From<&ClassifierRuleConfig> for ClassificationRule {
    fn from(config: &ClassifierRuleConfig) -> Self {
        Self::new(config.category, &config.patterns)
    }
}

/// Ordered pattern-to-category mapping.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    rules: Vec<ClassificationRule>,
}

impl ErrorClassifier {
    /// Classifier with only the built-in rules.
    pub fn new() -> Self {
        Self {
            rules: builtin_rules(),
        }
    }

    /// Classifier whose `extra` rules take precedence over the built-ins.
    pub fn with_rules(extra: impl IntoIterator<Item = ClassificationRule>) -> Self {
        let mut rules: Vec<_> = extra.into_iter().collect();
        rules.extend(builtin_rules());
        Self { rules }
    }

    /// Build from configured extra rules.
    pub fn from_config(rules: &[ClassifierRuleConfig]) -> Self {
        Self::with_rules(rules.iter().map(ClassificationRule::from))
    }

    /// Map raw error text to a category and its message.
    pub fn classify(&self, raw: &str) -> ClassifiedError {
        let haystack = raw.to_lowercase();
        let category = self
            .rules
            .iter()
            .find(|rule| rule.matches(&haystack))
            .map_or(FailureCategory::Unknown, |rule| rule.category);
        category.into()
    }

    /// Classify a submission failure. A declined signature is known
    /// structurally; everything else goes through the text rules.
    pub fn classify_submission(&self, err: &SubmissionError) -> ClassifiedError {
        match err {
            SubmissionError::UserRejected(_) => FailureCategory::UserRejected.into(),
            other => self.classify(&other.to_string()),
        }
    }

    /// Classify a tracking failure.
    pub fn classify_tracking(&self, err: &TrackingError) -> ClassifiedError {
        match err {
            TrackingError::Timeout { .. } => FailureCategory::TrackingTimeout.into(),
            other => self.classify(&other.to_string()),
        }
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin_rules() -> Vec<ClassificationRule> {
    vec![
        ClassificationRule::new(
            FailureCategory::UserRejected,
            [
                "user rejected",
                "user denied",
                "rejected the request",
                "denied transaction signature",
            ],
        ),
        ClassificationRule::new(
            FailureCategory::CodeAlreadyClaimed,
            ["invalid code", "already claimed", "code already used"],
        ),
        ClassificationRule::new(
            FailureCategory::TransactionReverted,
            ["reverted", "insufficient funds"],
        ),
    ]
}
