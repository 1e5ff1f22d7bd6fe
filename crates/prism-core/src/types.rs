//! Outcome types reported by the derivative pipeline.
//!
//! Blacklist hits, invalid inputs and "already stored" skips are ordinary
//! outcomes, not errors, so callers can count and log them uniformly.
//! Everything here is `Serialize` for callers that emit JSON logs.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pipeline::ContentHash;

/// Result of processing one source image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessOutcome {
    /// Original and derivatives are in the store
    Stored {
        /// Content hash, also the image id
        hash: ContentHash,
        /// Storage key of the original
        key: String,
        /// What happened to the original
        original: OriginalOutcome,
        /// One report per derivative, in declaration order
        derivatives: Vec<DerivativeReport>,
    },

    /// Content hash is blacklisted; nothing was stored
    Blacklisted { hash: ContentHash },

    /// Zero-sized image; nothing was hashed or stored
    Invalid,
}

impl ProcessOutcome {
    /// Content hash, when one was computed.
    pub fn hash(&self) -> Option<&ContentHash> {
        match self {
            ProcessOutcome::Stored { hash, .. } | ProcessOutcome::Blacklisted { hash } => {
                Some(hash)
            }
            ProcessOutcome::Invalid => None,
        }
    }

    /// Derivative reports; empty unless stored.
    pub fn derivatives(&self) -> &[DerivativeReport] {
        match self {
            ProcessOutcome::Stored { derivatives, .. } => derivatives,
            _ => &[],
        }
    }
}

/// What happened to the original during `process`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginalOutcome {
    /// Encoded and written
    Stored,
    /// Key already existed and `force` was off
    AlreadyPresent,
    /// `save_original` was off
    Suppressed,
}

/// What happened to a single derivative key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivativeOutcome {
    /// Transform chain ran and the result was stored
    Generated,
    /// Key already existed and `force` was off
    Skipped,
}

/// Per-derivative entry of a [`ProcessOutcome::Stored`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivativeReport {
    pub key: String,
    pub outcome: DerivativeOutcome,
}

/// Running counters over many `process` calls.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProcessingStats {
    /// Images that passed the blacklist and had their derivatives checked,
    /// whether or not the original was written this time
    pub processed: usize,

    /// Images dropped by the blacklist
    pub blacklisted: usize,

    /// Zero-sized images
    pub invalid: usize,

    /// Derivatives generated
    pub generated: usize,

    /// Derivatives skipped because they already existed
    pub skipped: usize,
}

impl ProcessingStats {
    /// Fold one outcome into the counters.
    pub fn record(&mut self, outcome: &ProcessOutcome) {
        match outcome {
            ProcessOutcome::Stored { derivatives, .. } => {
                self.processed += 1;
                for report in derivatives {
                    match report.outcome {
                        DerivativeOutcome::Generated => self.generated += 1,
                        DerivativeOutcome::Skipped => self.skipped += 1,
                    }
                }
            }
            ProcessOutcome::Blacklisted { .. } => self.blacklisted += 1,
            ProcessOutcome::Invalid => self.invalid += 1,
        }
    }
}

impl fmt::Display for ProcessingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} blacklisted, {} invalid; derivatives: {} generated, {} skipped",
            self.processed, self.blacklisted, self.invalid, self.generated, self.skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash() -> ContentHash {
        ContentHash::parse("abc123").unwrap()
    }

    fn stored() -> ProcessOutcome {
        ProcessOutcome::Stored {
            hash: hash(),
            key: "users/abc123".to_string(),
            original: OriginalOutcome::Stored,
            derivatives: vec![
                DerivativeReport {
                    key: "users/abc123(120x80)".to_string(),
                    outcome: DerivativeOutcome::Generated,
                },
                DerivativeReport {
                    key: "users/abc123(20x10)".to_string(),
                    outcome: DerivativeOutcome::Skipped,
                },
            ],
        }
    }

    #[test]
    fn test_outcome_json_is_tagged() {
        let json = serde_json::to_string(&stored()).unwrap();
        assert!(json.contains("\"status\":\"stored\""));
        assert!(json.contains("\"hash\":\"abc123\""));
        assert!(json.contains("\"outcome\":\"skipped\""));

        let parsed: ProcessOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, stored());
    }

    #[test]
    fn test_blacklisted_json() {
        let json = serde_json::to_string(&ProcessOutcome::Blacklisted { hash: hash() }).unwrap();
        assert_eq!(json, r#"{"status":"blacklisted","hash":"abc123"}"#);
        assert_eq!(
            serde_json::to_string(&ProcessOutcome::Invalid).unwrap(),
            r#"{"status":"invalid"}"#
        );
    }

    #[test]
    fn test_outcome_accessors() {
        assert_eq!(stored().hash(), Some(&hash()));
        assert_eq!(stored().derivatives().len(), 2);
        assert!(ProcessOutcome::Invalid.hash().is_none());
        assert!(ProcessOutcome::Invalid.derivatives().is_empty());
    }

    #[test]
    fn test_stats_record() {
        let mut stats = ProcessingStats::default();
        stats.record(&stored());
        stats.record(&ProcessOutcome::Blacklisted { hash: hash() });
        stats.record(&ProcessOutcome::Invalid);

        assert_eq!(
            stats,
            ProcessingStats {
                processed: 1,
                blacklisted: 1,
                invalid: 1,
                generated: 1,
                skipped: 1,
            }
        );
        assert_eq!(
            stats.to_string(),
            "1 processed, 1 blacklisted, 1 invalid; derivatives: 1 generated, 1 skipped"
        );
    }

    #[test]
    fn test_stats_count_processed_without_original_write() {
        let mut stats = ProcessingStats::default();
        for original in [OriginalOutcome::AlreadyPresent, OriginalOutcome::Suppressed] {
            stats.record(&ProcessOutcome::Stored {
                hash: hash(),
                key: "users/abc123".to_string(),
                original,
                derivatives: vec![],
            });
        }
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.generated, 0);
    }
}
