//! Outcome accumulation for one reconciliation run.
//!
//! The report is a plain owned value: created empty by the engine, appended
//! to as keys resolve, returned whole to the caller. Nothing here talks to
//! the modem and nothing is persisted; summarizing and rendering are the
//! caller's business.

use core::fmt;

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::config::{KeyName, SectionName};

/// Upper bound on per-key outcomes retained in one report. Counters keep
/// running past this; only the per-key log saturates.
pub const MAX_OUTCOMES: usize = 32;

/// Why a key ended up `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Failure {
    /// Could not read the current value (retries exhausted).
    Query,
    /// The set command was rejected or never answered.
    Set,
    /// The set was accepted but the re-query does not show the declared
    /// value. Either the value is unsupported or the module applies it
    /// late; worth surfacing prominently.
    Verify,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Failure::Query => "query_error",
            Failure::Set => "set_error",
            Failure::Verify => "verify_mismatch",
        })
    }
}

/// Terminal state of one declared key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Already at the declared value; no write issued.
    Skipped,
    /// Written and verified.
    Changed,
    Failed(Failure),
    /// Key absent from the parameter catalog.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyOutcome {
    pub section: SectionName,
    pub key: KeyName,
    pub outcome: Outcome,
}

impl KeyOutcome {
    pub fn new(section: &str, key: &str, outcome: Outcome) -> Self {
        Self {
            section: clip(section),
            key: clip(key),
            outcome,
        }
    }
}

// Section/key names come from a DesiredConfig with matching capacities, so
// this only ever truncates hostile input.
fn clip<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Aggregate counts of one run. `checked` covers every key with a catalog
/// entry (skipped + changed + failed); unknown keys are tallied separately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Summary {
    pub checked: usize,
    pub changed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub unknown: usize,
}

impl Summary {
    /// Share of checked settings that needed no write, i.e. the flash-wear
    /// reduction figure.
    pub fn skipped_percent(&self) -> u32 {
        if self.checked == 0 {
            return 0;
        }
        (self.skipped * 100 / self.checked) as u32
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checked: {}, changed: {}, skipped: {}, failed: {}, unknown: {}",
            self.checked, self.changed, self.skipped, self.failed, self.unknown
        )
    }
}

/// Ordered per-key outcomes plus running counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Report {
    outcomes: Vec<KeyOutcome, MAX_OUTCOMES>,
    summary: Summary,
    truncated: bool,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one outcome and updates the running counts.
    pub fn record(&mut self, outcome: KeyOutcome) {
        match outcome.outcome {
            Outcome::Skipped => {
                self.summary.checked += 1;
                self.summary.skipped += 1;
            }
            Outcome::Changed => {
                self.summary.checked += 1;
                self.summary.changed += 1;
            }
            Outcome::Failed(_) => {
                self.summary.checked += 1;
                self.summary.failed += 1;
            }
            Outcome::Unknown => self.summary.unknown += 1,
        }
        if self.outcomes.push(outcome).is_err() {
            self.truncated = true;
        }
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    /// Every recorded outcome, in processing order.
    pub fn outcomes(&self) -> &[KeyOutcome] {
        &self.outcomes
    }

    /// Outcomes of one section, in processing order.
    pub fn outcomes_for<'a>(&'a self, section: &'a str) -> impl Iterator<Item = &'a KeyOutcome> {
        self.outcomes
            .iter()
            .filter(move |o| o.section.as_str() == section)
    }

    /// True when more outcomes were recorded than the per-key log holds;
    /// the counts in [`Report::summary`] are still complete.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}
