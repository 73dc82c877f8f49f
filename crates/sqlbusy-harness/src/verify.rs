// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-run verification of persisted rows.
//!
//! For every thread within a run, sequences must be at least 1, strictly
//! increasing in insertion (id) order, and no larger than an optional maximum.
//! Each run restarts every writer's counter, so rows from different runs are
//! never compared. Gaps are collected separately: they are expected whenever a
//! constraint error was tolerated or a deleter purged rows mid-run.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlbusy_core::StressRecord;
use thiserror::Error;

/// A broken invariant in the persisted rows.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum Violation {
    #[error("thread {thread}: row {id} has sequence {sequence} after {previous}")]
    NotIncreasing {
        thread: i64,
        id: i64,
        previous: i64,
        sequence: i64,
    },
    #[error("thread {thread}: row {id} has sequence {sequence} below 1")]
    BelowMinimum { thread: i64, id: i64, sequence: i64 },
    #[error("thread {thread}: row {id} has sequence {sequence} above {max}")]
    AboveMaximum {
        thread: i64,
        id: i64,
        sequence: i64,
        max: i64,
    },
}

/// A jump in a thread's sequence between two consecutive rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gap {
    pub thread: i64,
    pub after: i64,
    pub next: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
    pub thread: i64,
    pub rows: u64,
    pub first: i64,
    pub last: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Verification {
    /// Ordered by run, then thread.
    pub threads: Vec<ThreadSummary>,
    pub violations: Vec<Violation>,
    pub gaps: Vec<Gap>,
}

impl Verification {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn summary_for(&self, run: Option<&str>, thread: i64) -> Option<&ThreadSummary> {
        self.threads
            .iter()
            .find(|t| t.thread == thread && t.run.as_deref() == run)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for t in &self.threads {
            if let Some(run) = &t.run {
                out.push_str(&format!("run {run} "));
            }
            out.push_str(&format!(
                "thread {}: {} rows, sequences {}..={}\n",
                t.thread, t.rows, t.first, t.last
            ));
        }
        for gap in &self.gaps {
            out.push_str(&format!(
                "gap: thread {} jumps from {} to {}\n",
                gap.thread, gap.after, gap.next
            ));
        }
        for violation in &self.violations {
            out.push_str(&format!("violation: {violation}\n"));
        }
        out.push_str(if self.is_ok() {
            "verification passed\n"
        } else {
            "verification failed\n"
        });
        out
    }
}

/// Check per-thread sequence invariants over `records`.
pub fn verify_records(records: &[StressRecord], max_sequence: Option<i64>) -> Verification {
    let mut by_id: Vec<&StressRecord> = records.iter().collect();
    by_id.sort_by_key(|r| r.id);

    let mut result = Verification::default();
    let mut threads: BTreeMap<(Option<&str>, i64), ThreadSummary> = BTreeMap::new();

    for record in by_id {
        let (thread, sequence, id) = (record.thread, record.sequence, record.id);
        let key = (record.run.as_deref(), thread);

        if sequence < 1 {
            result.violations.push(Violation::BelowMinimum {
                thread,
                id,
                sequence,
            });
        }
        if let Some(max) = max_sequence.filter(|max| sequence > *max) {
            result.violations.push(Violation::AboveMaximum {
                thread,
                id,
                sequence,
                max,
            });
        }

        let previous = threads.get(&key).map(|t| t.last);
        match previous {
            Some(previous) if sequence <= previous => {
                result.violations.push(Violation::NotIncreasing {
                    thread,
                    id,
                    previous,
                    sequence,
                });
            }
            Some(previous) if sequence > previous + 1 => result.gaps.push(Gap {
                thread,
                after: previous,
                next: sequence,
            }),
            _ => {}
        }

        threads
            .entry(key)
            .and_modify(|t| {
                t.rows += 1;
                t.last = sequence;
            })
            .or_insert_with(|| ThreadSummary {
                run: record.run.clone(),
                thread,
                rows: 1,
                first: sequence,
                last: sequence,
            });
    }

    result.threads = threads.into_values().collect();
    result
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn rows(pairs: &[(i64, i64)]) -> Vec<StressRecord> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, (thread, sequence))| StressRecord {
                id: i as i64 + 1,
                thread: *thread,
                sequence: *sequence,
                created_at: None,
                run: None,
            })
            .collect()
    }

    #[test]
    fn interleaved_increasing_sequences_pass() {
        let v = verify_records(&rows(&[(2, 1), (3, 1), (2, 2), (3, 2), (2, 3)]), Some(1000));
        assert!(v.is_ok());
        assert!(v.gaps.is_empty());
        assert_eq!(v.summary_for(None, 2).unwrap().rows, 3);
        assert_eq!(v.summary_for(None, 3).unwrap().last, 2);
    }

    #[test]
    fn skipped_sequence_is_a_gap_not_a_violation() {
        let v = verify_records(&rows(&[(2, 499), (2, 501)]), None);
        assert!(v.is_ok());
        assert_eq!(
            v.gaps,
            vec![Gap {
                thread: 2,
                after: 499,
                next: 501
            }]
        );
    }

    #[test]
    fn repeated_or_out_of_range_sequences_are_violations() {
        let v = verify_records(&rows(&[(2, 0), (2, 5), (2, 5), (2, 1001)]), Some(1000));
        assert!(!v.is_ok());
        assert!(v.violations.iter().any(|x| matches!(x, Violation::BelowMinimum { .. })));
        assert!(v.violations.iter().any(|x| matches!(x, Violation::NotIncreasing { .. })));
        assert!(v.violations.iter().any(|x| matches!(x, Violation::AboveMaximum { .. })));
        assert!(v.render_text().contains("verification failed"));
    }

    #[test]
    fn each_run_restarts_the_sequence() {
        let mut records = rows(&[(2, 1), (2, 2), (2, 1), (2, 2)]);
        for (record, run) in records.iter_mut().zip(["a", "a", "b", "b"]) {
            record.run = Some(run.to_string());
        }

        let v = verify_records(&records, Some(2));
        assert!(v.is_ok(), "{}", v.render_text());
        assert_eq!(v.threads.len(), 2);
        assert_eq!(v.summary_for(Some("b"), 2).unwrap().first, 1);
        assert!(v.render_text().contains("run a thread 2: 2 rows"));

        // Within one run a restart is still a violation.
        records[2].run = Some("a".to_string());
        let v = verify_records(&records, Some(2));
        assert!(matches!(
            v.violations.as_slice(),
            [Violation::NotIncreasing { id: 3, previous: 2, sequence: 1, .. }]
        ));
    }

    #[test]
    fn order_is_taken_from_ids_not_input_order() {
        let mut records = rows(&[(2, 1), (2, 2)]);
        records.reverse();
        assert!(verify_records(&records, None).is_ok());
    }

    proptest! {
        #[test]
        fn increasing_sequences_never_violate(steps in prop::collection::vec(1i64..5, 1..200)) {
            let mut sequence = 0;
            let pairs: Vec<(i64, i64)> = steps
                .iter()
                .map(|step| {
                    sequence += step;
                    (7, sequence)
                })
                .collect();
            let v = verify_records(&rows(&pairs), None);
            prop_assert!(v.is_ok());
            prop_assert_eq!(v.summary_for(None, 7).unwrap().rows, pairs.len() as u64);
        }
    }
}
