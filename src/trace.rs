//! Trace building and context-switch accounting shared by every policy.
//!
//! The driver records exactly one [`Occupant`] per simulated tick; the
//! [`TraceBuilder`] coalesces runs of the same occupant into intervals. Whether a
//! dispatch pays a switch cost is decided in one place, the
//! [`SwitchAccountant`], so idle and switch accounting cannot drift between
//! policies.

use serde::{Serialize, Serializer};

use crate::core::{TaskId, Ticks};
use crate::error::InvariantViolation;
use crate::workload::Workload;

pub const IDLE_ID: &str = "IDLE";
pub const SWITCH_ID: &str = "SWITCH";

/// What the CPU did during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occupant {
    Task(TaskId),
    Idle,
    Switch,
}

/// A coalesced `[start, end)` span in task-index form, before ids are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub occupant: Occupant,
    pub start: Ticks,
    pub end: Ticks,
}

#[derive(Debug, Default)]
pub struct TraceBuilder {
    spans: Vec<Span>,
}

impl TraceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `occupant` for the tick `[at, at + 1)`.
    pub fn record(&mut self, occupant: Occupant, at: Ticks) {
        self.record_span(occupant, at, 1);
    }

    pub fn record_span(&mut self, occupant: Occupant, at: Ticks, ticks: Ticks) {
        if ticks == 0 {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.occupant == occupant && last.end == at => last.end += ticks,
            _ => self.spans.push(Span {
                occupant,
                start: at,
                end: at + ticks,
            }),
        }
    }

    pub fn finish(self) -> Vec<Span> {
        self.spans
    }
}

/// Decides the switch cost of each dispatch and keeps the totals.
///
/// The first dispatch of a run is free, re-dispatching the previous occupant is
/// free, and idle ticks in between do not reset the previous occupant.
#[derive(Debug)]
pub struct SwitchAccountant {
    cost: Ticks,
    last: Option<TaskId>,
    switches: u64,
    charged: Ticks,
}

impl SwitchAccountant {
    pub fn new(cost: Ticks) -> Self {
        Self {
            cost,
            last: None,
            switches: 0,
            charged: 0,
        }
    }

    pub fn last(&self) -> Option<TaskId> {
        self.last
    }

    /// Returns the ticks to charge before `next` may run.
    pub fn charge(&mut self, next: TaskId) -> Ticks {
        let cost = match self.last {
            Some(prev) if prev != next => self.cost,
            _ => 0,
        };
        if cost > 0 {
            self.switches += 1;
            self.charged += cost;
        }
        self.last = Some(next);
        cost
    }

    pub fn switches(&self) -> u64 {
        self.switches
    }

    pub fn charged(&self) -> Ticks {
        self.charged
    }
}

/// Interval subject: a process id, or one of the two CPU pseudo-states.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    Process(String),
    Idle,
    Switch,
}

impl Subject {
    pub fn as_str(&self) -> &str {
        match self {
            Subject::Process(id) => id,
            Subject::Idle => IDLE_ID,
            Subject::Switch => SWITCH_ID,
        }
    }

    pub fn is_process(&self) -> bool {
        matches!(self, Subject::Process(_))
    }
}

impl Serialize for Subject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub subject_id: Subject,
    pub start: Ticks,
    pub end: Ticks,
}

impl Interval {
    pub fn len(&self) -> Ticks {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Ordered execution intervals of one (algorithm, workload) run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Trace {
    intervals: Vec<Interval>,
}

impl Trace {
    pub fn new(intervals: Vec<Interval>) -> Self {
        Self { intervals }
    }

    /// Attaches process ids to spans produced by a run over `workload`.
    pub fn from_spans(spans: Vec<Span>, workload: &Workload) -> Self {
        let intervals = spans
            .into_iter()
            .map(|span| Interval {
                subject_id: match span.occupant {
                    Occupant::Task(task) => Subject::Process(workload.processes()[task].id.clone()),
                    Occupant::Idle => Subject::Idle,
                    Occupant::Switch => Subject::Switch,
                },
                start: span.start,
                end: span.end,
            })
            .collect();
        Self { intervals }
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn total_time(&self) -> Ticks {
        self.intervals.last().map_or(0, |i| i.end)
    }

    pub fn ticks_where(&self, pred: impl Fn(&Subject) -> bool) -> Ticks {
        self.intervals
            .iter()
            .filter(|i| pred(&i.subject_id))
            .map(Interval::len)
            .sum()
    }

    pub fn busy_ticks(&self) -> Ticks {
        self.ticks_where(Subject::is_process)
    }

    /// Intervals must be non-empty, contiguous, and cover exactly `[0, total_time)`.
    pub fn check_coverage(&self, total_time: Ticks) -> Result<(), InvariantViolation> {
        let first = self.intervals.first().ok_or(InvariantViolation::EmptyTrace)?;
        if first.start != 0 {
            return Err(InvariantViolation::LateStart { start: first.start });
        }

        let mut expected = 0;
        for interval in &self.intervals {
            if interval.start != expected {
                return Err(InvariantViolation::Discontinuity {
                    expected,
                    found: interval.start,
                });
            }
            if interval.is_empty() {
                return Err(InvariantViolation::EmptyInterval {
                    start: interval.start,
                    end: interval.end,
                });
            }
            expected = interval.end;
        }

        if expected != total_time {
            return Err(InvariantViolation::WrongEnd {
                expected: total_time,
                found: expected,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn interval(subject: Subject, start: Ticks, end: Ticks) -> Interval {
        Interval {
            subject_id: subject,
            start,
            end,
        }
    }

    #[test_log::test]
    fn builder_coalesces_consecutive_ticks() {
        let mut builder = TraceBuilder::new();
        builder.record(Occupant::Task(0), 0);
        builder.record(Occupant::Task(0), 1);
        builder.record_span(Occupant::Switch, 2, 2);
        builder.record(Occupant::Task(1), 4);
        builder.record(Occupant::Idle, 5);
        builder.record(Occupant::Idle, 6);
        builder.record(Occupant::Task(1), 7);

        assert_eq!(
            builder.finish(),
            vec![
                Span { occupant: Occupant::Task(0), start: 0, end: 2 },
                Span { occupant: Occupant::Switch, start: 2, end: 4 },
                Span { occupant: Occupant::Task(1), start: 4, end: 5 },
                Span { occupant: Occupant::Idle, start: 5, end: 7 },
                Span { occupant: Occupant::Task(1), start: 7, end: 8 },
            ]
        );
    }

    #[test_log::test]
    fn interval_length_and_emptiness() {
        let run = interval(Subject::Idle, 2, 10);
        assert_eq!(run.len(), 8);
        assert!(!run.is_empty());

        let empty = interval(Subject::Switch, 0, 0);
        assert_eq!(empty.len(), 0);
        assert!(empty.is_empty());
        assert_eq!(
            Trace::new(vec![empty]).check_coverage(0),
            Err(InvariantViolation::EmptyInterval { start: 0, end: 0 })
        );
    }

    #[test_log::test]
    fn zero_length_span_is_dropped() {
        let mut builder = TraceBuilder::new();
        builder.record_span(Occupant::Switch, 0, 0);
        assert!(builder.finish().is_empty());
    }

    #[test_log::test]
    fn first_dispatch_and_same_task_are_free() {
        let mut acct = SwitchAccountant::new(3);
        assert_eq!(acct.charge(0), 0);
        assert_eq!(acct.charge(0), 0);
        assert_eq!(acct.charge(1), 3);
        assert_eq!(acct.charge(0), 3);
        assert_eq!(acct.switches(), 2);
        assert_eq!(acct.charged(), 6);
        assert_eq!(acct.last(), Some(0));
    }

    #[test_log::test]
    fn zero_cost_never_counts_switches() {
        let mut acct = SwitchAccountant::new(0);
        acct.charge(0);
        acct.charge(1);
        assert_eq!(acct.switches(), 0);
    }

    #[test_log::test]
    fn coverage_accepts_contiguous_trace() {
        let trace = Trace::new(vec![
            interval(Subject::Process("P1".into()), 0, 2),
            interval(Subject::Idle, 2, 10),
            interval(Subject::Process("P2".into()), 10, 12),
        ]);
        assert_eq!(trace.check_coverage(12), Ok(()));
        assert_eq!(trace.busy_ticks(), 4);
        assert_eq!(trace.total_time(), 12);
    }

    #[test_log::test]
    fn coverage_rejects_gap_overlap_and_wrong_end() {
        let gap = Trace::new(vec![
            interval(Subject::Process("P1".into()), 0, 2),
            interval(Subject::Process("P2".into()), 3, 5),
        ]);
        assert_eq!(
            gap.check_coverage(5),
            Err(InvariantViolation::Discontinuity { expected: 2, found: 3 })
        );

        let overlap = Trace::new(vec![
            interval(Subject::Process("P1".into()), 0, 4),
            interval(Subject::Switch, 3, 5),
        ]);
        assert_eq!(
            overlap.check_coverage(5),
            Err(InvariantViolation::Discontinuity { expected: 4, found: 3 })
        );

        let late = Trace::new(vec![interval(Subject::Idle, 1, 2)]);
        assert_eq!(late.check_coverage(2), Err(InvariantViolation::LateStart { start: 1 }));

        let short = Trace::new(vec![interval(Subject::Idle, 0, 2)]);
        assert_eq!(
            short.check_coverage(3),
            Err(InvariantViolation::WrongEnd { expected: 3, found: 2 })
        );

        assert_eq!(Trace::new(vec![]).check_coverage(0), Err(InvariantViolation::EmptyTrace));
    }

    #[test_log::test]
    fn subjects_serialize_as_plain_ids() {
        let trace = Trace::new(vec![
            interval(Subject::Process("P1".into()), 0, 1),
            interval(Subject::Switch, 1, 2),
        ]);
        let json = serde_json::to_value(&trace).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"subjectId": "P1", "start": 0, "end": 1},
                {"subjectId": "SWITCH", "start": 1, "end": 2},
            ])
        );
    }
}
