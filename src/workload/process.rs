use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::core::Ticks;
use crate::error::ValidationError;
use crate::trace::{IDLE_ID, SWITCH_ID};

fn default_priority() -> i64 {
    1
}

/// A process as supplied by the caller, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    #[serde(alias = "pid", alias = "process")]
    pub id: String,
    pub arrival: i64,
    pub burst: i64,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default)]
    pub queue_level: i64,
}

impl ProcessSpec {
    pub fn new(id: impl Into<String>, arrival: i64, burst: i64, priority: i64) -> Self {
        Self {
            id: id.into(),
            arrival,
            burst,
            priority,
            queue_level: 0,
        }
    }
}

/// A validated process. Lower `priority` value means higher priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Process {
    pub id: String,
    pub arrival: Ticks,
    pub burst: Ticks,
    pub priority: u64,
    pub queue_level: usize,
}

/// The validated process set plus run parameters, read-only for every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    processes: Vec<Process>,
    context_switch: Ticks,
    time_quantum: Option<Ticks>,
    horizon: Ticks,
}

impl Workload {
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn context_switch(&self) -> Ticks {
        self.context_switch
    }

    pub fn time_quantum(&self) -> Option<Ticks> {
        self.time_quantum
    }

    pub fn total_burst(&self) -> Ticks {
        self.processes.iter().map(|p| p.burst).sum()
    }

    pub fn last_arrival(&self) -> Ticks {
        self.processes.iter().map(|p| p.arrival).max().unwrap_or(0)
    }

    /// Upper bound on the length of any run: `last_arrival + Σburst × (1 + context_switch) + 1`.
    pub fn horizon(&self) -> Ticks {
        self.horizon
    }
}

fn run_horizon(processes: &[Process], context_switch: Ticks) -> Result<Ticks, ValidationError> {
    let total_burst = processes
        .iter()
        .try_fold(0u64, |acc, p| acc.checked_add(p.burst))
        .ok_or(ValidationError::TickOverflow { field: "total burst" })?;
    let last_arrival = processes.iter().map(|p| p.arrival).max().unwrap_or(0);

    context_switch
        .checked_add(1)
        .and_then(|per_tick| total_burst.checked_mul(per_tick))
        .and_then(|busy| busy.checked_add(last_arrival))
        .and_then(|ticks| ticks.checked_add(1))
        .ok_or(ValidationError::TickOverflow { field: "run horizon" })
}

fn non_negative(value: i64, err: impl FnOnce(i64) -> ValidationError) -> Result<u64, ValidationError> {
    u64::try_from(value).map_err(|_| err(value))
}

fn positive(value: i64, err: impl FnOnce(i64) -> ValidationError) -> Result<u64, ValidationError> {
    match u64::try_from(value) {
        Ok(v) if v >= 1 => Ok(v),
        _ => Err(err(value)),
    }
}

/// Validates a raw process list and parameters into a [`Workload`].
///
/// Either the whole workload is valid or the first violation is returned; no
/// partial workload is produced. `time_quantum` may be absent; policies that
/// need it report that on their own entry.
pub fn validate(
    processes: &[ProcessSpec],
    context_switch: i64,
    time_quantum: Option<i64>,
) -> Result<Workload, ValidationError> {
    if processes.is_empty() {
        return Err(ValidationError::NoProcesses);
    }

    let context_switch = non_negative(context_switch, |value| {
        ValidationError::InvalidContextSwitch { value }
    })?;
    let time_quantum = time_quantum
        .map(|q| positive(q, |value| ValidationError::InvalidTimeQuantum { value }))
        .transpose()?;

    let mut seen = FxHashSet::default();
    let mut validated = Vec::with_capacity(processes.len());
    for (index, spec) in processes.iter().enumerate() {
        let id = spec.id.as_str();
        if id.trim().is_empty() {
            return Err(ValidationError::EmptyId { index });
        }
        if id == IDLE_ID || id == SWITCH_ID {
            return Err(ValidationError::ReservedId { id: id.to_string() });
        }
        if !seen.insert(id) {
            return Err(ValidationError::DuplicateId { id: id.to_string() });
        }

        let arrival = non_negative(spec.arrival, |value| ValidationError::InvalidArrival {
            id: id.to_string(),
            value,
        })?;
        let burst = positive(spec.burst, |value| ValidationError::InvalidBurst {
            id: id.to_string(),
            value,
        })?;
        let priority = positive(spec.priority, |value| ValidationError::InvalidPriority {
            id: id.to_string(),
            value,
        })?;
        let queue_level = non_negative(spec.queue_level, |value| {
            ValidationError::InvalidQueueLevel {
                id: id.to_string(),
                value,
            }
        })?;

        validated.push(Process {
            id: id.to_string(),
            arrival,
            burst,
            priority,
            queue_level: usize::try_from(queue_level).unwrap_or(usize::MAX),
        });
    }

    let horizon = run_horizon(&validated, context_switch)?;
    tracing::debug!(
        processes = validated.len(),
        context_switch,
        ?time_quantum,
        horizon,
        "workload validated"
    );

    Ok(Workload {
        processes: validated,
        context_switch,
        time_quantum,
        horizon,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn spec(id: &str, arrival: i64, burst: i64, priority: i64) -> ProcessSpec {
        ProcessSpec::new(id, arrival, burst, priority)
    }

    #[test_log::test]
    fn accepts_valid_workload_in_input_order() {
        let workload = validate(
            &[spec("B", 3, 2, 1), spec(" A ", 0, 5, 4)],
            2,
            Some(3),
        )
        .unwrap();

        assert_eq!(workload.len(), 2);
        assert_eq!(workload.context_switch(), 2);
        assert_eq!(workload.time_quantum(), Some(3));
        assert_eq!(workload.processes()[1].id, " A ");
        assert_eq!(workload.total_burst(), 7);
        assert_eq!(workload.last_arrival(), 3);
        assert_eq!(workload.horizon(), 3 + 7 * 3 + 1);
    }

    #[test_log::test]
    fn ids_are_kept_verbatim() {
        let workload = validate(&[spec("A", 0, 1, 1), spec(" A", 0, 1, 1)], 0, None).unwrap();
        let ids: Vec<_> = workload.processes().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["A", " A"]);
    }

    #[test_log::test]
    fn rejects_workloads_whose_length_overflows() {
        let huge = [
            spec("A", 0, i64::MAX, 1),
            spec("B", 0, i64::MAX, 1),
            spec("C", 0, i64::MAX, 1),
        ];
        assert_eq!(
            validate(&huge, 0, None),
            Err(ValidationError::TickOverflow { field: "total burst" })
        );

        let slow_switches = [spec("A", 0, i64::MAX, 1)];
        assert_eq!(
            validate(&slow_switches, 2, None),
            Err(ValidationError::TickOverflow { field: "run horizon" })
        );
    }

    #[test_log::test]
    fn rejects_each_bad_field_by_name() {
        let cases = [
            (vec![], 0, None, ValidationError::NoProcesses),
            (
                vec![spec("  ", 0, 1, 1)],
                0,
                None,
                ValidationError::EmptyId { index: 0 },
            ),
            (
                vec![spec("IDLE", 0, 1, 1)],
                0,
                None,
                ValidationError::ReservedId { id: "IDLE".into() },
            ),
            (
                vec![spec("P1", 0, 1, 1), spec("P1", 2, 1, 1)],
                0,
                None,
                ValidationError::DuplicateId { id: "P1".into() },
            ),
            (
                vec![spec("P1", -1, 1, 1)],
                0,
                None,
                ValidationError::InvalidArrival { id: "P1".into(), value: -1 },
            ),
            (
                vec![spec("P1", 0, 0, 1)],
                0,
                None,
                ValidationError::InvalidBurst { id: "P1".into(), value: 0 },
            ),
            (
                vec![spec("P1", 0, 1, 0)],
                0,
                None,
                ValidationError::InvalidPriority { id: "P1".into(), value: 0 },
            ),
            (
                vec![spec("P1", 0, 1, 1)],
                -2,
                None,
                ValidationError::InvalidContextSwitch { value: -2 },
            ),
            (
                vec![spec("P1", 0, 1, 1)],
                0,
                Some(0),
                ValidationError::InvalidTimeQuantum { value: 0 },
            ),
        ];

        for (processes, cs, quantum, expected) in cases {
            assert_eq!(validate(&processes, cs, quantum), Err(expected));
        }
    }

    #[test_log::test]
    fn error_message_names_field_and_value() {
        let err = validate(&[spec("P7", 0, -3, 1)], 0, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "process P7: field `burst` must be >= 1, got -3"
        );
    }

    #[test_log::test]
    fn deserializes_aliases_and_defaults() {
        let raw = r#"[{"pid": "P1", "arrival": 0, "burst": 4}]"#;
        let specs: Vec<ProcessSpec> = serde_json::from_str(raw).unwrap();
        assert_eq!(specs, vec![spec("P1", 0, 4, 1)]);
    }
}
