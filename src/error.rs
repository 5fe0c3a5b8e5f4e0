use std::path::PathBuf;

use crate::core::Ticks;
use crate::scheduler::Algorithm;

/// Malformed or out-of-range workload or parameters. The simulation never starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("workload must contain at least one process")]
    NoProcesses,

    #[error("at least one algorithm must be requested")]
    NoAlgorithms,

    #[error("process #{index}: field `id` must be non-empty")]
    EmptyId { index: usize },

    #[error("process {id}: field `id` is reserved for trace intervals")]
    ReservedId { id: String },

    #[error("process {id}: field `id` is duplicated")]
    DuplicateId { id: String },

    #[error("process {id}: field `arrival` must be >= 0, got {value}")]
    InvalidArrival { id: String, value: i64 },

    #[error("process {id}: field `burst` must be >= 1, got {value}")]
    InvalidBurst { id: String, value: i64 },

    #[error("process {id}: field `priority` must be >= 1, got {value}")]
    InvalidPriority { id: String, value: i64 },

    #[error("process {id}: field `queue_level` must be >= 0, got {value}")]
    InvalidQueueLevel { id: String, value: i64 },

    #[error("field `context_switch` must be >= 0, got {value}")]
    InvalidContextSwitch { value: i64 },

    #[error("field `time_quantum` must be >= 1, got {value}")]
    InvalidTimeQuantum { value: i64 },

    #[error("workload too long to simulate: {field} overflows a 64-bit tick count")]
    TickOverflow { field: &'static str },

    #[error("generator range `{field}` is empty or out of bounds: {start}..={end}")]
    InvalidRange {
        field: &'static str,
        start: i64,
        end: i64,
    },

    #[error("generator probability `{field}` is outside {range}")]
    InvalidProbability {
        field: &'static str,
        range: &'static str,
    },
}

/// A policy was requested without a parameter it needs. Scoped to that policy's entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyConfigurationError {
    #[error("{algorithm} requires `time_quantum`")]
    MissingTimeQuantum { algorithm: Algorithm },

    #[error("{algorithm} requires at least one level, got {levels}")]
    InvalidLevelCount { algorithm: Algorithm, levels: usize },

    #[error("{algorithm}: explicit quanta list is empty")]
    EmptyQuanta { algorithm: Algorithm },

    #[error("{algorithm}: quantum of level {level} must be >= 1")]
    ZeroQuantum { algorithm: Algorithm, level: usize },

    #[error("{algorithm}: boost period must be >= 1")]
    ZeroBoostPeriod { algorithm: Algorithm },

    #[error("{algorithm}: process {id} has queue_level {level}, but only {levels} levels exist")]
    QueueLevelOutOfRange {
        algorithm: Algorithm,
        id: String,
        level: usize,
        levels: usize,
    },
}

/// A completed run failed a trace or metric invariant. Always an engine bug.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("trace is empty")]
    EmptyTrace,

    #[error("trace does not start at tick 0 (first interval starts at {start})")]
    LateStart { start: Ticks },

    #[error("trace has a gap or overlap at tick {expected}: next interval starts at {found}")]
    Discontinuity { expected: Ticks, found: Ticks },

    #[error("trace interval [{start}, {end}) is empty or reversed")]
    EmptyInterval { start: Ticks, end: Ticks },

    #[error("trace ends at {found}, expected total time {expected}")]
    WrongEnd { expected: Ticks, found: Ticks },

    #[error("trace refers to unknown process {id}")]
    UnknownSubject { id: String },

    #[error("process {id} ran {ran} ticks but has burst {burst}")]
    BurstMismatch { id: String, ran: Ticks, burst: Ticks },

    #[error("process {id}: {metric} would be negative")]
    NegativeMetric { id: String, metric: &'static str },

    #[error("process {id}: engine completed it at {engine}, trace ends it at {trace}")]
    CompletionMismatch { id: String, engine: Ticks, trace: Ticks },

    #[error("run exceeded its horizon of {horizon} ticks with {pending} processes unfinished")]
    Stalled { horizon: Ticks, pending: usize },
}

/// Failure of a single algorithm's run; sibling runs are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Configuration(#[from] PolicyConfigurationError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown algorithm `{0}`, expected one of FCFS, SJF, SRTF, RR, Priority, PriorityPreemptive, MLQ, MLFQ")]
pub struct UnknownAlgorithm(pub String);

/// Reading a request or config file.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {} as JSON", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse {} as YAML", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
