pub mod fcfs;
pub mod mlfq;
pub mod mlq;
pub mod priority;
pub mod round_robin;
pub mod sjf;
pub mod srtf;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, MlfqConfig, MlqConfig};
use crate::core::{SimCtx, TaskId, Ticks};
use crate::error::{PolicyConfigurationError, UnknownAlgorithm};
use crate::workload::Workload;
pub use fcfs::FcfsScheduler;
pub use mlfq::MlfqScheduler;
pub use mlq::MlqScheduler;
pub use priority::{PreemptivePriorityScheduler, PriorityScheduler};
pub use round_robin::RoundRobinScheduler;
pub use sjf::SjfScheduler;
pub use srtf::SrtfScheduler;

pub type EnqueueFlags = u64;

// Task became ready for the first time
pub const ENQ_WAKEUP: EnqueueFlags = 1 << 0;
// Task was displaced by a better candidate before its slice ended
pub const ENQ_PREEMPT: EnqueueFlags = 1 << 1;
// Task used up its slice without finishing
pub const ENQ_SLICE_EXPIRED: EnqueueFlags = 1 << 2;
// Task was moved back to the top level by a priority boost
pub const ENQ_BOOST: EnqueueFlags = 1 << 3;

/// Dispatch decision: who runs next and for how long (`None` = until completion).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub task: TaskId,
    pub slice: Option<Ticks>,
}

impl Dispatch {
    pub fn to_completion(task: TaskId) -> Self {
        Self { task, slice: None }
    }

    pub fn for_slice(task: TaskId, slice: Ticks) -> Self {
        Self {
            task,
            slice: Some(slice),
        }
    }
}

/// Per-run parameters a policy may need.
#[derive(Debug, Clone, Default)]
pub struct SchedParams {
    pub time_quantum: Option<Ticks>,
    pub mlfq: MlfqConfig,
    pub mlq: MlqConfig,
}

impl SchedParams {
    pub fn new(workload: &Workload, config: &EngineConfig) -> Self {
        Self {
            time_quantum: workload.time_quantum(),
            mlfq: config.mlfq.clone(),
            mlq: config.mlq.clone(),
        }
    }
}

/// A dispatch-decision policy plugged into the shared tick loop.
///
/// The driver owns the clock, the CPU, the trace and the switch accounting. A
/// policy only decides where ready tasks wait, who runs next, and whether the
/// running task should give way.
pub trait Scheduler: Sized {
    const ALGORITHM: Algorithm;

    fn init(ctx: &mut SimCtx, params: &SchedParams) -> Result<Self, PolicyConfigurationError>;

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, flags: EnqueueFlags);

    fn dispatch(&mut self, ctx: &mut SimCtx) -> Option<Dispatch>;

    /// Asked at each tick boundary once the running task has executed at least one tick.
    fn should_preempt(&self, _ctx: &SimCtx, _running: TaskId) -> bool {
        false
    }

    /// Called at the start of every tick, after arrivals.
    fn advance(&mut self, _ctx: &mut SimCtx) {}

    /// Called after the running task consumed a tick.
    fn tick(&mut self, _ctx: &mut SimCtx, _task: TaskId) {}
}

pub(crate) fn require_quantum(
    params: &SchedParams,
    algorithm: Algorithm,
) -> Result<Ticks, PolicyConfigurationError> {
    params
        .time_quantum
        .ok_or(PolicyConfigurationError::MissingTimeQuantum { algorithm })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    Fcfs,
    Sjf,
    Srtf,
    Rr,
    Priority,
    PriorityPreemptive,
    Mlq,
    Mlfq,
}

impl Algorithm {
    pub const ALL: [Algorithm; 8] = [
        Algorithm::Fcfs,
        Algorithm::Sjf,
        Algorithm::Srtf,
        Algorithm::Rr,
        Algorithm::Priority,
        Algorithm::PriorityPreemptive,
        Algorithm::Mlq,
        Algorithm::Mlfq,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Fcfs => "FCFS",
            Algorithm::Sjf => "SJF",
            Algorithm::Srtf => "SRTF",
            Algorithm::Rr => "RR",
            Algorithm::Priority => "Priority",
            Algorithm::PriorityPreemptive => "PriorityPreemptive",
            Algorithm::Mlq => "MLQ",
            Algorithm::Mlfq => "MLFQ",
        }
    }

    pub fn is_preemptive(&self) -> bool {
        matches!(
            self,
            Algorithm::Srtf | Algorithm::Rr | Algorithm::PriorityPreemptive | Algorithm::Mlfq
        )
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_uppercase)
            .collect();
        match normalized.as_str() {
            "FCFS" => Ok(Algorithm::Fcfs),
            "SJF" => Ok(Algorithm::Sjf),
            "SRTF" => Ok(Algorithm::Srtf),
            "RR" | "ROUNDROBIN" => Ok(Algorithm::Rr),
            "PRIORITY" => Ok(Algorithm::Priority),
            "PRIORITYPREEMPTIVE" => Ok(Algorithm::PriorityPreemptive),
            "MLQ" => Ok(Algorithm::Mlq),
            "MLFQ" => Ok(Algorithm::Mlfq),
            _ => Err(UnknownAlgorithm(s.to_string())),
        }
    }
}

impl TryFrom<String> for Algorithm {
    type Error = UnknownAlgorithm;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Algorithm> for String {
    fn from(value: Algorithm) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn parses_identifiers_loosely() {
        assert_eq!("fcfs".parse(), Ok(Algorithm::Fcfs));
        assert_eq!(" RR ".parse(), Ok(Algorithm::Rr));
        assert_eq!("priority".parse(), Ok(Algorithm::Priority));
        assert_eq!("priority-preemptive".parse(), Ok(Algorithm::PriorityPreemptive));
        assert_eq!("PRIORITY_PREEMPTIVE".parse(), Ok(Algorithm::PriorityPreemptive));
        assert_eq!("Mlfq".parse(), Ok(Algorithm::Mlfq));
        assert_eq!(
            "lottery".parse::<Algorithm>(),
            Err(UnknownAlgorithm("lottery".to_string()))
        );
    }

    #[test_log::test]
    fn display_round_trips_for_every_algorithm() {
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.to_string().parse(), Ok(algorithm));
        }
    }

    #[test_log::test]
    fn serde_uses_display_names() {
        let json = serde_json::to_string(&[Algorithm::Priority, Algorithm::Mlfq]).unwrap();
        assert_eq!(json, r#"["Priority","MLFQ"]"#);
        let back: Vec<Algorithm> = serde_json::from_str(r#"["srtf","Rr"]"#).unwrap();
        assert_eq!(back, vec![Algorithm::Srtf, Algorithm::Rr]);
    }
}
