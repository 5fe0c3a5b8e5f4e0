pub mod driver;

pub use driver::{Sim, SimOutcome};

use crate::{
    config::EngineConfig,
    error::{InvariantViolation, RunError},
    metrics,
    orchestrator::RunResult,
    scheduler::{
        Algorithm, FcfsScheduler, MlfqScheduler, MlqScheduler, PreemptivePriorityScheduler,
        PriorityScheduler, RoundRobinScheduler, SchedParams, Scheduler, SjfScheduler,
        SrtfScheduler,
    },
    trace::Trace,
    workload::Workload,
};

/// Runs one algorithm over `workload` and checks the result before deriving metrics.
pub fn run_algorithm(
    algorithm: Algorithm,
    workload: &Workload,
    config: &EngineConfig,
) -> Result<RunResult, RunError> {
    let params = SchedParams::new(workload, config);
    match algorithm {
        Algorithm::Fcfs => run_scheduler::<FcfsScheduler>(workload, &params),
        Algorithm::Sjf => run_scheduler::<SjfScheduler>(workload, &params),
        Algorithm::Srtf => run_scheduler::<SrtfScheduler>(workload, &params),
        Algorithm::Rr => run_scheduler::<RoundRobinScheduler>(workload, &params),
        Algorithm::Priority => run_scheduler::<PriorityScheduler>(workload, &params),
        Algorithm::PriorityPreemptive => run_scheduler::<PreemptivePriorityScheduler>(workload, &params),
        Algorithm::Mlq => run_scheduler::<MlqScheduler>(workload, &params),
        Algorithm::Mlfq => run_scheduler::<MlfqScheduler>(workload, &params),
    }
}

/// Runs a single policy type. [`run_algorithm`] dispatches here by name.
pub fn run_scheduler<S: Scheduler>(
    workload: &Workload,
    params: &SchedParams,
) -> Result<RunResult, RunError> {
    let sim = Sim::<S>::new(workload, params)?;
    tracing::debug!(
        algorithm = %S::ALGORITHM,
        processes = workload.len(),
        horizon = sim.horizon(),
        "run started"
    );
    let outcome = sim.run()?;

    let trace = Trace::from_spans(outcome.spans, workload);
    trace.check_coverage(outcome.total_time)?;
    let (metrics, per_process) = metrics::aggregate(&trace, workload)?;

    for (process, &engine) in per_process.iter().zip(&outcome.completions) {
        if process.completion != engine {
            return Err(InvariantViolation::CompletionMismatch {
                id: process.id.clone(),
                engine,
                trace: process.completion,
            }
            .into());
        }
    }
    debug_assert_eq!(metrics.context_switches, outcome.context_switches);

    Ok(RunResult {
        trace,
        metrics,
        per_process,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{QueueId, SimCtx, TaskId};
    use crate::error::PolicyConfigurationError;
    use crate::scheduler::{Dispatch, EnqueueFlags};
    use crate::workload::{validate, ProcessSpec};
    use similar_asserts::assert_eq;

    /// Accepts tasks and never hands one out.
    struct NeverDispatch {
        queue: QueueId,
    }

    impl Scheduler for NeverDispatch {
        const ALGORITHM: Algorithm = Algorithm::Fcfs;

        fn init(ctx: &mut SimCtx, _params: &SchedParams) -> Result<Self, PolicyConfigurationError> {
            Ok(Self {
                queue: ctx.create_queue_fifo(0),
            })
        }

        fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, flags: EnqueueFlags) {
            ctx.queue_push_fifo(self.queue, task, flags);
        }

        fn dispatch(&mut self, _ctx: &mut SimCtx) -> Option<Dispatch> {
            None
        }
    }

    fn workload() -> Workload {
        validate(&[ProcessSpec::new("P1", 0, 3, 1)], 0, None).unwrap()
    }

    #[test_log::test]
    fn sim_stops_at_horizon_when_nothing_is_dispatched() {
        let workload = workload();
        let sim = Sim::<NeverDispatch>::new(&workload, &SchedParams::default()).unwrap();
        assert_eq!(sim.horizon(), 4);

        let err = sim.run().unwrap_err();
        assert_eq!(
            err,
            InvariantViolation::Stalled {
                horizon: 4,
                pending: 1
            }
        );
    }

    #[test_log::test]
    fn stalled_policy_fails_alone() {
        let workload = workload();
        let params = SchedParams::new(&workload, &EngineConfig::default());

        let err = run_scheduler::<NeverDispatch>(&workload, &params).unwrap_err();
        assert_eq!(
            err,
            RunError::Invariant(InvariantViolation::Stalled {
                horizon: 4,
                pending: 1
            })
        );

        for algorithm in [Algorithm::Fcfs, Algorithm::Sjf, Algorithm::Priority] {
            let result = run_algorithm(algorithm, &workload, &EngineConfig::default()).unwrap();
            assert_eq!(result.metrics.total_time, 3);
        }
    }
}
