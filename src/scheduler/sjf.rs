use super::{Algorithm, Dispatch, EnqueueFlags, SchedParams, Scheduler};
use crate::core::{QueueId, Rank, SimCtx, TaskId};
use crate::error::PolicyConfigurationError;

/// Non-preemptive shortest job first, keyed on the full burst.
pub struct SjfScheduler {
    ready: QueueId,
}

impl Scheduler for SjfScheduler {
    const ALGORITHM: Algorithm = Algorithm::Sjf;

    fn init(ctx: &mut SimCtx, _params: &SchedParams) -> Result<Self, PolicyConfigurationError> {
        Ok(Self {
            ready: ctx.create_queue_priq(0),
        })
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, flags: EnqueueFlags) {
        let rank = Rank::new(ctx.task(task).burst, ctx.task(task));
        ctx.queue_push_priq(self.ready, task, rank, flags);
    }

    fn dispatch(&mut self, ctx: &mut SimCtx) -> Option<Dispatch> {
        ctx.queue_pop(self.ready).map(Dispatch::to_completion)
    }
}
