use super::{Algorithm, Dispatch, EnqueueFlags, SchedParams, Scheduler};
use crate::core::{QueueId, SimCtx, TaskId};
use crate::error::PolicyConfigurationError;

/// First come, first served. Arrivals are admitted in (arrival, input order), so
/// a single FIFO queue is already in the right order.
pub struct FcfsScheduler {
    queue: QueueId,
}

impl Scheduler for FcfsScheduler {
    const ALGORITHM: Algorithm = Algorithm::Fcfs;

    fn init(ctx: &mut SimCtx, _params: &SchedParams) -> Result<Self, PolicyConfigurationError> {
        Ok(Self {
            queue: ctx.create_queue_fifo(0),
        })
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, flags: EnqueueFlags) {
        ctx.queue_push_fifo(self.queue, task, flags);
    }

    fn dispatch(&mut self, ctx: &mut SimCtx) -> Option<Dispatch> {
        ctx.queue_pop(self.queue).map(Dispatch::to_completion)
    }
}
