use super::{require_quantum, Algorithm, Dispatch, EnqueueFlags, SchedParams, Scheduler};
use crate::core::{QueueId, SimCtx, TaskId, Ticks};
use crate::error::PolicyConfigurationError;

/// Round robin over one FIFO queue. An expired task rejoins the tail after the
/// tasks that arrived on the same tick.
pub struct RoundRobinScheduler {
    queue: QueueId,
    quantum: Ticks,
}

impl Scheduler for RoundRobinScheduler {
    const ALGORITHM: Algorithm = Algorithm::Rr;

    fn init(ctx: &mut SimCtx, params: &SchedParams) -> Result<Self, PolicyConfigurationError> {
        let quantum = require_quantum(params, Self::ALGORITHM)?;
        Ok(Self {
            queue: ctx.create_queue_fifo(0),
            quantum,
        })
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, flags: EnqueueFlags) {
        ctx.queue_push_fifo(self.queue, task, flags);
    }

    fn dispatch(&mut self, ctx: &mut SimCtx) -> Option<Dispatch> {
        ctx.queue_pop(self.queue)
            .map(|task| Dispatch::for_slice(task, self.quantum))
    }
}
