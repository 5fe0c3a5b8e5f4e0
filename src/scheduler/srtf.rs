use super::{Algorithm, Dispatch, EnqueueFlags, SchedParams, Scheduler};
use crate::core::{QueueId, Rank, SimCtx, TaskId};
use crate::error::PolicyConfigurationError;

/// Shortest remaining time first. The running task is displaced only by a
/// strictly shorter remaining time; equal remaining times never preempt.
pub struct SrtfScheduler {
    ready: QueueId,
}

impl Scheduler for SrtfScheduler {
    const ALGORITHM: Algorithm = Algorithm::Srtf;

    fn init(ctx: &mut SimCtx, _params: &SchedParams) -> Result<Self, PolicyConfigurationError> {
        Ok(Self {
            ready: ctx.create_queue_priq(0),
        })
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, flags: EnqueueFlags) {
        // Only the running task's remaining time changes, and it is never queued
        let rank = Rank::new(ctx.task(task).remaining, ctx.task(task));
        ctx.queue_push_priq(self.ready, task, rank, flags);
    }

    fn dispatch(&mut self, ctx: &mut SimCtx) -> Option<Dispatch> {
        ctx.queue_pop(self.ready).map(Dispatch::to_completion)
    }

    fn should_preempt(&self, ctx: &SimCtx, running: TaskId) -> bool {
        ctx.queue_peek(self.ready)
            .is_some_and(|best| ctx.task(best).remaining < ctx.task(running).remaining)
    }
}
