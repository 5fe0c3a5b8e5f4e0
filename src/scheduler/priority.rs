use super::{Algorithm, Dispatch, EnqueueFlags, SchedParams, Scheduler};
use crate::core::{QueueId, Rank, SimCtx, TaskId};
use crate::error::PolicyConfigurationError;

// Lower value = higher priority; ties fall back to arrival, then input order
struct PriorityQueue {
    ready: QueueId,
}

impl PriorityQueue {
    fn new(ctx: &mut SimCtx) -> Self {
        Self {
            ready: ctx.create_queue_priq(0),
        }
    }

    fn enqueue(&self, ctx: &mut SimCtx, task: TaskId, flags: EnqueueFlags) {
        let rank = Rank::new(ctx.task(task).priority, ctx.task(task));
        ctx.queue_push_priq(self.ready, task, rank, flags);
    }

    fn pop(&self, ctx: &mut SimCtx) -> Option<TaskId> {
        ctx.queue_pop(self.ready)
    }

    fn outranks(&self, ctx: &SimCtx, running: TaskId) -> bool {
        ctx.queue_peek(self.ready)
            .is_some_and(|best| ctx.task(best).priority < ctx.task(running).priority)
    }
}

/// Non-preemptive priority scheduling.
pub struct PriorityScheduler {
    queue: PriorityQueue,
}

impl Scheduler for PriorityScheduler {
    const ALGORITHM: Algorithm = Algorithm::Priority;

    fn init(ctx: &mut SimCtx, _params: &SchedParams) -> Result<Self, PolicyConfigurationError> {
        Ok(Self {
            queue: PriorityQueue::new(ctx),
        })
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, flags: EnqueueFlags) {
        self.queue.enqueue(ctx, task, flags);
    }

    fn dispatch(&mut self, ctx: &mut SimCtx) -> Option<Dispatch> {
        self.queue.pop(ctx).map(Dispatch::to_completion)
    }
}

/// Priority scheduling where a strictly higher priority ready task displaces
/// the running one at the next tick boundary.
pub struct PreemptivePriorityScheduler {
    queue: PriorityQueue,
}

impl Scheduler for PreemptivePriorityScheduler {
    const ALGORITHM: Algorithm = Algorithm::PriorityPreemptive;

    fn init(ctx: &mut SimCtx, _params: &SchedParams) -> Result<Self, PolicyConfigurationError> {
        Ok(Self {
            queue: PriorityQueue::new(ctx),
        })
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, flags: EnqueueFlags) {
        self.queue.enqueue(ctx, task, flags);
    }

    fn dispatch(&mut self, ctx: &mut SimCtx) -> Option<Dispatch> {
        self.queue.pop(ctx).map(Dispatch::to_completion)
    }

    fn should_preempt(&self, ctx: &SimCtx, running: TaskId) -> bool {
        self.queue.outranks(ctx, running)
    }
}
