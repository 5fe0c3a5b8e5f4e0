use super::{
    Algorithm, Dispatch, EnqueueFlags, SchedParams, Scheduler, ENQ_BOOST, ENQ_SLICE_EXPIRED,
    ENQ_WAKEUP,
};
use crate::config::Promotion;
use crate::core::{CpuState, QueueId, SimCtx, TaskId, Ticks};
use crate::error::PolicyConfigurationError;

/// Multilevel feedback queue.
///
/// New tasks enter level 0. A task that uses up its level's quantum without
/// finishing drops one level (the last level is the floor); a preempted task
/// keeps its level. The lowest-numbered non-empty level is always served, FIFO
/// within a level.
pub struct MlfqScheduler {
    levels: Vec<QueueId>,
    quanta: Vec<Ticks>,
    preempt_on_arrival: bool,
    promotion: Promotion,
}

impl MlfqScheduler {
    fn bottom(&self) -> usize {
        self.levels.len() - 1
    }

    fn boost(&self, ctx: &mut SimCtx) {
        for &queue in &self.levels[1..] {
            while let Some(task) = ctx.queue_pop(queue) {
                ctx.task_mut(task).level = 0;
                ctx.queue_push_fifo(self.levels[0], task, ENQ_BOOST);
            }
        }
        if let CpuState::Running(task) | CpuState::Switching { to: task, .. } = ctx.cpu {
            ctx.task_mut(task).level = 0;
        }
        tracing::trace!(tick = ctx.now, "mlfq priority boost");
    }
}

impl Scheduler for MlfqScheduler {
    const ALGORITHM: Algorithm = Algorithm::Mlfq;

    fn init(ctx: &mut SimCtx, params: &SchedParams) -> Result<Self, PolicyConfigurationError> {
        let quanta = params.mlfq.resolve_quanta(params.time_quantum)?;
        Ok(Self {
            levels: (0..quanta.len())
                .map(|level| ctx.create_queue_fifo(level))
                .collect(),
            quanta,
            preempt_on_arrival: params.mlfq.preempt_on_arrival,
            promotion: params.mlfq.promotion,
        })
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, flags: EnqueueFlags) {
        let bottom = self.bottom();
        let t = ctx.task_mut(task);
        if flags & ENQ_WAKEUP != 0 {
            t.level = 0;
        } else if flags & ENQ_SLICE_EXPIRED != 0 {
            t.level = (t.level + 1).min(bottom);
        }
        let queue = self.levels[t.level];
        ctx.queue_push_fifo(queue, task, flags);
    }

    fn dispatch(&mut self, ctx: &mut SimCtx) -> Option<Dispatch> {
        self.levels.iter().enumerate().find_map(|(level, &queue)| {
            ctx.queue_pop(queue)
                .map(|task| Dispatch::for_slice(task, self.quanta[level]))
        })
    }

    fn should_preempt(&self, ctx: &SimCtx, running: TaskId) -> bool {
        let level = ctx.task(running).level;
        self.preempt_on_arrival
            && self.levels[..level]
                .iter()
                .any(|&queue| !ctx.queue_is_empty(queue))
    }

    fn advance(&mut self, ctx: &mut SimCtx) {
        if let Promotion::Boost { period } = self.promotion {
            if ctx.now > 0 && ctx.now % period == 0 {
                self.boost(ctx);
            }
        }
    }
}
