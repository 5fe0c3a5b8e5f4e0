use super::{Algorithm, Dispatch, EnqueueFlags, SchedParams, Scheduler};
use crate::core::{QueueId, SimCtx, TaskId};
use crate::error::PolicyConfigurationError;

/// Static multilevel queue: each task stays on its `queue_level` for the whole
/// run. The lowest-numbered non-empty level is always served first, FCFS within
/// a level, and a dispatched task runs to completion.
pub struct MlqScheduler {
    levels: Vec<QueueId>,
}

impl Scheduler for MlqScheduler {
    const ALGORITHM: Algorithm = Algorithm::Mlq;

    fn init(ctx: &mut SimCtx, params: &SchedParams) -> Result<Self, PolicyConfigurationError> {
        let levels = params.mlq.levels;
        if levels == 0 {
            return Err(PolicyConfigurationError::InvalidLevelCount {
                algorithm: Self::ALGORITHM,
                levels,
            });
        }
        if let Some(task) = ctx.tasks.iter().find(|t| t.queue_level >= levels) {
            return Err(PolicyConfigurationError::QueueLevelOutOfRange {
                algorithm: Self::ALGORITHM,
                id: task.name.clone(),
                level: task.queue_level,
                levels,
            });
        }

        Ok(Self {
            levels: (0..levels).map(|level| ctx.create_queue_fifo(level)).collect(),
        })
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, task: TaskId, flags: EnqueueFlags) {
        let queue = self.levels[ctx.task(task).queue_level];
        ctx.queue_push_fifo(queue, task, flags);
    }

    fn dispatch(&mut self, ctx: &mut SimCtx) -> Option<Dispatch> {
        self.levels
            .iter()
            .find_map(|&queue| ctx.queue_pop(queue))
            .map(Dispatch::to_completion)
    }
}
