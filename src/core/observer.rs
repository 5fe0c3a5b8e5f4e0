use super::state::{CpuState, SimCtx, TaskState};

#[derive(Debug, Default)]
pub struct Observer {
    step: u64,
}

impl Observer {
    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn steps(&self) -> u64 {
        self.step
    }

    pub fn observe(&mut self, ctx: &SimCtx) {
        self.step += 1;

        let occupant = match ctx.cpu {
            CpuState::Running(task) | CpuState::Switching { to: task, .. } => Some(task),
            CpuState::Free => None,
        };
        if let Some(task_id) = occupant {
            let task = ctx.task(task_id);
            debug_assert_eq!(
                task.state,
                TaskState::Running,
                "cpu occupant {task_id} must be Running"
            );
            debug_assert!(
                !ctx.task_in_any_queue(task_id),
                "Running task {task_id} must not appear in any queue"
            );
        }

        for task in &ctx.tasks {
            if task.state == TaskState::Running {
                debug_assert_eq!(
                    occupant,
                    Some(task.id),
                    "Task {} is Running but does not own the cpu",
                    task.id
                );
            }
            if task.state == TaskState::Completed {
                debug_assert_eq!(task.remaining, 0, "Completed task {} has work left", task.id);
            }
        }

        if let Some(task_id) = ctx.yielded {
            debug_assert!(
                occupant != Some(task_id) && !ctx.task_in_any_queue(task_id),
                "Yielded task {task_id} must be off the cpu and out of every queue"
            );
        }

        for (&task_id, &queue_id) in &ctx.task_to_queue {
            let task = ctx.task(task_id);
            debug_assert_eq!(
                task.state,
                TaskState::Ready,
                "Queued task {task_id} must be Ready"
            );
            if let Some(queue) = ctx.queues.get(queue_id) {
                debug_assert!(
                    queue.contains(task_id),
                    "task_to_queue claims task {task_id} in queue {queue_id:?}, but queue does not contain it"
                );
            } else {
                debug_assert!(false, "task_to_queue references unknown queue {queue_id:?}");
            }
        }
    }
}
