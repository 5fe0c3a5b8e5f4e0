use crate::core::{TaskId, Ticks};
use crate::scheduler::EnqueueFlags;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    Arrived {
        task: TaskId,
    },
    Enqueued {
        task: TaskId,
        level: usize,
        flags: EnqueueFlags,
    },
    Dispatched {
        task: TaskId,
        slice: Option<Ticks>,
    },
    SwitchStarted {
        from: TaskId,
        to: TaskId,
        cost: Ticks,
    },
    Preempted {
        task: TaskId,
    },
    SliceExpired {
        task: TaskId,
    },
    Completed {
        task: TaskId,
    },
    // Nothing ready, even after dispatch()
    CpuIdle,
}
