use keyed_priority_queue::KeyedPriorityQueue;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use std::collections::VecDeque;

use super::event::SimEvent;
use crate::scheduler::EnqueueFlags;
use crate::workload::Process;

// Index into the task Vec; equal to the process's input position
pub type TaskId = usize;
pub type Ticks = u64;
new_key_type! {
    pub struct QueueId;
}

/// Ordering key for ranked queues: `primary`, then arrival, then input order.
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub struct Rank {
    pub primary: u64,
    pub arrival: Ticks,
    pub task: TaskId,
}

impl Rank {
    pub fn new(primary: u64, task: &Task) -> Self {
        Self {
            primary,
            arrival: task.arrival,
            task: task.id,
        }
    }

    fn key(&self) -> (u64, Ticks, TaskId) {
        (self.primary, self.arrival, self.task)
    }
}

// KeyedPriorityQueue is a max-heap, so the smallest rank must compare greatest
impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.key().cmp(&self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    // Not arrived yet
    Pending,
    Ready,
    Running,
    Completed,
}

#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub state: TaskState,
    pub arrival: Ticks,
    pub burst: Ticks,
    pub priority: u64,
    pub queue_level: usize,
    pub remaining: Ticks,
    pub first_start: Option<Ticks>,
    pub completion: Option<Ticks>,
    // MLFQ level, owned by the policy
    pub level: usize,
    pub allocated_slice: Option<Ticks>,
    pub consumed_slice: Ticks,
}

impl Task {
    pub fn from_process(id: TaskId, process: &Process) -> Self {
        Self {
            id,
            name: process.id.clone(),
            state: TaskState::Pending,
            arrival: process.arrival,
            burst: process.burst,
            priority: process.priority,
            queue_level: process.queue_level,
            remaining: process.burst,
            first_start: None,
            completion: None,
            level: 0,
            allocated_slice: None,
            consumed_slice: 0,
        }
    }

    pub fn slice_exhausted(&self) -> bool {
        self.allocated_slice == Some(self.consumed_slice)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    Free,
    // Paying the context-switch cost before `to` starts
    Switching { to: TaskId, left: Ticks },
    Running(TaskId),
}

#[derive(Debug)]
pub enum RunQueue {
    Fifo {
        level: usize,
        tasks: VecDeque<TaskId>,
    },
    Priq {
        level: usize,
        tasks: KeyedPriorityQueue<TaskId, Rank>,
    },
}

impl RunQueue {
    pub fn new_fifo(level: usize) -> Self {
        Self::Fifo {
            level,
            tasks: VecDeque::new(),
        }
    }

    pub fn new_priq(level: usize) -> Self {
        Self::Priq {
            level,
            tasks: KeyedPriorityQueue::new(),
        }
    }

    pub fn level(&self) -> usize {
        match self {
            Self::Fifo { level, .. } | Self::Priq { level, .. } => *level,
        }
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        match self {
            Self::Fifo { tasks, .. } => tasks.contains(&task_id),
            Self::Priq { tasks, .. } => tasks.iter().any(|t| *t.0 == task_id),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Fifo { tasks, .. } => tasks.len(),
            Self::Priq { tasks, .. } => tasks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// All mutable state of one simulation run. Never shared between runs.
#[derive(Debug)]
pub struct SimCtx {
    pub now: Ticks,
    pub cpu: CpuState,
    pub tasks: Vec<Task>,
    pub queues: SlotMap<QueueId, RunQueue>,
    pub task_to_queue: FxHashMap<TaskId, QueueId>,
    // Set when a quantum ends; requeued after the next tick's arrivals
    pub yielded: Option<TaskId>,
    events: Vec<SimEvent>,
}

impl SimCtx {
    pub fn new(processes: &[Process]) -> Self {
        Self {
            now: 0,
            cpu: CpuState::Free,
            tasks: processes
                .iter()
                .enumerate()
                .map(|(id, p)| Task::from_process(id, p))
                .collect(),
            queues: SlotMap::with_key(),
            task_to_queue: FxHashMap::default(),
            yielded: None,
            events: Vec::new(),
        }
    }

    pub fn advance_time(&mut self, delta: Ticks) {
        self.now = self.now.saturating_add(delta);
    }

    pub fn emit(&mut self, event: SimEvent) {
        tracing::trace!(tick = self.now, ?event, "sim event");
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn create_queue_fifo(&mut self, level: usize) -> QueueId {
        self.queues.insert(RunQueue::new_fifo(level))
    }

    pub fn create_queue_priq(&mut self, level: usize) -> QueueId {
        self.queues.insert(RunQueue::new_priq(level))
    }

    fn queue_push(&mut self, queue_id: QueueId, task_id: TaskId, rank: Option<Rank>, flags: EnqueueFlags) {
        assert!(
            !self.task_to_queue.contains_key(&task_id),
            "Task {task_id} already present in some queue"
        );
        debug_assert_eq!(
            self.task(task_id).state,
            TaskState::Ready,
            "Task {task_id} must be Ready when enqueued"
        );

        let queue = self.queues.get_mut(queue_id).expect("Unknown run queue");
        let level = queue.level();
        match queue {
            RunQueue::Fifo { tasks, .. } => tasks.push_back(task_id),
            RunQueue::Priq { tasks, .. } => {
                tasks.push(
                    task_id,
                    rank.expect("Attempted to push to a ranked queue with no rank"),
                );
            }
        };

        self.task_to_queue.insert(task_id, queue_id);
        self.emit(SimEvent::Enqueued {
            task: task_id,
            level,
            flags,
        });
    }

    pub fn queue_push_fifo(&mut self, queue_id: QueueId, task_id: TaskId, flags: EnqueueFlags) {
        self.queue_push(queue_id, task_id, None, flags);
    }

    pub fn queue_push_priq(&mut self, queue_id: QueueId, task_id: TaskId, rank: Rank, flags: EnqueueFlags) {
        self.queue_push(queue_id, task_id, Some(rank), flags);
    }

    pub fn queue_pop(&mut self, queue_id: QueueId) -> Option<TaskId> {
        let queue = self.queues.get_mut(queue_id)?;
        let task = match queue {
            RunQueue::Fifo { tasks, .. } => tasks.pop_front(),
            RunQueue::Priq { tasks, .. } => tasks.pop().map(|t| t.0),
        }?;

        let removed = self.task_to_queue.remove(&task);
        debug_assert!(removed.is_some(), "Task {task} missing queue membership");

        Some(task)
    }

    pub fn queue_peek(&self, queue_id: QueueId) -> Option<TaskId> {
        match self.queues.get(queue_id)? {
            RunQueue::Fifo { tasks, .. } => tasks.front().copied(),
            RunQueue::Priq { tasks, .. } => tasks.peek().map(|t| *t.0),
        }
    }

    pub fn queue_is_empty(&self, queue_id: QueueId) -> bool {
        self.queues.get(queue_id).map_or(true, RunQueue::is_empty)
    }

    pub fn task_in_any_queue(&self, task_id: TaskId) -> bool {
        self.task_to_queue.contains_key(&task_id)
    }

    pub fn task(&self, task_id: TaskId) -> &Task {
        &self.tasks[task_id]
    }

    pub fn task_mut(&mut self, task_id: TaskId) -> &mut Task {
        &mut self.tasks[task_id]
    }

    pub fn cpu_is_free(&self) -> bool {
        self.cpu == CpuState::Free
    }

    pub fn running(&self) -> Option<TaskId> {
        match self.cpu {
            CpuState::Running(task) => Some(task),
            _ => None,
        }
    }

    pub fn mark_ready(&mut self, task_id: TaskId) {
        let task = self.task_mut(task_id);
        debug_assert!(
            task.state != TaskState::Completed,
            "Completed task {} cannot be ready",
            task.id
        );
        task.state = TaskState::Ready;
    }

    pub fn mark_completed(&mut self, task_id: TaskId, completion_time: Ticks) {
        debug_assert!(
            !self.task_to_queue.contains_key(&task_id),
            "Completing task {} that is still enqueued",
            task_id
        );

        let task = &mut self.tasks[task_id];
        debug_assert!(
            task.state == TaskState::Running,
            "Task {task_id} must have been running before marked complete"
        );

        task.state = TaskState::Completed;
        task.remaining = 0;
        task.completion = Some(completion_time);
    }

    /// Hands the CPU to `task_id` for at most `slice` ticks (`None` runs to completion).
    pub fn set_dispatched(&mut self, task_id: TaskId, slice: Option<Ticks>, switch_cost: Ticks) {
        debug_assert!(
            !self.task_to_queue.contains_key(&task_id),
            "Dispatched task {task_id} must not be enqueued"
        );
        debug_assert!(self.cpu_is_free(), "CPU already occupied");

        let task = self.task_mut(task_id);
        task.state = TaskState::Running;
        task.allocated_slice = slice;
        task.consumed_slice = 0;

        self.cpu = if switch_cost > 0 {
            CpuState::Switching {
                to: task_id,
                left: switch_cost,
            }
        } else {
            CpuState::Running(task_id)
        };
    }

    pub fn clear_cpu(&mut self) {
        self.cpu = CpuState::Free;
    }
}
