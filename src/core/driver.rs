use super::{
    event::SimEvent,
    observer::Observer,
    state::{CpuState, SimCtx, TaskId, Ticks},
};
use crate::error::PolicyConfigurationError;
use crate::scheduler::{
    Dispatch, SchedParams, Scheduler, ENQ_PREEMPT, ENQ_SLICE_EXPIRED, ENQ_WAKEUP,
};
use crate::trace::{Occupant, Span, SwitchAccountant, TraceBuilder};

/// The shared tick loop. Every policy runs through it, so idle ticks, switch
/// costs and slice accounting are identical across policies.
pub struct SchedCore<S: Scheduler> {
    pub ctx: SimCtx,
    pub scheduler: S,
    trace: TraceBuilder,
    switches: SwitchAccountant,
    observer: Observer,
}

impl<S: Scheduler> SchedCore<S> {
    pub fn new(
        mut ctx: SimCtx,
        params: &SchedParams,
        context_switch: Ticks,
    ) -> Result<Self, PolicyConfigurationError> {
        let scheduler = S::init(&mut ctx, params)?;
        Ok(Self {
            ctx,
            scheduler,
            trace: TraceBuilder::new(),
            switches: SwitchAccountant::new(context_switch),
            observer: Observer::new(),
        })
    }

    pub fn wake_task(&mut self, task: TaskId) {
        self.ctx.mark_ready(task);
        self.ctx.emit(SimEvent::Arrived { task });
        self.scheduler.enqueue(&mut self.ctx, task, ENQ_WAKEUP);
    }

    /// Simulates the tick `[now, now + 1)`. Arrivals for `now` must already be
    /// woken. Returns the task that completed at the end of the tick, if any.
    pub fn tick(&mut self) -> Option<TaskId> {
        // 1. The task whose slice ended last tick rejoins after this tick's arrivals
        if let Some(task) = self.ctx.yielded.take() {
            self.scheduler.enqueue(&mut self.ctx, task, ENQ_SLICE_EXPIRED);
        }

        self.scheduler.advance(&mut self.ctx);

        // 2. Preemption, once the running task has had at least one tick
        if let Some(task) = self.ctx.running() {
            if self.ctx.task(task).consumed_slice > 0
                && self.scheduler.should_preempt(&self.ctx, task)
            {
                self.ctx.clear_cpu();
                self.ctx.mark_ready(task);
                self.ctx.emit(SimEvent::Preempted { task });
                self.scheduler.enqueue(&mut self.ctx, task, ENQ_PREEMPT);
            }
        }

        // 3. Fill a free CPU
        if self.ctx.cpu_is_free() {
            self.try_dispatch();
        }

        // 4. Execute
        let completed = self.run_cpu();
        self.ctx.advance_time(1);
        self.observer.observe(&self.ctx);
        completed
    }

    /// Jumps an empty system forward to `until`, recording the gap as one idle
    /// span. Returns false, leaving the clock alone, while any task is on the
    /// CPU or waiting to run.
    pub fn skip_idle(&mut self, until: Ticks) -> bool {
        let now = self.ctx.now;
        if until <= now
            || !self.ctx.cpu_is_free()
            || self.ctx.yielded.is_some()
            || !self.ctx.task_to_queue.is_empty()
        {
            return false;
        }

        self.trace.record_span(Occupant::Idle, now, until - now);
        self.ctx.emit(SimEvent::CpuIdle);
        self.ctx.advance_time(until - now);
        self.observer.observe(&self.ctx);
        tracing::trace!(from = now, to = until, "skipped idle gap");
        true
    }

    fn try_dispatch(&mut self) {
        let Some(Dispatch { task, slice }) = self.scheduler.dispatch(&mut self.ctx) else {
            return;
        };

        let from = self.switches.last();
        let cost = self.switches.charge(task);
        self.ctx.set_dispatched(task, slice, cost);
        self.ctx.emit(SimEvent::Dispatched { task, slice });
        if let (Some(from), true) = (from, cost > 0) {
            self.ctx.emit(SimEvent::SwitchStarted {
                from,
                to: task,
                cost,
            });
        }
    }

    fn run_cpu(&mut self) -> Option<TaskId> {
        let now = self.ctx.now;
        match self.ctx.cpu {
            CpuState::Free => {
                self.trace.record(Occupant::Idle, now);
                self.ctx.emit(SimEvent::CpuIdle);
                None
            }
            CpuState::Switching { to, left } => {
                self.trace.record(Occupant::Switch, now);
                self.ctx.cpu = if left > 1 {
                    CpuState::Switching { to, left: left - 1 }
                } else {
                    CpuState::Running(to)
                };
                None
            }
            CpuState::Running(task_id) => {
                self.trace.record(Occupant::Task(task_id), now);
                {
                    let task = self.ctx.task_mut(task_id);
                    task.first_start.get_or_insert(now);
                    task.remaining -= 1;
                    task.consumed_slice += 1;
                }

                self.scheduler.tick(&mut self.ctx, task_id);

                let task = self.ctx.task(task_id);
                let completed = task.remaining == 0;
                let slice_expired = task.slice_exhausted() && !completed;

                if completed {
                    self.ctx.clear_cpu();
                    self.ctx.mark_completed(task_id, now + 1);
                    self.ctx.emit(SimEvent::Completed { task: task_id });
                    return Some(task_id);
                }

                if slice_expired {
                    self.ctx.clear_cpu();
                    self.ctx.mark_ready(task_id);
                    self.ctx.yielded = Some(task_id);
                    self.ctx.emit(SimEvent::SliceExpired { task: task_id });
                }

                None
            }
        }
    }

    pub fn now(&self) -> Ticks {
        self.ctx.now
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    pub fn switches(&self) -> &SwitchAccountant {
        &self.switches
    }

    pub fn finish(self) -> (SimCtx, Vec<Span>) {
        (self.ctx, self.trace.finish())
    }
}
