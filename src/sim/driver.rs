use crate::{
    core::{driver::SchedCore, SimCtx, SimEvent, TaskId, Ticks},
    error::{InvariantViolation, PolicyConfigurationError},
    scheduler::{SchedParams, Scheduler},
    trace::Span,
    workload::Workload,
};

/// Raw result of one run, before process ids are attached.
#[derive(Debug, Clone)]
pub struct SimOutcome {
    pub spans: Vec<Span>,
    // Indexed by TaskId
    pub completions: Vec<Ticks>,
    pub total_time: Ticks,
    pub context_switches: u64,
}

/// Feeds a workload's arrivals into a [`SchedCore`] tick by tick.
pub struct Sim<S: Scheduler> {
    pub core: SchedCore<S>,
    // Task ids sorted by (arrival, input order)
    arrivals: Vec<TaskId>,
    arrival_cursor: usize,
    completed: usize,
    horizon: Ticks,
}

impl<S: Scheduler> Sim<S> {
    pub fn new(workload: &Workload, params: &SchedParams) -> Result<Self, PolicyConfigurationError> {
        let ctx = SimCtx::new(workload.processes());
        let mut arrivals: Vec<TaskId> = (0..workload.len()).collect();
        arrivals.sort_by_key(|&task| (ctx.task(task).arrival, task));

        Ok(Self {
            core: SchedCore::<S>::new(ctx, params, workload.context_switch())?,
            arrivals,
            arrival_cursor: 0,
            completed: 0,
            horizon: workload.horizon(),
        })
    }

    /// Simulates one tick and returns everything that happened during it. When
    /// nothing is ready and the CPU is free, the step instead covers the whole
    /// idle gap up to the next arrival.
    pub fn step(&mut self) -> Result<Vec<SimEvent>, InvariantViolation> {
        if self.core.now() >= self.horizon {
            return Err(InvariantViolation::Stalled {
                horizon: self.horizon,
                pending: self.arrivals.len() - self.completed,
            });
        }

        if let Some(next) = self.next_arrival() {
            if self.core.skip_idle(next) {
                return Ok(self.core.ctx.drain_events());
            }
        }

        self.handle_arrivals();
        if self.core.tick().is_some() {
            self.completed += 1;
        }
        Ok(self.core.ctx.drain_events())
    }

    fn handle_arrivals(&mut self) {
        let now = self.core.now();
        while let Some(&task) = self.arrivals.get(self.arrival_cursor) {
            // Contiguous, since arrivals are sorted
            if self.core.ctx.task(task).arrival != now {
                break;
            }
            self.core.wake_task(task);
            self.arrival_cursor += 1;
        }
    }

    fn next_arrival(&self) -> Option<Ticks> {
        let task = *self.arrivals.get(self.arrival_cursor)?;
        Some(self.core.ctx.task(task).arrival)
    }

    pub fn all_completed(&self) -> bool {
        self.completed == self.arrivals.len()
    }

    pub fn horizon(&self) -> Ticks {
        self.horizon
    }

    /// Steps until every process has completed.
    pub fn run(mut self) -> Result<SimOutcome, InvariantViolation> {
        while !self.all_completed() {
            self.step()?;
        }

        let total_time = self.core.now();
        let context_switches = self.core.switches().switches();
        tracing::debug!(
            algorithm = %S::ALGORITHM,
            total_time,
            context_switches,
            steps = self.core.observer().steps(),
            "run finished"
        );

        let (ctx, spans) = self.core.finish();
        let completions = ctx
            .tasks
            .iter()
            .map(|task| task.completion.unwrap_or(0))
            .collect();

        Ok(SimOutcome {
            spans,
            completions,
            total_time,
            context_switches,
        })
    }
}
