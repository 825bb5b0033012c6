//! Frame-driven executor for progressive builds.
//!
//! Each build occupies a named slot. Submitting into an occupied slot cancels
//! the previous occupant, so at most one build per slot is ever live. On each
//! frame every live build gets one slice, in `(priority, slot, submit order)`
//! order, until the frame budget runs out.

use tracing::debug;

use crate::budget::FrameBudget;
use crate::event_bus::{BuildEventKind, EventBus};
use crate::frame::Frame;
use crate::progressive::{BuildSummary, ProgressiveBuild, SliceWork, Step};

/// A resumable unit of work that mutates `C` one slice at a time.
pub trait FrameTask<C> {
    fn label(&self) -> &str;
    fn step(&mut self, ctx: &mut C) -> Step;
    fn cancel(&mut self);
    fn summary(&self) -> BuildSummary;
}

impl<W, C> FrameTask<C> for ProgressiveBuild<W>
where
    W: SliceWork<Context = C>,
{
    fn label(&self) -> &str {
        ProgressiveBuild::label(self)
    }

    fn step(&mut self, ctx: &mut C) -> Step {
        ProgressiveBuild::step(self, ctx)
    }

    fn cancel(&mut self) {
        self.cancel_token().cancel();
    }

    fn summary(&self) -> BuildSummary {
        ProgressiveBuild::summary(self)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PumpSummary {
    pub ran_slices: usize,
    /// Live builds that did not get a slice because the budget ran out.
    pub deferred: usize,
    pub completed: usize,
    pub cancelled: usize,
}

struct Entry<C> {
    slot: &'static str,
    priority: i32,
    order: u64,
    task: Box<dyn FrameTask<C>>,
}

pub struct FramePump<C> {
    next_order: u64,
    tasks: Vec<Entry<C>>,
    /// Builds replaced or cancelled since the last frame; reported on the next pump.
    retired: Vec<(&'static str, BuildSummary)>,
}

impl<C> Default for FramePump<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> FramePump<C> {
    pub fn new() -> Self {
        Self {
            next_order: 0,
            tasks: Vec::new(),
            retired: Vec::new(),
        }
    }

    /// Queues `task` in `slot`. Returns the summary of the build it replaced,
    /// which is cancelled before any further slice of it runs.
    pub fn submit(
        &mut self,
        slot: &'static str,
        priority: i32,
        task: Box<dyn FrameTask<C>>,
    ) -> Option<BuildSummary> {
        let replaced = self.cancel_slot(slot);
        let order = self.next_order;
        self.next_order = self.next_order.wrapping_add(1);
        debug!(slot, priority, build = task.label(), "build submitted");
        self.tasks.push(Entry {
            slot,
            priority,
            order,
            task,
        });
        replaced
    }

    /// Cancels the live build in `slot`, if any.
    pub fn cancel_slot(&mut self, slot: &str) -> Option<BuildSummary> {
        let pos = self.tasks.iter().position(|e| e.slot == slot)?;
        let mut entry = self.tasks.remove(pos);
        entry.task.cancel();
        let summary = entry.task.summary();
        debug!(
            slot = entry.slot,
            processed = summary.processed(),
            total = summary.total,
            "build cancelled"
        );
        self.retired.push((entry.slot, summary));
        Some(summary)
    }

    pub fn cancel_all(&mut self) {
        let slots: Vec<&'static str> = self.tasks.iter().map(|e| e.slot).collect();
        for slot in slots {
            self.cancel_slot(slot);
        }
    }

    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_active(&self, slot: &str) -> bool {
        self.tasks.iter().any(|e| e.slot == slot)
    }

    pub fn pump_frame(&mut self, ctx: &mut C, frame: Frame, bus: &mut EventBus) -> PumpSummary {
        let mut budget = FrameBudget::unlimited();
        self.pump_frame_with_budget(ctx, frame, bus, &mut budget)
    }

    /// Runs at most one slice per live build, stopping once `budget` is spent.
    pub fn pump_frame_with_budget(
        &mut self,
        ctx: &mut C,
        frame: Frame,
        bus: &mut EventBus,
        budget: &mut FrameBudget,
    ) -> PumpSummary {
        let mut summary = PumpSummary::default();

        for (slot, retired) in self.retired.drain(..) {
            bus.emit(frame, slot, BuildEventKind::Cancelled(retired));
            summary.cancelled += 1;
        }

        self.tasks.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.slot.cmp(b.slot))
                .then_with(|| a.order.cmp(&b.order))
        });

        let mut done = Vec::new();
        for (i, entry) in self.tasks.iter_mut().enumerate() {
            if !budget.try_take() {
                summary.deferred += 1;
                continue;
            }
            summary.ran_slices += 1;
            match entry.task.step(ctx) {
                Step::Yielded { processed, total } => {
                    bus.emit(frame, entry.slot, BuildEventKind::Progress { processed, total });
                }
                Step::Finished(s) => {
                    bus.emit(frame, entry.slot, BuildEventKind::Finished(s));
                    summary.completed += 1;
                    done.push(i);
                }
                Step::Cancelled(s) => {
                    bus.emit(frame, entry.slot, BuildEventKind::Cancelled(s));
                    summary.cancelled += 1;
                    done.push(i);
                }
            }
        }

        for i in done.into_iter().rev() {
            self.tasks.remove(i);
        }
        summary
    }
}
