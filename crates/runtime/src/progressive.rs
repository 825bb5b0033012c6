//! Progressive (time-sliced) builds.
//!
//! A [`ProgressiveBuild`] is a batch iterator: every call to
//! [`ProgressiveBuild::step`] processes the next slice of at most
//! `batch_size` items and then yields back to the caller, which is expected to
//! resume it on the next animation frame.
//!
//! Ordering contract:
//! - Items are processed in input order, each exactly once.
//! - `N` items with batch size `B` take `ceil(N / B)` slices.
//! - The cancel flag is checked before each slice; once set, no further slice
//!   runs. Work already applied is left in place for the owner to dispose.

use std::ops::Range;

use tracing::debug;

use crate::cancel::CancelToken;

/// Result of processing a single item.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The item produced exactly one primitive.
    Built,
    /// The item could not be rendered (e.g. unresolved endpoint) and was dropped.
    Skipped,
}

/// Item-level work driven by a [`ProgressiveBuild`].
pub trait SliceWork {
    /// What the work mutates, typically the scene.
    type Context;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn process(&mut self, index: usize, ctx: &mut Self::Context) -> ItemOutcome;
}

/// Splits `0..len` into consecutive ranges of at most `batch_size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceCursor {
    len: usize,
    batch_size: usize,
    next: usize,
}

impl SliceCursor {
    /// A zero batch size is treated as one.
    pub fn new(len: usize, batch_size: usize) -> Self {
        Self {
            len,
            batch_size: batch_size.max(1),
            next: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.next
    }

    pub fn is_exhausted(&self) -> bool {
        self.next >= self.len
    }
}

impl Iterator for SliceCursor {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_exhausted() {
            return None;
        }
        let start = self.next;
        let end = (start + self.batch_size).min(self.len);
        self.next = end;
        Some(start..end)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub total: usize,
    pub built: usize,
    pub skipped: usize,
    pub slices: usize,
}

impl BuildSummary {
    pub fn processed(&self) -> usize {
        self.built + self.skipped
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step {
    /// A slice ran and more items remain.
    Yielded { processed: usize, total: usize },
    /// All items were processed (possibly in this very step).
    Finished(BuildSummary),
    /// The cancel flag was observed; remaining items are dropped.
    Cancelled(BuildSummary),
}

impl Step {
    pub fn is_done(&self) -> bool {
        !matches!(self, Step::Yielded { .. })
    }
}

pub struct ProgressiveBuild<W> {
    label: String,
    work: W,
    cursor: SliceCursor,
    cancel: CancelToken,
    summary: BuildSummary,
    done: Option<Step>,
}

impl<W: SliceWork> ProgressiveBuild<W> {
    pub fn new(label: impl Into<String>, work: W, batch_size: usize) -> Self {
        Self::with_cancel_token(label, work, batch_size, CancelToken::new())
    }

    pub fn with_cancel_token(
        label: impl Into<String>,
        work: W,
        batch_size: usize,
        cancel: CancelToken,
    ) -> Self {
        let total = work.len();
        Self {
            label: label.into(),
            work,
            cursor: SliceCursor::new(total, batch_size),
            cancel,
            summary: BuildSummary {
                total,
                ..BuildSummary::default()
            },
            done: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn summary(&self) -> BuildSummary {
        self.summary
    }

    pub fn work(&self) -> &W {
        &self.work
    }

    /// Runs the next slice.
    ///
    /// Once the build has finished or been cancelled, further calls keep
    /// returning that terminal step without touching `ctx`.
    pub fn step(&mut self, ctx: &mut W::Context) -> Step {
        if let Some(done) = self.done {
            return done;
        }

        if self.cancel.is_cancelled() {
            debug!(
                build = %self.label,
                processed = self.summary.processed(),
                total = self.summary.total,
                "build cancelled"
            );
            return self.finish(Step::Cancelled(self.summary));
        }

        let Some(range) = self.cursor.next() else {
            return self.finish(Step::Finished(self.summary));
        };

        for index in range {
            match self.work.process(index, ctx) {
                ItemOutcome::Built => self.summary.built += 1,
                ItemOutcome::Skipped => self.summary.skipped += 1,
            }
        }
        self.summary.slices += 1;

        if self.cursor.is_exhausted() {
            debug!(
                build = %self.label,
                built = self.summary.built,
                skipped = self.summary.skipped,
                slices = self.summary.slices,
                "build finished"
            );
            return self.finish(Step::Finished(self.summary));
        }

        Step::Yielded {
            processed: self.cursor.position(),
            total: self.summary.total,
        }
    }

    /// Steps until done. Intended for tests and for callers that do not need
    /// to yield.
    pub fn run_to_completion(&mut self, ctx: &mut W::Context) -> Step {
        loop {
            let step = self.step(ctx);
            if step.is_done() {
                return step;
            }
        }
    }

    fn finish(&mut self, step: Step) -> Step {
        self.done = Some(step);
        step
    }
}

#[cfg(test)]
mod tests {
    use super::{ItemOutcome, ProgressiveBuild, SliceCursor, SliceWork, Step};

    /// Records processed indices; items listed in `skip` are skipped.
    struct Recorder {
        len: usize,
        skip: Vec<usize>,
    }

    impl SliceWork for Recorder {
        type Context = Vec<usize>;

        fn len(&self) -> usize {
            self.len
        }

        fn process(&mut self, index: usize, ctx: &mut Vec<usize>) -> ItemOutcome {
            if self.skip.contains(&index) {
                return ItemOutcome::Skipped;
            }
            ctx.push(index);
            ItemOutcome::Built
        }
    }

    fn recorder(len: usize) -> Recorder {
        Recorder {
            len,
            skip: Vec::new(),
        }
    }

    #[test]
    fn cursor_slices_105_by_50() {
        let sizes: Vec<usize> = SliceCursor::new(105, 50).map(|r| r.len()).collect();
        assert_eq!(sizes, vec![50, 50, 5]);

        let sizes: Vec<usize> = SliceCursor::new(105, 1000).map(|r| r.len()).collect();
        assert_eq!(sizes, vec![105]);
    }

    #[test]
    fn zero_batch_size_is_one() {
        assert_eq!(SliceCursor::new(3, 0).count(), 3);
    }

    #[test]
    fn batch_size_does_not_change_result() {
        for batch in [1, 7, 50, 1000] {
            let mut out = Vec::new();
            let mut build = ProgressiveBuild::new("t", recorder(105), batch);
            let Step::Finished(summary) = build.run_to_completion(&mut out) else {
                panic!("expected finish");
            };
            assert_eq!(out, (0..105).collect::<Vec<_>>());
            assert_eq!(summary.built, 105);
            assert_eq!(summary.slices, 105usize.div_ceil(batch));
        }
    }

    #[test]
    fn yields_between_slices() {
        let mut out = Vec::new();
        let mut build = ProgressiveBuild::new("t", recorder(105), 50);
        assert_eq!(
            build.step(&mut out),
            Step::Yielded {
                processed: 50,
                total: 105
            }
        );
        assert_eq!(out.len(), 50);
        assert!(matches!(build.step(&mut out), Step::Yielded { .. }));
        let Step::Finished(summary) = build.step(&mut out) else {
            panic!("expected finish on the last slice");
        };
        assert_eq!(summary.slices, 3);
        // Terminal step repeats without further work.
        assert_eq!(build.step(&mut out), Step::Finished(summary));
        assert_eq!(out.len(), 105);
    }

    #[test]
    fn empty_build_finishes_without_slices() {
        let mut out = Vec::new();
        let mut build = ProgressiveBuild::new("t", recorder(0), 50);
        let Step::Finished(summary) = build.step(&mut out) else {
            panic!("expected finish");
        };
        assert_eq!(summary.slices, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn skipped_items_do_not_abort_the_build() {
        let mut out = Vec::new();
        let work = Recorder {
            len: 10,
            skip: vec![0, 4],
        };
        let mut build = ProgressiveBuild::new("t", work, 3);
        let Step::Finished(summary) = build.run_to_completion(&mut out) else {
            panic!("expected finish");
        };
        assert_eq!(summary.built, 8);
        assert_eq!(summary.skipped, 2);
        assert_eq!(out, vec![1, 2, 3, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn cancellation_stops_before_next_slice() {
        let mut out = Vec::new();
        let mut build = ProgressiveBuild::new("t", recorder(105), 50);
        let token = build.cancel_token();

        assert!(matches!(build.step(&mut out), Step::Yielded { .. }));
        token.cancel();

        let Step::Cancelled(summary) = build.step(&mut out) else {
            panic!("expected cancel");
        };
        assert_eq!(summary.built, 50);
        assert_eq!(summary.slices, 1);
        assert!(matches!(build.step(&mut out), Step::Cancelled(_)));
        assert_eq!(out.len(), 50);
    }
}
