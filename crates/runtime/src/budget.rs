/// Per-frame cap on how many build slices may run.
///
/// Counting slices instead of wall-clock time keeps the amount of work per
/// frame deterministic and replayable in tests.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameBudget {
    remaining_slices: u32,
}

impl FrameBudget {
    pub fn slices(count: u32) -> Self {
        Self {
            remaining_slices: count,
        }
    }

    pub fn unlimited() -> Self {
        Self {
            remaining_slices: u32::MAX,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining_slices
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_slices == 0
    }

    /// Takes one slice from the budget; `false` once it is spent.
    pub fn try_take(&mut self) -> bool {
        if self.remaining_slices == 0 {
            return false;
        }
        self.remaining_slices -= 1;
        true
    }
}
