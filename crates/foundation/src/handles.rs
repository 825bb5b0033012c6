/// Generational handle: `(index, generation)`.
///
/// A slot that is freed and reused bumps its generation, so stale handles to a
/// disposed item never alias the item that replaced it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u32, u32);

impl Handle {
    pub fn new(index: u32, generation: u32) -> Self {
        Handle(index, generation)
    }

    pub fn index(&self) -> u32 {
        self.0
    }

    pub fn generation(&self) -> u32 {
        self.1
    }

    /// The handle that will address the same slot after it is recycled.
    pub fn next_generation(&self) -> Self {
        Handle(self.0, self.1.wrapping_add(1))
    }
}
