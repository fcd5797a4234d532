//! Song position markers
//!
//! A fixed number of slots filled left to right with playback ticks, and a
//! cursor walked by the marker buttons. Tick 0 marks an empty slot.

/// Default number of marker slots
pub const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerTable {
    slots: Vec<u64>,
    cursor: usize,
}

impl MarkerTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![0; capacity.max(1)],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Filled slots, in table order
    pub fn markers(&self) -> impl Iterator<Item = u64> + '_ {
        self.slots.iter().copied().filter(|tick| *tick != 0)
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = 0);
        self.cursor = 0;
    }

    /// Store `tick` in the first empty slot.
    ///
    /// Returns the slot index, or `None` when `tick` is 0 or the table is full.
    pub fn set(&mut self, tick: u64) -> Option<usize> {
        if tick == 0 {
            return None;
        }
        let index = self.slots.iter().position(|slot| *slot == 0)?;
        self.slots[index] = tick;
        Some(index)
    }

    /// Step the cursor left; returns the tick to seek to
    pub fn left(&mut self) -> Option<u64> {
        if self.slots[self.cursor] == 0 {
            return None;
        }
        self.cursor = self.cursor.saturating_sub(1);
        Some(self.slots[self.cursor])
    }

    /// Step the cursor right, never onto an empty slot; returns the tick to
    /// seek to
    pub fn right(&mut self) -> Option<u64> {
        if self.slots[self.cursor] == 0 {
            return None;
        }
        if self.cursor + 1 < self.slots.len() {
            self.cursor += 1;
        }
        if self.slots[self.cursor] == 0 {
            self.cursor = self.cursor.saturating_sub(1);
        }
        Some(self.slots[self.cursor])
    }
}

impl Default for MarkerTable {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
