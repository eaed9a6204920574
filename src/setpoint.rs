use std::sync::{Arc, Mutex};

/// Single-cell hand-off between the command socket and the poll loop.
///
/// Holds at most one commanded charge current, in tenths of an ampere. A
/// newer command overwrites an unconsumed one (last write wins, no queue,
/// no acknowledgment to the overwritten commander). The poll loop drains
/// the cell with [`Slot::take`], so each admitted value is written to the
/// device at most once.
#[derive(Clone, Debug, Default)]
pub struct Slot {
    cell: Arc<Mutex<Option<u16>>>,
}

impl Slot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a value, replacing any unconsumed one.
    pub fn set(&self, tenths: u16) {
        *self.cell.lock().unwrap() = Some(tenths);
    }

    /// Remove and return the pending value, leaving the cell empty.
    pub fn take(&self) -> Option<u16> {
        self.cell.lock().unwrap().take()
    }
}
