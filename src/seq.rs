//! Sequence numbers used as the time-priority key of resting orders.

pub type Seq = u64;

/// Strictly increasing source of sequence numbers, owned by a single book.
///
/// The first value handed out is 1; 0 marks an order that has not been
/// inserted into a book yet.
#[derive(Debug, Default, Clone)]
pub struct Clock {
    last: Seq,
}

impl Clock {
    pub fn new() -> Self {
        Clock::default()
    }

    /// Advance the clock and return the new value. Values are never reused.
    pub fn tick(&mut self) -> Seq {
        self.last += 1;
        self.last
    }
}
