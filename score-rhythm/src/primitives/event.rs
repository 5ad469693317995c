//! A smallest piece of music, that is held by a Timeline frame.
use super::{Rational, TimeResult};

/// Any payload, stamped with its position.
///
/// Event knows nothing about what it carries: notes, chords, tempo
/// changes are all the same for the Timeline.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Event<P> {
    timing: Rational,
    pub payload: P,
}
impl<P> Event<P> {
    pub fn new(timing: Rational, payload: P) -> Self {
        Self { timing, payload }
    }
    pub fn timing(&self) -> Rational {
        self.timing
    }
    pub fn payload(&self) -> &P {
        &self.payload
    }
    pub fn into_payload(self) -> P {
        self.payload
    }
    /// Same payload, other position.
    ///
    /// Fails with [`TimeError::Overflow`](super::TimeError::Overflow) if the new position does not fit.
    ///
    /// # Example
    /// ```
    /// # use score_rhythm::primitives::{Event, Rational};
    /// let quarter = Rational::new(1, 4).unwrap();
    /// let ev = Event::new(quarter, "c'");
    /// let moved = ev.clone().shifted(quarter).unwrap();
    /// assert_eq!(moved.timing(), Rational::new(1, 2).unwrap());
    /// assert_eq!(moved.payload(), ev.payload());
    /// assert!(ev.shifted(Rational::from_integer(i64::MAX)).is_err());
    /// ```
    pub fn shifted(mut self, offset: Rational) -> TimeResult<Self> {
        self.timing = self.timing.add(offset)?;
        Ok(self)
    }
}
