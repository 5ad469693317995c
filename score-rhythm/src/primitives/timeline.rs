//! Time-ordered storage of simultaneous events.
//!
//! Timeline holds frames: all events, placed at the exact same position.
//! Frame is created with the first event at its position, so Timeline
//! never contains empty frames.
//!
//! Positions are compared as rationals, so it does not matter how the
//! position was computed.
//!
//! # Example
//!
//! ```
//! use score_rhythm::primitives::{Rational, Timeline, TimeError};
//!
//! let quarter = Rational::new(1, 4).unwrap();
//! let mut timeline = Timeline::new();
//! timeline.insert(quarter + quarter, "c'");
//! timeline.insert(Rational::new(2, 4).unwrap(), "e'");
//! timeline.insert(Rational::zero(), "g");
//!
//! let frame = timeline.exact(Rational::new(1, 2).unwrap()).unwrap();
//! assert_eq!(frame.payloads().copied().collect::<Vec<_>>(), vec!["c'", "e'"]);
//! assert_eq!(timeline.floor(quarter).unwrap().time(), Rational::zero());
//! assert_eq!(
//!     timeline.exact(quarter).unwrap_err(),
//!     TimeError::NotFound(quarter)
//! );
//! ```

use std::{
    cmp,
    collections::{btree_map, BTreeMap},
};

use super::{Event, Rational, TimeError, TimeResult};

/// Events at one exact position. Never empty.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Frame<P> {
    time: Rational,
    events: Vec<Event<P>>,
}
impl<P> Frame<P> {
    fn new(time: Rational) -> Self {
        Self {
            time,
            events: Vec::new(),
        }
    }
    pub fn time(&self) -> Rational {
        self.time
    }
    /// In order of insertion.
    pub fn events(&self) -> &[Event<P>] {
        &self.events
    }
    pub fn payloads(&self) -> impl Iterator<Item = &P> + '_ {
        self.events.iter().map(|ev| ev.payload())
    }
    pub fn len(&self) -> usize {
        self.events.len()
    }
    /// Always false for frames taken from a Timeline.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
    pub fn iter(&self) -> std::slice::Iter<'_, Event<P>> {
        self.events.iter()
    }
}
impl<'a, P> IntoIterator for &'a Frame<P> {
    type Item = &'a Event<P>;
    type IntoIter = std::slice::Iter<'a, Event<P>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Timeline<P> {
    frames: BTreeMap<Rational, Frame<P>>,
}
impl<P> Timeline<P> {
    pub fn new() -> Self {
        Self {
            frames: BTreeMap::new(),
        }
    }

    /// Append payload to the frame at `time`, creating the frame if needed.
    ///
    /// # Returns
    /// Frame, that holds the event now.
    pub fn insert(&mut self, time: Rational, payload: P) -> &Frame<P> {
        self.insert_event(Event::new(time, payload))
    }
    /// Same as [`Timeline::insert`], but event is already stamped.
    pub fn insert_event(&mut self, event: Event<P>) -> &Frame<P> {
        let time = event.timing();
        let frame = self.frames.entry(time).or_insert_with(|| {
            log::trace!("new frame at {}", time);
            Frame::new(time)
        });
        frame.events.push(event);
        log::trace!("frame at {} holds {} events", time, frame.len());
        frame
    }

    /// Remove the whole frame at `time`.
    pub fn remove(&mut self, time: Rational) -> TimeResult<Frame<P>> {
        self.ensure_not_empty()?;
        self.frames.remove(&time).ok_or(TimeError::NotFound(time))
    }

    /// Frame exactly at `time`.
    pub fn exact(&self, time: Rational) -> TimeResult<&Frame<P>> {
        self.ensure_not_empty()?;
        self.frames.get(&time).ok_or(TimeError::NotFound(time))
    }
    /// Last frame at or before `time`.
    pub fn floor(&self, time: Rational) -> TimeResult<&Frame<P>> {
        self.ensure_not_empty()?;
        self.frames
            .range(..=time)
            .next_back()
            .map(|(_, frame)| frame)
            .ok_or(TimeError::NotFound(time))
    }
    /// First frame at or after `time`.
    pub fn ceiling(&self, time: Rational) -> TimeResult<&Frame<P>> {
        self.ensure_not_empty()?;
        self.frames
            .range(time..)
            .next()
            .map(|(_, frame)| frame)
            .ok_or(TimeError::NotFound(time))
    }
    pub fn first(&self) -> TimeResult<&Frame<P>> {
        self.frames.values().next().ok_or(TimeError::EmptyTimeline)
    }
    pub fn last(&self) -> TimeResult<&Frame<P>> {
        self.frames
            .values()
            .next_back()
            .ok_or(TimeError::EmptyTimeline)
    }

    /// Frames in `[from, to)`, in time order. Empty if `to <= from`.
    pub fn range(
        &self,
        from: Rational,
        to: Rational,
    ) -> impl DoubleEndedIterator<Item = &Frame<P>> + '_ {
        let to = cmp::max(from, to);
        self.frames.range(from..to).map(|(_, frame)| frame)
    }

    /// Frames in time order.
    pub fn iter(&self) -> btree_map::Values<'_, Rational, Frame<P>> {
        self.frames.values()
    }
    /// Amount of frames (not events).
    pub fn len(&self) -> usize {
        self.frames.len()
    }
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn ensure_not_empty(&self) -> TimeResult<()> {
        match self.frames.is_empty() {
            true => Err(TimeError::EmptyTimeline),
            false => Ok(()),
        }
    }
}
impl<P> Default for Timeline<P> {
    fn default() -> Self {
        Self::new()
    }
}
impl<'a, P> IntoIterator for &'a Timeline<P> {
    type Item = &'a Frame<P>;
    type IntoIter = btree_map::Values<'a, Rational, Frame<P>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
impl<P> Extend<Event<P>> for Timeline<P> {
    fn extend<T: IntoIterator<Item = Event<P>>>(&mut self, iter: T) {
        for event in iter {
            self.insert_event(event);
        }
    }
}
impl<P> FromIterator<Event<P>> for Timeline<P> {
    fn from_iter<T: IntoIterator<Item = Event<P>>>(iter: T) -> Self {
        let mut timeline = Self::new();
        timeline.extend(iter);
        timeline
    }
}
