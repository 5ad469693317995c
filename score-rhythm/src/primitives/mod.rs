//! Elements, from which rhythm and timelines are constructed.
//!
//! At first, a `Meter` is chosen and a `RhythmTree` is built for the span
//! of one measure (or any other span).
//! Then the tree is subdivided, node by node.
//! Independently, events are placed on a `Timeline` at exact positions,
//! usually matching the leaf boundaries of the tree.
//! Then tree and meter are walked by the notation mapper.

pub mod event;
pub mod meter;
pub mod rational;
pub mod rhythm_tree;
pub mod timeline;

pub use event::Event;
pub use meter::Meter;
pub use rational::Rational;
pub use rhythm_tree::{Leaves, NodeId, RhythmNode, RhythmTree};
pub use timeline::{Frame, Timeline};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("Invalid rational: denominator is zero ({numer}/{denom})")]
    InvalidRational { numer: i64, denom: i64 },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Rational overflow: value does not fit into 64-bit numerator and denominator")]
    Overflow,
    #[error(
        "Invalid meter {numerator}/{denominator}: \
        both parts should be positive"
    )]
    InvalidMeter { numerator: u32, denominator: u32 },
    #[error("Node {0} is already subdivided")]
    AlreadySubdivided(NodeId),
    #[error("Can not subdivide node {node} into {count} parts")]
    InvalidSubdivisionCount { node: NodeId, count: i64 },
    #[error("Node {0} does not belong to this tree")]
    UnknownNode(NodeId),
    #[error("Malformed subdivision sequence: {0}")]
    MalformedSubdivisions(String),
    #[error("Nothing found at position {0}")]
    NotFound(Rational),
    #[error("Timeline is empty")]
    EmptyTimeline,
    #[error("Can not parse `{input}`: {reason}")]
    Parse { input: String, reason: String },
}
pub type TimeResult<T> = Result<T, TimeError>;
