//! Mapping of rhythm trees to notation.
//!
//! Every internal node of the tree is either a plain group, or a tuplet.
//! It is decided by the meter: if the amount of children divides the
//! preferred subdivision at the node depth, children are notated as
//! ordinary notes. Otherwise they are wrapped in `actual:preferred` tuplet.
//!
//! Leaves get the preferred leaf length of their depth, stretched by the
//! plain groups above them, so notated lengths always fill the span of
//! their parent. Only lengths with numerator 1 (plain) or 3 (dotted) can
//! be notated, everything else is reported as
//! [`NotationError::UnrepresentableDuration`].
//!
//! # Example
//!
//! ```
//! use score_rhythm::notation::{NotationMapper, NotationToken};
//! use score_rhythm::primitives::{Meter, Rational, RhythmTree};
//!
//! let meter = Meter::common_time();
//! let mut tree = RhythmTree::new(meter.measure_length());
//! tree.subdivide(tree.root(), 3).unwrap();
//!
//! let tokens = NotationMapper::new(&tree, &meter)
//!     .tokens()
//!     .collect::<Result<Vec<_>, _>>()
//!     .unwrap();
//! assert_eq!(
//!     tokens.first(),
//!     Some(&NotationToken::TupletStart { actual: 3, preferred: 4 })
//! );
//! assert_eq!(tokens.last(), Some(&NotationToken::TupletEnd));
//! assert_eq!(tokens.len(), 5);
//! ```

use crate::primitives::{
    Meter, NodeId, Rational, RhythmNode, RhythmTree, TimeError,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotationError {
    #[error(
        "Can not notate length {length} of node {node}: \
        only numerators 1 and 3 (dotted) are supported"
    )]
    UnrepresentableDuration { node: NodeId, length: Rational },
    #[error(transparent)]
    Time(#[from] TimeError),
}
pub type NotationResult<T> = Result<T, NotationError>;

/// Length, that can be written as a single (maybe dotted) note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteLength {
    length: Rational,
    dotted: bool,
}
impl NoteLength {
    /// None if length can not be written as a single note.
    ///
    /// # Example
    /// ```
    /// # use score_rhythm::notation::NoteLength;
    /// # use score_rhythm::primitives::Rational;
    /// let r = |n, d| Rational::new(n, d).unwrap();
    /// assert!(!NoteLength::from_length(r(1, 8)).unwrap().is_dotted());
    /// assert!(NoteLength::from_length(r(3, 8)).unwrap().is_dotted());
    /// assert_eq!(NoteLength::from_length(r(3, 8)).unwrap().base(), r(1, 4));
    /// assert_eq!(NoteLength::from_length(r(5, 8)), None);
    /// ```
    pub fn from_length(length: Rational) -> Option<Self> {
        match (length.numer(), length.denom()) {
            (1, _) => Some(Self {
                length,
                dotted: false,
            }),
            (3, denom) if denom == 1 || denom % 2 == 0 => Some(Self {
                length,
                dotted: true,
            }),
            _ => None,
        }
    }
    /// Full length, with the dot.
    pub fn length(&self) -> Rational {
        self.length
    }
    pub fn is_dotted(&self) -> bool {
        self.dotted
    }
    /// Length of the note without the dot.
    pub fn base(&self) -> Rational {
        match self.dotted {
            false => self.length,
            // 3/d with the dot is 2/d without it
            true => Rational::from_unsigned(2, self.length.denom()),
        }
    }
}

/// One item of the notation stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotationToken {
    /// `actual` notes in the time of `preferred`.
    TupletStart { actual: usize, preferred: usize },
    Note { node: NodeId, length: NoteLength },
    TupletEnd,
}

/// How children of a node are notated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    Leaf,
    Plain { actual: usize, preferred: usize },
    Tuplet { actual: usize, preferred: usize },
}
impl Grouping {
    pub fn of(node: &RhythmNode, meter: &Meter) -> Self {
        let actual = node.children().len();
        if actual == 0 {
            return Self::Leaf;
        }
        let preferred = meter.preferred_subdivision(node.depth());
        match preferred % actual {
            0 => Self::Plain { actual, preferred },
            _ => Self::Tuplet { actual, preferred },
        }
    }
}

/// Read-only view of a (sub)tree in the given meter.
#[derive(Debug, Clone, Copy)]
pub struct NotationMapper<'a> {
    tree: &'a RhythmTree,
    meter: &'a Meter,
    start: NodeId,
}
impl<'a> NotationMapper<'a> {
    pub fn new(tree: &'a RhythmTree, meter: &'a Meter) -> Self {
        Self {
            tree,
            meter,
            start: tree.root(),
        }
    }
    /// Mapper for the subtree of `node`.
    ///
    /// Node keeps its depth, but plain groups above it are not taken
    /// into account.
    pub fn for_node(
        tree: &'a RhythmTree,
        meter: &'a Meter,
        node: NodeId,
    ) -> NotationResult<Self> {
        tree.node(node)?;
        Ok(Self {
            tree,
            meter,
            start: node,
        })
    }

    pub fn grouping(&self, node: NodeId) -> NotationResult<Grouping> {
        Ok(Grouping::of(self.tree.node(node)?, self.meter))
    }

    /// Fresh token stream. Can be called any number of times.
    pub fn tokens(&self) -> NotationTokens<'a> {
        NotationTokens {
            tree: self.tree,
            meter: self.meter,
            pending: vec![Step::Visit {
                node: self.start,
                scale: 1,
            }],
        }
    }
}
impl<'a> IntoIterator for &NotationMapper<'a> {
    type Item = NotationResult<NotationToken>;
    type IntoIter = NotationTokens<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens()
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    /// `scale` is how many preferred leaf lengths the node's leaves span.
    Visit { node: NodeId, scale: i64 },
    Close,
}

/// Lazy depth-first walk, see [`NotationMapper::tokens`].
///
/// Stops after the first error.
#[derive(Debug, Clone)]
pub struct NotationTokens<'a> {
    tree: &'a RhythmTree,
    meter: &'a Meter,
    pending: Vec<Step>,
}
impl<'a> NotationTokens<'a> {
    fn visit(
        &mut self,
        node: NodeId,
        scale: i64,
    ) -> NotationResult<Option<NotationToken>> {
        let tree = self.tree;
        let rhythm_node = tree.node(node)?;
        match Grouping::of(rhythm_node, self.meter) {
            Grouping::Leaf => {
                let length = self
                    .meter
                    .preferred_leaf_length(rhythm_node.depth())
                    .multiply_by_integer(scale)?;
                match NoteLength::from_length(length) {
                    Some(length) => Ok(Some(NotationToken::Note { node, length })),
                    None => {
                        log::warn!("can not notate {} at node {}", length, node);
                        Err(NotationError::UnrepresentableDuration { node, length })
                    }
                }
            }
            Grouping::Plain { actual, preferred } => {
                let scale = scale * (preferred / actual) as i64;
                self.push_children(rhythm_node, scale);
                Ok(None)
            }
            Grouping::Tuplet { actual, preferred } => {
                self.pending.push(Step::Close);
                self.push_children(rhythm_node, scale);
                Ok(Some(NotationToken::TupletStart { actual, preferred }))
            }
        }
    }
    fn push_children(&mut self, node: &RhythmNode, scale: i64) {
        self.pending.extend(
            node.children()
                .iter()
                .rev()
                .map(|child| Step::Visit { node: *child, scale }),
        );
    }
}
impl<'a> Iterator for NotationTokens<'a> {
    type Item = NotationResult<NotationToken>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(step) = self.pending.pop() {
            let token = match step {
                Step::Close => Ok(Some(NotationToken::TupletEnd)),
                Step::Visit { node, scale } => self.visit(node, scale),
            };
            match token {
                Ok(None) => continue,
                Ok(Some(token)) => return Some(Ok(token)),
                Err(err) => {
                    self.pending.clear();
                    return Some(Err(err));
                }
            }
        }
        None
    }
}
