//! Exact musical time: rational positions, rhythm trees, timelines of
//! simultaneous events, and their mapping to notation.

pub mod lilypond_render;
pub mod notation;
pub mod primitives;
