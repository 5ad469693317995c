use itertools::{process_results, Itertools};
use serde::{Deserialize, Serialize};

use crate::{
    notation::{
        NotationError, NotationMapper, NotationResult, NotationToken, NoteLength,
    },
    primitives::{Meter, RhythmTree},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Printed for every leaf of the rhythm.
    pub pitch: String,
}
impl RenderSettings {
    pub fn new(pitch: impl Into<String>) -> Self {
        Self {
            pitch: pitch.into(),
        }
    }
}
impl Default for RenderSettings {
    fn default() -> Self {
        Self::new("c'")
    }
}

pub trait RendersToLilypond {
    fn render_lilypond(&self) -> String;
}

impl RendersToLilypond for Meter {
    fn render_lilypond(&self) -> String {
        let (num, denom) = (self.numerator(), self.denominator());
        format!(r"\time {num}/{denom}")
    }
}

/// True if LilyPond has a duration for the length: binary fractions of
/// the whole note, `\breve` and `\longa`. Lengths like `1/3` are fine for
/// the mapper (e.g. in 3/3 meter), but can not be engraved.
pub fn has_lilypond_duration(length: &NoteLength) -> bool {
    let base = length.base();
    match (base.numer(), base.denom()) {
        (1, denom) => denom.is_power_of_two(),
        (2, 1) | (4, 1) => true,
        _ => false,
    }
}

/// Expects [`has_lilypond_duration`], other lengths are printed as
/// fractions.
impl RendersToLilypond for NoteLength {
    fn render_lilypond(&self) -> String {
        let base = self.base();
        let name = match (base.numer(), base.denom()) {
            (1, denom) => denom.to_string(),
            (2, 1) => r"\breve".to_string(),
            (4, 1) => r"\longa".to_string(),
            _ => base.to_string(),
        };
        match self.is_dotted() {
            true => format!("{name}."),
            false => name,
        }
    }
}

/// Render single token, using `settings.pitch` for notes.
///
/// Fails with [`NotationError::UnrepresentableDuration`] if the note
/// length has no LilyPond duration.
pub fn render_token(
    token: &NotationToken,
    settings: &RenderSettings,
) -> NotationResult<String> {
    match token {
        NotationToken::TupletStart { actual, preferred } => {
            Ok(format!(r"\tuplet {actual}/{preferred} {{"))
        }
        NotationToken::TupletEnd => Ok("}".to_string()),
        NotationToken::Note { node, length } => match has_lilypond_duration(length) {
            true => Ok(format!("{}{}", settings.pitch, length.render_lilypond())),
            false => {
                log::warn!("no LilyPond duration for {} at node {}", length.length(), node);
                Err(NotationError::UnrepresentableDuration {
                    node: *node,
                    length: length.length(),
                })
            }
        },
    }
}

/// Render the whole tree as one measure.
///
/// # Example
///
/// ```
/// use score_rhythm::lilypond_render::{render_rhythm, RenderSettings};
/// use score_rhythm::primitives::{Meter, RhythmTree};
///
/// let meter = Meter::new(3, 4).unwrap();
/// let mut tree = RhythmTree::new(meter.measure_length());
/// let beats = tree.subdivide(tree.root(), 3).unwrap();
/// tree.subdivide(beats[2], 3).unwrap();
/// assert_eq!(
///     render_rhythm(&tree, &meter, &RenderSettings::default()).unwrap(),
///     r"\time 3/4 c'4 c'4 \tuplet 3/2 { c'8 c'8 c'8 }"
/// );
/// ```
pub fn render_rhythm(
    tree: &RhythmTree,
    meter: &Meter,
    settings: &RenderSettings,
) -> NotationResult<String> {
    let rendered = NotationMapper::new(tree, meter)
        .tokens()
        .map(|token| token.and_then(|token| render_token(&token, settings)));
    let body = process_results(rendered, |mut parts| parts.join(" "))?;
    Ok(format!("{} {}", meter.render_lilypond(), body))
}
