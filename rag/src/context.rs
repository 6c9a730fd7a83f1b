//! Turns ranked results into one bounded context block.
//!
//! Personal results are admitted first with a fixed share of the budget; shared results get the
//! rest. Each passage gets an allowance from its score band and is cut at the last sentence end,
//! word boundary, or character that fits.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::RagConfig;
use crate::types::MergedResult;

/// Header placed before the passages.
pub const CONTEXT_HEADER: &str = "Relevant information:\n";

const ELLIPSIS: &str = "...";
const LINE_PREFIX: &str = "- ";
const LINE_OVERHEAD: usize = LINE_PREFIX.len() + 1;

/// Assembles retrieval results into prompt context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextAssembler {
    priority_share: f32,
    min_passage_length: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::from_config(&RagConfig::default())
    }
}

impl ContextAssembler {
    /// Creates an assembler with the default 60 % personal share.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an assembler from configuration.
    #[must_use]
    pub const fn from_config(config: &RagConfig) -> Self {
        Self {
            priority_share: config.priority_share,
            min_passage_length: config.min_passage_length,
        }
    }

    /// Builds the context block.
    ///
    /// The passage lines never exceed `max_length` characters; the header is added on top.
    /// Returns an empty string when nothing is admitted.
    #[must_use]
    pub fn assemble(&self, results: &[MergedResult], max_length: usize) -> String {
        let (personal, shared): (Vec<&MergedResult>, Vec<&MergedResult>) =
            results.iter().partition(|result| result.is_personal());
        if personal.is_empty() && shared.is_empty() {
            return String::new();
        }

        let personal_budget = if shared.is_empty() {
            max_length
        } else if personal.is_empty() {
            0
        } else {
            self.personal_share(max_length)
        };
        let shared_budget = max_length - personal_budget;

        let mut body = String::new();
        let mut remaining = max_length;
        for (tier, budget) in [(personal, personal_budget), (shared, shared_budget)] {
            let mut tier_remaining = budget;
            for result in tier {
                if tier_remaining < self.min_passage_length || remaining < self.min_passage_length {
                    break;
                }
                let allowance = score_allowance(result.score)
                    .min(tier_remaining)
                    .min(remaining);
                let limit = allowance.saturating_sub(LINE_OVERHEAD);
                if limit < self.min_passage_length {
                    continue;
                }

                let passage = truncate_passage(result.text.trim(), limit);
                if passage.is_empty() {
                    continue;
                }
                let used = passage.chars().count() + LINE_OVERHEAD;
                body.push_str(LINE_PREFIX);
                body.push_str(&passage);
                body.push('\n');
                tier_remaining -= used;
                remaining -= used;
            }
        }

        if body.is_empty() {
            return String::new();
        }
        format!("{CONTEXT_HEADER}{body}")
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn personal_share(&self, max_length: usize) -> usize {
        let share = (max_length as f64 * f64::from(self.priority_share.clamp(0.0, 1.0))).floor();
        (share as usize).min(max_length)
    }
}

/// Character allowance for a passage with `score`.
#[must_use]
pub fn score_allowance(score: f32) -> usize {
    if score > 0.7 {
        400
    } else if score > 0.5 {
        250
    } else {
        150
    }
}

/// Shortens `text` to at most `limit` characters.
///
/// Prefers the last sentence end that fits, then the last word boundary past half the limit
/// followed by `...`, then a hard cut followed by `...`.
#[must_use]
pub fn truncate_passage(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }

    let fits = byte_offset(text, limit);
    if let Some(end) = last_sentence_end(text, fits) {
        return text[..end].to_string();
    }

    let room = limit.saturating_sub(ELLIPSIS.len());
    let cut = byte_offset(text, room);
    let word_cut = text
        .split_word_bound_indices()
        .take_while(|(start, _)| *start <= cut)
        .filter(|(_, segment)| segment.chars().all(char::is_whitespace))
        .map(|(start, _)| text[..start].trim_end())
        .last()
        .filter(|prefix| prefix.chars().count() * 2 >= room);

    let prefix = word_cut.unwrap_or(&text[..cut]);
    format!("{prefix}{ELLIPSIS}")
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(offset, _)| offset)
}

/// Byte offset just past the last `.`, `!` or `?` ending within `text[..fits]` that is followed
/// by whitespace in the full text.
fn last_sentence_end(text: &str, fits: usize) -> Option<usize> {
    let mut chars = text.char_indices().peekable();
    let mut last = None;
    while let Some((offset, c)) = chars.next() {
        if offset + c.len_utf8() > fits {
            break;
        }
        let followed_by_space = chars.peek().is_some_and(|(_, next)| next.is_whitespace());
        if matches!(c, '.' | '!' | '?') && followed_by_space {
            last = Some(offset + c.len_utf8());
        }
    }
    last
}
