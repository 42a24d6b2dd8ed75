//! Excerpts shown next to results. Highlights never affect matching.

use crate::index::types::Item;
use crate::query::types::{Field, Highlight, Query};
use memchr::memmem;

pub const MAX_EXCERPTS: usize = 3;
pub const EXCERPT_WIDTH: usize = 100;
const ELLIPSIS: char = '…';

/// Highlights for an item under `query`.
///
/// A matching `name:` filter echoes the display name once. Content filters
/// and free text add excerpts around their first occurrences in the item's
/// content, at most three in total.
pub fn highlights(item: &Item, query: &Query) -> Vec<Highlight> {
    let mut out = Vec::new();

    let name_lower = item.name.to_lowercase();
    let name_hit = query
        .positive(Field::Name)
        .filter_map(|f| f.text_value())
        .any(|v| name_lower.contains(&v.to_lowercase()));
    if name_hit {
        out.push(Highlight {
            field: Field::Name,
            text: item.name.clone(),
        });
    }

    let mut remaining = MAX_EXCERPTS;
    for value in query.positive(Field::Content).filter_map(|f| f.text_value()) {
        if remaining == 0 {
            break;
        }
        for text in excerpts(&item.content, value, remaining, EXCERPT_WIDTH) {
            out.push(Highlight {
                field: Field::Content,
                text,
            });
            remaining -= 1;
        }
    }

    out
}

/// Up to `max` excerpts of `text`, each about `width` characters and centred
/// on an occurrence of `needle` (ASCII case-insensitive). Whitespace is
/// collapsed and truncated sides get an ellipsis.
pub fn excerpts(text: &str, needle: &str, max: usize, width: usize) -> Vec<String> {
    let needle = needle.trim();
    if needle.is_empty() || max == 0 {
        return Vec::new();
    }

    // ASCII lowercasing keeps byte offsets aligned with `text`
    let haystack = text.to_ascii_lowercase();
    let needle_lower = needle.to_ascii_lowercase();
    let context = width.saturating_sub(needle.chars().count()) / 2;

    memmem::find_iter(haystack.as_bytes(), needle_lower.as_bytes())
        .take(max)
        .map(|pos| excerpt_at(text, pos, needle.len(), context))
        .collect()
}

fn excerpt_at(text: &str, pos: usize, len: usize, context: usize) -> String {
    let start = if context == 0 {
        pos
    } else {
        text[..pos]
            .char_indices()
            .rev()
            .nth(context - 1)
            .map_or(0, |(i, _)| i)
    };
    let tail = pos + len;
    let end = text[tail..]
        .char_indices()
        .nth(context)
        .map_or(text.len(), |(i, _)| tail + i);

    let mut excerpt = String::new();
    if start > 0 {
        excerpt.push(ELLIPSIS);
    }
    excerpt.push_str(&text[start..end].split_whitespace().collect::<Vec<_>>().join(" "));
    if end < text.len() {
        excerpt.push(ELLIPSIS);
    }
    excerpt
}
