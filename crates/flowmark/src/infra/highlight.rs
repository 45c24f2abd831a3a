//! Splitting tree labels into plain and filter-matching segments.

use crate::app::filter::Filter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    pub content: String,
    pub matched: bool,
}

/// Split `label` into spans, marking every non-overlapping occurrence of `filter`.
pub fn highlight(label: &str, filter: &Filter) -> Vec<HighlightSpan> {
    if filter.is_empty() {
        return vec![plain(label)];
    }

    let chars: Vec<char> = label.chars().collect();
    let needle: Vec<char> = filter.as_str().chars().collect();
    let mut spans = Vec::new();
    let mut pending = String::new();
    let mut idx = 0;

    while idx < chars.len() {
        if matches_at(&chars[idx..], &needle) {
            if !pending.is_empty() {
                spans.push(plain(&std::mem::take(&mut pending)));
            }
            spans.push(HighlightSpan {
                content: chars[idx..idx + needle.len()].iter().collect(),
                matched: true,
            });
            idx += needle.len();
        } else {
            pending.push(chars[idx]);
            idx += 1;
        }
    }
    if !pending.is_empty() {
        spans.push(plain(&pending));
    }
    spans
}

fn matches_at(haystack: &[char], needle: &[char]) -> bool {
    haystack.len() >= needle.len()
        && haystack
            .iter()
            .zip(needle)
            .all(|(ch, expected)| upper(*ch) == *expected)
}

fn upper(ch: char) -> char {
    let mut upper = ch.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(single), None) => single,
        _ => ch,
    }
}

fn plain(content: &str) -> HighlightSpan {
    HighlightSpan {
        content: content.to_owned(),
        matched: false,
    }
}
