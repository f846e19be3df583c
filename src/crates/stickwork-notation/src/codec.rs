//! Token strings, numeric lists, and the phrase/accent duality
//!
//! A phrase is a list of group lengths, e.g. `[3, 3, 2]` for a bar of eight
//! notes. The first note of each group is accented, so the same bar can be
//! described by its accent indices `[0, 3, 6]`.

use stickwork_core::{Result, TimingError};

use crate::lexer::{Lexer, Token};

/// Split on whitespace, dropping empty pieces.
///
/// Joining the result with single spaces and splitting again yields the same
/// tokens.
pub fn parse_tokens(input: &str) -> Vec<String> {
    input.split_whitespace().map(str::to_string).collect()
}

pub fn join_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens.iter().map(|t| t.as_ref()).collect::<Vec<_>>().join(" ")
}

/// Parse whitespace-separated numbers, skipping anything that is not a finite
/// positive number.
pub fn parse_numeric_list(input: &str) -> Vec<f64> {
    parse_tokens(input)
        .iter()
        .filter_map(|t| t.parse::<f64>().ok())
        .filter(|n| n.is_finite() && *n > 0.0)
        .collect()
}

/// Parse phrase text such as `"3 3 2"`, `"3+3+2"` or `"3,3,2"`.
///
/// Unreadable or empty input is a single group spanning the bar.
pub fn parse_phrase(input: &str, notes_per_bar: usize) -> Vec<usize> {
    let mut lexer = Lexer::new(input);
    let mut groups = Vec::new();
    while let Some((token, span)) = lexer.next_token() {
        match token {
            Token::Number(n) if n > 0 => groups.push(n as usize),
            Token::Number(_) | Token::Plus | Token::Comma => {}
            other => {
                log::warn!(
                    "unreadable phrase '{}' ({} '{}' at {}), using one group",
                    input,
                    other,
                    lexer.slice(span),
                    span
                );
                groups.clear();
                break;
            }
        }
    }

    if groups.is_empty() {
        vec![notes_per_bar.max(1)]
    } else {
        groups
    }
}

pub fn format_phrase(groups: &[usize]) -> String {
    join_tokens(&groups.iter().map(|g| g.to_string()).collect::<Vec<_>>())
}

/// First index of every group: the running sum of the group lengths before it.
///
/// Empty groups would repeat the previous index and are skipped.
pub fn build_accent_indices(phrase: &[usize]) -> Vec<usize> {
    let mut indices = Vec::with_capacity(phrase.len());
    let mut position = 0;
    for &group in phrase.iter().filter(|&&g| g > 0) {
        indices.push(position);
        position += group;
    }
    indices
}

/// Rebuild group lengths from accent positions.
///
/// Indices outside `[0, notes_per_bar)` are dropped and duplicates ignored.
/// Without any accents the bar is one group. Notes before the first accent
/// become a leading group of their own.
pub fn build_phrase_from_accents(accents: &[usize], notes_per_bar: usize) -> Result<Vec<usize>> {
    if notes_per_bar == 0 {
        return Err(TimingError::zero("notes per bar"));
    }

    let mut sorted: Vec<usize> = accents.iter().copied().filter(|&i| i < notes_per_bar).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let Some(&first) = sorted.first() else {
        return Ok(vec![notes_per_bar]);
    };

    let mut groups = Vec::with_capacity(sorted.len() + 1);
    if first > 0 {
        groups.push(first);
    }
    for pair in sorted.windows(2) {
        groups.push(pair[1] - pair[0]);
    }
    groups.push(notes_per_bar - sorted[sorted.len() - 1]);
    Ok(groups)
}
