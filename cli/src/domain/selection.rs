//! Ordinal selection over ordered lists
//!
//! Lists are kept in creation order and addressed by 0-based position.
//! How positions are rendered (letters, numbers) is up to the caller.

use crate::error::ValidationError;

/// Pick exactly one item; out-of-range positions are rejected, never clamped
pub fn select_one<T>(items: &[T], index: usize) -> Result<&T, ValidationError> {
    items
        .get(index)
        .ok_or(ValidationError::SelectionOutOfRange {
            index,
            len: items.len(),
        })
}

/// Outcome of a multi-select
#[derive(Debug, PartialEq, Eq)]
pub struct Selection<'a, T> {
    /// Selected items, deduplicated, in the order first requested
    pub chosen: Vec<&'a T>,
    /// Requested positions that did not exist
    pub out_of_range: Vec<usize>,
}

/// Pick several items
///
/// Repeated positions count once. Out-of-range positions are reported
/// alongside the valid ones; the call only fails when nothing valid remains.
pub fn select_many<'a, T>(
    items: &'a [T],
    indices: &[usize],
) -> Result<Selection<'a, T>, ValidationError> {
    let mut seen = std::collections::HashSet::new();
    let mut chosen = Vec::new();
    let mut out_of_range = Vec::new();

    for &index in indices {
        if !seen.insert(index) {
            continue;
        }
        match items.get(index) {
            Some(item) => chosen.push(item),
            None => out_of_range.push(index),
        }
    }

    if chosen.is_empty() {
        return Err(match out_of_range.first() {
            Some(&index) => ValidationError::SelectionOutOfRange {
                index,
                len: items.len(),
            },
            None => ValidationError::EmptySelection,
        });
    }

    Ok(Selection {
        chosen,
        out_of_range,
    })
}
