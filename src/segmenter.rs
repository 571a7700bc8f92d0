// Groups adjacent same-page text units into larger spans for scoring
use std::num::NonZeroUsize;

use crate::types::TextSegment;

/// Merge consecutive runs of at most `max_group` segments that share a page.
///
/// The inputs are consumed; the output holds fresh segments with score 0.
pub fn merge_segments(units: Vec<TextSegment>, max_group: NonZeroUsize) -> Vec<TextSegment> {
    let max_group = max_group.get();
    let mut merged = Vec::new();
    let mut group: Vec<TextSegment> = Vec::with_capacity(max_group);

    for unit in units {
        let page_changed = group.first().is_some_and(|g| g.page_index != unit.page_index);
        if page_changed || group.len() >= max_group {
            merged.push(merge_group(&group));
            group.clear();
        }
        group.push(unit);
    }

    if !group.is_empty() {
        merged.push(merge_group(&group));
    }

    merged
}

/// Collapse a non-empty group into one segment covering all its members.
///
/// Panics on an empty group: the scan above never produces one.
pub fn merge_group(group: &[TextSegment]) -> TextSegment {
    assert!(!group.is_empty(), "cannot merge an empty group of segments");

    let text = group
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let region = group
        .iter()
        .skip(1)
        .fold(group[0].region, |acc, s| acc.union(&s.region));

    TextSegment::new(text, region, group[0].page_index)
}
