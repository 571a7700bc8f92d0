// Properties of box merging over arbitrary unit streams
use pdf_ai_colorize::segmenter::merge_segments;
use pdf_ai_colorize::{Rect, TextSegment};
use proptest::prelude::*;
use std::num::NonZeroUsize;

fn unit_strategy() -> impl Strategy<Value = TextSegment> {
    (
        "[a-z]{1,8}",
        0usize..3,
        0.0f32..500.0,
        0.0f32..700.0,
        1.0f32..80.0,
        1.0f32..20.0,
    )
        .prop_map(|(text, page, x, y, w, h)| TextSegment::new(text, Rect::new(x, y, x + w, y + h), page))
}

fn units_strategy() -> impl Strategy<Value = Vec<TextSegment>> {
    // Sorted by page so runs look like real extractor output.
    prop::collection::vec(unit_strategy(), 0..40).prop_map(|mut units| {
        units.sort_by_key(|u| u.page_index);
        units
    })
}

proptest! {
    #[test]
    fn merged_region_is_the_tight_bound_of_its_members(units in units_strategy(), n in 1usize..8) {
        let merged = merge_segments(units.clone(), NonZeroUsize::new(n).unwrap());

        let mut cursor = units.iter();
        for segment in &merged {
            let members = segment.text.split(' ').count();
            prop_assert!(members >= 1 && members <= n);
            let group: Vec<&TextSegment> = cursor.by_ref().take(members).collect();
            prop_assert_eq!(group.len(), members);
            for unit in &group {
                prop_assert_eq!(unit.page_index, segment.page_index);
            }
            let bounds = group
                .iter()
                .skip(1)
                .fold(group[0].region, |acc, unit| acc.union(&unit.region));
            prop_assert_eq!(segment.region, bounds);
            prop_assert_eq!(segment.score, 0.0);
        }
        prop_assert!(cursor.next().is_none());
    }

    #[test]
    fn text_is_preserved_in_order(units in units_strategy(), n in 1usize..8) {
        let expected: Vec<String> = units.iter().map(|u| u.text.clone()).collect();
        let merged = merge_segments(units, NonZeroUsize::new(n).unwrap());
        let rejoined: Vec<String> = merged
            .iter()
            .flat_map(|s| s.text.split(' ').map(str::to_string))
            .collect();
        prop_assert_eq!(rejoined, expected);
    }

    #[test]
    fn segment_count_is_bounded(units in units_strategy(), n in 1usize..8) {
        let len = units.len();
        let pages = {
            let mut p: Vec<usize> = units.iter().map(|u| u.page_index).collect();
            p.dedup();
            p.len()
        };
        let merged = merge_segments(units, NonZeroUsize::new(n).unwrap());
        prop_assert!(merged.len() <= len);
        prop_assert!(merged.len() >= len.div_ceil(n).max(pages));
    }

    #[test]
    fn union_is_commutative_and_covering(
        a in (0.0f32..100.0, 0.0f32..100.0, 0.0f32..100.0, 0.0f32..100.0),
        b in (0.0f32..100.0, 0.0f32..100.0, 0.0f32..100.0, 0.0f32..100.0),
    ) {
        let a = Rect::from(a);
        let b = Rect::from(b);
        prop_assert_eq!(a.union(&b), b.union(&a));
        prop_assert!(a.union(&b).contains(&a));
        prop_assert!(a.union(&b).contains(&b));
    }
}
