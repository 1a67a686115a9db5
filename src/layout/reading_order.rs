//! Reading order for unordered OCR output
//!
//! Engines tend to return observations in confidence or scan order. Items
//! are sorted top to bottom, grouped into lines by vertical overlap, and each
//! line is read left to right.

use crate::geometry::BoundingBox;

/// Default share of the shorter box height two boxes must overlap to share a line
pub const DEFAULT_SAME_LINE_OVERLAP: f64 = 0.5;

/// Vertical overlap between two boxes (negative when they are apart)
pub fn vertical_overlap(a: &BoundingBox, b: &BoundingBox) -> f64 {
    a.bottom().min(b.bottom()) - a.top().max(b.top())
}

/// A line being accumulated, tracking the vertical span of its members
struct TextLine<T> {
    top: f64,
    bottom: f64,
    items: Vec<T>,
}

impl<T> TextLine<T> {
    fn new(item: T, bbox: &BoundingBox) -> Self {
        Self {
            top: bbox.top(),
            bottom: bbox.bottom(),
            items: vec![item],
        }
    }

    fn accepts(&self, bbox: &BoundingBox, threshold: f64) -> bool {
        let span = BoundingBox::new(0.0, self.top, 0.0, self.bottom - self.top);
        let overlap = vertical_overlap(&span, bbox);
        let shorter = span.height.min(bbox.height);
        if shorter > 0.0 {
            // Boxes that only touch never share a line, even at threshold 0
            overlap > 0.0 && overlap >= threshold * shorter
        } else {
            overlap >= 0.0
        }
    }

    fn push(&mut self, item: T, bbox: &BoundingBox) {
        self.top = self.top.min(bbox.top());
        self.bottom = self.bottom.max(bbox.bottom());
        self.items.push(item);
    }
}

/// Group items into lines, top to bottom, each line sorted left to right.
///
/// Boxes must be in a top-left origin convention. Sorting is stable, so
/// items with identical geometry keep the order they were given in.
pub fn group_lines<T, F>(mut items: Vec<T>, bbox_of: F, threshold: f64) -> Vec<Vec<T>>
where
    F: Fn(&T) -> BoundingBox,
{
    items.sort_by(|a, b| {
        let (a, b) = (bbox_of(a), bbox_of(b));
        a.top()
            .total_cmp(&b.top())
            .then_with(|| a.left().total_cmp(&b.left()))
    });

    let mut lines: Vec<TextLine<T>> = Vec::new();
    for item in items {
        let bbox = bbox_of(&item);
        match lines.last_mut() {
            Some(line) if line.accepts(&bbox, threshold) => line.push(item, &bbox),
            _ => lines.push(TextLine::new(item, &bbox)),
        }
    }

    lines
        .into_iter()
        .map(|mut line| {
            line.items
                .sort_by(|a, b| bbox_of(a).left().total_cmp(&bbox_of(b).left()));
            line.items
        })
        .collect()
}

/// Flatten [`group_lines`] into a single reading sequence
pub fn sort_reading_order<T, F>(items: Vec<T>, bbox_of: F, threshold: f64) -> Vec<T>
where
    F: Fn(&T) -> BoundingBox,
{
    group_lines(items, bbox_of, threshold)
        .into_iter()
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(label: &'static str, x: f64, y: f64, w: f64, h: f64) -> (&'static str, BoundingBox) {
        (label, BoundingBox::new(x, y, w, h))
    }

    fn labels(items: &[(&'static str, BoundingBox)]) -> Vec<&'static str> {
        items.iter().map(|(l, _)| *l).collect()
    }

    #[test]
    fn test_empty_input() {
        let sorted = sort_reading_order(Vec::<(&str, BoundingBox)>::new(), |w| w.1, 0.5);
        assert!(sorted.is_empty());
    }

    #[test]
    fn test_words_on_one_line_read_left_to_right() {
        let items = vec![
            word("c", 0.6, 0.10, 0.1, 0.05),
            word("a", 0.1, 0.11, 0.1, 0.05),
            word("b", 0.3, 0.09, 0.1, 0.05),
        ];
        let sorted = sort_reading_order(items, |w| w.1, DEFAULT_SAME_LINE_OVERLAP);
        assert_eq!(labels(&sorted), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_lines_are_contiguous_and_top_to_bottom() {
        // Three bands with no vertical overlap, items shuffled
        let bands = [0.1, 0.4, 0.7];
        let mut items = Vec::new();
        let mut seed = 7u32;
        for (line, top) in bands.iter().enumerate() {
            for col in 0..4 {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                let jitter = (seed % 100) as f64 / 10_000.0;
                items.push((line, col, BoundingBox::new(col as f64 * 0.2, top + jitter, 0.15, 0.1)));
            }
        }
        items.reverse();
        items.swap(1, 7);
        items.swap(3, 10);

        let lines = group_lines(items.clone(), |w| w.2, DEFAULT_SAME_LINE_OVERLAP);
        assert_eq!(lines.len(), 3);
        for (index, line) in lines.iter().enumerate() {
            assert!(line.iter().all(|w| w.0 == index));
            let cols: Vec<usize> = line.iter().map(|w| w.1).collect();
            assert_eq!(cols, vec![0, 1, 2, 3]);
        }

        let flat = sort_reading_order(items, |w| w.2, DEFAULT_SAME_LINE_OVERLAP);
        let order: Vec<(usize, usize)> = flat.iter().map(|w| (w.0, w.1)).collect();
        let expected: Vec<(usize, usize)> = (0..3).flat_map(|l| (0..4).map(move |c| (l, c))).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_touching_lines_stay_separate() {
        let items = vec![
            word("second", 0.0, 0.2, 0.5, 0.1),
            word("first", 0.3, 0.1, 0.5, 0.1),
        ];
        let lines = group_lines(items, |w| w.1, DEFAULT_SAME_LINE_OVERLAP);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0][0].0, "first");
    }

    #[test]
    fn test_touching_lines_stay_separate_at_zero_threshold() {
        let items = vec![
            word("second", 0.0, 0.2, 0.5, 0.1),
            word("first", 0.3, 0.1, 0.5, 0.1),
        ];
        let lines = group_lines(items.clone(), |w| w.1, 0.0);
        assert_eq!(lines.len(), 2);

        let sorted = sort_reading_order(items, |w| w.1, 0.0);
        assert_eq!(labels(&sorted), vec!["first", "second"]);
    }

    #[test]
    fn test_any_overlap_joins_at_zero_threshold() {
        let items = vec![
            word("right", 0.5, 0.19, 0.2, 0.1),
            word("left", 0.1, 0.10, 0.2, 0.1),
        ];
        let lines = group_lines(items, |w| w.1, 0.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(labels(&lines[0]), vec!["left", "right"]);
    }

    #[test]
    fn test_threshold_controls_grouping() {
        // Overlap of 0.03 against a shorter height of 0.1 is 30%
        let items = vec![
            word("right", 0.5, 0.17, 0.2, 0.1),
            word("left", 0.1, 0.10, 0.2, 0.1),
        ];

        let strict = group_lines(items.clone(), |w| w.1, 0.5);
        assert_eq!(strict.len(), 2);

        let loose = group_lines(items, |w| w.1, 0.25);
        assert_eq!(loose.len(), 1);
        assert_eq!(labels(&loose[0]), vec!["left", "right"]);
    }

    #[test]
    fn test_zero_height_boxes_are_kept() {
        let items = vec![
            word("dot", 0.5, 0.15, 0.0, 0.0),
            word("line", 0.1, 0.1, 0.2, 0.1),
            word("below", 0.1, 0.5, 0.0, 0.0),
        ];
        let sorted = sort_reading_order(items, |w| w.1, DEFAULT_SAME_LINE_OVERLAP);
        assert_eq!(labels(&sorted), vec!["line", "dot", "below"]);
    }

    #[test]
    fn test_identical_boxes_keep_input_order() {
        let bbox = BoundingBox::new(0.1, 0.1, 0.1, 0.1);
        let items = vec![("one", bbox), ("two", bbox), ("three", bbox)];
        let sorted = sort_reading_order(items, |w| w.1, DEFAULT_SAME_LINE_OVERLAP);
        assert_eq!(labels(&sorted), vec!["one", "two", "three"]);
    }
}
