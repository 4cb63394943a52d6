//! Literal search over a paragraph's logical text.

use std::ops::Range;

use crate::model::Paragraph;

/// The part of one run covered by an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSlice {
    /// Index into [`Paragraph::content`].
    pub run: usize,
    /// Byte offsets inside the run's text.
    pub start: usize,
    pub end: usize,
}

/// A located match, as byte offsets into the paragraph's logical text plus the
/// run slices it covers, in run order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub start: usize,
    pub end: usize,
    pub slices: Vec<RunSlice>,
}

/// Find all non-overlapping occurrences of `search`, left to right.
///
/// Case-insensitive search lower-cases both sides; offsets are mapped back to
/// character boundaries of the original text.
pub fn find_all(text: &str, search: &str, case_sensitive: bool) -> Vec<Range<usize>> {
    if search.is_empty() {
        return Vec::new();
    }
    if case_sensitive {
        return text
            .match_indices(search)
            .map(|(start, m)| start..start + m.len())
            .collect();
    }

    let needle = search.to_lowercase();
    let folded = FoldedText::new(text);
    folded
        .text
        .match_indices(needle.as_str())
        .filter_map(|(start, m)| folded.original_range(start, start + m.len()))
        .collect()
}

/// Locate `search` in a paragraph and attach the covered run slices.
pub fn locate(paragraph: &Paragraph, search: &str, case_sensitive: bool) -> Vec<Occurrence> {
    let text = paragraph.text();
    let layout = paragraph.run_layout();

    find_all(&text, search, case_sensitive)
        .into_iter()
        .map(|range| {
            let slices = layout
                .iter()
                .filter(|extent| {
                    extent.start < extent.end
                        && extent.start < range.end
                        && extent.end > range.start
                })
                .map(|extent| RunSlice {
                    run: extent.index,
                    start: range.start.max(extent.start) - extent.start,
                    end: range.end.min(extent.end) - extent.start,
                })
                .collect();
            Occurrence {
                start: range.start,
                end: range.end,
                slices,
            }
        })
        .collect()
}

/// Lower-cased text with a byte map back to the original.
struct FoldedText {
    text: String,
    /// For each byte of `text`, the byte offset of the source character.
    origin: Vec<usize>,
    original_len: usize,
}

impl FoldedText {
    fn new(original: &str) -> Self {
        let mut text = String::with_capacity(original.len());
        let mut origin = Vec::with_capacity(original.len());
        for (offset, ch) in original.char_indices() {
            for lower in ch.to_lowercase() {
                text.push(lower);
                origin.extend(std::iter::repeat(offset).take(lower.len_utf8()));
            }
        }
        Self {
            text,
            origin,
            original_len: original.len(),
        }
    }

    fn original_range(&self, start: usize, end: usize) -> Option<Range<usize>> {
        let from = *self.origin.get(start)?;
        let to = if end >= self.text.len() {
            self.original_len
        } else {
            self.origin[end]
        };
        (from < to).then_some(from..to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Run, RunFormat};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("abcabc", "abc", true, vec![0..3, 3..6])]
    #[case("aaaa", "aa", true, vec![0..2, 2..4])]
    #[case("OLD text old", "Old", false, vec![0..3, 9..12])]
    #[case("OLD text old", "Old", true, vec![])]
    #[case("nothing here", "", true, vec![])]
    #[case("café CAFÉ", "CAFÉ", false, vec![0..5, 6..11])]
    fn test_find_all(
        #[case] text: &str,
        #[case] search: &str,
        #[case] case_sensitive: bool,
        #[case] expected: Vec<Range<usize>>,
    ) {
        assert_eq!(find_all(text, search, case_sensitive), expected);
    }

    #[test]
    fn test_case_insensitive_matches_fold_equal() {
        let text = "Alpha ALPHA alpha aLpHa";
        for range in find_all(text, "alpha", false) {
            assert_eq!(text[range].to_lowercase(), "alpha");
        }
    }

    #[test]
    fn test_locate_reports_slices_across_runs() {
        let paragraph = Paragraph::new()
            .with_run(Run::new("Hello {{na"))
            .with_run(Run::formatted("me", RunFormat::bold()))
            .with_run(Run::new("}}!"));

        let occurrences = locate(&paragraph, "{{name}}", true);
        assert_eq!(occurrences.len(), 1);
        let occurrence = &occurrences[0];
        assert_eq!((occurrence.start, occurrence.end), (6, 14));
        assert_eq!(
            occurrence.slices,
            vec![
                RunSlice { run: 0, start: 6, end: 10 },
                RunSlice { run: 1, start: 0, end: 2 },
                RunSlice { run: 2, start: 0, end: 2 },
            ]
        );
    }

    #[test]
    fn test_locate_skips_empty_runs() {
        let paragraph = Paragraph::new()
            .with_run(Run::new("ab"))
            .with_run(Run::new(""))
            .with_run(Run::new("cd"));

        let occurrences = locate(&paragraph, "bc", true);
        assert_eq!(occurrences[0].slices.len(), 2);
        assert_eq!(occurrences[0].slices[1].run, 2);
    }
}
