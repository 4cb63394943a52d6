//! Span rewriting for located occurrences.

use crate::locate::Occurrence;
use crate::model::{Inline, Paragraph, Run};

/// Replace one occurrence inside `paragraph`.
///
/// With `preserve_formatting` the replacement lands in the head run (the run
/// holding the occurrence start) and the other covered runs lose their covered
/// slice. Runs emptied this way are kept. Without it the whole paragraph
/// collapses into a single plain run.
///
/// Returns 1 when the paragraph changed, 0 for an occurrence without run slices.
pub fn rewrite(
    paragraph: &mut Paragraph,
    occurrence: &Occurrence,
    replacement: &str,
    preserve_formatting: bool,
) -> usize {
    if occurrence.slices.is_empty() {
        return 0;
    }

    if preserve_formatting {
        for (position, slice) in occurrence.slices.iter().enumerate() {
            let Some(run) = paragraph.run_at_mut(slice.run) else {
                continue;
            };
            let text = if position == 0 { replacement } else { "" };
            run.text.replace_range(slice.start..slice.end, text);
        }
    } else {
        let mut text = paragraph.text();
        text.replace_range(occurrence.start..occurrence.end, replacement);
        collapse_runs(paragraph, text);
    }
    1
}

/// Drop every run and put `text` into one plain run where the first run was.
fn collapse_runs(paragraph: &mut Paragraph, text: String) {
    let anchor = paragraph
        .content
        .iter()
        .position(|inline| matches!(inline, Inline::Run(_)))
        .unwrap_or(paragraph.content.len());

    // Everything ahead of the anchor is a non-run inline, so the index survives.
    paragraph
        .content
        .retain(|inline| !matches!(inline, Inline::Run(_)));
    paragraph.content.insert(anchor, Inline::Run(Run::new(text)));
}
