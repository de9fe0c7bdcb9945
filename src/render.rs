use crate::config::DisplayMode;
use crate::skeleton::SkeletonNode;

/// Rendering strategy picked from the paragraph-count comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlignMode {
    /// Full source and full translation as two undivided blocks. Safe
    /// fallback when positional pairing would misalign.
    AllInOne,
    /// Per-paragraph pairing driven by the translated skeleton.
    Interleaved,
}

/// Paragraph-count mismatch forces AllInOne unless the caller explicitly
/// opted into sequential matching; with the opt-in, pairing degrades to empty
/// strings past the shorter queue instead.
pub fn choose_alignment(trans_len: usize, orig_len: usize, force_sequential: bool) -> AlignMode {
    if !force_sequential && trans_len != orig_len {
        AlignMode::AllInOne
    } else {
        AlignMode::Interleaved
    }
}

#[allow(clippy::too_many_arguments)]
pub fn render(
    mode: AlignMode,
    skeleton: &[SkeletonNode],
    orig_queue: &[String],
    display_mode: DisplayMode,
    has_mask: bool,
    orig_masked_text: &str,
    trans_masked_text: &str,
) -> String {
    match mode {
        AlignMode::AllInOne => {
            render_all_in_one(display_mode, has_mask, orig_masked_text, trans_masked_text)
        }
        AlignMode::Interleaved => render_interleaved(skeleton, orig_queue, display_mode),
    }
}

/// Two full masked texts joined by a blank line. When any mask is present the
/// texts are concatenated unadorned: a protected span may contain raw markup
/// that would break a foldable container wrapped around it.
fn render_all_in_one(
    display_mode: DisplayMode,
    has_mask: bool,
    orig_masked_text: &str,
    trans_masked_text: &str,
) -> String {
    let (first, second) = match display_mode {
        DisplayMode::OriginalFirst => (orig_masked_text, trans_masked_text),
        _ => (trans_masked_text, orig_masked_text),
    };

    if has_mask {
        return format!("{first}\n\n{second}");
    }

    let mode_class = match display_mode {
        DisplayMode::OriginalFirst => "mode-original-first",
        _ => "mode-folded",
    };
    format!(
        "<details class=\"chatfold-details {mode_class}\">\n\
         <summary class=\"chatfold-summary\">{first}</summary>\n\
         {second}\n\
         </details>"
    )
}

/// Walks the translated skeleton: Mask and Empty lines pass through verbatim,
/// each Text line pairs with the same-index original paragraph (or an empty
/// string once the original queue is exhausted).
fn render_interleaved(
    skeleton: &[SkeletonNode],
    orig_queue: &[String],
    display_mode: DisplayMode,
) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(skeleton.len());
    let mut orig_index = 0usize;

    for node in skeleton {
        match node {
            SkeletonNode::Mask(content) | SkeletonNode::Empty(content) => {
                parts.push(content.clone());
            }
            SkeletonNode::Text(trans_text) => {
                let orig_text = orig_queue.get(orig_index).map(String::as_str).unwrap_or("");
                orig_index += 1;
                parts.push(fold_unit(trans_text, orig_text, display_mode));
            }
        }
    }

    parts.join("\n")
}

/// One paragraph pair in the shape the display mode asks for.
fn fold_unit(trans_text: &str, orig_text: &str, display_mode: DisplayMode) -> String {
    match display_mode {
        DisplayMode::Unfolded => format!(
            "<span class=\"translated_text mode-unfolded\">{trans_text}</span><br>\
             <span class=\"original_text mode-unfolded\">{orig_text}</span>"
        ),
        DisplayMode::OriginalFirst => format!(
            "<details class=\"chatfold-details mode-original-first\">\
             <summary class=\"chatfold-summary\"><span class=\"original_text\">{orig_text}</span></summary>\
             <span class=\"translated_text\">{trans_text}</span>\
             </details>"
        ),
        _ => format!(
            "<details class=\"chatfold-details mode-folded\">\
             <summary class=\"chatfold-summary\"><span class=\"translated_text\">{trans_text}</span></summary>\
             <span class=\"original_text\">{orig_text}</span>\
             </details>"
        ),
    }
}
