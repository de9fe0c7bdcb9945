use crate::tokens::is_mask_only_line;

/// One line of masked text, classified. `Empty` and `Text` keep the raw line
/// content verbatim (internal whitespace included); `Mask` keeps the trimmed
/// token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkeletonNode {
    Mask(String),
    Empty(String),
    Text(String),
}

/// Scans the masked translated text line-by-line into a skeleton, plus the
/// ordered queue of Text line contents embedded in it.
pub fn build_skeleton(masked_text: &str) -> (Vec<SkeletonNode>, Vec<String>) {
    let mut skeleton = Vec::new();
    let mut text_queue = Vec::new();

    for line in masked_text.split('\n') {
        let trimmed = line.trim();
        if is_mask_only_line(trimmed) {
            skeleton.push(SkeletonNode::Mask(trimmed.to_string()));
        } else if trimmed.is_empty() {
            skeleton.push(SkeletonNode::Empty(line.to_string()));
        } else {
            skeleton.push(SkeletonNode::Text(line.to_string()));
            text_queue.push(line.to_string());
        }
    }

    (skeleton, text_queue)
}

/// Same classification as `build_skeleton`, keeping only the Text lines.
/// Applied to the masked source text to get the pairing queue.
pub fn extract_queue(masked_text: &str) -> Vec<String> {
    masked_text
        .split('\n')
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !is_mask_only_line(trimmed)
        })
        .map(|line| line.to_string())
        .collect()
}
