use std::fmt;

use crate::config::{DisplayMode, RenderConfig};
use crate::isolator::isolate;
use crate::render::{choose_alignment, render, AlignMode};
use crate::restore::{leftover_token_count, restore};
use crate::rules::{PatternError, RuleSet};
use crate::skeleton::{build_skeleton, extract_queue};
use crate::textutil::correct_backticks;
use crate::tokens::Source;

/// Non-fatal conditions surfaced to the caller alongside the rendered text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderWarning {
    /// Paragraph counts disagree and sequential matching is off; rendering
    /// fell back to the all-in-one layout.
    ParagraphCountMismatch { translated: usize, original: usize },
    /// Token-shaped substrings survived restoration (both maps missed).
    RestorationIncomplete { leftover: usize },
}

impl fmt::Display for RenderWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderWarning::ParagraphCountMismatch {
                translated,
                original,
            } => write!(
                f,
                "paragraph count mismatch ({translated} translated vs {original} original); showing both texts whole"
            ),
            RenderWarning::RestorationIncomplete { leftover } => {
                write!(f, "{leftover} protected span token(s) could not be restored")
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct RenderOutcome {
    pub text: String,
    pub warnings: Vec<RenderWarning>,
    pub pattern_errors: Vec<PatternError>,
}

impl RenderOutcome {
    fn plain(text: String) -> Self {
        Self {
            text,
            warnings: Vec::new(),
            pattern_errors: Vec::new(),
        }
    }
}

/// End-to-end bilingual render: isolate both texts, build the structural
/// skeleton from the translated side, pick an alignment strategy, render, and
/// restore the isolated spans. Pure and synchronous: each call owns its token
/// maps and ordinal counters.
pub fn process_translation_text(
    original: &str,
    translated: &str,
    cfg: &RenderConfig,
) -> RenderOutcome {
    if cfg.display_mode == DisplayMode::Disabled {
        return RenderOutcome::plain(correct_backticks(translated));
    }

    let (rules, pattern_errors) = RuleSet::compile(
        &cfg.user_translate_protect_patterns,
        &cfg.user_fold_protect_patterns,
    );

    let orig = isolate(original, Source::Orig, &rules);
    let trans = isolate(translated, Source::Trans, &rules);
    let has_mask = orig.has_mask || trans.has_mask;

    let (skeleton, trans_queue) = build_skeleton(&trans.masked_text);
    let orig_queue = extract_queue(&orig.masked_text);

    let mut warnings = Vec::new();
    let mode = choose_alignment(
        trans_queue.len(),
        orig_queue.len(),
        cfg.force_sequential_matching,
    );
    if mode == AlignMode::AllInOne {
        warnings.push(RenderWarning::ParagraphCountMismatch {
            translated: trans_queue.len(),
            original: orig_queue.len(),
        });
    }

    let markup = render(
        mode,
        &skeleton,
        &orig_queue,
        cfg.display_mode,
        has_mask,
        &orig.masked_text,
        &trans.masked_text,
    );

    let restored = restore(&markup, &trans.map, &orig.map);
    let leftover = leftover_token_count(&restored);
    if leftover > 0 {
        warnings.push(RenderWarning::RestorationIncomplete { leftover });
    }

    RenderOutcome {
        text: correct_backticks(&restored),
        warnings,
        pattern_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DisplayMode, RenderConfig};

    fn cfg(mode: DisplayMode) -> RenderConfig {
        RenderConfig {
            display_mode: mode,
            ..RenderConfig::default()
        }
    }

    #[test]
    fn disabled_mode_returns_corrected_translation_only() {
        let out = process_translation_text("Hello", "안녕 `x", &cfg(DisplayMode::Disabled));
        assert_eq!(out.text, "안녕 `x`");
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn protected_span_round_trips_byte_for_byte() {
        let original = "Hello <think>ignore</think> world";
        let translated = "안녕 <think>ignore</think> 세상";
        let out = process_translation_text(original, translated, &cfg(DisplayMode::Folded));

        assert!(out.text.contains("<think>ignore</think>"));
        assert!(out.text.contains("안녕"));
        assert!(out.text.contains("Hello"));
        assert_eq!(crate::restore::leftover_token_count(&out.text), 0);
    }

    #[test]
    fn matching_paragraphs_fold_pairwise() {
        let original = "First paragraph.\n\nSecond paragraph.";
        let translated = "첫 번째 문단.\n\n두 번째 문단.";
        let out = process_translation_text(original, translated, &cfg(DisplayMode::Folded));

        assert!(out.warnings.is_empty());
        assert_eq!(out.text.matches("<details").count(), 2);
        assert!(out.text.contains("첫 번째 문단."));
        assert!(out.text.contains("First paragraph."));
    }

    #[test]
    fn mismatch_falls_back_to_all_in_one_with_warning() {
        let original = "One.\nTwo.\nThree.";
        let translated = "하나.\n둘.";
        let out = process_translation_text(original, translated, &cfg(DisplayMode::Folded));

        assert!(matches!(
            out.warnings.as_slice(),
            [RenderWarning::ParagraphCountMismatch {
                translated: 2,
                original: 3
            }]
        ));
        // No per-paragraph folding: at most the single all-in-one container.
        assert!(out.text.matches("<details").count() <= 1);
        assert!(out.text.contains("하나."));
        assert!(out.text.contains("Three."));
    }

    #[test]
    fn force_sequential_pairs_extra_paragraph_with_empty() {
        let original = "One.\nTwo.\nThree.";
        let translated = "하나.\n둘.";
        let mut config = cfg(DisplayMode::Folded);
        config.force_sequential_matching = true;

        let out = process_translation_text(original, translated, &config);
        assert!(out.warnings.is_empty());
        assert_eq!(out.text.matches("<details").count(), 2);
        assert!(out.text.contains("One."));
        assert!(out.text.contains("Two."));
        // The third original paragraph has no translated partner and is not
        // rendered (the translated skeleton drives the walk).
        assert!(!out.text.contains("Three."));
    }

    #[test]
    fn no_leftover_tokens_across_modes() {
        let original = "A <think>x</think>\n\n```\ncode\n```\n\nB";
        let translated = "가 <think>x</think>\n\n```\ncode\n```\n\n나";
        for mode in [
            DisplayMode::Folded,
            DisplayMode::Unfolded,
            DisplayMode::OriginalFirst,
        ] {
            let out = process_translation_text(original, translated, &cfg(mode));
            assert_eq!(
                crate::restore::leftover_token_count(&out.text),
                0,
                "{mode:?}"
            );
            assert!(out.text.contains("<think>x</think>"), "{mode:?}");
        }
    }

    #[test]
    fn all_in_one_with_mask_has_no_container() {
        // Counts mismatch AND a mask is present: both texts concatenated raw.
        let original = "<think>a</think>\nOne.\nTwo.";
        let translated = "<think>a</think>\n하나.";
        let out = process_translation_text(original, translated, &cfg(DisplayMode::Folded));

        assert_eq!(out.text.matches("chatfold-details").count(), 0);
        assert!(out.text.contains("하나."));
        assert!(out.text.contains("Two."));
    }

    #[test]
    fn invalid_user_pattern_is_reported_and_skipped() {
        let mut config = cfg(DisplayMode::Folded);
        config.user_translate_protect_patterns = vec!["(broken".to_string()];
        let out = process_translation_text("Hi", "안녕", &config);
        assert_eq!(out.pattern_errors.len(), 1);
        assert_eq!(out.pattern_errors[0].pattern, "(broken");
        assert!(out.text.contains("안녕"));
    }

    #[test]
    fn unfolded_mode_stacks_pairs_without_details() {
        let out = process_translation_text("Hello.", "안녕.", &cfg(DisplayMode::Unfolded));
        assert!(out.text.contains("translated_text"));
        assert!(out.text.contains("original_text"));
        assert!(!out.text.contains("<details"));
    }

    #[test]
    fn fold_protected_block_is_not_split_across_units() {
        let original = "Intro\n```\nline one\nline two\n```";
        let translated = "소개\n```\nline one\nline two\n```";
        let out = process_translation_text(original, translated, &cfg(DisplayMode::Folded));

        assert!(out.warnings.is_empty());
        // Exactly one foldable unit (the prose line); the fenced block stays
        // a single unit, with its backtick runs collapsed by the final
        // correction pass.
        assert_eq!(out.text.matches("<details").count(), 1);
        assert!(out.text.contains("`\nline one\nline two\n`"));
        assert!(!out.text.contains("<details><summary>line one"));
    }
}
