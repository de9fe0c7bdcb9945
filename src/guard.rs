use once_cell::sync::Lazy;
use regex::{Captures, NoExpand, Regex};

use crate::rules::RuleSet;
use crate::tokens::{var_placeholder, VAR_PLACEHOLDER_RE};

/// Text ready to be sent to the translation backend, plus the spans that were
/// lifted out of it. Span index == placeholder index.
#[derive(Clone, Debug)]
pub struct MaskedForTranslation {
    pub text: String,
    pub spans: Vec<String>,
}

/// Outcome of substituting spans back in. `found < expected` means the model
/// destroyed placeholders beyond repair; the corresponding spans are lost from
/// the output (diagnostic only, no auto-correction).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnmaskReport {
    pub expected: usize,
    pub found: usize,
}

impl UnmaskReport {
    pub fn is_complete(&self) -> bool {
        self.found >= self.expected
    }
}

/// Replaces every TranslateProtect match with a constant `[[__VAR_<n>__]]`
/// placeholder before the text goes to the backend. Uses the same rule set as
/// render-path isolation but a different, model-tuned grammar; the two must
/// stay separate concepts.
pub fn mask_for_translation(text: &str, rules: &RuleSet) -> MaskedForTranslation {
    let mut spans: Vec<String> = Vec::new();
    let mut current = text.to_string();

    for rule in &rules.translate_protect {
        current = rule
            .pattern
            .replace_all(&current, |caps: &Captures<'_>| {
                let placeholder = var_placeholder(spans.len());
                spans.push(caps[0].to_string());
                placeholder
            })
            .into_owned();
    }

    MaskedForTranslation {
        text: current,
        spans,
    }
}

// Translator-induced mutations, each repaired independently back to the
// canonical placeholder. Order matters: whitespace first, then word swaps.
static REPAIR_SPACED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[\s*__VAR_(\d+)__\s*\]\]").expect("spaced repair regex"));
static REPAIR_KOREAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[\s*__변수_(\d+)__\s*\]\]").expect("korean repair regex"));
static REPAIR_EXPANDED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[\s*__VARIABLE_(\d+)__\s*\]\]").expect("expanded repair regex"));
static REPAIR_LOWER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[\s*__var_(\d+)__\s*\]\]").expect("lowercase repair regex"));

/// Normalizes the common ways a model mangles `[[__VAR_<n>__]]`: internal
/// whitespace, "VAR" translated to 변수, expanded to VARIABLE, or lower-cased.
/// Idempotent: canonical text passes through unchanged.
pub fn repair_placeholders(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut fixed = REPAIR_SPACED_RE
        .replace_all(text, "[[__VAR_${1}__]]")
        .into_owned();
    fixed = REPAIR_KOREAN_RE
        .replace_all(&fixed, "[[__VAR_${1}__]]")
        .into_owned();
    fixed = REPAIR_EXPANDED_RE
        .replace_all(&fixed, "[[__VAR_${1}__]]")
        .into_owned();
    fixed = REPAIR_LOWER_RE
        .replace_all(&fixed, "[[__VAR_${1}__]]")
        .into_owned();
    fixed
}

/// Substitutes each canonical placeholder, by index, with its original span.
/// The placeholder is regex-escaped before compiling, so bracket characters
/// stay literal.
pub fn unmask(text: &str, spans: &[String]) -> (String, UnmaskReport) {
    let found = VAR_PLACEHOLDER_RE.find_iter(text).count();
    let report = UnmaskReport {
        expected: spans.len(),
        found,
    };

    let mut current = text.to_string();
    for (index, span) in spans.iter().enumerate() {
        let escaped = regex::escape(&var_placeholder(index));
        let placeholder_re = Regex::new(&escaped).expect("escaped placeholder regex");
        // NoExpand keeps `$` in the original span literal.
        current = placeholder_re
            .replace_all(&current, NoExpand(span.as_str()))
            .into_owned();
    }
    (current, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;

    fn default_rules() -> RuleSet {
        RuleSet::compile(&[], &[]).0
    }

    #[test]
    fn mask_then_unmask_round_trips() {
        let src = "before <think>raw <b>html</b></think> after";
        let masked = mask_for_translation(src, &default_rules());
        assert_eq!(masked.text, "before [[__VAR_0__]] after");
        assert_eq!(masked.spans.len(), 1);

        let (out, report) = unmask(&masked.text, &masked.spans);
        assert_eq!(out, src);
        assert!(report.is_complete());
    }

    #[test]
    fn repair_fixes_internal_whitespace() {
        assert_eq!(repair_placeholders("[[  __VAR_0__  ]]"), "[[__VAR_0__]]");
    }

    #[test]
    fn repair_fixes_translated_and_mutated_words() {
        assert_eq!(repair_placeholders("[[__변수_3__]]"), "[[__VAR_3__]]");
        assert_eq!(repair_placeholders("[[__VARIABLE_1__]]"), "[[__VAR_1__]]");
        assert_eq!(repair_placeholders("[[ __var_2__ ]]"), "[[__VAR_2__]]");
    }

    #[test]
    fn repair_is_idempotent() {
        let cases = [
            "plain text",
            "[[__VAR_0__]]",
            "a [[ __변수_1__ ]] b [[__VARIABLE_2__]] c",
        ];
        for case in cases {
            let once = repair_placeholders(case);
            let twice = repair_placeholders(&once);
            assert_eq!(once, twice, "{case}");
        }
    }

    #[test]
    fn missing_placeholder_is_reported_not_fixed() {
        let spans = vec!["<think>a</think>".to_string(), "<think>b</think>".to_string()];
        let (out, report) = unmask("only [[__VAR_0__]] survived", &spans);
        assert_eq!(out, "only <think>a</think> survived");
        assert_eq!(report.expected, 2);
        assert_eq!(report.found, 1);
        assert!(!report.is_complete());
    }

    #[test]
    fn placeholder_indices_follow_span_order() {
        let src = "<think>a</think> mid <tableEdit>b</tableEdit>";
        let masked = mask_for_translation(src, &default_rules());
        assert_eq!(masked.text, "[[__VAR_0__]] mid [[__VAR_1__]]");
        assert_eq!(masked.spans[0], "<think>a</think>");
        assert_eq!(masked.spans[1], "<tableEdit>b</tableEdit>");
    }
}
