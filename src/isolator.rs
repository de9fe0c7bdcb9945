use std::collections::HashMap;

use regex::Captures;

use crate::rules::{RuleCategory, RuleSet};
use crate::tokens::{mask_token, Source, MASK_TOKEN_RE};

/// Token -> the exact substring it replaced. One map per source per call;
/// entries are never rewritten after insertion.
pub type TokenMap = HashMap<String, String>;

#[derive(Clone, Debug)]
pub struct IsolationResult {
    pub masked_text: String,
    pub map: TokenMap,
    pub has_mask: bool,
}

/// Render-path isolation: replaces every protected span with a mask token so
/// the line-based structure pass cannot tear it apart.
///
/// Pass order: token-shaped text already in the input is masked first (tagged
/// `PREEXISTING`, restoring to its own literal text), then every
/// TranslateProtect rule, then every FoldProtect rule. A single ordinal
/// counter spans the whole call, so tokens are unique within it.
pub fn isolate(text: &str, source: Source, rules: &RuleSet) -> IsolationResult {
    if text.is_empty() {
        return IsolationResult {
            masked_text: String::new(),
            map: TokenMap::new(),
            has_mask: false,
        };
    }

    let mut map = TokenMap::new();
    let mut counter: usize = 0;

    let mut current = MASK_TOKEN_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let token = mask_token(RuleCategory::Preexisting.token_tag(), source, counter);
            counter += 1;
            map.insert(token.clone(), caps[0].to_string());
            token
        })
        .into_owned();

    for rule in rules
        .translate_protect
        .iter()
        .chain(rules.fold_protect.iter())
    {
        current = rule
            .pattern
            .replace_all(&current, |caps: &Captures<'_>| {
                let token = mask_token(rule.category.token_tag(), source, counter);
                counter += 1;
                map.insert(token.clone(), caps[0].to_string());
                token
            })
            .into_owned();
    }

    IsolationResult {
        masked_text: current,
        map,
        has_mask: counter > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleSet;

    fn default_rules() -> RuleSet {
        RuleSet::compile(&[], &[]).0
    }

    #[test]
    fn think_block_becomes_one_token() {
        let res = isolate(
            "Hello <think>ignore</think> world",
            Source::Orig,
            &default_rules(),
        );
        assert!(res.has_mask);
        assert_eq!(res.masked_text, "Hello MASK-TRANSLATE-ORIG-0 world");
        assert_eq!(
            res.map.get("MASK-TRANSLATE-ORIG-0").map(String::as_str),
            Some("<think>ignore</think>")
        );
    }

    #[test]
    fn ordinals_are_shared_across_rule_groups() {
        let res = isolate(
            "<think>a</think>\n{{img::pic.png}}",
            Source::Trans,
            &default_rules(),
        );
        assert!(res.map.contains_key("MASK-TRANSLATE-TRANS-0"));
        assert!(res.map.contains_key("MASK-FOLD-TRANS-1"));
    }

    #[test]
    fn preexisting_tokens_are_shielded() {
        let res = isolate("literal MASK-FOLD-ORIG-9 here", Source::Trans, &default_rules());
        assert_eq!(res.masked_text, "literal MASK-PREEXISTING-TRANS-0 here");
        assert_eq!(
            res.map.get("MASK-PREEXISTING-TRANS-0").map(String::as_str),
            Some("MASK-FOLD-ORIG-9")
        );
    }

    #[test]
    fn no_match_means_no_mask() {
        let res = isolate("plain text only", Source::Orig, &default_rules());
        assert!(!res.has_mask);
        assert_eq!(res.masked_text, "plain text only");
        assert!(res.map.is_empty());
    }

    #[test]
    fn each_token_appears_exactly_once() {
        let res = isolate(
            "<think>a</think> mid <think>b</think>",
            Source::Orig,
            &default_rules(),
        );
        for token in res.map.keys() {
            assert_eq!(res.masked_text.matches(token.as_str()).count(), 1, "{token}");
        }
    }

    #[test]
    fn user_pattern_is_applied_after_builtins() {
        let (rules, errors) =
            RuleSet::compile(&["/\\[secret\\].*?\\[/secret\\]/is".to_string()], &[]);
        assert!(errors.is_empty());
        let res = isolate("x [secret]keep[/secret] y", Source::Orig, &rules);
        assert_eq!(res.masked_text, "x MASK-TRANSLATE-ORIG-0 y");
    }
}
