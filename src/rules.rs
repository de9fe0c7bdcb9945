use once_cell::sync::Lazy;
use regex::Regex;

/// Evaluation order is fixed: Preexisting first (guards token-shaped text
/// already present in the input against double-masking), then every
/// TranslateProtect rule, then every FoldProtect rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleCategory {
    Preexisting,
    TranslateProtect,
    FoldProtect,
}

impl RuleCategory {
    /// Category tag embedded in generated mask tokens.
    pub fn token_tag(self) -> &'static str {
        match self {
            RuleCategory::Preexisting => "PREEXISTING",
            RuleCategory::TranslateProtect => "TRANSLATE",
            RuleCategory::FoldProtect => "FOLD",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ProtectedSpanRule {
    pub category: RuleCategory,
    pub pattern: Regex,
}

/// A user pattern that failed to compile. Collected, never fatal.
#[derive(Clone, Debug)]
pub struct PatternError {
    pub pattern: String,
    pub error: String,
}

/// Block tags and fences the translation backend must never see in the clear.
static BUILTIN_TRANSLATE_PROTECT: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?is)<think>.*?</think>",
        r"(?is)<thinking>.*?</thinking>",
        r"(?is)<tableEdit>.*?</tableEdit>",
        r"(?is)<details[^>]*>.*?</details>",
        r"(?s)`{3,}[^`]*.*?`{3,}",
        r"(?is)<UpdateVariable>.*?</UpdateVariable>",
        r"(?i)<StatusPlaceHolderImpl\s*/?>",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("builtin translate-protect regex"))
    .collect()
});

/// Spans that survive translation but must not be torn apart by per-paragraph
/// folding: image macros, variable/status tags, whole-line code fences, and
/// full HTML documents.
static BUILTIN_FOLD_PROTECT: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\{\{img::.*?\}\}",
        r"(?is)<UpdateVariable>.*?</UpdateVariable>",
        r"(?i)<StatusPlaceHolderImpl\s*/?>",
        r"(?ms)^```.*?```$",
        r"(?is)^<!DOCTYPE.*?</html>",
        r"(?is)<html.*?</html>",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("builtin fold-protect regex"))
    .collect()
});

static SLASH_PATTERN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/(.*?)/([a-z]*)$").expect("slash pattern regex"));

/// Compiled rule sets for one call. Built fresh from the caller's config; the
/// core keeps no global pattern state.
#[derive(Clone, Debug)]
pub struct RuleSet {
    pub translate_protect: Vec<ProtectedSpanRule>,
    pub fold_protect: Vec<ProtectedSpanRule>,
}

impl RuleSet {
    /// Builtins plus user-declared patterns, in declaration order. Patterns
    /// that fail to compile are skipped and reported back.
    pub fn compile(
        user_translate_protect: &[String],
        user_fold_protect: &[String],
    ) -> (Self, Vec<PatternError>) {
        let mut errors = Vec::new();

        let mut translate_protect: Vec<ProtectedSpanRule> = BUILTIN_TRANSLATE_PROTECT
            .iter()
            .map(|p| ProtectedSpanRule {
                category: RuleCategory::TranslateProtect,
                pattern: p.clone(),
            })
            .collect();
        append_user_rules(
            &mut translate_protect,
            RuleCategory::TranslateProtect,
            user_translate_protect,
            &mut errors,
        );

        let mut fold_protect: Vec<ProtectedSpanRule> = BUILTIN_FOLD_PROTECT
            .iter()
            .map(|p| ProtectedSpanRule {
                category: RuleCategory::FoldProtect,
                pattern: p.clone(),
            })
            .collect();
        append_user_rules(
            &mut fold_protect,
            RuleCategory::FoldProtect,
            user_fold_protect,
            &mut errors,
        );

        (
            Self {
                translate_protect,
                fold_protect,
            },
            errors,
        )
    }
}

fn append_user_rules(
    rules: &mut Vec<ProtectedSpanRule>,
    category: RuleCategory,
    raw_patterns: &[String],
    errors: &mut Vec<PatternError>,
) {
    for raw in raw_patterns {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        match compile_user_pattern(raw) {
            Ok(pattern) => rules.push(ProtectedSpanRule { category, pattern }),
            Err(err) => errors.push(PatternError {
                pattern: raw.to_string(),
                error: err.to_string(),
            }),
        }
    }
}

/// Parses a user pattern: `/body/flags` when the whole string matches that
/// shape, else a plain body with the default case-insensitive flag. The `g`
/// flag is meaningless here (replacement is always global) and is dropped.
pub fn compile_user_pattern(raw: &str) -> Result<Regex, regex::Error> {
    let (body, flags) = match SLASH_PATTERN_RE.captures(raw) {
        Some(caps) => {
            let body = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let mut flags = String::new();
            for ch in caps.get(2).map(|m| m.as_str()).unwrap_or_default().chars() {
                match ch {
                    'i' | 'm' | 's' | 'x' => {
                        if !flags.contains(ch) {
                            flags.push(ch);
                        }
                    }
                    _ => {}
                }
            }
            (body.to_string(), flags)
        }
        None => (raw.to_string(), "i".to_string()),
    };

    if flags.is_empty() {
        Regex::new(&body)
    } else {
        Regex::new(&format!("(?{flags}){body}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_translate_protect_covers_think_blocks() {
        let (rules, errors) = RuleSet::compile(&[], &[]);
        assert!(errors.is_empty());
        let text = "a <THINK>hidden\nstuff</THINK> b";
        assert!(rules
            .translate_protect
            .iter()
            .any(|r| r.pattern.is_match(text)));
    }

    #[test]
    fn fenced_code_is_translate_protected() {
        let (rules, _) = RuleSet::compile(&[], &[]);
        let text = "x\n```py\nprint(1)\n```\ny";
        assert!(rules
            .translate_protect
            .iter()
            .any(|r| r.pattern.is_match(text)));
    }

    #[test]
    fn slash_form_pattern_honors_flags() {
        let re = compile_user_pattern("/<custom>.*?</custom>/is").expect("compile");
        assert!(re.is_match("<CUSTOM>a\nb</CUSTOM>"));
    }

    #[test]
    fn plain_pattern_defaults_to_case_insensitive() {
        let re = compile_user_pattern("secret").expect("compile");
        assert!(re.is_match("SECRET"));
    }

    #[test]
    fn invalid_pattern_is_collected_not_fatal() {
        let user = vec!["(unclosed".to_string(), "/ok/".to_string()];
        let (rules, errors) = RuleSet::compile(&user, &[]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].pattern, "(unclosed");
        assert_eq!(
            rules.translate_protect.len(),
            BUILTIN_TRANSLATE_PROTECT.len() + 1
        );
    }

    #[test]
    fn g_flag_is_dropped() {
        let re = compile_user_pattern("/abc/gi").expect("compile");
        assert!(re.is_match("ABC"));
    }
}
