use once_cell::sync::Lazy;
use regex::Regex;

/// Render-path token grammar: `MASK-<CATEGORY>-<SOURCE>-<ordinal>`.
///
/// Tokens stand in for protected spans while the line-based structure pass
/// runs, and carry enough metadata (origin + category + ordinal) to be
/// restored afterwards, including cross-restoration from the opposite map.
pub static MASK_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"MASK-([A-Z]+)-(ORIG|TRANS)-(\d+)").expect("mask token regex"));

/// Same grammar anchored to a whole (trimmed) line.
pub static MASK_TOKEN_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^MASK-[A-Z]+-(?:ORIG|TRANS)-\d+$").expect("mask line regex"));

/// Translate-path placeholder grammar: `[[__VAR_<n>__]]`.
///
/// Deliberately distinct from the mask-token grammar: this is the shape a
/// language model is most likely to treat as a code variable and pass through
/// untranslated.
pub static VAR_PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[__VAR_(\d+)__\]\]").expect("var placeholder regex"));

/// Which input a token was minted from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    Orig,
    Trans,
}

impl Source {
    pub fn tag(self) -> &'static str {
        match self {
            Source::Orig => "ORIG",
            Source::Trans => "TRANS",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Source::Orig => Source::Trans,
            Source::Trans => Source::Orig,
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "ORIG" => Some(Source::Orig),
            "TRANS" => Some(Source::Trans),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedToken {
    pub category: String,
    pub source: Source,
    pub ordinal: usize,
}

pub fn mask_token(category: &str, source: Source, ordinal: usize) -> String {
    format!("MASK-{category}-{}-{ordinal}", source.tag())
}

pub fn parse_mask_token(token: &str) -> Option<ParsedToken> {
    let caps = MASK_TOKEN_RE.captures(token)?;
    if caps.get(0)?.as_str() != token {
        return None;
    }
    Some(ParsedToken {
        category: caps[1].to_string(),
        source: Source::parse(&caps[2])?,
        ordinal: caps[3].parse().ok()?,
    })
}

/// True iff the trimmed line is exactly one mask token (and nothing else).
pub fn is_mask_only_line(trimmed_line: &str) -> bool {
    MASK_TOKEN_LINE_RE.is_match(trimmed_line)
}

pub fn var_placeholder(index: usize) -> String {
    format!("[[__VAR_{index}__]]")
}
