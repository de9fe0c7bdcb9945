use regex::Captures;

use crate::isolator::TokenMap;
use crate::tokens::{mask_token, parse_mask_token, MASK_TOKEN_RE};

/// Replaces every mask token in the rendered markup with its original
/// content. A token whose declared source map misses is retried against the
/// opposite map under the flipped source tag (line rearrangement can attribute
/// a token to the wrong side). A token both maps miss stays in the output:
/// a visible failure beats silent data loss.
pub fn restore(markup: &str, trans_map: &TokenMap, orig_map: &TokenMap) -> String {
    MASK_TOKEN_RE
        .replace_all(markup, |caps: &Captures<'_>| {
            let token = &caps[0];
            let Some(parsed) = parse_mask_token(token) else {
                return token.to_string();
            };

            let (own_map, other_map) = match parsed.source {
                crate::tokens::Source::Trans => (trans_map, orig_map),
                crate::tokens::Source::Orig => (orig_map, trans_map),
            };

            if let Some(content) = own_map.get(token) {
                return content.clone();
            }

            let cross_key = mask_token(&parsed.category, parsed.source.flipped(), parsed.ordinal);
            if let Some(content) = other_map.get(&cross_key) {
                return content.clone();
            }

            token.to_string()
        })
        .into_owned()
}

/// Count of token-shaped substrings left in a text. Non-zero after
/// restoration means a cross-restoration failure.
pub fn leftover_token_count(text: &str) -> usize {
    MASK_TOKEN_RE.find_iter(text).count()
}
