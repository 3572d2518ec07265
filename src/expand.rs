//! Recursive `${KEY}` placeholder expansion.

use std::collections::HashMap;
use std::env;

use crate::{TagError, TagErrorKind};

const TOKEN_OPEN: &str = "${";
const TOKEN_CLOSE: &str = "}";

/// Expands the `${KEY}` region of `text` against `dictionary`.
///
/// The key is looked up in the dictionary first, then in the process
/// environment, and substitutes the empty string when neither knows it.
/// The region spans from the first `${` to the *last* `}`; its content is
/// expanded recursively before the lookup, so `${${A}}` resolves the inner
/// token first. Strings carrying several independent `${..}` groups are not
/// supported — only a single (possibly nested) substitution region is
/// well-defined.
///
/// Text with no `${` at all is returned unchanged. A `${` with no `}` at or
/// after it fails with [`TagErrorKind::MalformedPlaceholder`].
pub fn expand_str(text: &str, dictionary: &HashMap<String, String>) -> Result<String, TagError> {
    let Some(open) = text.find(TOKEN_OPEN) else {
        return Ok(text.to_owned());
    };
    let close = match text.rfind(TOKEN_CLOSE) {
        Some(close) if close > open => close,
        _ => {
            return Err(TagErrorKind::MalformedPlaceholder {
                text: text.to_owned(),
            }
            .into());
        }
    };

    let key = expand_str(&text[open + TOKEN_OPEN.len()..close], dictionary)?;
    let value = match dictionary.get(&key) {
        Some(value) => value.clone(),
        None => env::var(&key).unwrap_or_default(),
    };

    Ok(format!(
        "{}{}{}",
        &text[..open],
        value,
        &text[close + TOKEN_CLOSE.len()..]
    ))
}
