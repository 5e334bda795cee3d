//! Format normalisation: strip LLM response wrapping from converted code.
//!
//! ## Why is this necessary?
//!
//! Even well-prompted models frequently wrap their answer in a fenced code
//! block — sometimes with a language tag line — despite the prompt saying
//! "output only the code". This module deterministically unwraps that
//! response so downstream consumers always see plain source text.
//!
//! ## Multi-block responses
//!
//! When a response contains more than one fenced block (e.g. explanation
//! plus code), the **first** block wins: the payload is the span between the
//! first and second delimiters, and later delimiters are ignored. This
//! matches the common case of a single wrapped block; a response that leads
//! with a prose block would lose the code, but models prompted for
//! code-only output do not produce that shape in practice.
//!
//! Normalisation never fails — unparsable input degrades to best-effort
//! trimmed text — and is idempotent: output contains no fence delimiters,
//! so a second pass returns it unchanged.

const FENCE: &str = "```";

/// Language tags recognised (case-insensitively) on the first payload line
/// of a fenced block. The line is dropped when it matches exactly.
const KNOWN_LANGUAGE_TAGS: &[&str] = &[
    "c",
    "cpp",
    "python",
    "java",
    "javascript",
    "js",
    "html",
    "css",
    "go",
    "rust",
    "ruby",
];

/// Clean raw model output into plain source text.
///
/// `target_lang` is accepted so callers key normalisation on the language
/// they asked for; the tag check itself matches any known tag, since models
/// sometimes label the block with an alias (e.g. `js` for `javascript`).
pub fn clean_code(raw: &str, target_lang: &str) -> String {
    let _ = target_lang;
    let code = raw.trim();

    let first = match code.find(FENCE) {
        Some(pos) => pos,
        None => return code.to_string(),
    };
    let after_first = first + FENCE.len();

    match code[after_first..].find(FENCE) {
        Some(rel) => {
            // Two or more delimiters: the payload is the span between the
            // first pair.
            let payload = code[after_first..after_first + rel].trim();
            strip_language_tag(payload).trim().to_string()
        }
        None => {
            // A single stray delimiter: remove it.
            code.replace(FENCE, "").trim().to_string()
        }
    }
}

/// Drop the first line of `payload` when it is exactly a known language tag.
fn strip_language_tag(payload: &str) -> &str {
    let Some(newline) = payload.find('\n') else {
        return payload;
    };
    let first_line = payload[..newline].trim();
    if KNOWN_LANGUAGE_TAGS
        .iter()
        .any(|tag| tag.eq_ignore_ascii_case(first_line))
    {
        &payload[newline + 1..]
    } else {
        payload
    }
}
