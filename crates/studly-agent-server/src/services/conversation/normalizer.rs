use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]*>").expect("valid tag regex"));
static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").expect("valid entity regex")
});
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Strip markup and normalize whitespace.
///
/// Entities are decoded first so that escaped tags (`&lt;b&gt;`) are removed
/// along with real ones; stray angle brackets that never formed a tag are
/// dropped. The result never contains `<` or `>`, has no runs of whitespace
/// and is trimmed.
pub fn normalize_text(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let decoded = decode_entities(raw);
    let untagged = TAG_RE.replace_all(&decoded, " ");
    let cleaned: String = untagged.chars().filter(|c| *c != '<' && *c != '>').collect();

    WHITESPACE_RE.replace_all(&cleaned, " ").trim().to_string()
}

/// Upper bound on decoding rounds for nested encodings like `&amp;lt;`.
const MAX_DECODE_PASSES: usize = 4;

fn decode_entities(raw: &str) -> String {
    let mut text = raw.to_string();
    for _ in 0..MAX_DECODE_PASSES {
        if !text.contains('&') {
            break;
        }
        let decoded = ENTITY_RE
            .replace_all(&text, |caps: &Captures| {
                decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned();
        if decoded == text {
            break;
        }
        text = decoded;
    }
    text
}

fn decode_entity(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }

    let decoded = match name {
        "nbsp" => " ",
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        _ => return None,
    };
    Some(decoded.to_string())
}
