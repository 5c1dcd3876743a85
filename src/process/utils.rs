use once_cell::sync::Lazy;
use regex::Regex;

static CORPORATE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(" llc| inc| ltd").expect("valid suffix regex"));

/// Anything that is not a word character or whitespace.
static SYMBOLS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid symbol regex"));

/// 1) Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Start,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// 2) Drop spaces at the start of every field of raw delimited bytes.
///
/// Runs before parsing so a quote that follows `, ` still opens a quoted
/// field. Bytes inside quotes are left alone. Tabs count as space unless the
/// delimiter is a tab.
pub fn skip_initial_space(data: &[u8], delimiter: u8) -> Vec<u8> {
    let is_space = |b: u8| b == b' ' || (b == b'\t' && delimiter != b'\t');
    let mut out = Vec::with_capacity(data.len());
    let mut state = Field::Start;

    for &b in data {
        state = match state {
            Field::Start if is_space(b) => continue,
            Field::Start if b == b'"' => Field::Quoted,
            Field::Quoted if b == b'"' => Field::QuoteInQuoted,
            Field::Quoted => Field::Quoted,
            Field::QuoteInQuoted if b == b'"' => Field::Quoted,
            _ if b == delimiter || b == b'\n' || b == b'\r' => Field::Start,
            _ => Field::Unquoted,
        };
        out.push(b);
    }
    out
}

/// 3) An empty cell counts as missing.
pub fn blank_as_missing(raw: &str) -> Option<&str> {
    if raw.is_empty() {
        None
    } else {
        Some(raw)
    }
}

/// 4) Remove every ` llc`, ` inc`, ` ltd`, wherever it occurs.
pub fn strip_corporate_suffixes(s: &str) -> String {
    CORPORATE_SUFFIX.replace_all(s, "").into_owned()
}

/// 5) Remove anything that is not a word character or whitespace.
pub fn strip_symbols(s: &str) -> String {
    SYMBOLS.replace_all(s, "").into_owned()
}

/// 6) Suffix removal (names only) followed by symbol removal. Expects lowercased, trimmed input.
pub fn scrub_text(s: &str, is_name: bool) -> String {
    if is_name {
        strip_symbols(&strip_corporate_suffixes(s))
    } else {
        strip_symbols(s)
    }
}
