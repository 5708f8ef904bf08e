//! Product URL helpers.
//!
//! Product pages are addressed by an encoded product name rather than an id,
//! e.g. `/products/Divine-Orb?league=Settlers&difficulty=softcore`.

/// Characters replaced by `-` when encoding a product name.
const SEPARATORS: &[char] = &[
    '+', '&', '%', '#', '@', '!', '(', ')', '[', ']', '{', '}', ':', ';', '\'', '"', ',', '.',
    '?', '<', '>', '/', '\\', '|',
];

/// Encode a product name into a URL path segment.
///
/// Whitespace and punctuation become `-`, runs of `-` collapse, leading and
/// trailing `-` are trimmed and whatever is left is percent-encoded.
pub fn encode_product_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c.is_whitespace() || SEPARATORS.contains(&c) {
            '-'
        } else {
            c
        };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    percent_encode(out.trim_matches('-'))
}

/// Turn an encoded path segment back into a display name.
///
/// Falls back to the raw segment when it is not valid percent-encoding.
pub fn decode_product_name(slug: &str) -> String {
    let decoded = percent_decode(slug).unwrap_or_else(|| slug.to_string());
    title_case(&decoded.replace('-', " "))
}

/// Relative product page URL. `league` / `difficulty` of `any` are skipped.
pub fn product_url(name: &str, league: Option<&str>, difficulty: Option<&str>) -> String {
    let mut url = format!("/products/{}", encode_product_name(name));
    let params: Vec<String> = [("league", league), ("difficulty", difficulty)]
        .into_iter()
        .filter_map(|(k, v)| {
            v.filter(|v| !v.is_empty() && *v != "any")
                .map(|v| format!("{}={}", k, form_encode(v)))
        })
        .collect();
    if !params.is_empty() {
        url.push('?');
        url.push_str(&params.join("&"));
    }
    url
}

/// Rewrite `http://` URLs to `https://`. Other URLs pass through.
pub fn enforce_https(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

/// Comparison key for slug lookups.
pub(crate) fn slug_key(s: &str) -> String {
    let decoded = percent_decode(s).unwrap_or_else(|| s.to_string());
    encode_product_name(&decoded).to_lowercase()
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_word = false;
    for c in s.chars() {
        if !prev_word && is_word(c) {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
        prev_word = is_word(c);
    }
    out
}

/// Percent-encode everything except the URI-component unreserved set.
fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// Form-style encoding for query values (space becomes `+`).
fn form_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'*' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

fn percent_decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
