//! Just enough XML reading for Query API responses
//!
//! Responses are small, namespace-default, attribute-free documents, so
//! elements are located by tag name. Same-named nested elements
//! (`member` inside `member`) are matched by depth.

/// Inner text of every top-level `<tag>` element in `xml`, in order
pub fn elements<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let mut found = Vec::new();
    let mut rest = xml;

    while let Some(start) = rest.find(&open) {
        let body_start = start + open.len();
        let mut depth = 1;
        let mut cursor = body_start;

        loop {
            let next_open = rest[cursor..].find(&open).map(|i| cursor + i);
            let Some(next_close) = rest[cursor..].find(&close).map(|i| cursor + i) else {
                // Unterminated element
                return found;
            };

            match next_open {
                Some(o) if o < next_close => {
                    depth += 1;
                    cursor = o + open.len();
                }
                _ => {
                    depth -= 1;
                    if depth == 0 {
                        found.push(&rest[body_start..next_close]);
                        rest = &rest[next_close + close.len()..];
                        break;
                    }
                    cursor = next_close + close.len();
                }
            }
        }
    }

    found
}

/// Inner text of the first `<tag>` element
pub fn first<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    elements(xml, tag).into_iter().next()
}

/// Unescaped, trimmed text of the first `<tag>` element
pub fn text(xml: &str, tag: &str) -> Option<String> {
    first(xml, tag).map(|raw| unescape(raw.trim()))
}

/// Unescaped text of each `<member>` under the first `<tag>` element
pub fn member_texts(xml: &str, tag: &str) -> Vec<String> {
    first(xml, tag)
        .map(|list| {
            elements(list, "member")
                .into_iter()
                .map(|m| unescape(m.trim()))
                .collect()
        })
        .unwrap_or_default()
}

/// Decode the predefined XML entities and numeric character references
///
/// Decoding is a single pass, so `&amp;lt;` becomes `&lt;`. Unknown or
/// malformed references are kept as written.
pub fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];

        let decoded = rest
            .find(';')
            .and_then(|end| decode_entity(&rest[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "amp" => Some('&'),
        _ => {
            let code = match entity.strip_prefix('#')? {
                hex if hex.starts_with(['x', 'X']) => u32::from_str_radix(&hex[1..], 16).ok()?,
                dec => dec.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
