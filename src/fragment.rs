//! Server HTML fragments reduced to terminal text.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use tracing::error;

struct Patterns {
    line_break: Regex,
    tag: Regex,
    response_textarea: Regex,
    markup_token: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            line_break: Regex::new(r"(?i)<br\s*/?>|</p\s*>|</div\s*>|</li\s*>")?,
            tag: Regex::new(r"<[^>]*>")?,
            response_textarea: Regex::new(
                r#"(?is)<textarea[^>]*id\s*=\s*"response-textarea"[^>]*>(.*?)</textarea\s*>"#,
            )?,
            markup_token: Regex::new(r"<[^>]+>|[^<]+")?,
        })
    }
}

static PATTERNS: LazyLock<Option<Patterns>> = LazyLock::new(|| match Patterns::compile() {
    Ok(patterns) => Some(patterns),
    Err(e) => {
        error!(error = %e, "fragment patterns failed to compile");
        None
    }
});

/// Compiled patterns; `None` leaves fragments as raw text.
fn patterns() -> Option<&'static Patterns> {
    PATTERNS.as_ref()
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr", "!doctype",
];

/// Plain text of a fragment: tags stripped, breaks kept, blank lines dropped.
pub fn to_text(html: &str) -> String {
    let stripped = match patterns() {
        Some(p) => {
            let with_breaks = p.line_break.replace_all(html, "\n");
            p.tag.replace_all(&with_breaks, "").into_owned()
        }
        None => html.to_string(),
    };
    decode_entities(&stripped)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Contents of the `response-textarea` element of a request result, if any.
pub fn response_body(html: &str) -> Option<String> {
    patterns()?
        .response_textarea
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str()).trim_end_matches(['\r', '\n']).to_string())
}

/// Text around the response body, e.g. the `$  status: 200` line.
pub fn response_summary(html: &str) -> String {
    match patterns() {
        Some(p) => to_text(&p.response_textarea.replace_all(html, "")),
        None => to_text(html),
    }
}

/// Re-indents JSON and markup response bodies; anything else is returned as is.
pub fn format_response(text: &str) -> String {
    match text.chars().next() {
        Some('{') | Some('[') => match pretty_json(text) {
            Some(pretty) => pretty + "\n",
            None => text.to_string(),
        },
        Some('<') => beautify_markup(text),
        _ => text.to_string(),
    }
}

fn pretty_json(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer).ok()?;
    String::from_utf8(out).ok()
}

fn beautify_markup(text: &str) -> String {
    let Some(p) = patterns() else {
        return text.to_string();
    };
    let mut depth: usize = 0;
    let mut lines = Vec::new();

    for token in p.markup_token.find_iter(text).map(|m| m.as_str().trim()) {
        if token.is_empty() {
            continue;
        }
        if token.starts_with("</") {
            depth = depth.saturating_sub(1);
            lines.push(format!("{}{}", "    ".repeat(depth), token));
            continue;
        }
        lines.push(format!("{}{}", "    ".repeat(depth), token));
        if token.starts_with('<') && opens_element(token) {
            depth += 1;
        }
    }

    lines.join("\n")
}

fn opens_element(tag: &str) -> bool {
    if tag.ends_with("/>") || tag.starts_with("<!--") || tag.starts_with("<?") {
        return false;
    }
    let name: String = tag[1..]
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '>' && *c != '/')
        .collect::<String>()
        .to_ascii_lowercase();
    !VOID_ELEMENTS.contains(&name.as_str())
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match candidate.find(';').filter(|end| *end <= 10) {
            Some(end) => {
                let entity = &candidate[1..end];
                match decode_entity(entity) {
                    Some(c) => out.push(c),
                    None => out.push_str(&candidate[..=end]),
                }
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let number = entity.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}
