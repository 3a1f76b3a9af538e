use std::borrow::Cow;

/// Converts an HTML fragment to plain text.
///
/// Tags are removed (block-level tags such as `<p>`, `<br>`, `<li>` become a
/// space so adjacent paragraphs do not run together), the bodies of `<script>`
/// and `<style>` are dropped, entities are decoded and runs of whitespace are
/// collapsed to a single space. A `<` that cannot start a tag (`a < b`) is
/// kept as text.
///
/// # Examples
///
/// ```
/// use podfeed::util::strip_html;
///
/// assert_eq!(strip_html("<p>Tom &amp; Jerry</p><p>Part 2</p>"), "Tom & Jerry Part 2");
/// assert_eq!(strip_html("1 < 2 <b>always</b>"), "1 < 2 always");
/// ```
pub fn strip_html(s: &str) -> String {
    let mut text = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(lt) = rest.find('<') {
        text.push_str(&rest[..lt]);
        let after = &rest[lt + 1..];

        if !starts_tag(after) {
            text.push('<');
            rest = after;
            continue;
        }

        // Comments may contain '>' so they need their own terminator
        if after.starts_with("!--") {
            rest = match after.find("-->") {
                Some(end) => &after[end + 3..],
                None => "",
            };
            continue;
        }

        let Some(gt) = after.find('>') else {
            // Unterminated tag: drop the remainder
            rest = "";
            break;
        };

        let name = tag_name(&after[..gt]);
        rest = &after[gt + 1..];

        if name == "script" || name == "style" {
            let closing = format!("</{name}");
            rest = match find_ascii_case_insensitive(rest, &closing) {
                Some(pos) => match rest[pos..].find('>') {
                    Some(end) => &rest[pos + end + 1..],
                    None => "",
                },
                None => "",
            };
            text.push(' ');
        } else if is_block_tag(&name) {
            text.push(' ');
        }
    }
    text.push_str(rest);

    let decoded = decode_entities(&text);
    collapse_whitespace(&decoded)
}

fn starts_tag(after_lt: &str) -> bool {
    matches!(
        after_lt.chars().next(),
        Some(c) if c.is_ascii_alphabetic() || c == '/' || c == '!' || c == '?'
    )
}

/// Lowercased element name of a tag body such as `/P class="x"`.
fn tag_name(tag_body: &str) -> String {
    tag_body
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn is_block_tag(name: &str) -> bool {
    matches!(
        name,
        "p" | "br"
            | "div"
            | "li"
            | "ul"
            | "ol"
            | "tr"
            | "td"
            | "th"
            | "table"
            | "blockquote"
            | "pre"
            | "hr"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "section"
            | "article"
            | "header"
            | "footer"
    )
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
    ("nbsp", " "),
    ("ndash", "\u{2013}"),
    ("mdash", "\u{2014}"),
    ("lsquo", "\u{2018}"),
    ("rsquo", "\u{2019}"),
    ("ldquo", "\u{201C}"),
    ("rdquo", "\u{201D}"),
    ("hellip", "\u{2026}"),
    ("copy", "\u{00A9}"),
    ("reg", "\u{00AE}"),
    ("trade", "\u{2122}"),
    ("bull", "\u{2022}"),
    ("middot", "\u{00B7}"),
    ("deg", "\u{00B0}"),
    ("times", "\u{00D7}"),
    ("euro", "\u{20AC}"),
    ("pound", "\u{00A3}"),
    ("yen", "\u{00A5}"),
    ("cent", "\u{00A2}"),
    ("eacute", "\u{00E9}"),
    ("egrave", "\u{00E8}"),
    ("aacute", "\u{00E1}"),
    ("agrave", "\u{00E0}"),
    ("ouml", "\u{00F6}"),
    ("uuml", "\u{00FC}"),
    ("auml", "\u{00E4}"),
    ("ccedil", "\u{00E7}"),
];

/// Decodes named (`&amp;`, `&rsquo;`, ...) and numeric (`&#38;`, `&#x26;`)
/// entities in a single pass. Unknown or malformed entities are left as-is,
/// and decoded output is never decoded a second time (`&amp;lt;` becomes
/// `&lt;`).
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];

        // Entities are short; anything longer is literal text
        let decoded = after
            .char_indices()
            .take(12)
            .find(|&(_, c)| c == ';')
            .and_then(|(semi, _)| decode_entity(&after[..semi]).map(|c| (c, semi)));

        match decoded {
            Some((replacement, semi)) => {
                out.push_str(&replacement);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);

    Cow::Owned(out)
}

fn decode_entity(body: &str) -> Option<String> {
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }

    NAMED_ENTITIES
        .iter()
        .find(|(name, _)| *name == body)
        .map(|(_, value)| (*value).to_owned())
}

/// Collapses runs of whitespace into single spaces and trims both ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strips terminal control characters and ANSI escape sequences.
///
/// Feed titles and descriptions are attacker-controlled and end up on a
/// terminal, so CSI (`ESC [ ... final`) and OSC (`ESC ] ... BEL|ST`)
/// sequences, bare ESC, DEL and C0 controls other than tab/newline/CR are
/// removed. Returns `Cow::Borrowed` when nothing needs stripping.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let needs_strip = s
        .bytes()
        .any(|b| b == 0x1b || b == 0x7f || (b < 0x20 && b != b'\t' && b != b'\n' && b != b'\r'));
    if !needs_strip {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => match chars.peek() {
                Some('[') => {
                    chars.next();
                    // Parameter and intermediate bytes up to the final byte
                    for c in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&c) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\u{07}' {
                            break;
                        }
                        if c == '\u{1b}' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {}
            c => out.push(c),
        }
    }

    Cow::Owned(out)
}
