//! Canonical form of rendered content.
//!
//! The host page prefixes every answer with an ordinal marker such as
//! `<span class="answernumber">b. </span>`. The ordinal follows the answer's
//! position, and the host shuffles positions, so markers must not take part in
//! identity. Everything else, including other markup, is kept verbatim: an
//! image-only answer still differs from its siblings by its `src`.

use std::borrow::Cow;

/// Class token marking an ordinal-marker span.
pub const ORDINAL_MARKER_CLASS: &str = "answernumber";

/// Strip every ordinal-marker span (and its contents) from `content`.
///
/// Repeats until no marker remains, so the result is a fixpoint:
/// `canonicalize(canonicalize(x)) == canonicalize(x)`.
/// An unterminated marker is left in place.
pub fn canonicalize(content: &str) -> Cow<'_, str> {
    canonicalize_with(content, ORDINAL_MARKER_CLASS)
}

/// [`canonicalize`] for pages that mark ordinals with a different class.
pub fn canonicalize_with<'a>(content: &'a str, marker_class: &str) -> Cow<'a, str> {
    if marker_class.is_empty() || !content.contains(marker_class) {
        return Cow::Borrowed(content);
    }

    let mut current = content.to_string();
    while let Some(next) = strip_pass(&current, marker_class) {
        current = next;
    }

    if current == content {
        Cow::Borrowed(content)
    } else {
        Cow::Owned(current)
    }
}

/// One left-to-right removal pass. `None` when nothing was removed.
fn strip_pass(content: &str, marker_class: &str) -> Option<String> {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    let mut removed = false;

    while let Some(start) = find_marker_open(rest, marker_class) {
        let (before, marker) = rest.split_at(start);
        match closing_span_end(marker) {
            Some(end) => {
                out.push_str(before);
                rest = &marker[end..];
                removed = true;
            }
            None => break,
        }
    }
    out.push_str(rest);

    removed.then_some(out)
}

/// Byte offset of the next `<span ...>` whose class list holds the marker token.
fn find_marker_open(s: &str, marker_class: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(rel) = s[offset..].find("<span") {
        let start = offset + rel;
        if let Some(tag_len) = span_open_len(&s[start..]) {
            if has_marker_class(&s[start..start + tag_len], marker_class) {
                return Some(start);
            }
        }
        offset = start + "<span".len();
    }
    None
}

/// Length of the opening tag at the start of `s` if it really is a `<span>`
/// (and not, say, `<spanner>`).
fn span_open_len(s: &str) -> Option<usize> {
    let after = s.get("<span".len()..)?;
    match after.chars().next() {
        Some(c) if c == '>' || c.is_whitespace() => {}
        _ => return None,
    }
    s.find('>').map(|gt| gt + 1)
}

fn has_marker_class(open_tag: &str, marker_class: &str) -> bool {
    class_attr(open_tag).is_some_and(|value| {
        value.split_whitespace().any(|class| class == marker_class)
    })
}

/// Value of the `class` attribute of an opening tag, scanning attribute by
/// attribute so that names like `data-class` are not mistaken for it.
fn class_attr(open_tag: &str) -> Option<&str> {
    let body = open_tag.strip_prefix('<')?;
    let body = body.strip_suffix('>').unwrap_or(body);
    // Skip the tag name.
    let mut rest = body.trim_start_matches(|c: char| !c.is_whitespace() && c != '/');

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
        if rest.is_empty() {
            return None;
        }

        let name_len = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let (name, after) = rest.split_at(name_len);

        let after_ws = after.trim_start();
        let Some(after_eq) = after_ws.strip_prefix('=') else {
            // Valueless attribute.
            rest = after;
            continue;
        };
        let after_eq = after_eq.trim_start();

        let (value, tail) = match after_eq.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let quoted = &after_eq[1..];
                match quoted.find(quote) {
                    Some(end) => (&quoted[..end], &quoted[end + 1..]),
                    None => (quoted, ""),
                }
            }
            _ => {
                let end = after_eq.find(char::is_whitespace).unwrap_or(after_eq.len());
                after_eq.split_at(end)
            }
        };

        if name.eq_ignore_ascii_case("class") {
            return Some(value);
        }
        rest = tail;
    }
}

/// Given `s` starting with a span opening tag, the byte offset just past its
/// matching `</span>`, honouring nested spans.
fn closing_span_end(s: &str) -> Option<usize> {
    const CLOSE: &str = "</span>";

    let mut depth = 0usize;
    let mut pos = 0;
    while let Some(rel) = s[pos..].find('<') {
        let at = pos + rel;
        let tail = &s[at..];
        if tail.starts_with(CLOSE) {
            depth = depth.checked_sub(1)?;
            pos = at + CLOSE.len();
            if depth == 0 {
                return Some(pos);
            }
        } else if let Some(len) = span_open_len(tail) {
            depth += 1;
            pos = at + len;
        } else {
            pos = at + 1;
        }
    }
    None
}
