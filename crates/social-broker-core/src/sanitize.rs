// Text sanitation applied to every free-text field coming out of a
// provider profile, plus redirect-target scrubbing for the thin HTTP
// surface. Markup is stripped, whitespace runs collapse to one space,
// ends are trimmed; the username variant additionally removes spaces
// and lower-cases.

use std::borrow::Cow;

/// Remove anything that looks like markup. Unclosed tags are dropped to
/// the end of the input.
pub fn strip_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Collapse internal whitespace runs to a single space and trim the ends.
pub fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_space = false;
    for ch in input.trim().chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out
}

/// Standard sanitation for free-text profile fields.
pub fn clean_text(input: &str) -> String {
    collapse_whitespace(&strip_markup(input))
}

/// Username-seed sanitation: `clean_text` plus space removal and lower-casing.
pub fn clean_username(input: &str) -> String {
    clean_text(input).replace(' ', "").to_lowercase()
}

/// Coerce possibly invalid byte content to valid UTF-8 instead of rejecting it.
pub fn coerce_utf8(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// Strip an embedded logout marker from a redirect target so a successful
/// login can never bounce the visitor straight back out.
pub fn sanitize_redirect_target(target: &str) -> String {
    let (rest, fragment) = match target.split_once('#') {
        Some((r, f)) => (r, Some(f)),
        None => (target, None),
    };
    let sanitized = match rest.split_once('?') {
        Some((base, query)) => {
            let kept: Vec<&str> = query
                .split('&')
                .filter(|pair| !pair.eq_ignore_ascii_case("logintype=logout"))
                .filter(|pair| !pair.is_empty())
                .collect();
            if kept.is_empty() {
                base.to_string()
            } else {
                format!("{}?{}", base, kept.join("&"))
            }
        }
        None => rest.to_string(),
    };
    match fragment {
        Some(f) => format!("{sanitized}#{f}"),
        None => sanitized,
    }
}

/// Append a machine-readable error code to a fallback target.
pub fn error_redirect(fallback: &str, code: &str) -> String {
    let sep = if fallback.contains('?') { "&" } else { "?" };
    format!("{}{}error={}", fallback, sep, urlencoding::encode(code))
}
