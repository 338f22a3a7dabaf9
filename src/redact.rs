use std::borrow::Cow;

const JWT_PREFIX: &str = "eyJ";
const ACCESS_TOKEN_FIELD: &str = "\"access_token\":\"";

fn is_token_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || ch == '.'
}

/// Masks anything that looks like a JWT (`eyJ...`).
pub fn redact_jwt(input: &str) -> Cow<'_, str> {
    if !input.contains(JWT_PREFIX) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(idx) = rest.find(JWT_PREFIX) {
        let starts_word = rest[..idx]
            .chars()
            .next_back()
            .map_or(true, |prev| !is_token_char(prev));
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];

        let consumed: usize = rest
            .chars()
            .take_while(|ch| is_token_char(*ch))
            .map(char::len_utf8)
            .sum();
        let candidate = &rest[..consumed];
        if starts_word && candidate.matches('.').count() == 2 {
            out.push_str("REDACTED");
        } else {
            out.push_str(candidate);
        }
        rest = &rest[consumed..];
    }
    out.push_str(rest);

    if out == input {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(out)
    }
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let nee = needle.as_bytes();
    if nee.is_empty() {
        return Some(0);
    }
    if nee.len() > hay.len() {
        return None;
    }

    (0..=hay.len() - nee.len()).find(|&i| hay[i..i + nee.len()].eq_ignore_ascii_case(nee))
}

fn redact_until(text: String, marker: &str, stop: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text.as_str();
    loop {
        let Some(idx) = find_ascii_case_insensitive(rest, marker) else {
            out.push_str(rest);
            break;
        };
        let end = idx + marker.len();
        out.push_str(&rest[..end]);
        rest = &rest[end..];

        if let Some(first) = rest.chars().next() {
            if first == ' ' {
                out.push(' ');
                rest = &rest[first.len_utf8()..];
            }
        }

        let consumed: usize = rest
            .chars()
            .take_while(|ch| !stop(*ch))
            .map(char::len_utf8)
            .sum();
        out.push_str("REDACTED");
        rest = &rest[consumed..];
    }
    out
}

/// Strips tokens from text before it reaches the logs.
pub fn redact_secrets(input: &str) -> Cow<'_, str> {
    let mut value = redact_jwt(input).into_owned();

    value = redact_until(value, "Authorization:", |ch| ch == '\n' || ch == '\r');
    value = redact_until(value, ACCESS_TOKEN_FIELD, |ch| ch == '"');

    if value == input {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_secrets_redacts_authorization_header_line() {
        let input = "authorization: abc.def\nAccept: application/json\n";
        let out = redact_secrets(input).to_string();
        assert_eq!(out, "authorization: REDACTED\nAccept: application/json\n");
    }

    #[test]
    fn redact_secrets_masks_stored_session_json() {
        let input = r#"{"access_token":"opaque-token-1"}"#;
        let out = redact_secrets(input).to_string();
        assert_eq!(out, r#"{"access_token":"REDACTED"}"#);
    }

    #[test]
    fn redact_jwt_masks_three_part_tokens_only() {
        let input = "token eyJhbGciOi.eyJzdWIiOjF9.c2lnbmF0dXJl sent, eyJnot-a-jwt kept";
        let out = redact_jwt(input).to_string();
        assert_eq!(out, "token REDACTED sent, eyJnot-a-jwt kept");
    }

    #[test]
    fn clean_text_is_borrowed() {
        assert!(matches!(
            redact_secrets("error sending request for url"),
            Cow::Borrowed(_)
        ));
    }
}
