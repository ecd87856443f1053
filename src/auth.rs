//! Inbound `Authorization` header handling.

use crate::{Credential, Result, SessionError};

/// Extracts the bearer token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively; the token must be a single
/// non-empty word.
pub fn parse_bearer(header: Option<&str>) -> Result<Credential> {
    let value = header
        .map(str::trim)
        .ok_or_else(|| auth_error("missing Authorization header"))?;

    let prefix = value.get(..7);
    if !prefix.is_some_and(|prefix| prefix.eq_ignore_ascii_case("bearer ")) {
        return Err(auth_error("Authorization header must use the Bearer scheme"));
    }

    let token = value[7..].trim();
    if token.is_empty() {
        return Err(auth_error("bearer token is empty"));
    }
    if token.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
        return Err(auth_error("malformed bearer token"));
    }
    Ok(Credential::new(token))
}

fn auth_error(message: &str) -> SessionError {
    SessionError::AuthHeader(message.to_owned())
}

#[cfg(test)]
mod tests {
    use super::parse_bearer;
    use crate::FailureKind;

    #[test]
    fn accepts_bearer_in_any_case() {
        let credential = parse_bearer(Some("bEaReR abc123")).expect("must parse");
        assert_eq!(credential.expose(), "abc123");

        let credential = parse_bearer(Some("  Bearer   abc123 ")).expect("must parse");
        assert_eq!(credential.expose(), "abc123");
    }

    #[test]
    fn rejects_missing_and_malformed_headers() {
        for header in [
            None,
            Some(""),
            Some("Bearer"),
            Some("Bearer "),
            Some("Basic dXNlcjpwYXNz"),
            Some("Bearer a b"),
            Some("abc123"),
        ] {
            let err = parse_bearer(header).expect_err("must reject");
            assert_eq!(err.kind(), FailureKind::AuthHeader, "header {header:?}");
        }
    }
}
