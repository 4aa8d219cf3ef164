//! Scan tokens: the three-field record encoded in every LockIt QR code.
//!
//! A token is printed on a parcel-box label as a QR code containing plain text
//! of the form:
//!
//! ```text
//! <userId>-<boxId>-<pin>
//! ```
//!
//! # Parsing rules (for beginners)
//!
//! The raw text is split on the `-` character.  Exactly three parts must come
//! out, in this literal order: user id, box id, PIN.  Anything else (two
//! parts, four parts, no delimiter at all) is rejected with
//! [`TokenError::InvalidFormat`].
//!
//! Because the delimiter is a plain `-`, none of the three fields can contain a
//! `-` themselves.  A user id such as `"jean-luc"` would produce four parts and
//! is therefore rejected; callers that need richer identifiers must pick a
//! different encoding.
//!
//! Beyond the part count, the only check performed is that no field is empty.
//! There is no character-set or length validation.

use thiserror::Error;

/// Delimiter between the three token fields.
pub const TOKEN_DELIMITER: char = '-';

/// Human-readable description of the accepted format, carried by
/// [`TokenError::InvalidFormat`].
pub const EXPECTED_FORMAT: &str = "userId-BoxId-pin";

/// Number of fields a valid token splits into.
const FIELD_COUNT: usize = 3;

/// Error type for token parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The raw text did not split into exactly three parts.
    #[error("Invalid input format. Expected format is \"{expected}\" (got {parts} part(s))")]
    InvalidFormat {
        /// The accepted format, always [`EXPECTED_FORMAT`].
        expected: &'static str,
        /// How many parts the raw text actually split into.
        parts: usize,
    },

    /// The raw text split into three parts but one of them is empty.
    #[error("token field `{field}` is empty")]
    EmptyField {
        /// Name of the empty field (`user_id`, `box_id` or `pin`).
        field: &'static str,
    },
}

/// A parsed scan token.
///
/// Invariant: all three fields are non-empty and contain no `-`.  The only way
/// to build a `ScanToken` outside of tests is [`parse_token`] (or
/// [`ScanToken::new`], which applies the same checks).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanToken {
    user_id: String,
    box_id: String,
    pin: String,
}

impl ScanToken {
    /// Builds a token from its three fields.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::EmptyField`] if any field is empty, and
    /// [`TokenError::InvalidFormat`] if any field contains the delimiter
    /// (the token could not be re-read from its own text form).
    pub fn new(
        user_id: impl Into<String>,
        box_id: impl Into<String>,
        pin: impl Into<String>,
    ) -> Result<Self, TokenError> {
        let token = Self {
            user_id: user_id.into(),
            box_id: box_id.into(),
            pin: pin.into(),
        };
        for (field, value) in token.fields() {
            if value.is_empty() {
                return Err(TokenError::EmptyField { field });
            }
        }
        let parts = token.to_string().split(TOKEN_DELIMITER).count();
        if parts != FIELD_COUNT {
            return Err(TokenError::InvalidFormat {
                expected: EXPECTED_FORMAT,
                parts,
            });
        }
        Ok(token)
    }

    /// The user the box is assigned to.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The parcel box identifier.
    pub fn box_id(&self) -> &str {
        &self.box_id
    }

    /// The unlock PIN.
    pub fn pin(&self) -> &str {
        &self.pin
    }

    fn fields(&self) -> [(&'static str, &str); FIELD_COUNT] {
        [
            ("user_id", self.user_id.as_str()),
            ("box_id", self.box_id.as_str()),
            ("pin", self.pin.as_str()),
        ]
    }
}

impl std::fmt::Display for ScanToken {
    /// Formats the token back into its `userId-boxId-pin` text form.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{TOKEN_DELIMITER}{}{TOKEN_DELIMITER}{}",
            self.user_id, self.box_id, self.pin
        )
    }
}

impl std::str::FromStr for ScanToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_token(s)
    }
}

/// Parses raw decoded (or typed) text into a [`ScanToken`].
///
/// # Errors
///
/// - [`TokenError::InvalidFormat`] when `raw` does not split into exactly
///   three parts on `-`.
/// - [`TokenError::EmptyField`] when one of the three parts is empty.
///
/// # Examples
///
/// ```rust
/// use lockit_core::parse_token;
///
/// let token = parse_token("alice-box42-7890").unwrap();
/// assert_eq!(token.user_id(), "alice");
/// assert_eq!(token.box_id(), "box42");
/// assert_eq!(token.pin(), "7890");
///
/// assert!(parse_token("alice-box42").is_err());
/// ```
pub fn parse_token(raw: &str) -> Result<ScanToken, TokenError> {
    let parts: Vec<&str> = raw.split(TOKEN_DELIMITER).collect();
    let [user_id, box_id, pin] = parts.as_slice() else {
        return Err(TokenError::InvalidFormat {
            expected: EXPECTED_FORMAT,
            parts: parts.len(),
        });
    };
    ScanToken::new(*user_id, *box_id, *pin)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_splits_three_fields_in_order() {
        // Arrange / Act
        let token = parse_token("alice-box42-7890").expect("valid token");

        // Assert
        assert_eq!(token.user_id(), "alice");
        assert_eq!(token.box_id(), "box42");
        assert_eq!(token.pin(), "7890");
    }

    #[test]
    fn test_parse_token_rejects_two_parts() {
        let result = parse_token("alice-box42");
        assert_eq!(
            result,
            Err(TokenError::InvalidFormat {
                expected: EXPECTED_FORMAT,
                parts: 2
            })
        );
    }

    #[test]
    fn test_parse_token_rejects_four_parts() {
        let result = parse_token("jean-luc-box42-7890");
        assert!(matches!(
            result,
            Err(TokenError::InvalidFormat { parts: 4, .. })
        ));
    }

    #[test]
    fn test_parse_token_rejects_text_without_delimiter() {
        let result = parse_token("https://example.com/qr");
        assert!(matches!(result, Err(TokenError::InvalidFormat { .. })));

        let result = parse_token("plaintext");
        assert!(matches!(
            result,
            Err(TokenError::InvalidFormat { parts: 1, .. })
        ));
    }

    #[test]
    fn test_parse_token_rejects_empty_string_as_one_part() {
        // "".split('-') yields a single empty part.
        let result = parse_token("");
        assert!(matches!(
            result,
            Err(TokenError::InvalidFormat { parts: 1, .. })
        ));
    }

    #[test]
    fn test_parse_token_rejects_empty_middle_field() {
        let result = parse_token("alice--7890");
        assert_eq!(result, Err(TokenError::EmptyField { field: "box_id" }));
    }

    #[test]
    fn test_parse_token_rejects_empty_trailing_field() {
        let result = parse_token("alice-box42-");
        assert_eq!(result, Err(TokenError::EmptyField { field: "pin" }));
    }

    #[test]
    fn test_parse_token_keeps_whitespace_verbatim() {
        // No trimming is applied; fields are taken exactly as decoded.
        let token = parse_token(" alice-box42-7890 ").expect("valid token");
        assert_eq!(token.user_id(), " alice");
        assert_eq!(token.pin(), "7890 ");
    }

    #[test]
    fn test_invalid_format_message_names_expected_format() {
        let err = parse_token("alice").unwrap_err();
        assert!(err.to_string().contains("userId-BoxId-pin"));
    }

    #[test]
    fn test_display_reproduces_raw_text() {
        let raw = "u1-b2-p3";
        let token = parse_token(raw).unwrap();
        assert_eq!(token.to_string(), raw);
    }

    #[test]
    fn test_from_str_matches_parse_token() {
        let token: ScanToken = "u1-b2-p3".parse().unwrap();
        assert_eq!(token, parse_token("u1-b2-p3").unwrap());
    }

    #[test]
    fn test_new_rejects_field_containing_delimiter() {
        let result = ScanToken::new("jean-luc", "box42", "7890");
        assert!(matches!(
            result,
            Err(TokenError::InvalidFormat { parts: 4, .. })
        ));
    }
}
