//! Email syntax checks applied at the transport edge.

use crate::error::{ProfileError, ProfileResult};
use validator::ValidateEmail;

pub fn is_valid_email(email: &str) -> bool {
    email.validate_email()
}

/// Reject syntactically invalid emails with [`ProfileError::InvalidArgument`].
pub fn ensure_valid_email(email: &str) -> ProfileResult<()> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(ProfileError::InvalidArgument(format!("invalid email '{email}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_addresses() {
        for email in ["a@example.com", "x@test.com", "first.last+tag@sub.domain.org"] {
            assert!(is_valid_email(email), "{email} should be valid");
        }
    }

    #[test]
    fn rejects_malformed_addresses() {
        for email in ["", "not-an-email", "@example.com", "user@", "two@@example.com"] {
            assert!(!is_valid_email(email), "{email:?} should be invalid");
        }
    }

    #[test]
    fn ensure_maps_to_invalid_argument() {
        assert!(ensure_valid_email("a@example.com").is_ok());
        assert!(matches!(
            ensure_valid_email("not-an-email"),
            Err(ProfileError::InvalidArgument(_))
        ));
    }
}
