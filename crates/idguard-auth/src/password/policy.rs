//! Password policy enforcement for new passwords.

use idguard_core::config::auth::AuthConfig;
use idguard_core::error::AppError;

/// The symbol set accepted for the special-character requirement.
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Validates password strength against the configured policy.
///
/// Each violation is reported as a distinct `Policy` error naming the rule,
/// so the user can correct it. Reuse checking is not done here: it needs
/// the stored history and lives with the credential flows.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    /// Minimum password length.
    min_length: usize,
}

impl PasswordPolicy {
    /// Creates a policy from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            min_length: config.password_min_length,
        }
    }

    /// Validates a password against all rules.
    ///
    /// Returns `Ok(())` if the password meets every requirement, or an
    /// error describing the first violation found.
    pub fn validate(&self, password: &str) -> Result<(), AppError> {
        if password.chars().count() < self.min_length {
            return Err(AppError::policy(format!(
                "Password must be at least {} characters long",
                self.min_length
            )));
        }

        if !password.chars().any(|c| c.is_uppercase()) {
            return Err(AppError::policy(
                "Password must contain at least one uppercase letter",
            ));
        }

        if !password.chars().any(|c| c.is_lowercase()) {
            return Err(AppError::policy(
                "Password must contain at least one lowercase letter",
            ));
        }

        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(AppError::policy(
                "Password must contain at least one digit",
            ));
        }

        if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
            return Err(AppError::policy(format!(
                "Password must contain at least one special character ({SPECIAL_CHARACTERS})"
            )));
        }

        Ok(())
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::new(&AuthConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use idguard_core::error::ErrorKind;

    use super::*;

    #[test]
    fn test_valid_password_passes() {
        let policy = PasswordPolicy::default();
        assert!(policy.validate("Str0ng!Passw0rd").is_ok());
    }

    #[test]
    fn test_each_rule_is_reported() {
        let policy = PasswordPolicy::default();

        let too_short = policy.validate("Ab1!x").unwrap_err();
        assert_eq!(too_short.kind, ErrorKind::Policy);
        assert!(too_short.message.contains("12 characters"));

        let no_upper = policy.validate("weak!passw0rd").unwrap_err();
        assert!(no_upper.message.contains("uppercase"));

        let no_lower = policy.validate("WEAK!PASSW0RD").unwrap_err();
        assert!(no_lower.message.contains("lowercase"));

        let no_digit = policy.validate("Weak!Password").unwrap_err();
        assert!(no_digit.message.contains("digit"));

        let no_special = policy.validate("Weak1Password").unwrap_err();
        assert!(no_special.message.contains("special character"));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let policy = PasswordPolicy::default();
        // 11 characters, multi-byte included: still too short.
        assert!(policy.validate("Aa1!ééééééé").is_err());
    }
}
