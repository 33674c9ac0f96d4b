/// Input validators for registration and login payloads.
/// Features:
/// 1. DoS Protection: input length limits on every field
/// 2. Format validation: username, email, and student-number shapes
/// 3. Control-character rejection for client-supplied labels

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 32;
const MIN_STUDENT_NUMBER_LENGTH: usize = 4;
const MAX_STUDENT_NUMBER_LENGTH: usize = 20;
const MAX_DEVICE_LABEL_LENGTH: usize = 128;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9_]+$").unwrap();

    static ref STUDENT_NUMBER_REGEX: Regex = Regex::new(r"^[0-9]+$").unwrap();
}

/// Validates a username
/// - 3 to 32 characters, letters/digits/underscore only
pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("username".to_string()));
    }
    if trimmed.len() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort(
            "username".to_string(),
            MIN_USERNAME_LENGTH,
        ));
    }
    if trimmed.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong(
            "username".to_string(),
            MAX_USERNAME_LENGTH,
        ));
    }
    if !USERNAME_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("username".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates an email address
/// - Checks format using RFC 5322 simplified regex
/// - Verifies length constraints
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }
    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort(
            "email".to_string(),
            MIN_EMAIL_LENGTH,
        ));
    }
    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong(
            "email".to_string(),
            MAX_EMAIL_LENGTH,
        ));
    }
    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }
    // Extremely long local part is a phishing indicator
    if let Some(at_pos) = trimmed.find('@') {
        if trimmed[..at_pos].len() > 64 {
            return Err(ValidationError::SuspiciousContent("email".to_string()));
        }
    }

    Ok(trimmed.to_string())
}

/// Validates a student number (digits only, registrar-issued)
pub fn is_valid_student_number(student_number: &str) -> Result<String, ValidationError> {
    let trimmed = student_number.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("student_number".to_string()));
    }
    if trimmed.len() < MIN_STUDENT_NUMBER_LENGTH {
        return Err(ValidationError::TooShort(
            "student_number".to_string(),
            MIN_STUDENT_NUMBER_LENGTH,
        ));
    }
    if trimmed.len() > MAX_STUDENT_NUMBER_LENGTH {
        return Err(ValidationError::TooLong(
            "student_number".to_string(),
            MAX_STUDENT_NUMBER_LENGTH,
        ));
    }
    if !STUDENT_NUMBER_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("student_number".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates an optional device label. The label is an opaque descriptor
/// attached to the session row; it is never used for authorization.
pub fn is_valid_device_label(label: Option<&str>) -> Result<String, ValidationError> {
    let trimmed = match label {
        None => return Ok("unknown".to_string()),
        Some(l) => l.trim(),
    };

    if trimmed.is_empty() {
        return Ok("unknown".to_string());
    }
    if trimmed.len() > MAX_DEVICE_LABEL_LENGTH {
        return Err(ValidationError::TooLong(
            "device".to_string(),
            MAX_DEVICE_LABEL_LENGTH,
        ));
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::SuspiciousContent("device".to_string()));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_usernames() {
        for username in ["alice", "bob_42", "StudyGroupLead", "a_b"] {
            assert!(is_valid_username(username).is_ok(), "rejected: {}", username);
        }
    }

    #[test]
    fn rejects_invalid_usernames() {
        for username in ["", "ab", "has space", "почта", "semi;colon", &"x".repeat(33)] {
            assert!(is_valid_username(username).is_err(), "accepted: {}", username);
        }
    }

    #[test]
    fn trims_username_whitespace() {
        assert_eq!(is_valid_username("  alice  ").unwrap(), "alice");
    }

    #[test]
    fn accepts_valid_emails() {
        for email in ["user@example.com", "first.last@uni.ac.kr", "a+tag@domain.io"] {
            assert!(is_valid_email(email).is_ok(), "rejected: {}", email);
        }
    }

    #[test]
    fn rejects_invalid_emails() {
        for email in ["", "notanemail", "user@", "@example.com", "user@@example.com"] {
            assert!(is_valid_email(email).is_err(), "accepted: {}", email);
        }
    }

    #[test]
    fn rejects_overlong_email_local_part() {
        let email = format!("{}@example.com", "a".repeat(65));
        assert!(is_valid_email(&email).is_err());
    }

    #[test]
    fn accepts_valid_student_numbers() {
        for number in ["2021", "20231234", "19990001"] {
            assert!(is_valid_student_number(number).is_ok(), "rejected: {}", number);
        }
    }

    #[test]
    fn rejects_invalid_student_numbers() {
        for number in ["", "123", "abc12345", "2023-1234", &"9".repeat(21)] {
            assert!(is_valid_student_number(number).is_err(), "accepted: {}", number);
        }
    }

    #[test]
    fn device_label_defaults_to_unknown() {
        assert_eq!(is_valid_device_label(None).unwrap(), "unknown");
        assert_eq!(is_valid_device_label(Some("   ")).unwrap(), "unknown");
    }

    #[test]
    fn device_label_rejects_control_characters() {
        assert!(is_valid_device_label(Some("lab\x07top")).is_err());
    }

    #[test]
    fn device_label_rejects_overlong_input() {
        let label = "x".repeat(129);
        assert!(is_valid_device_label(Some(&label)).is_err());
    }
}
