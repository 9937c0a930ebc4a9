//! Request field checks shared by signup and login. All of them run before any I/O.

use regex::Regex;

use super::error::{AuthError, AuthResult};
use crate::store::Identifier;

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

pub(crate) fn valid_phone_number(phone: &str) -> bool {
    Regex::new(r"^\+?[0-9-]{6,15}$").is_ok_and(|regex| regex.is_match(phone))
}

/// Trimmed value of a required text field.
pub(crate) fn required<'a>(field: &str, value: &'a str) -> AuthResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::InvalidInput(format!("{field} is required")));
    }
    Ok(value)
}

/// A password must not be blank, but is otherwise used byte for byte.
pub(crate) fn password(value: &str) -> AuthResult<&str> {
    if value.trim().is_empty() {
        return Err(AuthError::InvalidInput("password is required".to_string()));
    }
    Ok(value)
}

pub(crate) fn email(value: &str) -> AuthResult<String> {
    let normalized = normalize_email(required("email", value)?);
    if !valid_email(&normalized) {
        return Err(AuthError::InvalidInput("email is invalid".to_string()));
    }
    Ok(normalized)
}

pub(crate) fn phone_number(value: &str) -> AuthResult<String> {
    let phone = required("phone number", value)?;
    if !valid_phone_number(phone) {
        return Err(AuthError::InvalidInput("phone number is invalid".to_string()));
    }
    Ok(phone.to_string())
}

/// Exactly one of email and phone number must be supplied.
pub(crate) fn email_xor_phone(
    email_value: Option<&str>,
    phone_value: Option<&str>,
) -> AuthResult<Identifier> {
    let email_value = email_value.filter(|value| !value.trim().is_empty());
    let phone_value = phone_value.filter(|value| !value.trim().is_empty());
    match (email_value, phone_value) {
        (Some(value), None) => Ok(Identifier::Email(email(value)?)),
        (None, Some(value)) => Ok(Identifier::PhoneNumber(phone_number(value)?)),
        (Some(_), Some(_)) => Err(AuthError::InvalidInput(
            "provide either an email or a phone number, not both".to_string(),
        )),
        (None, None) => Err(AuthError::InvalidInput(
            "an email or a phone number is required".to_string(),
        )),
    }
}
