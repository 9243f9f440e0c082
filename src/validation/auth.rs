use garde::Validate;
use serde::Deserialize;
use thiserror::Error;

/// Symbols accepted as the "special character" of a strong password.
pub const PASSWORD_SYMBOLS: &str = "@$!%*#?&";
/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum password length.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// The password strength rule that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRule {
    TooShort,
    TooLong,
    MissingLetter,
    MissingDigit,
    MissingSymbol,
}

/// Why signup or password-change input was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in {0}")]
    MissingField(String),

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("{0}")]
    InvalidUsername(&'static str),

    #[error("{}", password_message(.0))]
    WeakPassword(PasswordRule),

    #[error("Passwords do not match")]
    PasswordMismatch,
}

fn password_message(rule: &PasswordRule) -> &'static str {
    match rule {
        PasswordRule::TooShort => "Password must be at least 8 characters long",
        PasswordRule::TooLong => "Password must be at most 128 characters",
        PasswordRule::MissingLetter => "Password must contain at least one letter",
        PasswordRule::MissingDigit => "Password must contain at least one number",
        PasswordRule::MissingSymbol => {
            "Password must contain at least one special character (@$!%*#?&)"
        }
    }
}

/// The fields submitted by the signup form.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[garde(length(min = 1))]
    pub first_name: String,
    #[garde(length(min = 1))]
    pub last_name: String,
    #[garde(length(min = 1))]
    pub username: String,
    #[garde(length(min = 1), email, custom(dotted_domain))]
    pub email: String,
    #[garde(skip)]
    pub password: String,
    #[garde(skip)]
    pub confirm_password: String,
}

impl SignupRequest {
    /// Trims the free-text fields. Passwords are left as typed.
    pub fn normalized(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
            confirm_password: self.confirm_password,
        }
    }

    /// Runs every signup rule in form order: required fields, email shape,
    /// username shape, password strength, then confirmation.
    pub fn check(&self) -> Result<(), ValidationError> {
        if self.password.is_empty() {
            return Err(ValidationError::MissingField("password".to_string()));
        }

        if let Err(report) = self.validate() {
            let failed = report
                .iter()
                .map(|(path, _)| path.to_string())
                .collect::<Vec<_>>();

            let missing = [
                ("first_name", &self.first_name),
                ("last_name", &self.last_name),
                ("username", &self.username),
                ("email", &self.email),
            ]
            .into_iter()
            .find(|(field, value)| value.is_empty() && failed.iter().any(|f| f == field));

            if let Some((field, _)) = missing {
                return Err(ValidationError::MissingField(field.replace('_', " ")));
            }
            if failed.iter().any(|f| f == "email") {
                return Err(ValidationError::InvalidEmail);
            }
            return Err(ValidationError::MissingField(failed.join(", ")));
        }

        validate_username(&self.username)?;
        validate_password(&self.password)?;

        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }

        Ok(())
    }
}

/// The body of a forgot-password request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EmailAddress {
    #[garde(email, custom(dotted_domain))]
    pub email: String,
}

/// Requires a dot inside the domain part, so `user@localhost` is rejected.
fn dotted_domain(value: &str, _: &()) -> garde::Result {
    match value.rsplit_once('@') {
        Some((_, domain))
            if domain
                .split_once('.')
                .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty()) =>
        {
            Ok(())
        }
        _ => Err(garde::Error::new("domain must contain a dot")),
    }
}

/// Validates the shape of an email address.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    EmailAddress {
        email: email.trim().to_string(),
    }
    .validate()
    .map_err(|_| ValidationError::InvalidEmail)
}

/// Validates a username.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.chars().count() < 3 {
        return Err(ValidationError::InvalidUsername(
            "Username must be at least 3 characters long",
        ));
    }

    if username.len() > 255 {
        return Err(ValidationError::InvalidUsername(
            "Username must be at most 255 characters",
        ));
    }

    if !username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(ValidationError::InvalidUsername(
            "Username can only contain letters, numbers, underscores, and hyphens",
        ));
    }

    Ok(())
}

/// Validates password strength.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let length = password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::WeakPassword(PasswordRule::TooShort));
    }

    if length > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::WeakPassword(PasswordRule::TooLong));
    }

    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::WeakPassword(PasswordRule::MissingLetter));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::WeakPassword(PasswordRule::MissingDigit));
    }

    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        return Err(ValidationError::WeakPassword(PasswordRule::MissingSymbol));
    }

    Ok(())
}
