//! Customer form validation.
//!
//! Pure functions over raw form input. The rules match what the Order
//! Store accepts, so a form that passes here is never rejected for shape.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use counsel_core::{CustomerInfo, Email, Phone, PhoneError};
use regex::Regex;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s]{2,}$").expect("Invalid regex"));

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"));

/// Raw checkout form input, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerForm {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl CustomerForm {
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Email,
    Phone,
}

impl Field {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-keyed error messages for form binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: BTreeMap<Field, String>,
}

impl ValidationReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.errors {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

fn check_name(raw: &str) -> Result<String, String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err("Name is required".to_string());
    }
    if name.chars().count() < 2 {
        return Err("Name must be at least 2 characters".to_string());
    }
    if !NAME_RE.is_match(name) {
        return Err("Name can only contain letters and spaces".to_string());
    }
    Ok(name.to_string())
}

fn check_email(raw: &str) -> Result<Email, String> {
    let email = raw.trim();
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.chars().count() > Email::MAX_LENGTH {
        return Err(format!(
            "Email must be at most {} characters",
            Email::MAX_LENGTH
        ));
    }
    if !EMAIL_RE.is_match(email) {
        return Err("Please enter a valid email address".to_string());
    }
    Email::parse(email).map_err(|_| "Please enter a valid email address".to_string())
}

fn check_phone(raw: &str) -> Result<Phone, String> {
    Phone::parse(raw).map_err(|e| match e {
        PhoneError::Empty => "Phone number is required".to_string(),
        PhoneError::DigitCount { .. } => "Phone number must have 10 digits".to_string(),
        PhoneError::InvalidPrefix => {
            "Please enter a valid 10-digit mobile number starting with 6-9".to_string()
        }
    })
}

/// Validate a form, returning normalized customer details.
///
/// # Errors
///
/// Returns a [`ValidationReport`] with one message per invalid field.
pub fn validate(form: &CustomerForm) -> Result<CustomerInfo, ValidationReport> {
    let mut report = ValidationReport::default();

    let name = check_name(&form.name)
        .map_err(|m| report.errors.insert(Field::Name, m))
        .ok();
    let email = check_email(&form.email)
        .map_err(|m| report.errors.insert(Field::Email, m))
        .ok();
    let phone = check_phone(&form.phone)
        .map_err(|m| report.errors.insert(Field::Phone, m))
        .ok();

    match (name, email, phone) {
        (Some(name), Some(email), Some(phone)) => Ok(CustomerInfo::new(name, email, phone)),
        _ => Err(report),
    }
}
