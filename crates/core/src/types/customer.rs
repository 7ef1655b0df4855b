//! Customer details captured at checkout.

use serde::{Deserialize, Serialize};

use super::email::Email;
use super::phone::Phone;

/// Validated customer contact details.
///
/// Construct through the storefront's checkout form validator; the fields
/// are already normalized (trimmed name, ten-digit phone).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: Email,
    pub phone: Phone,
}

impl CustomerInfo {
    #[must_use]
    pub const fn new(name: String, email: Email, phone: Phone) -> Self {
        Self { name, email, phone }
    }
}
