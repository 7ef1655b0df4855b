//! Purchasable line items.
//!
//! A [`LineItem`] is either a standard downloadable template or a custom
//! (bespoke service) request. The distinction is a tagged [`ItemKind`]
//! rather than an optional flag, so "not custom" and "unknown" cannot be
//! confused.
//!
//! On the wire, line items use the camelCase record shape shared by the
//! cart record and the Order Store:
//!
//! ```json
//! {
//!   "id": "t1",
//!   "title": "NDA Template",
//!   "category": "Contracts",
//!   "unitPrice": 500,
//!   "quantity": 2,
//!   "isCustom": false,
//!   "fulfillment": { "scheduleLink": "https://cal.example/nda" }
//! }
//! ```
//!
//! Deserialization goes through [`LineItemRecord`], which accepts
//! string-typed numbers and a missing `isCustom`, then upgrades into the
//! typed form via `TryFrom`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::email::{Email, EmailError};
use super::id::{IdError, ItemId};
use super::lenient;
use super::price::{CurrencyCode, Price, PriceError};
use super::quantity::Quantity;

/// Errors that can occur when upgrading a [`LineItemRecord`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LineItemError {
    /// The item has no identifier.
    #[error("invalid item id: {0}")]
    Id(#[from] IdError),
    /// The unit price is invalid.
    #[error("invalid unit price: {0}")]
    Price(#[from] PriceError),
    /// The quantity is below one.
    #[error("quantity must be at least 1, got {0}")]
    Quantity(i64),
    /// The fulfillment contact email is malformed.
    #[error("invalid fulfillment contact email: {0}")]
    ContactEmail(#[from] EmailError),
}

/// What kind of purchase a line item represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    /// A file that can be downloaded right after purchase.
    Standard,
    /// A bespoke service request; fulfilled by scheduling or contact.
    Custom {
        /// Name of the selected service option.
        option_name: String,
    },
}

/// Post-purchase contact details for an item.
///
/// At most one route is used: a scheduling link wins over a contact email,
/// and with neither the generic contact form applies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FulfillmentContact {
    schedule_link: Option<String>,
    contact_email: Option<Email>,
}

/// The contact route selected from a [`FulfillmentContact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactRoute<'a> {
    /// Open an external scheduling page.
    Schedule(&'a str),
    /// Compose an email to a specific address.
    Email(&'a Email),
    /// Fall back to the site's generic contact form.
    ContactForm,
}

impl FulfillmentContact {
    /// Create contact details. Blank links are treated as absent.
    #[must_use]
    pub fn new(schedule_link: Option<String>, contact_email: Option<Email>) -> Self {
        Self {
            schedule_link: schedule_link
                .map(|link| link.trim().to_owned())
                .filter(|link| !link.is_empty()),
            contact_email,
        }
    }

    /// The scheduling link, if any.
    #[must_use]
    pub fn schedule_link(&self) -> Option<&str> {
        self.schedule_link.as_deref()
    }

    /// The contact email, if any.
    #[must_use]
    pub const fn contact_email(&self) -> Option<&Email> {
        self.contact_email.as_ref()
    }

    /// Select the contact route by precedence.
    #[must_use]
    pub fn route(&self) -> ContactRoute<'_> {
        match (&self.schedule_link, &self.contact_email) {
            (Some(link), _) => ContactRoute::Schedule(link),
            (None, Some(email)) => ContactRoute::Email(email),
            (None, None) => ContactRoute::ContactForm,
        }
    }

    /// Whether neither a link nor an email is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.schedule_link.is_none() && self.contact_email.is_none()
    }
}

/// A purchasable unit in a cart or order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LineItemRecord", into = "LineItemRecord")]
pub struct LineItem {
    id: ItemId,
    title: String,
    category: String,
    unit_price: Price,
    quantity: Quantity,
    kind: ItemKind,
    file_name: Option<String>,
    contact: FulfillmentContact,
}

impl LineItem {
    /// Create a standard (downloadable) item with quantity one.
    #[must_use]
    pub fn standard(
        id: ItemId,
        title: impl Into<String>,
        category: impl Into<String>,
        unit_price: Price,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            category: category.into(),
            unit_price,
            quantity: Quantity::ONE,
            kind: ItemKind::Standard,
            file_name: None,
            contact: FulfillmentContact::default(),
        }
    }

    /// Create a custom (bespoke service) item with quantity one.
    #[must_use]
    pub fn custom(
        id: ItemId,
        title: impl Into<String>,
        category: impl Into<String>,
        unit_price: Price,
        option_name: impl Into<String>,
    ) -> Self {
        Self {
            kind: ItemKind::Custom {
                option_name: option_name.into(),
            },
            ..Self::standard(id, title, category, unit_price)
        }
    }

    /// Set the quantity.
    #[must_use]
    pub fn with_quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = quantity;
        self
    }

    /// Replace the quantity in place.
    pub const fn set_quantity(&mut self, quantity: Quantity) {
        self.quantity = quantity;
    }

    /// Set the post-purchase contact details.
    #[must_use]
    pub fn with_contact(mut self, contact: FulfillmentContact) -> Self {
        self.contact = contact;
        self
    }

    /// Set the catalog file name.
    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    #[must_use]
    pub const fn id(&self) -> &ItemId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub const fn unit_price(&self) -> Price {
        self.unit_price
    }

    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    #[must_use]
    pub const fn kind(&self) -> &ItemKind {
        &self.kind
    }

    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    #[must_use]
    pub const fn contact(&self) -> &FulfillmentContact {
        &self.contact
    }

    /// Whether the item is a bespoke service request.
    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self.kind, ItemKind::Custom { .. })
    }

    /// Name of the selected custom option, for custom items.
    #[must_use]
    pub fn option_name(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::Custom { option_name } => Some(option_name),
            ItemKind::Standard => None,
        }
    }

    /// Unit price times quantity.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::OutOfRange`] if the product overflows.
    pub fn line_total(&self) -> Result<Price, PriceError> {
        self.unit_price.times(self.quantity)
    }
}

/// Raw wire shape of a line item.
///
/// Numbers may arrive as strings and `isCustom` may be missing; the
/// conversion into [`LineItem`] normalizes both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRecord {
    #[serde(alias = "_id", alias = "templateId")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(
        alias = "price",
        deserialize_with = "lenient::decimal",
        serialize_with = "rust_decimal::serde::float::serialize"
    )]
    pub unit_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyCode>,
    #[serde(default, deserialize_with = "lenient::optional_count")]
    pub quantity: Option<i64>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_custom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_option_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfillment: Option<FulfillmentRecord>,
}

/// Raw wire shape of [`FulfillmentContact`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
}

impl TryFrom<FulfillmentRecord> for FulfillmentContact {
    type Error = EmailError;

    fn try_from(record: FulfillmentRecord) -> Result<Self, Self::Error> {
        let contact_email = record
            .contact_email
            .filter(|email| !email.trim().is_empty())
            .map(|email| Email::parse(&email))
            .transpose()?;
        Ok(Self::new(record.schedule_link, contact_email))
    }
}

impl From<FulfillmentContact> for FulfillmentRecord {
    fn from(contact: FulfillmentContact) -> Self {
        Self {
            schedule_link: contact.schedule_link,
            contact_email: contact.contact_email.map(Email::into_inner),
        }
    }
}

impl TryFrom<LineItemRecord> for LineItem {
    type Error = LineItemError;

    fn try_from(record: LineItemRecord) -> Result<Self, Self::Error> {
        let id = ItemId::parse(&record.id)?;
        let unit_price = Price::new(record.unit_price, record.currency.unwrap_or_default())?;

        let quantity = match record.quantity {
            None => Quantity::ONE,
            Some(n) => u32::try_from(n)
                .ok()
                .and_then(Quantity::new)
                .ok_or(LineItemError::Quantity(n))?,
        };

        // A custom record without an option name is upgraded to use its title.
        let kind = if record.is_custom {
            let option_name = record
                .custom_option_name
                .map(|name| name.trim().to_owned())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| record.title.clone());
            ItemKind::Custom { option_name }
        } else {
            ItemKind::Standard
        };

        let contact = record
            .fulfillment
            .map(FulfillmentContact::try_from)
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            id,
            title: record.title,
            category: record.category,
            unit_price,
            quantity,
            kind,
            file_name: record.file_name.filter(|name| !name.trim().is_empty()),
            contact,
        })
    }
}

impl From<LineItem> for LineItemRecord {
    fn from(item: LineItem) -> Self {
        let (is_custom, custom_option_name) = match item.kind {
            ItemKind::Standard => (false, None),
            ItemKind::Custom { option_name } => (true, Some(option_name)),
        };

        Self {
            id: item.id.into_inner(),
            title: item.title,
            category: item.category,
            unit_price: item.unit_price.amount(),
            currency: Some(item.unit_price.currency_code()),
            quantity: Some(i64::from(item.quantity.get())),
            is_custom,
            custom_option_name,
            file_name: item.file_name,
            fulfillment: (!item.contact.is_empty()).then(|| item.contact.into()),
        }
    }
}
