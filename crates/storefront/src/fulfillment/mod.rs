//! Post-purchase fulfillment.
//!
//! Each purchased line item resolves to exactly one action, first match
//! wins:
//!
//! 1. Standard item: download the file.
//! 2. Custom item with a scheduling link: open the link.
//! 3. Custom item with a contact address: open a prefilled email.
//! 4. Otherwise: a prefilled contact form sent to the site inbox.
//!
//! A standard item whose download endpoint answers "this is custom" falls
//! through to rules 2-4 using the contact details from that answer.

pub mod filename;
mod resolver;

use counsel_core::{ContactRoute, CustomerInfo, Email, FulfillmentContact, ItemId, LineItem};
use thiserror::Error;
use url::Url;

use crate::api::ApiError;
use crate::services::{EmailJsError, TemplateParams};

pub use resolver::{Fulfilled, FulfillmentResolver, LaunchError, Launcher};

/// Who bought the item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchaser {
    pub name: String,
    pub email: Email,
}

impl From<&CustomerInfo> for Purchaser {
    fn from(customer: &CustomerInfo) -> Self {
        Self {
            name: customer.name.clone(),
            email: customer.email.clone(),
        }
    }
}

/// A prefilled message for the site's inbound mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRequest {
    pub item_id: ItemId,
    pub subject: String,
    pub name: String,
    pub email: Email,
    pub message: String,
}

impl ContactRequest {
    /// Template variables for delivery to `recipient`.
    #[must_use]
    pub fn template_params(&self, recipient: &str) -> TemplateParams {
        TemplateParams {
            to_email: recipient.to_string(),
            from_name: self.name.clone(),
            reply_to: self.email.to_string(),
            subject: self.subject.clone(),
            message: self.message.clone(),
        }
    }
}

/// What to do for one purchased item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentAction {
    Download { item_id: ItemId },
    Schedule { link: Url },
    ComposeEmail { to: Email, mailto: Url },
    ContactForm(ContactRequest),
}

/// The subset of actions that reach a person instead of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactAction {
    Schedule { link: Url },
    ComposeEmail { to: Email, mailto: Url },
    ContactForm(ContactRequest),
}

impl From<ContactAction> for FulfillmentAction {
    fn from(action: ContactAction) -> Self {
        match action {
            ContactAction::Schedule { link } => Self::Schedule { link },
            ContactAction::ComposeEmail { to, mailto } => Self::ComposeEmail { to, mailto },
            ContactAction::ContactForm(request) => Self::ContactForm(request),
        }
    }
}

impl FulfillmentAction {
    /// Short label for a button or menu entry.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Download { .. } => "Download",
            Self::Schedule { .. } => "Schedule",
            Self::ComposeEmail { .. } => "Email",
            Self::ContactForm(_) => "Contact us",
        }
    }
}

#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("Download failed: {0}")]
    Download(#[from] ApiError),

    #[error("Download returned an empty file")]
    EmptyDownload,

    #[error("Could not save download: {0}")]
    Save(#[from] std::io::Error),

    #[error("Could not open link: {0}")]
    Launch(#[from] LaunchError),

    #[error("Contact form delivery is not configured")]
    ContactUnavailable,

    #[error("Contact form delivery failed: {0}")]
    Contact(#[from] EmailJsError),
}

impl FulfillmentError {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Download(ApiError::Api { message, .. }) => {
                format!("Download failed: {message}")
            }
            Self::Download(_) | Self::EmptyDownload => {
                "Download failed. Please try again from your purchases.".to_string()
            }
            Self::Save(_) => "The file could not be saved on this device.".to_string(),
            Self::Launch(_) => "The link could not be opened.".to_string(),
            Self::ContactUnavailable => {
                "Please reach out to us by email to get started.".to_string()
            }
            Self::Contact(e) => e.user_message(),
        }
    }
}

/// Decide the action for one item.
#[must_use]
pub fn plan(item: &LineItem, purchaser: &Purchaser) -> FulfillmentAction {
    if item.is_custom() {
        contact_action(item, item.contact(), purchaser).into()
    } else {
        FulfillmentAction::Download {
            item_id: item.id().clone(),
        }
    }
}

/// Rules 2-4 for an item, given its contact details.
#[must_use]
pub fn contact_action(
    item: &LineItem,
    contact: &FulfillmentContact,
    purchaser: &Purchaser,
) -> ContactAction {
    let subject = subject_for(item);

    if let ContactRoute::Schedule(raw) = contact.route() {
        match parse_web_link(raw) {
            Some(link) => return ContactAction::Schedule { link },
            None => tracing::warn!(item_id = %item.id(), "Ignoring invalid schedule link"),
        }
    }

    if let Some(to) = contact.contact_email() {
        let body = format!(
            "Hi,\n\nI purchased \"{}\" and would like to get started.\n\nName: {}\nEmail: {}\n",
            item.title(),
            purchaser.name,
            purchaser.email
        );
        let raw = format!(
            "mailto:{}?subject={}&body={}",
            to,
            urlencoding::encode(&subject),
            urlencoding::encode(&body)
        );
        if let Ok(mailto) = Url::parse(&raw) {
            return ContactAction::ComposeEmail {
                to: to.clone(),
                mailto,
            };
        }
    }

    let option = item.option_name().unwrap_or_else(|| item.title());
    ContactAction::ContactForm(ContactRequest {
        item_id: item.id().clone(),
        subject,
        name: purchaser.name.clone(),
        email: purchaser.email.clone(),
        message: format!(
            "I purchased \"{}\" ({option}) and would like to discuss the next steps.",
            item.title()
        ),
    })
}

fn subject_for(item: &LineItem) -> String {
    match item.option_name() {
        Some(option) if option != item.title() => format!("{}: {option}", item.title()),
        _ => item.title().to_string(),
    }
}

fn parse_web_link(raw: &str) -> Option<Url> {
    Url::parse(raw.trim())
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use counsel_core::{CurrencyCode, Price};

    fn purchaser() -> Purchaser {
        Purchaser {
            name: "Asha Rao".to_string(),
            email: Email::parse("asha@example.in").unwrap(),
        }
    }

    fn custom(contact: FulfillmentContact) -> LineItem {
        LineItem::custom(
            ItemId::parse("c1").unwrap(),
            "Contract Review",
            "Services",
            Price::zero(CurrencyCode::INR),
            "Express",
        )
        .with_contact(contact)
        .with_file_name("review.pdf")
    }

    #[test]
    fn test_standard_item_downloads() {
        let item = LineItem::standard(
            ItemId::parse("t1").unwrap(),
            "NDA",
            "Contracts",
            Price::zero(CurrencyCode::INR),
        );
        assert_eq!(
            plan(&item, &purchaser()),
            FulfillmentAction::Download {
                item_id: ItemId::parse("t1").unwrap()
            }
        );
    }

    #[test]
    fn test_schedule_beats_file_name_and_email() {
        let item = custom(FulfillmentContact::new(
            Some("https://cal.example/counsel".to_string()),
            Some(Email::parse("desk@counsel.test").unwrap()),
        ));
        let action = plan(&item, &purchaser());
        assert_eq!(action.label(), "Schedule");
        assert!(
            matches!(action, FulfillmentAction::Schedule { link } if link.as_str() == "https://cal.example/counsel")
        );
    }

    #[test]
    fn test_email_composer() {
        let item = custom(FulfillmentContact::new(
            None,
            Some(Email::parse("desk@counsel.test").unwrap()),
        ));
        let FulfillmentAction::ComposeEmail { to, mailto } = plan(&item, &purchaser()) else {
            panic!("expected email action");
        };
        assert_eq!(to.as_str(), "desk@counsel.test");
        assert_eq!(mailto.scheme(), "mailto");
        assert!(mailto.as_str().contains("subject=Contract%20Review%3A%20Express"));
    }

    #[test]
    fn test_invalid_schedule_link_falls_through() {
        let item = custom(FulfillmentContact::new(
            Some("javascript:alert(1)".to_string()),
            None,
        ));
        let FulfillmentAction::ContactForm(request) = plan(&item, &purchaser()) else {
            panic!("expected contact form");
        };
        assert_eq!(request.subject, "Contract Review: Express");
        assert_eq!(request.email.as_str(), "asha@example.in");
        assert!(request.message.contains("(Express)"));

        let params = request.template_params("hello@counsel.test");
        assert_eq!(params.to_email, "hello@counsel.test");
        assert_eq!(params.reply_to, "asha@example.in");
    }
}
