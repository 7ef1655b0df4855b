//! Outbound services other than the site API.
//!
//! - `emailjs` - transactional contact messages

pub mod emailjs;

pub use emailjs::{EmailJsClient, EmailJsError, TemplateParams};
