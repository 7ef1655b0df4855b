//! Executing fulfillment actions.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use counsel_core::{Email, FulfillmentContact, LineItem};
use thiserror::Error;
use tracing::{info, instrument, warn};
use url::Url;

use super::{
    ContactAction, ContactRequest, FulfillmentError, Purchaser, contact_action, filename,
};
use crate::api::{ApiClient, DownloadResponse, DownloadedFile, NotDownloadable};
use crate::error::add_breadcrumb;
use crate::services::EmailJsClient;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct LaunchError(pub String);

/// Opens links outside the application (browser, mail client).
pub trait Launcher: Send + Sync {
    /// Open `url` in a new context.
    ///
    /// # Errors
    ///
    /// Returns error if nothing could handle the URL.
    fn open_url(&self, url: &Url) -> Result<(), LaunchError>;
}

/// Result of running one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fulfilled {
    Downloaded { path: PathBuf },
    ScheduleOpened { link: Url },
    ComposerOpened { to: Email },
    /// The form is ready for the customer to review and send.
    ContactFormReady(ContactRequest),
}

/// Runs fulfillment actions against the download endpoint, the local disk
/// and a [`Launcher`].
#[derive(Debug, Clone)]
pub struct FulfillmentResolver<L> {
    api: ApiClient,
    download_dir: PathBuf,
    launcher: L,
    emailjs: Option<EmailJsClient>,
}

impl<L: Launcher> FulfillmentResolver<L> {
    pub fn new(
        api: ApiClient,
        download_dir: impl Into<PathBuf>,
        launcher: L,
        emailjs: Option<EmailJsClient>,
    ) -> Self {
        Self {
            api,
            download_dir: download_dir.into(),
            launcher,
            emailjs,
        }
    }

    #[must_use]
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Plan and run the action for one item.
    ///
    /// # Errors
    ///
    /// Returns error if the download fails or a link cannot be opened. A
    /// failed download never leaves a file behind.
    #[instrument(skip(self, item, purchaser), fields(item_id = %item.id()))]
    pub async fn fulfill(
        &self,
        item: &LineItem,
        purchaser: &Purchaser,
    ) -> Result<Fulfilled, FulfillmentError> {
        if item.is_custom() {
            self.run(contact_action(item, item.contact(), purchaser))
        } else {
            self.download(item, purchaser).await
        }
    }

    /// Send a reviewed contact form to the site inbox.
    ///
    /// # Errors
    ///
    /// Returns [`FulfillmentError::ContactUnavailable`] when no mailbox is
    /// configured, or the delivery error.
    #[instrument(skip(self, request), fields(item_id = %request.item_id))]
    pub async fn send_contact(&self, request: &ContactRequest) -> Result<(), FulfillmentError> {
        let client = self
            .emailjs
            .as_ref()
            .ok_or(FulfillmentError::ContactUnavailable)?;
        client
            .send(&request.template_params(client.recipient()))
            .await?;
        add_breadcrumb(
            "fulfillment",
            "Contact form sent",
            Some(&[("item_id", request.item_id.as_str())]),
        );
        Ok(())
    }

    async fn download(
        &self,
        item: &LineItem,
        purchaser: &Purchaser,
    ) -> Result<Fulfilled, FulfillmentError> {
        match self.api.download_template(item.id(), &purchaser.email).await? {
            DownloadResponse::File(file) => {
                let path = self.save(item, &file)?;
                info!(path = %path.display(), "Template saved");
                add_breadcrumb(
                    "fulfillment",
                    "Template downloaded",
                    Some(&[("item_id", item.id().as_str())]),
                );
                Ok(Fulfilled::Downloaded { path })
            }
            DownloadResponse::NotDownloadable(signal) => {
                warn!("Download endpoint reports a custom item, using contact flow");
                let contact = contact_from_signal(&signal, item.contact());
                self.run(contact_action(item, &contact, purchaser))
            }
        }
    }

    fn run(&self, action: ContactAction) -> Result<Fulfilled, FulfillmentError> {
        match action {
            ContactAction::Schedule { link } => {
                self.launcher.open_url(&link)?;
                Ok(Fulfilled::ScheduleOpened { link })
            }
            ContactAction::ComposeEmail { to, mailto } => {
                self.launcher.open_url(&mailto)?;
                Ok(Fulfilled::ComposerOpened { to })
            }
            ContactAction::ContactForm(request) => Ok(Fulfilled::ContactFormReady(request)),
        }
    }

    fn save(&self, item: &LineItem, file: &DownloadedFile) -> Result<PathBuf, FulfillmentError> {
        if file.bytes.is_empty() {
            return Err(FulfillmentError::EmptyDownload);
        }

        let name = filename::resolve(
            item,
            file.content_disposition.as_deref(),
            file.content_type.as_deref(),
        );
        fs::create_dir_all(&self.download_dir)?;
        let target = unique_path(&self.download_dir, &name);
        let partial = self.download_dir.join(format!(".{name}.part"));

        let written = write_file(&partial, &file.bytes).and_then(|()| fs::rename(&partial, &target));
        if let Err(e) = written {
            let _ = fs::remove_file(&partial);
            return Err(e.into());
        }
        Ok(target)
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// `name`, or `name (1)`, `name (2)`, ... if it is already taken.
fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    (1..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{stem} ({n}).{ext}")),
            None => dir.join(format!("{stem} ({n})")),
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Contact details from the server signal, or the item's own when the
/// signal carries none.
fn contact_from_signal(signal: &NotDownloadable, own: &FulfillmentContact) -> FulfillmentContact {
    let contact_email = signal
        .contact_email
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .and_then(|e| Email::parse(e).ok());
    let from_signal = FulfillmentContact::new(signal.schedule_link.clone(), contact_email);
    if from_signal.is_empty() {
        own.clone()
    } else {
        from_signal
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_path() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(unique_path(dir.path(), "nda.pdf"), dir.path().join("nda.pdf"));

        fs::write(dir.path().join("nda.pdf"), b"x").unwrap();
        assert_eq!(
            unique_path(dir.path(), "nda.pdf"),
            dir.path().join("nda (1).pdf")
        );

        fs::write(dir.path().join("nda (1).pdf"), b"x").unwrap();
        assert_eq!(
            unique_path(dir.path(), "nda.pdf"),
            dir.path().join("nda (2).pdf")
        );
    }

    fn signal(schedule_link: Option<&str>, contact_email: Option<&str>) -> NotDownloadable {
        NotDownloadable {
            is_custom: true,
            schedule_link: schedule_link.map(str::to_string),
            contact_email: contact_email.map(str::to_string),
            message: None,
        }
    }

    #[test]
    fn test_contact_from_signal() {
        let contact = contact_from_signal(
            &signal(None, Some("desk@counsel.test")),
            &FulfillmentContact::default(),
        );
        assert_eq!(
            contact.contact_email().map(Email::as_str),
            Some("desk@counsel.test")
        );
        assert!(contact.schedule_link().is_none());
    }

    #[test]
    fn test_empty_signal_keeps_item_contact() {
        let item_link = "https://cal.counsel.test/item";
        let desk_link = "https://cal.counsel.test/desk";
        let own = FulfillmentContact::new(Some(item_link.to_string()), None);

        let contact = contact_from_signal(&signal(None, Some("  ")), &own);
        assert_eq!(contact, own);

        let contact = contact_from_signal(&signal(Some(desk_link), None), &own);
        assert_eq!(contact.schedule_link(), Some(desk_link));
    }
}
