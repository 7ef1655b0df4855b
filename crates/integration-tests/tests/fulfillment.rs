//! Post-purchase fulfillment: downloads, contact routes and the contact form.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use counsel_core::{Email, FulfillmentContact, ItemId, LineItem};
use counsel_integration_tests::{RecordingLauncher, api_client, inr, template};
use counsel_storefront::api::ApiError;
use counsel_storefront::config::EmailJsConfig;
use counsel_storefront::fulfillment::Fulfilled;
use counsel_storefront::services::EmailJsClient;
use counsel_storefront::{FulfillmentError, FulfillmentResolver, Purchaser};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EMAIL: &str = "asha@example.in";

fn purchaser() -> Purchaser {
    Purchaser {
        name: "Asha Rao".to_string(),
        email: Email::parse(EMAIL).unwrap(),
    }
}

fn custom(id: &str, contact: FulfillmentContact) -> LineItem {
    LineItem::custom(
        ItemId::parse(id).unwrap(),
        "Contract Review",
        "Services",
        inr(2500),
        "Standard Review",
    )
    .with_contact(contact)
}

fn resolver<'a>(
    server: &MockServer,
    dir: &std::path::Path,
    launcher: &'a RecordingLauncher,
    emailjs: Option<EmailJsClient>,
) -> FulfillmentResolver<&'a RecordingLauncher> {
    FulfillmentResolver::new(api_client(server), dir, launcher, emailjs)
}

async fn mount_download(server: &MockServer, item_id: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/templates/{item_id}/download")))
        .and(query_param("email", EMAIL))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

fn files_in(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[tokio::test]
async fn test_download_uses_header_filename() {
    let server = MockServer::start().await;
    mount_download(
        &server,
        "t1",
        ResponseTemplate::new(200)
            .insert_header("content-type", "application/pdf")
            .insert_header(
                "content-disposition",
                "attachment; filename=\"Rental Agreement.pdf\"",
            )
            .set_body_bytes(b"%PDF-1.7 rental".to_vec()),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let launcher = RecordingLauncher::default();

    let result = resolver(&server, dir.path(), &launcher, None)
        .fulfill(&template("t1", "Rental Agreement", 500), &purchaser())
        .await
        .unwrap();

    let Fulfilled::Downloaded { path } = result else {
        panic!("expected a download");
    };
    assert_eq!(path, dir.path().join("Rental Agreement.pdf"));
    assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7 rental");
    assert!(launcher.opened().is_empty());
}

#[tokio::test]
async fn test_header_filename_without_extension_gets_one() {
    let server = MockServer::start().await;
    mount_download(
        &server,
        "t7",
        ResponseTemplate::new(200)
            .insert_header("content-type", "application/pdf")
            .insert_header("content-disposition", "attachment; filename=\"contract\"")
            .set_body_bytes(b"%PDF-1.7 contract".to_vec()),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let launcher = RecordingLauncher::default();

    let result = resolver(&server, dir.path(), &launcher, None)
        .fulfill(&template("t7", "Contract", 700), &purchaser())
        .await
        .unwrap();

    assert_eq!(
        result,
        Fulfilled::Downloaded {
            path: dir.path().join("contract.pdf")
        }
    );
    assert_eq!(files_in(dir.path()), ["contract.pdf"]);
}

#[tokio::test]
async fn test_download_prefers_extended_filename() {
    let server = MockServer::start().await;
    mount_download(
        &server,
        "t2",
        ResponseTemplate::new(200)
            .insert_header(
                "content-type",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            )
            .insert_header(
                "content-disposition",
                "attachment; filename=\"lease.docx\"; filename*=UTF-8''Lease%20Deed%20(Draft).docx",
            )
            .set_body_bytes(b"PK\x03\x04".to_vec()),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let launcher = RecordingLauncher::default();

    let result = resolver(&server, dir.path(), &launcher, None)
        .fulfill(&template("t2", "Lease Deed", 300), &purchaser())
        .await
        .unwrap();

    assert_eq!(
        result,
        Fulfilled::Downloaded {
            path: dir.path().join("Lease Deed (Draft).docx")
        }
    );
}

#[tokio::test]
async fn test_download_without_header_names_file_after_title() {
    let server = MockServer::start().await;
    mount_download(
        &server,
        "t3",
        ResponseTemplate::new(200)
            .insert_header("content-type", "application/pdf")
            .set_body_bytes(b"%PDF".to_vec()),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Partnership Deed.pdf"), b"older copy").unwrap();
    let launcher = RecordingLauncher::default();

    let result = resolver(&server, dir.path(), &launcher, None)
        .fulfill(&template("t3", "Partnership Deed", 800), &purchaser())
        .await
        .unwrap();

    assert_eq!(
        result,
        Fulfilled::Downloaded {
            path: dir.path().join("Partnership Deed (1).pdf")
        }
    );
    assert_eq!(
        std::fs::read(dir.path().join("Partnership Deed.pdf")).unwrap(),
        b"older copy"
    );
}

#[tokio::test]
async fn test_custom_signal_falls_back_to_schedule_link() {
    let server = MockServer::start().await;
    mount_download(
        &server,
        "t4",
        ResponseTemplate::new(400).set_body_json(json!({
            "isCustom": true,
            "scheduleLink": "https://cal.counsel.test/review",
            "message": "This service is delivered on a call"
        })),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let launcher = RecordingLauncher::default();

    let result = resolver(&server, dir.path(), &launcher, None)
        .fulfill(&template("t4", "Contract Review", 2500), &purchaser())
        .await
        .unwrap();

    let link = Url::parse("https://cal.counsel.test/review").unwrap();
    assert_eq!(result, Fulfilled::ScheduleOpened { link: link.clone() });
    assert_eq!(launcher.opened(), vec![link]);
    assert!(files_in(dir.path()).is_empty());
}

#[tokio::test]
async fn test_refused_download_leaves_no_file() {
    let server = MockServer::start().await;
    mount_download(
        &server,
        "t5",
        ResponseTemplate::new(403).set_body_json(json!({ "message": "No completed purchase" })),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let launcher = RecordingLauncher::default();

    let err = resolver(&server, dir.path(), &launcher, None)
        .fulfill(&template("t5", "Will", 400), &purchaser())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FulfillmentError::Download(ApiError::Api { status: 403, ref message })
            if message == "No completed purchase"
    ));
    assert!(files_in(dir.path()).is_empty());
}

#[tokio::test]
async fn test_empty_download_is_an_error() {
    let server = MockServer::start().await;
    mount_download(
        &server,
        "t6",
        ResponseTemplate::new(200).insert_header("content-type", "application/pdf"),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let launcher = RecordingLauncher::default();

    let err = resolver(&server, dir.path(), &launcher, None)
        .fulfill(&template("t6", "Affidavit", 200), &purchaser())
        .await
        .unwrap_err();

    assert!(matches!(err, FulfillmentError::EmptyDownload));
    assert!(files_in(dir.path()).is_empty());
}

#[tokio::test]
async fn test_custom_item_with_contact_email_opens_composer() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let launcher = RecordingLauncher::default();
    let desk = Email::parse("desk@counsel.test").unwrap();
    let item = custom("s1", FulfillmentContact::new(None, Some(desk.clone())));

    let result = resolver(&server, dir.path(), &launcher, None)
        .fulfill(&item, &purchaser())
        .await
        .unwrap();

    assert_eq!(result, Fulfilled::ComposerOpened { to: desk });
    let opened = launcher.opened();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].scheme(), "mailto");
    assert!(opened[0].as_str().starts_with("mailto:desk@counsel.test?subject="));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_contact_form_is_sent_through_emailjs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1.0/email/send"))
        .and(body_partial_json(json!({
            "service_id": "service_counsel",
            "template_id": "template_contact",
            "user_id": "public_key",
            "template_params": {
                "to_email": "hello@counsel.test",
                "from_name": "Asha Rao",
                "reply_to": EMAIL,
                "subject": "Contract Review: Standard Review"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    let emailjs = EmailJsClient::new(
        EmailJsConfig {
            endpoint: Url::parse(&format!("{}/api/v1.0/email/send", server.uri())).unwrap(),
            service_id: "service_counsel".to_string(),
            template_id: "template_contact".to_string(),
            public_key: "public_key".to_string(),
            private_key: None,
            recipient: Email::parse("hello@counsel.test").unwrap(),
        },
        Duration::from_secs(5),
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let launcher = RecordingLauncher::default();
    let resolver = resolver(&server, dir.path(), &launcher, Some(emailjs));

    let result = resolver
        .fulfill(&custom("s2", FulfillmentContact::default()), &purchaser())
        .await
        .unwrap();
    let Fulfilled::ContactFormReady(request) = result else {
        panic!("expected a contact form");
    };
    assert_eq!(request.email.as_str(), EMAIL);

    resolver.send_contact(&request).await.unwrap();
    assert!(launcher.opened().is_empty());
}

#[tokio::test]
async fn test_contact_form_without_mailbox_is_unavailable() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let launcher = RecordingLauncher::default();
    let resolver = resolver(&server, dir.path(), &launcher, None);

    let Fulfilled::ContactFormReady(request) = resolver
        .fulfill(&custom("s3", FulfillmentContact::default()), &purchaser())
        .await
        .unwrap()
    else {
        panic!("expected a contact form");
    };

    let err = resolver.send_contact(&request).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::ContactUnavailable));
}
