//! Error reporting with Sentry integration.
//!
//! Every layer has its own `thiserror` enum; this module holds the helpers
//! that attach them to Sentry. All helpers are no-ops when Sentry was never
//! initialised.

/// Set the Sentry user context to the customer placing an order.
pub fn set_sentry_user(email: &str, name: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            email: Some(email.to_string()),
            username: name.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a checkout or fulfillment step.
///
/// Breadcrumbs appear in Sentry reports to show the trail of steps leading
/// up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order created", Some(&[("order_id", "665f")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

/// Capture an error as a Sentry event with extra tags, and log it.
///
/// Used for the cases where money may have moved but the order record does
/// not say so.
pub fn report_error<E>(error: &E, context: &str, tags: &[(&str, &str)])
where
    E: std::error::Error + ?Sized,
{
    let event_id = sentry::with_scope(
        |scope| {
            for (key, value) in tags {
                scope.set_tag(key, value);
            }
        },
        || sentry::capture_error(error),
    );
    tracing::error!(
        error = %error,
        sentry_event_id = %event_id,
        "{context}"
    );
}

/// Capture a message-level Sentry event with extra tags, and log it.
pub fn report_message(message: &str, tags: &[(&str, &str)]) {
    let event_id = sentry::with_scope(
        |scope| {
            for (key, value) in tags {
                scope.set_tag(key, value);
            }
        },
        || sentry::capture_message(message, sentry::Level::Error),
    );
    tracing::error!(sentry_event_id = %event_id, "{message}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_without_client() {
        add_breadcrumb("checkout", "Validated", Some(&[("items", "2")]));
        set_sentry_user("a@b.co", Some("Asha"));
        clear_sentry_user();
        report_message("verification rejected", &[("order_id", "665f")]);
    }
}
