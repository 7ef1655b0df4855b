//! Purchase history and re-fulfillment.

use counsel_core::{Email, ItemId, Order, OrderId};
use counsel_storefront::fulfillment::{Fulfilled, LaunchError, Launcher};
use counsel_storefront::services::EmailJsClient;
use counsel_storefront::{
    FulfillmentError, FulfillmentResolver, Purchaser, Purchases, StorefrontConfig, purchases,
};
use url::Url;

use super::{CommandError, api_client};

/// Prints links instead of opening them; a terminal has no browser to hand.
struct TerminalLauncher;

impl Launcher for TerminalLauncher {
    fn open_url(&self, url: &Url) -> Result<(), LaunchError> {
        println!("Open: {url}");
        Ok(())
    }
}

fn email(raw: &str) -> Result<Email, CommandError> {
    Email::parse(raw).map_err(|e| CommandError::Input(format!("Invalid email: {e}")))
}

fn print_order(order: &Order) {
    let placed = order
        .created_at
        .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string());
    println!(
        "{}  {}  {}  {}  total {}",
        order.order_id, placed, order.payment_status, order.payment_method, order.total
    );
    for item in &order.items {
        println!("    {:<12} {} x{}", item.id(), item.title(), item.quantity());
    }
}

/// Completed orders for `email`.
pub async fn list(config: &StorefrontConfig, email_raw: &str) -> Result<(), CommandError> {
    let api = api_client(config)?;
    match purchases::lookup(&api, &email(email_raw)?).await? {
        Purchases::NoneFound => println!("No purchases found for {email_raw}."),
        Purchases::Found(orders) => {
            for order in &orders {
                print_order(order);
            }
        }
    }
    Ok(())
}

/// One order by id, any status.
pub async fn show_order(config: &StorefrontConfig, id: &str) -> Result<(), CommandError> {
    let order_id =
        OrderId::parse(id).map_err(|e| CommandError::Input(format!("Invalid order id: {e}")))?;
    let api = api_client(config)?;
    match api.order_by_id(&order_id).await? {
        Some(order) => print_order(&order),
        None => println!("Order {order_id} not found."),
    }
    Ok(())
}

/// Download or contact for one item of a completed order.
pub async fn fulfill(
    config: &StorefrontConfig,
    order: &str,
    item: &str,
    email_raw: &str,
) -> Result<(), CommandError> {
    let order_id =
        OrderId::parse(order).map_err(|e| CommandError::Input(format!("Invalid order id: {e}")))?;
    let item_id =
        ItemId::parse(item).map_err(|e| CommandError::Input(format!("Invalid item id: {e}")))?;
    let email = email(email_raw)?;

    let api = api_client(config)?;
    let history = purchases::lookup(&api, &email).await?;
    let order = history.order(&order_id).ok_or_else(|| {
        CommandError::Input(format!("No completed order {order_id} for {email}"))
    })?;
    let line = order
        .items
        .iter()
        .find(|line| line.id() == &item_id)
        .ok_or_else(|| CommandError::Input(format!("Order {order_id} has no item {item_id}")))?;

    let emailjs = config
        .emailjs
        .clone()
        .map(|emailjs| EmailJsClient::new(emailjs, config.request_timeout))
        .transpose()
        .map_err(FulfillmentError::from)?;
    let resolver = FulfillmentResolver::new(
        api,
        config.download_dir.clone(),
        TerminalLauncher,
        emailjs,
    );

    let purchaser = Purchaser::from(&order.customer);
    match resolver.fulfill(line, &purchaser).await? {
        Fulfilled::Downloaded { path } => println!("Saved to {}", path.display()),
        Fulfilled::ScheduleOpened { .. } => println!("Book a time using the link above."),
        Fulfilled::ComposerOpened { to } => println!("Write to {to} using the link above."),
        Fulfilled::ContactFormReady(request) => {
            println!("Subject: {}", request.subject);
            println!("{}", request.message);
            resolver.send_contact(&request).await?;
            println!("Message sent. We'll be in touch at {}.", request.email);
        }
    }
    Ok(())
}
