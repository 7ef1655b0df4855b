//! Cart commands.

use counsel_core::{Email, FulfillmentContact, ItemId, LineItem, Price, Quantity};
use counsel_storefront::{CartStore, StorefrontConfig};
use rust_decimal::Decimal;

use super::CommandError;

/// Item details from `cart add`.
pub struct NewItem {
    pub id: String,
    pub title: String,
    pub category: String,
    pub price: Decimal,
    pub quantity: u32,
    pub custom: Option<String>,
    pub schedule_link: Option<String>,
    pub contact_email: Option<String>,
    pub file_name: Option<String>,
}

pub fn open(config: &StorefrontConfig) -> CartStore {
    CartStore::in_dir(&config.data_dir)
}

fn item_id(raw: &str) -> Result<ItemId, CommandError> {
    ItemId::parse(raw).map_err(|e| CommandError::Input(format!("Invalid item id: {e}")))
}

pub fn print_items(items: &[LineItem]) {
    for item in items {
        let kind = item
            .option_name()
            .map_or_else(String::new, |option| format!(" [custom: {option}]"));
        let total = item
            .line_total()
            .map_or_else(|_| "(out of range)".to_string(), |total| total.to_string());
        println!(
            "  {:<12} {} x{} @ {} = {total}{kind}",
            item.id(),
            item.title(),
            item.quantity(),
            item.unit_price(),
        );
    }
}

pub fn list(cart: &CartStore) -> Result<(), CommandError> {
    let items = cart.get();
    if items.is_empty() {
        println!("Your cart is empty.");
        return Ok(());
    }

    print_items(&items);
    let summary = cart.summary()?;
    println!(
        "{} line(s), {} unit(s), subtotal {}",
        summary.lines, summary.units, summary.subtotal
    );
    Ok(())
}

pub fn add(cart: &CartStore, config: &StorefrontConfig, new: NewItem) -> Result<(), CommandError> {
    let id = item_id(&new.id)?;
    let price = Price::new(new.price, config.payment.currency)
        .map_err(|e| CommandError::Input(format!("Invalid price: {e}")))?;
    let quantity = Quantity::new(new.quantity)
        .ok_or_else(|| CommandError::Input("Quantity must be at least 1".to_string()))?;

    let contact_email = new
        .contact_email
        .as_deref()
        .map(Email::parse)
        .transpose()
        .map_err(|e| CommandError::Input(format!("Invalid contact email: {e}")))?;

    let mut item = match new.custom {
        Some(option_name) => LineItem::custom(id, new.title, new.category, price, option_name)
            .with_contact(FulfillmentContact::new(new.schedule_link, contact_email)),
        None => LineItem::standard(id, new.title, new.category, price),
    }
    .with_quantity(quantity);
    if let Some(file_name) = new.file_name {
        item = item.with_file_name(file_name);
    }

    let items = cart.add(item)?;
    println!("Added. Cart now has {} line(s).", items.len());
    Ok(())
}

pub fn remove(cart: &CartStore, id: &str) -> Result<(), CommandError> {
    let items = cart.remove(&item_id(id)?)?;
    println!("Removed. Cart now has {} line(s).", items.len());
    Ok(())
}

pub fn update_quantity(cart: &CartStore, id: &str, delta: i64) -> Result<(), CommandError> {
    let id = item_id(id)?;
    let items = cart.update_quantity(&id, delta)?;
    if let Some(line) = items.iter().find(|i| i.id() == &id) {
        println!("{} quantity is now {}.", line.title(), line.quantity());
    }
    Ok(())
}

pub fn clear(cart: &CartStore) -> Result<(), CommandError> {
    cart.clear()?;
    println!("Cart cleared.");
    Ok(())
}
