//! Shared fixtures for the workshop integration tests.

#![allow(dead_code)]

use std::time::Duration;

use workshop_rust::{Catalog, ItemId, LocalWorkshop, StoredItem, WorkshopClient, WorkshopConfig};

/// Upper bound for waits that are expected to succeed.
pub const WAIT: Duration = Duration::from_secs(5);

pub fn config() -> WorkshopConfig {
    WorkshopConfig {
        app_id: 7,
        poll_interval_ms: 1,
        ..Default::default()
    }
}

pub fn stored(id: ItemId, title: &str) -> StoredItem {
    StoredItem {
        id,
        title: title.to_string(),
        description: format!("{} description", title),
        created_at: id,
        updated_at: id,
        ..Default::default()
    }
}

pub fn workshop_with(items: Vec<StoredItem>) -> LocalWorkshop {
    let mut catalog = Catalog::default();
    for item in items {
        catalog.items.insert(item.id, item);
    }
    LocalWorkshop::with_catalog(catalog)
}

pub fn connect(workshop: LocalWorkshop) -> WorkshopClient<LocalWorkshop> {
    WorkshopClient::connect(workshop, config()).unwrap()
}
