//! Local workshop - a file-backed implementation of [`crate::Transport`]
//!
//! Useful for:
//! - Unit and integration testing without the vendor service
//! - Running the `workshop` tool offline against a JSON catalog
//! - Reproducing failure paths (refused submissions, transport failures,
//!   rejected updates) deterministically

mod catalog;
mod workshop;

pub use catalog::{folder_size, Catalog, StoredItem};
pub use workshop::LocalWorkshop;
