//! Items - publishing new items and editing existing ones
//!
//! ```text
//! begin_item(edit, None)      begin_item(edit, Some(id))
//!        │                            │
//!        ▼                            │
//!    Creating ── create ok ──► Updating ◄┘
//!        │                        │
//!        ▼                        ▼
//!      Failed              Succeeded | Failed
//! ```
//!
//! `cancel_item` is allowed until an outcome has been returned; an item
//! minted by the create step is deleted again.

mod edit;
mod results;
mod workflow;

pub use edit::{
    format_tags, is_valid_tag, next_item_version, parse_item_version, parse_tag_list, ItemEdit,
    ItemUpdate, Visibility, MAX_TAG_LENGTH,
};
pub use results::{CreatedItem, DeletedItem, SubmittedUpdate};
pub use workflow::{ItemFailure, ItemOutcome, ItemPhase, ItemWorkflow};
