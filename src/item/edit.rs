use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::transport::ItemId;

/// Who can see a published item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Public,
    FriendsOnly,
    Private,
    Unlisted,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::FriendsOnly => "friends",
            Visibility::Private => "private",
            Visibility::Unlisted => "unlisted",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "public" => Ok(Visibility::Public),
            "friends" => Ok(Visibility::FriendsOnly),
            "private" => Ok(Visibility::Private),
            "unlisted" => Ok(Visibility::Unlisted),
            other => Err(format!("invalid visibility value: '{}'", other)),
        }
    }
}

/// User-supplied changes to an item. Unset fields are left as they are.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Folder whose contents become the item's content.
    pub content_folder: Option<String>,
    /// Image file uploaded as the item's preview.
    pub preview_file: Option<String>,
    pub visibility: Option<Visibility>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<String>,
    pub change_note: Option<String>,
}

impl ItemEdit {
    pub fn is_empty(&self) -> bool {
        *self == ItemEdit::default()
    }
}

/// An update transaction for one item, as submitted to the service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub app_id: u32,
    pub item_id: ItemId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content_folder: Option<String>,
    pub preview_file: Option<String>,
    pub visibility: Option<Visibility>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<String>,
    pub change_note: Option<String>,
}

impl ItemUpdate {
    /// Start an empty transaction.
    pub fn start(app_id: u32, item_id: ItemId) -> Self {
        ItemUpdate {
            app_id,
            item_id,
            title: None,
            description: None,
            content_folder: None,
            preview_file: None,
            visibility: None,
            tags: None,
            metadata: None,
            change_note: None,
        }
    }

    /// Copy every set field of `edit` into the transaction.
    pub fn apply(mut self, edit: &ItemEdit) -> Self {
        if let Some(title) = &edit.title {
            self.title = Some(title.clone());
        }
        if let Some(description) = &edit.description {
            self.description = Some(description.clone());
        }
        if let Some(folder) = &edit.content_folder {
            self.content_folder = Some(folder.clone());
        }
        if let Some(preview) = &edit.preview_file {
            self.preview_file = Some(preview.clone());
        }
        if let Some(visibility) = edit.visibility {
            self.visibility = Some(visibility);
        }
        if let Some(tags) = &edit.tags {
            self.tags = Some(tags.clone());
        }
        if let Some(metadata) = &edit.metadata {
            self.metadata = Some(metadata.clone());
        }
        if let Some(note) = &edit.change_note {
            self.change_note = Some(note.clone());
        }
        self
    }
}

pub const MAX_TAG_LENGTH: usize = 255;

/// Split a comma separated tag list, trimming blanks.
pub fn parse_tag_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn format_tags(tags: &[String]) -> String {
    tags.join(",")
}

/// Tags are at most 255 bytes of printable characters; the only
/// whitespace allowed is a plain space.
pub fn is_valid_tag(tag: &str) -> bool {
    tag.len() <= MAX_TAG_LENGTH
        && !tag.is_empty()
        && tag
            .chars()
            .all(|c| c == ' ' || (!c.is_control() && !c.is_whitespace()))
}

/// Read the version number an item stores in its metadata.
pub fn parse_item_version(metadata: &str) -> Option<u32> {
    metadata.trim().parse().ok()
}

/// Version to write on the next update: one past `previous`, or 1.
pub fn next_item_version(previous: Option<u32>) -> u32 {
    previous.map_or(1, |version| version.saturating_add(1))
}
