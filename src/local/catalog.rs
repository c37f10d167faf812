use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::item::Visibility;
use crate::query::{BrowseFilter, FindOrder, ItemDetails, ItemStats};
use crate::state::InstallInfo;
use crate::transport::ItemId;

/// An item as stored by the local service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    pub id: ItemId,
    pub owner_id: u64,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub metadata: String,
    #[serde(default)]
    pub key_value_tags: Vec<(String, String)>,
    #[serde(default)]
    pub content_folder: Option<String>,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default, with = "preview_serde")]
    pub preview: Option<Vec<u8>>,
    #[serde(default)]
    pub additional_previews: Vec<String>,
    #[serde(default)]
    pub children: Vec<ItemId>,
    pub created_at: u64,
    pub updated_at: u64,
    #[serde(default)]
    pub votes_up: u32,
    #[serde(default)]
    pub votes_down: u32,
    #[serde(default)]
    pub stats: ItemStats,
}

mod preview_serde {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(preview: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        preview
            .as_ref()
            .map(|bytes| STANDARD.encode(bytes))
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

impl StoredItem {
    /// Upvote share in `0.0..=1.0`.
    pub fn score(&self) -> f32 {
        let votes = self.votes_up as u64 + self.votes_down as u64;
        if votes == 0 {
            0.0
        } else {
            self.votes_up as f32 / votes as f32
        }
    }

    fn matches_text(&self, text: &str) -> bool {
        let needle = text.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }

    fn matches_tags(&self, filter: &BrowseFilter) -> bool {
        if filter.tags.is_empty() {
            return true;
        }
        let has = |tag: &String| self.tags.iter().any(|own| own == tag);
        if filter.match_any_tag {
            filter.tags.iter().any(has)
        } else {
            filter.tags.iter().all(has)
        }
    }

    /// Details as the service reports them; long descriptions are cut to
    /// 255 bytes unless requested.
    pub fn details(&self, long_description: bool, playtime_stats: bool) -> ItemDetails {
        let mut description = self.description.clone();
        if !long_description && description.len() > 255 {
            let mut end = 255;
            while !description.is_char_boundary(end) {
                end -= 1;
            }
            description.truncate(end);
        }
        let mut stats = self.stats.clone();
        if !playtime_stats {
            stats.seconds_played = None;
            stats.playtime_sessions = None;
        }
        ItemDetails {
            id: self.id,
            result: crate::error::ResultCode::Ok,
            title: self.title.clone(),
            description,
            owner_id: self.owner_id,
            tags: self.tags.clone(),
            visibility: self.visibility,
            score: self.score(),
            votes_up: self.votes_up,
            votes_down: self.votes_down,
            created_at: self.created_at,
            updated_at: self.updated_at,
            file_size: self.file_size,
            num_children: self.children.len() as u32,
            stats,
        }
    }
}

/// Persistent state of the local service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub next_id: ItemId,
    pub owner_id: u64,
    #[serde(default)]
    pub items: BTreeMap<ItemId, StoredItem>,
    #[serde(default)]
    pub installs: BTreeMap<ItemId, InstallInfo>,
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog {
            next_id: 1_000_000_001,
            owner_id: 76_561_197_960_265_729,
            items: BTreeMap::new(),
            installs: BTreeMap::new(),
        }
    }
}

impl Catalog {
    /// Load a catalog from disk; a missing file yields an empty catalog.
    pub fn load(path: &Path) -> Result<Self, TransportError> {
        if !path.exists() {
            return Ok(Catalog::default());
        }
        let text = fs::read_to_string(path).map_err(|source| TransportError::CatalogIo {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| TransportError::CatalogFormat {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), TransportError> {
        let text =
            serde_json::to_string_pretty(self).map_err(|source| TransportError::CatalogFormat {
                path: path.display().to_string(),
                source,
            })?;
        fs::write(path, text).map_err(|source| TransportError::CatalogIo {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn mint_id(&mut self) -> ItemId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Items matching a browse filter and optional search text, in the
    /// filter's order.
    pub fn browse(&self, filter: &BrowseFilter, search_text: Option<&str>) -> Vec<&StoredItem> {
        let mut matching: Vec<&StoredItem> = self
            .items
            .values()
            .filter(|item| item.visibility == Visibility::Public || item.owner_id == self.owner_id)
            .filter(|item| search_text.map_or(true, |text| item.matches_text(text)))
            .filter(|item| item.matches_tags(filter))
            .collect();

        match filter.order {
            FindOrder::Votes => matching.sort_by(|a, b| {
                let a_net = a.votes_up as i64 - a.votes_down as i64;
                let b_net = b.votes_up as i64 - b.votes_down as i64;
                b_net.cmp(&a_net).then(a.id.cmp(&b.id))
            }),
            FindOrder::Date => {
                matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)))
            }
            FindOrder::Subscriptions => matching.sort_by(|a, b| {
                b.stats
                    .subscriptions
                    .cmp(&a.stats.subscriptions)
                    .then(a.id.cmp(&b.id))
            }),
            FindOrder::Playtime => matching.sort_by(|a, b| {
                let a_played = a.stats.seconds_played.unwrap_or_default();
                let b_played = b.stats.seconds_played.unwrap_or_default();
                b_played.cmp(&a_played).then(a.id.cmp(&b.id))
            }),
        }
        matching
    }
}

/// Total size of the files under `folder`.
pub fn folder_size(folder: &Path) -> std::io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            total += folder_size(&entry.path())?;
        } else {
            total += metadata.len();
        }
    }
    Ok(total)
}
