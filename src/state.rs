use std::fmt;

use serde::{Deserialize, Serialize};

/// Local subscription/install state of an item, as a bit set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemState(u32);

impl ItemState {
    pub const NONE: ItemState = ItemState(0);
    pub const SUBSCRIBED: ItemState = ItemState(1 << 0);
    pub const LEGACY_ITEM: ItemState = ItemState(1 << 1);
    pub const INSTALLED: ItemState = ItemState(1 << 2);
    pub const NEEDS_UPDATE: ItemState = ItemState(1 << 3);
    pub const DOWNLOADING: ItemState = ItemState(1 << 4);
    pub const DOWNLOAD_PENDING: ItemState = ItemState(1 << 5);

    const NAMES: [&'static str; 6] = [
        "subscribed",
        "legacy_item",
        "installed",
        "needs_update",
        "downloading",
        "download_pending",
    ];

    pub fn from_bits(bits: u32) -> Self {
        ItemState(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: ItemState) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: ItemState) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: ItemState) {
        self.0 &= !other.0;
    }

    pub fn is_installed(&self) -> bool {
        self.contains(Self::INSTALLED)
    }

    pub fn is_downloading(&self) -> bool {
        self.0 & (Self::DOWNLOADING.0 | Self::DOWNLOAD_PENDING.0) != 0
    }
}

impl std::ops::BitOr for ItemState {
    type Output = ItemState;

    fn bitor(self, rhs: ItemState) -> ItemState {
        ItemState(self.0 | rhs.0)
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return write!(f, "none");
        }
        let names: Vec<&str> = Self::NAMES
            .iter()
            .enumerate()
            .filter(|(bit, _)| self.0 & (1 << bit) != 0)
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join(" "))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub bytes_downloaded: u64,
    pub bytes_total: u64,
}

impl DownloadProgress {
    /// Completed percentage in `0..=100`.
    pub fn percentage(&self) -> u32 {
        if self.bytes_total == 0 {
            return 0;
        }
        (self.bytes_downloaded.min(self.bytes_total) * 100 / self.bytes_total) as u32
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallInfo {
    pub size_on_disk: u64,
    pub folder: String,
    pub timestamp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_text_lists_set_bits() {
        assert_eq!(ItemState::NONE.to_string(), "none");
        let state = ItemState::SUBSCRIBED | ItemState::INSTALLED;
        assert_eq!(state.to_string(), "subscribed installed");
        assert!(state.is_installed());
        assert!(!state.is_downloading());
    }

    #[test]
    fn insert_and_remove_bits() {
        let mut state = ItemState::DOWNLOAD_PENDING;
        assert!(state.is_downloading());
        state.remove(ItemState::DOWNLOAD_PENDING);
        state.insert(ItemState::INSTALLED);
        assert_eq!(state, ItemState::INSTALLED);
    }

    #[test]
    fn percentage_handles_empty_totals() {
        let empty = DownloadProgress::default();
        assert_eq!(empty.percentage(), 0);
        let half = DownloadProgress { bytes_downloaded: 50, bytes_total: 200 };
        assert_eq!(half.percentage(), 25);
    }
}
