use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Pending,
    Collected,
    Unavailable,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Collected => "collected",
            ItemStatus::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ItemStatus::Pending),
            "collected" => Ok(ItemStatus::Collected),
            "unavailable" => Ok(ItemStatus::Unavailable),
            other => Err(format!(
                "unknown item status '{}' (expected pending, collected or unavailable)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ShoppingListItem {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty: Option<u32>,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ShoppingList {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub items: Vec<ShoppingListItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<String>,
}

impl ShoppingList {
    pub fn summary(&self) -> ListSummary {
        self.items
            .iter()
            .fold(ListSummary::default(), |mut summary, item| {
                match item.status {
                    ItemStatus::Pending => summary.pending += 1,
                    ItemStatus::Collected => summary.collected += 1,
                    ItemStatus::Unavailable => summary.unavailable += 1,
                }
                summary
            })
    }

    pub fn item(&self, item_id: &str) -> Option<&ShoppingListItem> {
        self.items.iter().find(|item| item.id == item_id)
    }
}

/// Item counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ListSummary {
    pub pending: usize,
    pub collected: usize,
    pub unavailable: usize,
}

impl ListSummary {
    pub fn total(&self) -> usize {
        self.pending + self.collected + self.unavailable
    }
}

/// Backend answer to a completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CompletionInfo {
    #[serde(default)]
    pub queued: bool,
    #[serde(rename = "listId")]
    pub list_id: String,
}

/// A line of a list being created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewListItem {
    pub name: String,
    pub qty: u32,
}

impl FromStr for NewListItem {
    type Err = String;

    /// Parse `NAME` or `NAME:QTY`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, qty) = match s.rsplit_once(':') {
            Some((name, qty)) => {
                let qty = qty
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| format!("invalid quantity in '{}'", s))?;
                (name, qty)
            }
            None => (s, 1),
        };
        let name = name.trim();
        if name.is_empty() {
            return Err("item name must not be empty".to_string());
        }
        Ok(Self {
            name: name.to_string(),
            qty,
        })
    }
}
