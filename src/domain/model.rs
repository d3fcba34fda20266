use crate::core::item_link::parse_item_link;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSpec {
    pub name: String,
    pub characters: Vec<String>,
}

impl AccountSpec {
    pub fn new(name: impl Into<String>, characters: Vec<String>) -> Self {
        Self {
            name: name.into(),
            characters,
        }
    }

    pub fn explicit_characters(&self) -> Vec<String> {
        self.characters
            .iter()
            .filter(|c| !c.trim().is_empty())
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankItemRecord {
    pub char_name: String,
    pub bag_id: Option<i64>,
    pub item_link: String,
    pub item_count: Option<i64>,
}

/// Final record. `item_id` and `item_name` are both set or both empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub char_name: String,
    pub bag_id: Option<i64>,
    pub item_id: Option<i64>,
    pub item_name: Option<String>,
    pub item_count: Option<i64>,
}

impl From<BankItemRecord> for ItemRecord {
    fn from(record: BankItemRecord) -> Self {
        let (item_id, item_name) = match parse_item_link(&record.item_link) {
            Some(parsed) => (Some(parsed.item_id), Some(parsed.item_name)),
            None => (None, None),
        };
        ItemRecord {
            char_name: record.char_name,
            bag_id: record.bag_id,
            item_id,
            item_name,
            item_count: record.item_count,
        }
    }
}

/// Serializes as a map from account name to records, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountGroups<T> {
    groups: Vec<(String, Vec<T>)>,
}

pub type RawAccountData = AccountGroups<BankItemRecord>;
pub type AggregatedData = AccountGroups<ItemRecord>;

impl<T> Default for AccountGroups<T> {
    fn default() -> Self {
        Self { groups: Vec::new() }
    }
}

impl<T> AccountGroups<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend_account(&mut self, account: &str, records: impl IntoIterator<Item = T>) {
        match self.groups.iter_mut().find(|(name, _)| name == account) {
            Some((_, existing)) => existing.extend(records),
            None => self
                .groups
                .push((account.to_string(), records.into_iter().collect())),
        }
    }

    pub fn get(&self, account: &str) -> Option<&[T]> {
        self.groups
            .iter()
            .find(|(name, _)| name == account)
            .map(|(_, records)| records.as_slice())
    }

    pub fn accounts(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.groups
            .iter()
            .map(|(name, records)| (name.as_str(), records.as_slice()))
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &T)> {
        self.iter()
            .flat_map(|(account, records)| records.iter().map(move |record| (account, record)))
    }

    pub fn account_count(&self) -> usize {
        self.groups.len()
    }

    pub fn record_count(&self) -> usize {
        self.groups.iter().map(|(_, records)| records.len()).sum()
    }

    pub fn map_records<U>(self, mut f: impl FnMut(T) -> U) -> AccountGroups<U> {
        AccountGroups {
            groups: self
                .groups
                .into_iter()
                .map(|(name, records)| (name, records.into_iter().map(&mut f).collect()))
                .collect(),
        }
    }
}

impl<T: Serialize> Serialize for AccountGroups<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (account, records) in &self.groups {
            map.serialize_entry(account, records)?;
        }
        map.end()
    }
}
