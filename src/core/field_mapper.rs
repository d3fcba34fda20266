use crate::core::lua_table::{LuaTable, LuaValue, TableKey};
use crate::domain::model::BankItemRecord;

/// Position of each value inside one row of the addon dump.
pub const FIELD_MAP: [(i64, &str); 4] = [
    (1, "charName"),
    (2, "bagId"),
    (3, "itemLink"),
    (4, "itemCount"),
];

/// Keys missing from [`FIELD_MAP`] keep their value under `unknown_<key>`.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRow {
    fields: Vec<(String, LuaValue)>,
}

pub fn field_name(key: &TableKey) -> String {
    match key {
        TableKey::Index(index) => FIELD_MAP
            .iter()
            .find(|(position, _)| position == index)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| format!("unknown_{}", index)),
        TableKey::Name(name) => format!("unknown_{}", name),
    }
}

pub fn map_row(row: LuaTable) -> MappedRow {
    let fields = row
        .into_entries()
        .into_iter()
        .map(|entry| (field_name(&entry.key), entry.value))
        .collect();
    MappedRow { fields }
}

impl MappedRow {
    pub fn fields(&self) -> &[(String, LuaValue)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&LuaValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn unknown_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .map(|(name, _)| name.as_str())
            .filter(|name| name.starts_with("unknown_"))
            .collect()
    }

    pub fn to_record(&self) -> BankItemRecord {
        BankItemRecord {
            char_name: self
                .get("charName")
                .and_then(LuaValue::as_text)
                .unwrap_or_default(),
            bag_id: self.get("bagId").and_then(LuaValue::as_i64),
            item_link: self
                .get("itemLink")
                .and_then(LuaValue::as_text)
                .unwrap_or_default(),
            item_count: self.get("itemCount").and_then(LuaValue::as_i64),
        }
    }
}
