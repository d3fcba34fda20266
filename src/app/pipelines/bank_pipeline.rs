use crate::config::BankConfig;
use crate::core::field_mapper::map_row;
use crate::core::lua_table::{decode_assignment, DecodeError, LuaTable, LuaValue};
use crate::domain::model::{
    AccountSpec, AggregatedData, BankItemRecord, ItemRecord, RawAccountData,
};
use crate::domain::ports::{Pipeline, Sink, Storage};
use crate::utils::error::Result;
use std::path::{Path, PathBuf};
use tracing::Instrument;

pub struct BankPipeline<S: Storage, K: Sink> {
    pub(crate) storage: S,
    pub(crate) config: BankConfig,
    pub(crate) sink: K,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterPlan {
    pub account: String,
    pub character: String,
    pub dump_path: PathBuf,
    pub present: bool,
}

impl<S: Storage, K: Sink> BankPipeline<S, K> {
    pub fn new(storage: S, config: BankConfig, sink: K) -> Self {
        Self {
            storage,
            config,
            sink,
        }
    }

    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    pub async fn resolve_characters(&self, account: &AccountSpec) -> Vec<String> {
        let explicit = account.explicit_characters();
        if !explicit.is_empty() {
            return explicit;
        }

        tracing::info!(
            "No characters specified for account '{}', scanning directories...",
            account.name
        );
        self.discover_characters(&account.name).await
    }

    // 依名稱排序，目錄不存在時回傳空清單
    pub async fn discover_characters(&self, account: &str) -> Vec<String> {
        let realm_path = self.config.realm_path(account);
        let location = self.storage.resolve(&realm_path);

        match self.storage.list_dirs(&realm_path).await {
            Ok(Some(mut characters)) => {
                characters.sort();
                tracing::info!("Found characters at {}: {:?}", location.display(), characters);
                characters
            }
            Ok(None) => {
                tracing::warn!(
                    "Account path does not exist or is not a directory: {}",
                    location.display()
                );
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Cannot list characters in {}: {}", location.display(), e);
                Vec::new()
            }
        }
    }

    /// Records from one character's dump. A missing or unreadable dump contributes nothing.
    pub async fn load_character(&self, account: &str, character: &str) -> Vec<BankItemRecord> {
        let path = self.config.dump_path(account, character);
        let location = self.storage.resolve(&path);

        if !self.storage.is_file(&path).await {
            tracing::warn!("Saved variables file missing: {}", location.display());
            return Vec::new();
        }

        match self.read_dump(&path).await {
            Ok(records) => {
                tracing::debug!("Loaded {} records from {}", records.len(), location.display());
                records
            }
            Err(e) => {
                tracing::error!(
                    "Error loading saved variables for {} - {} ({}): {}",
                    account,
                    character,
                    location.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    async fn read_dump(&self, path: &Path) -> Result<Vec<BankItemRecord>> {
        tracing::info!(
            "Loading saved variables from {}",
            self.storage.resolve(path).display()
        );
        let bytes = self.storage.read_file(path).await?;
        let content = String::from_utf8(bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let table = decode_assignment(&content, &self.config.wow_info.saved_variable_name)?;
        Ok(rows_to_records(table)?)
    }

    pub async fn process_account(&self, account: &AccountSpec) -> Vec<BankItemRecord> {
        let characters = self.resolve_characters(account).await;
        tracing::info!(
            "Processing account '{}' with characters: {:?}",
            account.name,
            characters
        );

        let mut records = Vec::new();
        for character in &characters {
            let loaded = self
                .load_character(&account.name, character)
                .instrument(tracing::info_span!("character", name = %character))
                .await;
            records.extend(loaded);
        }
        records
    }

    pub async fn plan(&self) -> Vec<CharacterPlan> {
        let mut plan = Vec::new();
        for account in self.config.accounts() {
            for character in self.resolve_characters(account).await {
                let path = self.config.dump_path(&account.name, &character);
                plan.push(CharacterPlan {
                    account: account.name.clone(),
                    present: self.storage.is_file(&path).await,
                    dump_path: self.storage.resolve(&path),
                    character,
                });
            }
        }
        plan
    }
}

fn rows_to_records(table: LuaTable) -> std::result::Result<Vec<BankItemRecord>, DecodeError> {
    let mut records = Vec::with_capacity(table.len());

    for entry in table.into_entries() {
        let LuaValue::Table(row) = entry.value else {
            return Err(DecodeError::RowNotTable { key: entry.key });
        };

        let mapped = map_row(row);
        let unknown = mapped.unknown_fields();
        if !unknown.is_empty() {
            tracing::warn!("Row {} has unmapped fields: {:?}", entry.key, unknown);
        }

        let record = mapped.to_record();
        if record.bag_id.is_none() && mapped.get("bagId").is_some() {
            tracing::warn!("Row {} has a non-integer bagId: {:?}", entry.key, mapped.get("bagId"));
        }
        if record.item_count.is_none() && mapped.get("itemCount").is_some() {
            tracing::warn!(
                "Row {} has a non-integer itemCount: {:?}",
                entry.key,
                mapped.get("itemCount")
            );
        }
        records.push(record);
    }

    Ok(records)
}

#[async_trait::async_trait]
impl<S: Storage, K: Sink> Pipeline for BankPipeline<S, K> {
    async fn extract(&self) -> Result<RawAccountData> {
        let mut data = RawAccountData::new();

        for account in self.config.accounts() {
            tracing::info!("Starting processing for account: {}", account.name);
            let records = self
                .process_account(account)
                .instrument(tracing::info_span!("account", name = %account.name))
                .await;
            data.extend_account(&account.name, records);
        }

        tracing::info!(
            "Extracted {} records from {} accounts",
            data.record_count(),
            data.account_count()
        );
        Ok(data)
    }

    async fn transform(&self, data: RawAccountData) -> Result<AggregatedData> {
        let resolved = data.map_records(ItemRecord::from);

        let unresolved = resolved
            .rows()
            .filter(|(_, record)| record.item_id.is_none())
            .count();
        if unresolved > 0 {
            tracing::debug!("{} records have no parsable item link", unresolved);
        }

        Ok(resolved)
    }

    async fn load(&self, data: AggregatedData) -> Result<String> {
        self.sink.write(&data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::EtlError;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn put(&self, path: impl Into<PathBuf>, content: &str) {
            let mut files = self.files.lock().await;
            files.insert(path.into(), content.as_bytes().to_vec());
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path.display()),
                ))
            })
        }

        async fn write_file(&self, path: &Path, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_path_buf(), data.to_vec());
            Ok(())
        }

        async fn is_file(&self, path: &Path) -> bool {
            self.files.lock().await.contains_key(path)
        }

        async fn list_dirs(&self, path: &Path) -> Result<Option<Vec<String>>> {
            let files = self.files.lock().await;
            let mut found = false;
            let mut dirs = BTreeSet::new();
            for file in files.keys() {
                if let Ok(rest) = file.strip_prefix(path) {
                    found = true;
                    let mut components = rest.components();
                    if let (Some(first), Some(_)) = (components.next(), components.next()) {
                        dirs.insert(first.as_os_str().to_string_lossy().into_owned());
                    }
                }
            }
            Ok(found.then(|| dirs.into_iter().collect()))
        }

        fn resolve(&self, path: &Path) -> PathBuf {
            Path::new("/mock").join(path)
        }
    }

    #[derive(Clone, Default)]
    struct MockSink {
        written: Arc<Mutex<Vec<AggregatedData>>>,
    }

    #[async_trait::async_trait]
    impl Sink for MockSink {
        async fn write(&self, data: &AggregatedData) -> Result<String> {
            self.written.lock().await.push(data.clone());
            Ok("mock".to_string())
        }
    }

    fn config(accounts: &str) -> BankConfig {
        BankConfig::from_toml_str(&format!(
            "[wowInfo]\nwowAccountAddonVariablePath = \"/wow\"\nrealmName = \"Realm\"\n[wowInfo.wowAccountsToCheck]\n{}\n",
            accounts
        ))
        .unwrap()
    }

    fn dump(rows: &[(&str, i64, i64, &str, i64)]) -> String {
        let mut out = String::from("MyBankData = {\n");
        for (i, (char_name, bag_id, item_id, item_name, count)) in rows.iter().enumerate() {
            out.push_str(&format!(
                "\t{{\n\t\t\"{}\", -- [1]\n\t\t{}, -- [2]\n\t\t\"|cffffffff|Hitem:{}::::::::60:::::|h[{}]|h|r\", -- [3]\n\t\t{}, -- [4]\n\t}}, -- [{}]\n",
                char_name,
                bag_id,
                item_id,
                item_name,
                count,
                i + 1
            ));
        }
        out.push_str("}\n");
        out
    }

    fn dump_path(account: &str, character: &str) -> PathBuf {
        PathBuf::from(account)
            .join("Realm")
            .join(character)
            .join("SavedVariables")
            .join("bankContentExtractor.lua")
    }

    fn pipeline(storage: MockStorage, accounts: &str) -> BankPipeline<MockStorage, MockSink> {
        BankPipeline::new(storage, config(accounts), MockSink::default())
    }

    #[tokio::test]
    async fn test_extract_preserves_account_and_character_order() {
        let storage = MockStorage::default();
        storage
            .put(dump_path("A", "c1"), &dump(&[("c1", 1, 10, "One", 1), ("c1", 2, 11, "Two", 2)]))
            .await;
        storage.put(dump_path("A", "c2"), &dump(&[("c2", 1, 20, "Three", 3)])).await;
        storage.put(dump_path("B", "c3"), &dump(&[("c3", 5, 30, "Four", 4)])).await;

        let pipeline = pipeline(storage, "A = [\"c1\", \"c2\"]\nB = [\"c3\"]");
        let data = pipeline.extract().await.unwrap();

        let accounts: Vec<_> = data.accounts().collect();
        assert_eq!(accounts, vec!["A", "B"]);

        let a: Vec<_> = data.get("A").unwrap().iter().map(|r| r.item_count).collect();
        assert_eq!(a, vec![Some(1), Some(2), Some(3)]);
        let b = data.get("B").unwrap();
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].char_name, "c3");
        assert_eq!(b[0].bag_id, Some(5));
    }

    #[tokio::test]
    async fn test_account_directory_is_uppercased() {
        let storage = MockStorage::default();
        storage.put(dump_path("MYACCT", "Bob"), &dump(&[("Bob", 1, 1, "X", 1)])).await;

        let pipeline = pipeline(storage, "myacct = [\"Bob\"]");
        let data = pipeline.extract().await.unwrap();

        assert_eq!(data.get("myacct").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_character_list_scans_realm_directory() {
        let storage = MockStorage::default();
        storage.put(dump_path("A", "Zed"), &dump(&[("Zed", 1, 1, "Z", 1)])).await;
        storage.put(dump_path("A", "Amy"), &dump(&[("Amy", 1, 2, "Y", 1)])).await;

        let pipeline = pipeline(storage, "A = []");
        let data = pipeline.extract().await.unwrap();

        let names: Vec<_> = data.get("A").unwrap().iter().map(|r| r.char_name.as_str()).collect();
        assert_eq!(names, vec!["Amy", "Zed"]);
    }

    #[tokio::test]
    async fn test_blank_entries_are_filtered_or_trigger_scan() {
        let storage = MockStorage::default();
        storage.put(dump_path("A", "Bob"), &dump(&[("Bob", 1, 1, "X", 1)])).await;
        storage.put(dump_path("A", "Cat"), &dump(&[("Cat", 1, 1, "X", 1)])).await;

        let pipeline = pipeline(storage, "A = [\"\", \"Bob\"]\nB = [\"\", \" \"]");
        let a = pipeline.config().accounts()[0].clone();
        let b = pipeline.config().accounts()[1].clone();

        assert_eq!(pipeline.resolve_characters(&a).await, vec!["Bob".to_string()]);
        // B has no realm directory at all.
        assert!(pipeline.resolve_characters(&b).await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_account_directory_yields_empty_group() {
        let pipeline = pipeline(MockStorage::default(), "ghost = []");

        assert!(pipeline.discover_characters("ghost").await.is_empty());

        let data = pipeline.extract().await.unwrap();
        assert_eq!(data.get("ghost"), Some(&[][..]));
    }

    #[tokio::test]
    async fn test_missing_dump_is_skipped() {
        let storage = MockStorage::default();
        storage.put(dump_path("A", "Bob"), &dump(&[("Bob", 1, 1, "X", 1)])).await;

        let pipeline = pipeline(storage, "A = [\"NoData\", \"Bob\"]");
        let data = pipeline.extract().await.unwrap();

        let records = data.get("A").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].char_name, "Bob");
    }

    #[tokio::test]
    async fn test_truncated_dump_contributes_nothing() {
        let storage = MockStorage::default();
        let full = dump(&[("Bad", 1, 1, "X", 1)]);
        let truncated = &full[..full.len() - 3];
        storage.put(dump_path("A", "Bad"), truncated).await;
        storage.put(dump_path("A", "Good"), &dump(&[("Good", 1, 2, "Y", 7)])).await;

        let pipeline = pipeline(storage, "A = [\"Bad\", \"Good\"]");
        assert!(pipeline.load_character("A", "Bad").await.is_empty());

        let data = pipeline.extract().await.unwrap();
        let records = data.get("A").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].char_name, "Good");
    }

    #[tokio::test]
    async fn test_deeply_nested_dump_does_not_stop_other_characters() {
        let storage = MockStorage::default();
        let nested = format!("MyBankData = {}{}\n", "{".repeat(1000), "}".repeat(1000));
        storage.put(dump_path("A", "Deep"), &nested).await;
        storage.put(dump_path("A", "Good"), &dump(&[("Good", 1, 2, "Y", 7)])).await;
        storage.put(dump_path("B", "Other"), &dump(&[("Other", 3, 4, "Z", 1)])).await;

        let pipeline = pipeline(storage, "A = [\"Deep\", \"Good\"]\nB = [\"Other\"]");
        let data = pipeline.extract().await.unwrap();

        assert_eq!(data.get("A").unwrap().len(), 1);
        assert_eq!(data.get("A").unwrap()[0].char_name, "Good");
        assert_eq!(data.get("B").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_variable_contributes_nothing() {
        let storage = MockStorage::default();
        storage.put(dump_path("A", "Bob"), "SomethingElse = {\n}\n").await;

        let pipeline = pipeline(storage, "A = [\"Bob\"]");
        assert!(pipeline.load_character("A", "Bob").await.is_empty());
    }

    #[tokio::test]
    async fn test_scalar_row_is_a_decode_error() {
        let table = crate::core::lua_table::decode_table("{ { \"Bob\", 1, \"x\", 1 }, 5 }").unwrap();
        let err = rows_to_records(table).unwrap_err();
        assert!(matches!(err, DecodeError::RowNotTable { .. }));
    }

    #[tokio::test]
    async fn test_every_row_becomes_one_record() {
        let table = crate::core::lua_table::decode_table(
            "{ { \"Bob\", 1, \"x\", 1, \"extra\" }, { \"Bob\" }, { [2] = \"bag\", [4] = 2 } }",
        )
        .unwrap();
        let records = rows_to_records(table).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[1].bag_id, None);
        assert_eq!(records[2].char_name, "");
        assert_eq!(records[2].bag_id, None);
        assert_eq!(records[2].item_count, Some(2));
    }

    #[tokio::test]
    async fn test_transform_resolves_links_and_keeps_every_record() {
        let mut raw = RawAccountData::new();
        raw.extend_account(
            "acct1",
            vec![
                BankItemRecord {
                    char_name: "Bob".to_string(),
                    bag_id: Some(1),
                    item_link: "|cff1eff00|Hitem:12345::::|h[Widget]|h|r".to_string(),
                    item_count: Some(3),
                },
                BankItemRecord {
                    char_name: "Bob".to_string(),
                    bag_id: Some(1),
                    item_link: String::new(),
                    item_count: Some(1),
                },
            ],
        );

        let pipeline = pipeline(MockStorage::default(), "acct1 = []");
        let data = pipeline.transform(raw).await.unwrap();
        let records = data.get("acct1").unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].item_id, Some(12345));
        assert_eq!(records[0].item_name.as_deref(), Some("Widget"));
        assert_eq!(records[1].item_id, None);
        assert_eq!(records[1].item_name, None);
    }

    #[tokio::test]
    async fn test_load_hands_data_to_sink() {
        let sink = MockSink::default();
        let pipeline = BankPipeline::new(MockStorage::default(), config("A = []"), sink.clone());

        let mut data = AggregatedData::new();
        data.extend_account("A", Vec::new());
        let destination = pipeline.load(data.clone()).await.unwrap();

        assert_eq!(destination, "mock");
        assert_eq!(sink.written.lock().await.as_slice(), &[data]);
    }

    #[tokio::test]
    async fn test_plan_lists_dump_paths() {
        let storage = MockStorage::default();
        storage.put(dump_path("A", "Bob"), &dump(&[("Bob", 1, 1, "X", 1)])).await;

        let pipeline = pipeline(storage, "A = [\"Bob\", \"Ann\"]");
        let plan = pipeline.plan().await;

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].character, "Bob");
        assert!(plan[0].present);
        assert_eq!(
            plan[0].dump_path,
            Path::new("/mock").join(dump_path("A", "Bob"))
        );
        assert_eq!(plan[1].character, "Ann");
        assert!(!plan[1].present);
    }
}
