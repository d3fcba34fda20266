#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const REALM: &str = "Silvermoon";

pub const BOB_DUMP: &str = r#"
MyBankData = {
	{
		"Bob", -- [1]
		0, -- [2]
		"|cff9d9d9d|Hitem:2589::::::::60:::::::::|h[Linen Cloth]|h|r", -- [3]
		20, -- [4]
	}, -- [1]
	{
		"Bob", -- [1]
		5, -- [2]
		"|cffffffff|Hitem:4306::::::::60:::::::::|h[Silk Cloth]|h|r", -- [3]
		7, -- [4]
	}, -- [2]
}
"#;

pub const ANNA_DUMP: &str = r#"
MyBankData = {
	{
		"Anna", -- [1]
		-1, -- [2]
		"|cff1eff00|Hitem:10000::::::::60:::::::::|h[Some, Item]|h|r", -- [3]
		1, -- [4]
	}, -- [1]
}
"#;

pub const TRUNCATED_DUMP: &str = "MyBankData = {\n\t{\n\t\t\"Zed\", -- [1]\n\t\t0,";

pub const EXPECTED_CSV: &str = "account,charName,bagId,itemId,itemName,itemCount\n\
acct1,Bob,0,2589,Linen Cloth,20\n\
acct1,Bob,5,4306,Silk Cloth,7\n\
acct2,Anna,-1,10000,\"Some, Item\",1\n";

/// A WoW account tree: acct1 lists Bob and Zed (truncated dump), acct2 is discovered
/// and holds Carl (no dump) and Anna.
pub struct WowTree {
    pub root: TempDir,
    pub output: TempDir,
}

impl WowTree {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();

        write_dump(root.path(), "ACCT1", "Bob", BOB_DUMP);
        write_dump(root.path(), "ACCT1", "Zed", TRUNCATED_DUMP);
        write_dump(root.path(), "ACCT2", "Anna", ANNA_DUMP);
        std::fs::create_dir_all(root.path().join("ACCT2").join(REALM).join("Carl")).unwrap();

        Self { root, output }
    }

    pub fn config_toml(&self, sink_type: &str, connection: &str) -> String {
        format!(
            r#"
sinkType = "{sink_type}"

[wowInfo]
wowAccountAddonVariablePath = "{base}"
realmName = "{REALM}"

[wowInfo.wowAccountsToCheck]
acct1 = ["Bob", "Zed"]
acct2 = []

[connection]
outputFileName = "bank"
outputFileLocation = "{output}"
{connection}
"#,
            base = toml_path(self.root.path()),
            output = toml_path(self.output.path()),
        )
    }

    pub fn output_file(&self, extension: &str) -> PathBuf {
        self.output.path().join(format!("bank.{}", extension))
    }
}

pub fn write_dump(root: &Path, account: &str, character: &str, content: &str) {
    let dir = root
        .join(account)
        .join(REALM)
        .join(character)
        .join("SavedVariables");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("bankContentExtractor.lua"), content).unwrap();
}

pub fn toml_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
