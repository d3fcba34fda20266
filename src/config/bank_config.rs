use crate::domain::model::AccountSpec;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_identifier, validate_non_empty_string, validate_path, validate_required_field,
    Validate,
};
use regex::Regex;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use url::Url;

pub const DEFAULT_SAVED_VARIABLE_FILENAME: &str = "bankContentExtractor.lua";
pub const DEFAULT_SAVED_VARIABLE_NAME: &str = "MyBankData";
pub const DEFAULT_TABLE: &str = "bank_items";
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "bank_items";
const SAVED_VARIABLES_DIR: &str = "SavedVariables";

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

#[derive(Debug, Clone, Deserialize)]
pub struct BankConfig {
    #[serde(rename = "wowInfo", alias = "wow_info")]
    pub wow_info: WowInfo,
    #[serde(rename = "sinkType", alias = "sink_type", default = "default_sink_type")]
    pub sink_type: String,
    #[serde(default)]
    pub connection: ConnectionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WowInfo {
    #[serde(rename = "wowAccountAddonVariablePath", alias = "base_path", default)]
    pub base_path: PathBuf,
    #[serde(rename = "realmName", alias = "realm_name", default)]
    pub realm_name: String,
    #[serde(
        rename = "wowAccountsToCheck",
        alias = "accounts",
        default,
        deserialize_with = "deserialize_accounts"
    )]
    pub accounts: Vec<AccountSpec>,
    #[serde(
        rename = "savedVariableFilename",
        alias = "saved_variable_filename",
        default = "default_saved_variable_filename"
    )]
    pub saved_variable_filename: String,
    #[serde(
        rename = "savedVariableName",
        alias = "saved_variable_name",
        default = "default_saved_variable_name"
    )]
    pub saved_variable_name: String,
}

#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub table: Option<String>,
    pub url: Option<String>,
    #[serde(alias = "output_file_name")]
    pub output_file_name: Option<String>,
    #[serde(alias = "output_file_location")]
    pub output_file_location: Option<String>,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("table", &self.table)
            .field("url", &self.url.as_ref().map(|_| "***"))
            .field("output_file_name", &self.output_file_name)
            .field("output_file_location", &self.output_file_location)
            .finish()
    }
}

fn default_sink_type() -> String {
    "json".to_string()
}

fn default_saved_variable_filename() -> String {
    DEFAULT_SAVED_VARIABLE_FILENAME.to_string()
}

fn default_saved_variable_name() -> String {
    DEFAULT_SAVED_VARIABLE_NAME.to_string()
}

/// Accounts are a map in the file; keep them in document order.
fn deserialize_accounts<'de, D>(deserializer: D) -> std::result::Result<Vec<AccountSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    struct AccountsVisitor;

    impl<'de> Visitor<'de> for AccountsVisitor {
        type Value = Vec<AccountSpec>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of account name to a list of character names")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut accounts = Vec::new();
            while let Some((name, characters)) = map.next_entry::<String, Option<Vec<String>>>()? {
                accounts.push(AccountSpec::new(name, characters.unwrap_or_default()));
            }
            Ok(accounts)
        }
    }

    deserializer.deserialize_map(AccountsVisitor)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Relational,
    DelimitedFile,
    Document,
}

impl SinkKind {
    pub const VALID_NAMES: &'static [&'static str] = &[
        "mariadb",
        "mysql",
        "relational",
        "csv",
        "delimited-file",
        "json",
        "document",
    ];
}

impl FromStr for SinkKind {
    type Err = EtlError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mariadb" | "mysql" | "relational" => Ok(SinkKind::Relational),
            "csv" | "delimited-file" => Ok(SinkKind::DelimitedFile),
            "json" | "document" => Ok(SinkKind::Document),
            _ => Err(EtlError::InvalidConfigValueError {
                field: "sinkType".to_string(),
                value: value.to_string(),
                reason: format!(
                    "Unsupported sink type. Valid options: {}",
                    SinkKind::VALID_NAMES.join(", ")
                ),
            }),
        }
    }
}

impl BankConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EtlError::config(format!("Cannot read config file '{}': {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let content = Self::substitute_env_vars(content);
        toml::from_str(&content).map_err(|e| EtlError::config(format!("TOML parsing error: {}", e)))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let content = Self::substitute_env_vars(content);
        serde_json::from_str(&content)
            .map_err(|e| EtlError::config(format!("JSON parsing error: {}", e)))
    }

    /// Replace `${VAR}` with the environment value; unknown variables are left as written.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn sink_kind(&self) -> Result<SinkKind> {
        self.sink_type.parse()
    }

    pub fn base_path(&self) -> &Path {
        &self.wow_info.base_path
    }

    pub fn accounts(&self) -> &[AccountSpec] {
        &self.wow_info.accounts
    }

    pub fn realm_path(&self, account: &str) -> PathBuf {
        PathBuf::from(account.to_uppercase()).join(&self.wow_info.realm_name)
    }

    /// `<ACCOUNT>/<realm>/<character>/SavedVariables/<file>`, relative to the base path.
    pub fn dump_path(&self, account: &str, character: &str) -> PathBuf {
        self.realm_path(account)
            .join(character)
            .join(SAVED_VARIABLES_DIR)
            .join(&self.wow_info.saved_variable_filename)
    }

    pub fn table_name(&self) -> &str {
        self.connection.table.as_deref().unwrap_or(DEFAULT_TABLE)
    }

    pub fn output_file_name(&self) -> &str {
        self.connection
            .output_file_name
            .as_deref()
            .unwrap_or(DEFAULT_OUTPUT_FILE_NAME)
    }

    pub fn output_location(&self) -> &str {
        self.connection.output_file_location.as_deref().unwrap_or(".")
    }

    pub fn output_file(&self, extension: &str) -> PathBuf {
        PathBuf::from(format!("{}.{}", self.output_file_name(), extension))
    }

    /// `connection.url` when set, otherwise a MySQL URL built from the credential fields.
    pub fn database_url(&self) -> Result<String> {
        let connection = &self.connection;
        if let Some(url) = connection.url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Ok(url.to_string());
        }

        let host = connection.host.as_deref().unwrap_or("localhost");
        let port = connection.port.unwrap_or(3306);
        let username = validate_required_field("connection.username", &connection.username)?;
        let password = validate_required_field("connection.password", &connection.password)?;
        let database = validate_required_field("connection.database", &connection.database)?;

        validate_non_empty_string("connection.host", host)?;
        validate_non_empty_string("connection.username", username)?;
        validate_non_empty_string("connection.password", password)?;
        validate_non_empty_string("connection.database", database)?;
        if port == 0 {
            return Err(EtlError::InvalidConfigValueError {
                field: "connection.port".to_string(),
                value: port.to_string(),
                reason: "Port must be between 1 and 65535".to_string(),
            });
        }

        let invalid = |field: &str, value: &str| EtlError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: "Cannot be used in a database URL".to_string(),
        };

        let mut url = Url::parse("mysql://localhost").map_err(|e| EtlError::config(e.to_string()))?;
        url.set_host(Some(host))
            .map_err(|_| invalid("connection.host", host))?;
        url.set_port(Some(port))
            .map_err(|_| invalid("connection.port", &port.to_string()))?;
        url.set_username(username)
            .map_err(|_| invalid("connection.username", username))?;
        url.set_password(Some(password))
            .map_err(|_| invalid("connection.password", "***"))?;
        url.set_path(&format!("/{}", database));

        Ok(url.to_string())
    }
}

impl Validate for BankConfig {
    fn validate(&self) -> Result<()> {
        let base_path = self.base_path();
        let base_display = base_path.to_string_lossy();
        validate_path("wowInfo.wowAccountAddonVariablePath", &base_display)?;
        if !base_path.is_dir() {
            return Err(EtlError::InvalidConfigValueError {
                field: "wowInfo.wowAccountAddonVariablePath".to_string(),
                value: base_display.into_owned(),
                reason: "WoW addon variable path does not exist".to_string(),
            });
        }

        validate_non_empty_string("wowInfo.realmName", &self.wow_info.realm_name)?;

        if self.accounts().is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "wowInfo.wowAccountsToCheck".to_string(),
            });
        }
        for account in self.accounts() {
            validate_non_empty_string("wowInfo.wowAccountsToCheck", &account.name)?;
        }

        validate_non_empty_string(
            "wowInfo.savedVariableFilename",
            &self.wow_info.saved_variable_filename,
        )?;
        validate_identifier("wowInfo.savedVariableName", &self.wow_info.saved_variable_name)?;

        match self.sink_kind()? {
            SinkKind::Relational => {
                self.database_url()?;
                validate_identifier("connection.table", self.table_name())?;
            }
            SinkKind::DelimitedFile | SinkKind::Document => {
                validate_non_empty_string("connection.outputFileName", self.output_file_name())?;
                validate_path("connection.outputFileLocation", self.output_location())?;
            }
        }

        Ok(())
    }
}
