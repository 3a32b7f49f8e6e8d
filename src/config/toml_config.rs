use crate::core::service::EngineSettings;
use crate::domain::model::{FillType, MAX_PER_PROVIDER};
use crate::utils::error::{FillError, Result};
use crate::utils::validation::{validate_path, validate_positive_number, validate_unique_items, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_max_per_provider")]
    pub max_per_provider: u32,
    #[serde(default = "default_fill_order")]
    pub fill_order: Vec<FillType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub json: bool,
}

fn default_max_per_provider() -> u32 {
    MAX_PER_PROVIDER
}

fn default_fill_order() -> Vec<FillType> {
    FillType::ALL.to_vec()
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_snapshot_file() -> String {
    "guild-fill.json".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_per_provider: default_max_per_provider(),
            fill_order: default_fill_order(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            snapshot_file: default_snapshot_file(),
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(FillError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 設定檔不存在時使用預設值
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(
                "Config file {} not found, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| FillError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GUILD_FILL_DATA})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| FillError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            max_per_provider: self.engine.max_per_provider,
            fill_order: self.engine.fill_order.clone(),
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_positive_number("engine.max_per_provider", self.engine.max_per_provider, 1)?;
        validate_unique_items("engine.fill_order", &self.engine.fill_order)?;
        if let Some(missing) = FillType::ALL
            .iter()
            .find(|fill_type| !self.engine.fill_order.contains(fill_type))
        {
            return Err(FillError::InvalidConfigValueError {
                field: "engine.fill_order".to_string(),
                value: format!("{:?}", self.engine.fill_order),
                reason: format!("must include {}", missing),
            });
        }
        validate_path("store.data_dir", &self.store.data_dir)?;
        validate_path("store.snapshot_file", &self.store.snapshot_file)?;
        Ok(())
    }
}
