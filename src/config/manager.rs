//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::error::{WorkTimeError, WorkTimeResult};
use crate::i18n::{MessageCatalog, WorkTimeMessages};

/// 货币定义
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CurrencyDef {
    /// ISO-4217 代码，如 "USD"
    pub code: String,
    /// 符号，如 "$"
    pub symbol: String,
}

impl CurrencyDef {
    pub fn new(code: &str, symbol: &str) -> Self {
        Self {
            code: code.to_string(),
            symbol: symbol.to_string(),
        }
    }
}

/// 引擎配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 未知语言的回退语言
    pub fallback_language: String,
    /// 单次 flush 的最大投递轮数
    pub max_delivery_rounds: usize,
    /// process_element 直接拒绝的元素
    pub skip_elements: Vec<String>,
    /// 识别的货币（有序）
    pub currencies: Vec<CurrencyDef>,
    /// 额外的或覆盖内置的消息表
    pub messages: BTreeMap<String, WorkTimeMessages>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fallback_language: constants::FALLBACK_LANGUAGE.to_string(),
            max_delivery_rounds: constants::DEFAULT_MAX_DELIVERY_ROUNDS,
            skip_elements: constants::SKIP_ELEMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            currencies: constants::DEFAULT_CURRENCIES
                .iter()
                .map(|(code, symbol)| CurrencyDef::new(code, symbol))
                .collect(),
            messages: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// 验证配置
    pub fn validate(&self) -> WorkTimeResult<()> {
        if self.currencies.is_empty() {
            return Err(WorkTimeError::ConfigError("货币列表不能为空".to_string()));
        }

        for currency in &self.currencies {
            if currency.code.trim().is_empty() || currency.symbol.trim().is_empty() {
                return Err(WorkTimeError::ConfigError(format!(
                    "货币定义不完整: {:?}",
                    currency
                )));
            }
        }

        if self.max_delivery_rounds == 0 {
            return Err(WorkTimeError::ConfigError("最大投递轮数不能为0".to_string()));
        }

        if !self.message_catalog().contains(&self.fallback_language) {
            return Err(WorkTimeError::ConfigError(format!(
                "回退语言 '{}' 没有消息表",
                self.fallback_language
            )));
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{config, EnvVar};

        if let Ok(language) = config::FallbackLanguage::get() {
            tracing::info!("环境变量覆盖回退语言: {}", language);
            self.fallback_language = language;
        }
    }

    /// 构建消息表
    pub fn message_catalog(&self) -> MessageCatalog {
        MessageCatalog::with_overrides(&self.messages, &self.fallback_language)
    }

    /// 是否为直接跳过的元素
    pub fn is_skip_element(&self, tag_name: &str) -> bool {
        self.skip_elements
            .iter()
            .any(|skip| skip.eq_ignore_ascii_case(tag_name))
    }
}

/// 简化的配置管理器
pub struct ConfigManager {
    config: EngineConfig,
}

impl ConfigManager {
    /// 使用给定配置创建管理器
    pub fn new(mut config: EngineConfig) -> WorkTimeResult<Self> {
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 按 .env、WORKTIME_CONFIG、搜索路径的顺序查找配置
    pub fn discover() -> WorkTimeResult<Self> {
        use crate::env::{config, EnvVar};

        Self::load_dotenv();

        if let Ok(path) = config::ConfigPath::get() {
            let expanded_path = shellexpand::tilde(&path);
            tracing::info!("加载环境变量指定的配置文件: {}", expanded_path);
            return Self::load_from_file(expanded_path.as_ref());
        }

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(expanded_path.as_ref());
            }
        }

        tracing::info!("未找到配置文件，使用默认配置");
        Self::new(EngineConfig::default())
    }

    /// 从指定文件加载配置
    pub fn load_from_file(path: &str) -> WorkTimeResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WorkTimeError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        if path.ends_with(".json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// 解析TOML配置
    pub fn from_toml_str(content: &str) -> WorkTimeResult<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        Self::new(config)
    }

    /// 解析JSON配置
    pub fn from_json_str(content: &str) -> WorkTimeResult<Self> {
        let config: EngineConfig = serde_json::from_str(content)
            .map_err(|e| WorkTimeError::ConfigError(format!("解析JSON配置失败: {}", e)))?;
        Self::new(config)
    }

    /// 获取配置
    pub fn get_config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn into_config(self) -> EngineConfig {
        self.config
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &str) -> WorkTimeResult<()> {
        let mut config = EngineConfig::default();
        config
            .messages
            .insert("it".to_string(), WorkTimeMessages::italian());

        let content = toml::to_string_pretty(&config)
            .map_err(|e| WorkTimeError::SerializationError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| WorkTimeError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        for env_file in constants::ENV_FILES {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }
}
