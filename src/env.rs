//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问

use std::env;
use std::fmt;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "WORKTIME_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.trim().to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.trim().to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }

    /// 禁用颜色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }
}

/// 配置相关环境变量
pub mod config {
    use super::*;

    /// 显式指定的配置文件路径
    pub struct ConfigPath;
    impl EnvVar<String> for ConfigPath {
        const NAME: &'static str = "WORKTIME_CONFIG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Path to a TOML or JSON configuration file";

        fn parse(value: &str) -> EnvResult<String> {
            let path = value.trim();
            if path.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Path must not be empty".to_string(),
                });
            }
            Ok(path.to_string())
        }
    }

    /// 回退语言
    pub struct FallbackLanguage;
    impl EnvVar<String> for FallbackLanguage {
        const NAME: &'static str = "WORKTIME_FALLBACK_LANGUAGE";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str =
            "Language used when the preferred one has no messages (ISO 639-1 code)";

        fn parse(value: &str) -> EnvResult<String> {
            parse_language_code(value, Self::NAME)
        }
    }
}

/// 区域设置相关环境变量
pub mod locale {
    use super::*;

    /// 系统语言，依次读取 LC_ALL、LC_MESSAGES、LANG
    pub struct SystemLanguage;
    impl EnvVar<String> for SystemLanguage {
        const NAME: &'static str = "LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str =
            "System locale; its first two letters become the default preferred language";

        fn get() -> EnvResult<String> {
            for name in ["LC_ALL", "LC_MESSAGES", Self::NAME] {
                if let Ok(value) = env::var(name) {
                    if let Ok(language) = Self::parse(&value) {
                        return Ok(language);
                    }
                }
            }
            Err(EnvError {
                variable: Self::NAME.to_string(),
                message: "No usable locale found".to_string(),
            })
        }

        fn parse(value: &str) -> EnvResult<String> {
            // "it_IT.UTF-8" / "pt-BR" / "C"
            let prefix: String = value.trim().chars().take(2).collect();
            parse_language_code(&prefix, Self::NAME)
        }
    }
}

/// 辅助函数
fn parse_language_code(value: &str, var_name: &str) -> EnvResult<String> {
    let lang = value.trim().to_lowercase();
    if lang.len() != 2 || !lang.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Language code must be 2 letters (ISO 639-1), got '{}'", value),
        });
    }
    // "POSIX" 区域设置不是语言
    if lang == "po" {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("'{}' is not a language", value),
        });
    }
    Ok(lang)
}

/// 首选语言的默认值：系统语言，否则为 "en"
pub fn default_language() -> String {
    locale::SystemLanguage::get_or_default(crate::config::constants::DEFAULT_LANGUAGE.to_string())
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables Documentation\n\n");

    docs.push_str("## Core Configuration\n\n");
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        core::LogLevel::NAME,
        core::LogLevel::DESCRIPTION,
        core::LogLevel::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        core::NoColor::NAME,
        core::NoColor::DESCRIPTION,
        core::NoColor::DEFAULT
    ));

    docs.push_str("\n## Engine Configuration\n\n");
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        config::ConfigPath::NAME,
        config::ConfigPath::DESCRIPTION,
        config::ConfigPath::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        config::FallbackLanguage::NAME,
        config::FallbackLanguage::DESCRIPTION,
        config::FallbackLanguage::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        locale::SystemLanguage::NAME,
        locale::SystemLanguage::DESCRIPTION,
        locale::SystemLanguage::DEFAULT
    ));

    docs
}
