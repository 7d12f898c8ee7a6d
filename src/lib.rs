//! # WorkTime Library
//!
//! 把页面上可见的金额改写为 "金额 (工作时长)"，例如 `$50` → `$50 (5 h of work)`。
//!
//! ## 模块组织
//!
//! - `core` - 引擎：挂载、设置变更响应和一次性转换
//! - `parsers` - 数字、货币、HTML 和 CSS 解析
//! - `rewrite` - 可见性判断、时长格式化和文本改写
//! - `watch` - 可观察的文档和变更观察器
//! - `settings` - 设置快照、存储和收入换算
//! - `config` - 引擎配置
//! - `i18n` - 本地化消息
//! - `env` - 环境变量
//! - `error` - 错误类型

pub mod config;
pub mod core;
pub mod env;
pub mod error;
pub mod i18n;
pub mod parsers;
pub mod rewrite;
pub mod settings;
pub mod watch;

// Re-export commonly used items for convenience
pub use config::{ConfigManager, EngineConfig};
pub use crate::core::*;
pub use error::{WorkTimeError, WorkTimeResult};
pub use rewrite::{RewriteStats, TextRewriter};
pub use settings::{
    MemorySettingsStore, SettingsChange, SettingsGateway, SettingsSnapshot, StorageArea,
};
pub use watch::{DomWatcher, LiveDocument};
