//! 引擎配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, CurrencyDef, EngineConfig};

/// 配置常量
pub mod constants {
    /// 内置货币表（代码 → 符号），顺序即匹配模式中的顺序
    pub const DEFAULT_CURRENCIES: &[(&str, &str)] =
        &[("USD", "$"), ("EUR", "€"), ("GBP", "£"), ("JPY", "¥")];

    // 设置默认值
    pub const DEFAULT_CURRENCY: &str = "EUR";
    pub const DEFAULT_LANGUAGE: &str = "en";
    pub const FALLBACK_LANGUAGE: &str = "en";

    // 整棵子树都不处理的元素
    pub const SKIP_ELEMENTS: &[&str] = &[
        "script", "style", "noscript", "iframe", "object", "code", "pre", "input", "textarea",
    ];

    // 祖先链中出现即视为可编辑的元素
    pub const EDITABLE_ELEMENTS: &[&str] = &["input", "textarea", "select"];

    // 浏览器默认样式表中 display: none 的元素
    pub const UA_HIDDEN_ELEMENTS: &[&str] = &[
        "head", "script", "style", "template", "noscript", "title", "meta", "link", "base",
    ];

    // 浏览器默认样式表中带删除线的元素
    pub const UA_LINE_THROUGH_ELEMENTS: &[&str] = &["s", "strike", "del"];

    // 单次 flush 中变更投递的最大轮数
    pub const DEFAULT_MAX_DELIVERY_ROUNDS: usize = 16;

    // 每写入多少条记录清理一次失效节点
    pub const PRUNE_INTERVAL: usize = 256;

    // 与 chrome.storage.sync 相同的单项配额（字节）
    pub const QUOTA_BYTES_PER_ITEM: usize = 8192;

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "worktime.toml",
        ".worktime.toml",
        "~/.config/worktime/config.toml",
    ];

    pub const ENV_FILES: &[&str] = &[".env.local", ".env"];
}

/// 加载配置，失败时回退到默认配置
pub fn load_engine_config() -> EngineConfig {
    match ConfigManager::discover() {
        Ok(manager) => manager.into_config(),
        Err(e) => {
            e.with_context("使用默认配置").log();
            EngineConfig::default()
        }
    }
}
