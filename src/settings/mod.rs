//! 设置网关
//!
//! 引擎本身从不写入设置，只读取快照并订阅变更。`MemorySettingsStore`
//! 是一个与浏览器扩展存储语义相同的内存实现，用于宿主集成和测试。

pub mod income;
pub mod snapshot;
pub mod store;

pub use income::{hourly_income, IncomeBasis};
pub use snapshot::SettingsSnapshot;
pub use store::{
    MemorySettingsStore, SettingsChange, SettingsGateway, SettingsListener, SettingsValues,
    StorageArea, SubscriptionId, ValueChange,
};

/// 存储中的键名
pub mod keys {
    pub const HOURLY_INCOME: &str = "hourlyIncome";
    pub const PREFERRED_LANGUAGE: &str = "preferredLanguage";
    pub const PREFERRED_CURRENCY: &str = "preferredCurrency";
    pub const EXTENSION_ENABLED: &str = "extensionEnabled";

    /// 变更后需要重新处理页面的键
    pub const CORE_KEYS: &[&str] = &[
        HOURLY_INCOME,
        PREFERRED_LANGUAGE,
        PREFERRED_CURRENCY,
        EXTENSION_ENABLED,
    ];
}
