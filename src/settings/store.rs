use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use serde_json::Value;

use super::keys;
use super::snapshot::SettingsSnapshot;
use crate::config::constants;
use crate::error::{WorkTimeError, WorkTimeResult};

/// 键 → JSON 值
pub type SettingsValues = BTreeMap<String, Value>;

/// 存储区域
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StorageArea {
    /// 跨设备同步的设置
    Sync,
    /// 仅本机
    Local,
}

/// 单个键的新旧值
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChange {
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// 一次变更通知
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsChange {
    pub area: StorageArea,
    pub changes: BTreeMap<String, ValueChange>,
    /// 变更后同步区域的快照
    pub snapshot: SettingsSnapshot,
}

impl SettingsChange {
    /// 是否涉及需要重新处理页面的键
    pub fn touches_core_keys(&self) -> bool {
        keys::CORE_KEYS
            .iter()
            .any(|key| self.changes.contains_key(*key))
    }

    /// 引擎只响应同步区域中核心键的变化
    pub fn is_relevant(&self) -> bool {
        self.area == StorageArea::Sync && self.touches_core_keys()
    }
}

/// 订阅标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type SettingsListener = Box<dyn FnMut(&SettingsChange)>;

/// 设置来源：读取快照并订阅变更
pub trait SettingsGateway {
    /// 当前设置快照
    fn snapshot(&self) -> SettingsSnapshot;

    /// 订阅变更通知
    fn subscribe(&self, listener: SettingsListener) -> SubscriptionId;

    /// 取消订阅，返回订阅是否存在
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

type SharedListener = Rc<RefCell<SettingsListener>>;

/// 内存键值存储，写入后同步通知订阅者
#[derive(Default)]
pub struct MemorySettingsStore {
    areas: RefCell<BTreeMap<StorageArea, SettingsValues>>,
    listeners: RefCell<Vec<(SubscriptionId, SharedListener)>>,
    next_id: Cell<u64>,
    /// 等待通知的变更；回调中写入的设置排在当前通知之后
    queued: RefCell<VecDeque<SettingsChange>>,
    notifying: Cell<bool>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用同步区域的初始值创建
    pub fn with_values(values: SettingsValues) -> Self {
        let store = Self::new();
        store
            .areas
            .borrow_mut()
            .insert(StorageArea::Sync, values);
        store
    }

    /// 读取单个键
    pub fn get(&self, area: StorageArea, key: &str) -> Option<Value> {
        self.areas
            .borrow()
            .get(&area)
            .and_then(|values| values.get(key))
            .cloned()
    }

    /// 读取多个键，缺失的键不出现在结果中
    pub fn get_many(&self, area: StorageArea, keys: &[&str]) -> SettingsValues {
        let areas = self.areas.borrow();
        let Some(values) = areas.get(&area) else {
            return SettingsValues::new();
        };

        keys.iter()
            .filter_map(|key| values.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect()
    }

    /// 写入单个键
    pub fn set(&self, area: StorageArea, key: &str, value: Value) -> WorkTimeResult<()> {
        let mut values = SettingsValues::new();
        values.insert(key.to_string(), value);
        self.set_many(area, values)
    }

    /// 一次写入多个键，只产生一次通知
    pub fn set_many(&self, area: StorageArea, values: SettingsValues) -> WorkTimeResult<()> {
        for (key, value) in &values {
            check_quota(key, value)?;
        }

        let mut changes = BTreeMap::new();
        {
            let mut areas = self.areas.borrow_mut();
            let stored = areas.entry(area).or_default();

            for (key, value) in values {
                let old_value = stored.insert(key.clone(), value.clone());
                if old_value.as_ref() != Some(&value) {
                    changes.insert(
                        key,
                        ValueChange {
                            old_value,
                            new_value: Some(value),
                        },
                    );
                }
            }
        }

        self.notify(area, changes);
        Ok(())
    }

    /// 删除键
    pub fn remove(&self, area: StorageArea, key: &str) -> bool {
        let old_value = self
            .areas
            .borrow_mut()
            .get_mut(&area)
            .and_then(|values| values.remove(key));

        let Some(old_value) = old_value else {
            return false;
        };

        let mut changes = BTreeMap::new();
        changes.insert(
            key.to_string(),
            ValueChange {
                old_value: Some(old_value),
                new_value: None,
            },
        );
        self.notify(area, changes);
        true
    }

    /// 首次安装：时薪初始化为 0（未设置）
    pub fn install_defaults(&self) -> WorkTimeResult<()> {
        if self.get(StorageArea::Sync, keys::HOURLY_INCOME).is_some() {
            return Ok(());
        }

        tracing::info!("首次运行，时薪初始化为0");
        self.set(StorageArea::Sync, keys::HOURLY_INCOME, Value::from(0))
    }

    /// 某个区域的全部键值
    pub fn values(&self, area: StorageArea) -> SettingsValues {
        self.areas
            .borrow()
            .get(&area)
            .cloned()
            .unwrap_or_default()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn notify(&self, area: StorageArea, changes: BTreeMap<String, ValueChange>) {
        if changes.is_empty() {
            return;
        }

        let change = SettingsChange {
            area,
            changes,
            snapshot: self.snapshot(),
        };
        tracing::debug!(
            "设置变更 {:?}: {:?}",
            area,
            change.changes.keys().collect::<Vec<_>>()
        );

        self.queued.borrow_mut().push_back(change);
        if self.notifying.get() {
            return;
        }

        let _guard = NotifyGuard::enter(&self.notifying);
        loop {
            let Some(change) = self.queued.borrow_mut().pop_front() else {
                break;
            };
            self.deliver(&change);
        }
    }

    fn deliver(&self, change: &SettingsChange) {
        // 先复制监听器列表，回调中可以安全地订阅或取消订阅
        let listeners: Vec<SharedListener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            match listener.try_borrow_mut() {
                Ok(mut callback) => (*callback)(change),
                Err(_) => tracing::warn!("监听器仍在执行，跳过本次通知"),
            }
        }
    }
}

impl SettingsGateway for MemorySettingsStore {
    fn snapshot(&self) -> SettingsSnapshot {
        self.areas
            .borrow()
            .get(&StorageArea::Sync)
            .map(SettingsSnapshot::from_values)
            .unwrap_or_default()
    }

    fn subscribe(&self, listener: SettingsListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.listeners
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(listener))));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }
}

/// 通知期间置位，回调 panic 时也会复位
struct NotifyGuard<'a>(&'a Cell<bool>);

impl<'a> NotifyGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for NotifyGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// 单项配额：键长加 JSON 序列化后的值长
fn check_quota(key: &str, value: &Value) -> WorkTimeResult<()> {
    let size = key.len() + serde_json::to_string(value)?.len();
    if size > constants::QUOTA_BYTES_PER_ITEM {
        return Err(WorkTimeError::StorageError(format!(
            "'{}' 超出单项配额: {} > {} 字节",
            key,
            size,
            constants::QUOTA_BYTES_PER_ITEM
        )));
    }
    Ok(())
}
