// 集成测试公共模块
//
// 提供测试辅助工具和共享功能

#![allow(dead_code)]

use std::rc::Rc;

use markup5ever_rcdom::{Handle, NodeData};
use serde_json::{json, Value};

use worktime::parsers::html::{text_descendants, walk_descendants, WalkControl};
use worktime::settings::SettingsValues;
use worktime::{EngineConfig, LiveDocument, MemorySettingsStore, WorkTimeEngine};

/// 从 HTML 字符串创建文档
pub fn document(html: &str) -> LiveDocument {
    LiveDocument::parse(html).expect("HTML 应当可以解析")
}

/// 元素下全部文本拼接后的结果
pub fn text_of(document: &LiveDocument, id: &str) -> String {
    let element = element(document, id);
    text_descendants(&element)
        .iter()
        .map(|node| match &node.data {
            NodeData::Text { contents } => contents.borrow().to_string(),
            _ => String::new(),
        })
        .collect()
}

pub fn element(document: &LiveDocument, id: &str) -> Handle {
    document
        .get_element_by_id(id)
        .unwrap_or_else(|| panic!("找不到 id 为 {} 的元素", id))
}

/// 元素下第一个文本节点
pub fn first_text(document: &LiveDocument, id: &str) -> Handle {
    text_descendants(&element(document, id)).remove(0)
}

/// 查找内容包含 `needle` 的第一个文本节点
pub fn find_text(document: &LiveDocument, needle: &str) -> Option<Handle> {
    let mut found = None;
    walk_descendants(&document.document(), &mut |node| {
        if found.is_none() {
            if let NodeData::Text { contents } = &node.data {
                if contents.borrow().contains(needle) {
                    found = Some(node.clone());
                }
            }
        }
        WalkControl::Continue
    });
    found
}

/// 构建同步区域设置
pub fn settings(pairs: &[(&str, Value)]) -> SettingsValues {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

/// 设置了时薪的英文存储
pub fn store_with_income(income: f64) -> Rc<MemorySettingsStore> {
    Rc::new(MemorySettingsStore::with_values(settings(&[
        ("hourlyIncome", json!(income)),
        ("preferredLanguage", json!("en")),
    ])))
}

/// 使用默认配置挂载引擎
pub fn attach(document: &LiveDocument, store: &Rc<MemorySettingsStore>) -> WorkTimeEngine {
    WorkTimeEngine::attach(document.clone(), store.clone(), &EngineConfig::default())
        .expect("引擎应当可以挂载")
}
