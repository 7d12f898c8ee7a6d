//! 本地化消息表
//!
//! 为工作时长格式化提供各语言的单位词汇，未知语言回退到默认语言。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::constants;

/// 工作时长字符串所需的词汇
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkTimeMessages {
    /// 小时单位，如 "h"
    pub hours: String,
    /// 分钟单位，如 "min"
    pub minutes: String,
    /// 连接词，如 "and"
    pub and: String,
    /// 结尾短语，如 "of work"
    #[serde(rename = "ofWork", alias = "of_work")]
    pub of_work: String,
}

impl WorkTimeMessages {
    pub fn new(hours: &str, minutes: &str, and: &str, of_work: &str) -> Self {
        Self {
            hours: hours.to_string(),
            minutes: minutes.to_string(),
            and: and.to_string(),
            of_work: of_work.to_string(),
        }
    }

    /// 英语
    pub fn english() -> Self {
        Self::new("h", "min", "and", "of work")
    }

    /// 意大利语
    pub fn italian() -> Self {
        Self::new("ore", "min", "e", "di lavoro")
    }
}

/// 语言代码 → 消息表
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    messages: BTreeMap<String, WorkTimeMessages>,
    fallback: String,
}

impl MessageCatalog {
    /// 只包含内置语言的消息表
    pub fn builtin() -> Self {
        let mut messages = BTreeMap::new();
        messages.insert("en".to_string(), WorkTimeMessages::english());
        messages.insert("it".to_string(), WorkTimeMessages::italian());

        Self {
            messages,
            fallback: constants::FALLBACK_LANGUAGE.to_string(),
        }
    }

    /// 在内置语言之上合并额外的消息
    pub fn with_overrides(
        overrides: &BTreeMap<String, WorkTimeMessages>,
        fallback: &str,
    ) -> Self {
        let mut catalog = Self::builtin();
        for (language, messages) in overrides {
            catalog.insert(language, messages.clone());
        }
        catalog.fallback = normalize_language(fallback);
        catalog
    }

    pub fn insert(&mut self, language: &str, messages: WorkTimeMessages) {
        self.messages.insert(normalize_language(language), messages);
    }

    pub fn contains(&self, language: &str) -> bool {
        self.messages.contains_key(&normalize_language(language))
    }

    pub fn fallback_language(&self) -> &str {
        &self.fallback
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    /// 查找语言的消息，未知语言回退到默认语言
    pub fn resolve(&self, language: &str) -> WorkTimeMessages {
        let code = normalize_language(language);
        if let Some(messages) = self.messages.get(&code) {
            return messages.clone();
        }

        tracing::debug!("语言 '{}' 没有消息表，回退到 '{}'", language, self.fallback);
        self.messages
            .get(&self.fallback)
            .cloned()
            .unwrap_or_else(WorkTimeMessages::english)
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// "it-IT" / "IT_it" → "it"
pub fn normalize_language(language: &str) -> String {
    language
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}
