//! 引擎
//!
//! 把设置来源、改写器和文档观察器组装在一起：挂载时完整扫描一次并开始观察，
//! 之后每次相关设置变化都会开始新的一代，再重新扫描或恢复原文。

use std::cell::RefCell;
use std::rc::Rc;

use encoding_rs::Encoding;
use tracing::Level;

use crate::config::EngineConfig;
use crate::env::{self, EnvVar};
use crate::error::{WorkTimeError, WorkTimeResult};
use crate::parsers::html::{get_charset, html_to_dom};
use crate::rewrite::{RewriteStats, TextRewriter};
use crate::settings::{SettingsChange, SettingsGateway, SettingsSnapshot, SubscriptionId};
use crate::watch::{DomWatcher, LiveDocument};

/// 挂载在一个文档上的改写引擎
pub struct WorkTimeEngine {
    document: LiveDocument,
    gateway: Rc<dyn SettingsGateway>,
    rewriter: Rc<RefCell<TextRewriter>>,
    watcher: DomWatcher,
    subscription: Option<SubscriptionId>,
}

impl WorkTimeEngine {
    /// 读取设置、订阅变更并激活观察器
    pub fn attach(
        document: LiveDocument,
        gateway: Rc<dyn SettingsGateway>,
        config: &EngineConfig,
    ) -> WorkTimeResult<Self> {
        let snapshot = gateway.snapshot();
        tracing::info!(
            "挂载引擎: 语言 {}, 货币 {}, 启用 {}, 时薪 {:?}",
            snapshot.language,
            snapshot.currency,
            snapshot.enabled,
            snapshot.effective_income()
        );

        document.set_max_delivery_rounds(config.max_delivery_rounds);
        let rewriter = Rc::new(RefCell::new(TextRewriter::new(config, snapshot)?));

        let listener_rewriter = rewriter.clone();
        let listener_document = document.clone();
        let subscription = gateway.subscribe(Box::new(move |change: &SettingsChange| {
            on_settings_changed(&listener_rewriter, &listener_document, change);
        }));

        let mut watcher = DomWatcher::new(document.clone(), rewriter.clone());
        let rewritten = watcher.activate();
        tracing::debug!("初次扫描改写了 {} 个文本节点", rewritten);

        Ok(Self {
            document,
            gateway,
            rewriter,
            watcher,
            subscription: Some(subscription),
        })
    }

    /// 取消订阅并停止观察，可以重复调用
    pub fn detach(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.gateway.unsubscribe(id);
            tracing::info!("引擎已卸载");
        }
        self.watcher.disconnect();
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn document(&self) -> &LiveDocument {
        &self.document
    }

    /// 投递所有排队的变更记录
    pub fn flush(&self) {
        self.document.flush_mutations();
    }

    pub fn stats(&self) -> RewriteStats {
        self.rewriter.borrow().stats()
    }

    pub fn generation(&self) -> u64 {
        self.rewriter.borrow().generation()
    }

    pub fn snapshot(&self) -> SettingsSnapshot {
        self.rewriter.borrow().snapshot().clone()
    }

    /// 当前设置下是否在改写
    pub fn is_active(&self) -> bool {
        self.rewriter.borrow().is_active()
    }
}

impl Drop for WorkTimeEngine {
    fn drop(&mut self) {
        self.detach();
    }
}

fn on_settings_changed(
    rewriter: &Rc<RefCell<TextRewriter>>,
    document: &LiveDocument,
    change: &SettingsChange,
) {
    if !change.is_relevant() {
        tracing::trace!("忽略无关的设置变更: {:?}", change.area);
        return;
    }

    {
        let Ok(mut rewriter) = rewriter.try_borrow_mut() else {
            tracing::warn!("改写器正忙，忽略本次设置变更");
            return;
        };

        rewriter.apply_settings(change.snapshot.clone());
        if rewriter.is_active() {
            let rewritten = rewriter.sweep(document);
            tracing::info!("设置已更新，重新改写了 {} 个文本节点", rewritten);
        } else {
            let restored = rewriter.restore_original_text(document, &document.document());
            tracing::info!("转换已停用，恢复了 {} 个文本节点", restored);
        }
    }

    // 改写产生的记录在这里投递；节点已在本代处理过，不会再次改写
    document.flush_mutations();
}

/// 一次性转换：解析 HTML、改写金额、按文档字符集序列化
///
/// `encoding` 为空时按 UTF-8 解析；文档内声明了有效字符集时以声明为准。
pub fn convert_html(
    data: &[u8],
    encoding: Option<&str>,
    snapshot: SettingsSnapshot,
    config: &EngineConfig,
) -> WorkTimeResult<Vec<u8>> {
    let mut document_encoding = encoding.unwrap_or("utf-8").to_string();
    let mut dom = html_to_dom(data, &document_encoding).inspect_err(WorkTimeError::log)?;

    if let Some(html_charset) = get_charset(&dom.document) {
        if !html_charset.is_empty() {
            if let Some(charset) = Encoding::for_label_no_replacement(html_charset.as_bytes()) {
                document_encoding = charset.name().to_string();
                dom = html_to_dom(data, &document_encoding).inspect_err(WorkTimeError::log)?;
            }
        }
    }

    let document = LiveDocument::new(dom);
    let mut rewriter = TextRewriter::new(config, snapshot).inspect_err(WorkTimeError::log)?;
    let rewritten = rewriter.sweep(&document);
    tracing::debug!("转换完成，改写了 {} 个文本节点", rewritten);

    document
        .serialize(&document_encoding)
        .inspect_err(WorkTimeError::log)
}

/// 安装 fmt 日志订阅者，重复调用无副作用
pub fn init_logging() {
    let level = env::core::LogLevel::get_or_default("info".to_string())
        .parse::<Level>()
        .unwrap_or(Level::INFO);
    let no_color = env::core::NoColor::get_or_default(false);

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(!no_color)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{MemorySettingsStore, SettingsValues, StorageArea};
    use serde_json::json;

    fn store(income: f64) -> Rc<MemorySettingsStore> {
        let mut values = SettingsValues::new();
        values.insert("hourlyIncome".to_string(), json!(income));
        values.insert("preferredLanguage".to_string(), json!("en"));
        Rc::new(MemorySettingsStore::with_values(values))
    }

    fn text_of(document: &LiveDocument, id: &str) -> String {
        let element = document.get_element_by_id(id).unwrap();
        crate::parsers::html::text_descendants(&element)
            .iter()
            .filter_map(crate::parsers::html::get_text)
            .collect()
    }

    #[test]
    fn test_attach_sweeps_document() {
        let document = LiveDocument::parse("<p id=t>Buy now for $50</p>").unwrap();
        let engine =
            WorkTimeEngine::attach(document.clone(), store(10.0), &EngineConfig::default()).unwrap();

        assert_eq!(text_of(&document, "t"), "Buy now for $50 (5 h of work)");
        assert!(engine.is_attached());
        assert!(engine.is_active());
        assert_eq!(engine.stats().rewritten, 1);
    }

    #[test]
    fn test_disable_restores_and_enable_rewrites() {
        let document = LiveDocument::parse("<p id=t>$50</p>").unwrap();
        let gateway = store(10.0);
        let engine =
            WorkTimeEngine::attach(document.clone(), gateway.clone(), &EngineConfig::default())
                .unwrap();

        gateway
            .set(StorageArea::Sync, "extensionEnabled", json!(false))
            .unwrap();
        assert_eq!(text_of(&document, "t"), "$50");
        assert!(!engine.is_active());

        gateway
            .set(StorageArea::Sync, "extensionEnabled", json!(true))
            .unwrap();
        assert_eq!(text_of(&document, "t"), "$50 (5 h of work)");
        assert_eq!(engine.generation(), 2);
    }

    #[test]
    fn test_detach_stops_reacting() {
        let document = LiveDocument::parse("<p id=t>$50</p>").unwrap();
        let gateway = store(10.0);
        let mut engine =
            WorkTimeEngine::attach(document.clone(), gateway.clone(), &EngineConfig::default())
                .unwrap();

        engine.detach();
        engine.detach();
        assert_eq!(gateway.listener_count(), 0);
        assert_eq!(document.observer_count(), 0);

        gateway.set(StorageArea::Sync, "hourlyIncome", json!(25)).unwrap();
        assert_eq!(text_of(&document, "t"), "$50 (5 h of work)");
    }

    #[test]
    fn test_drop_unsubscribes() {
        let document = LiveDocument::parse("<p>$5</p>").unwrap();
        let gateway = store(10.0);
        {
            let _engine =
                WorkTimeEngine::attach(document.clone(), gateway.clone(), &EngineConfig::default())
                    .unwrap();
            assert_eq!(gateway.listener_count(), 1);
        }
        assert_eq!(gateway.listener_count(), 0);
    }

    #[test]
    fn test_convert_html() {
        let snapshot = SettingsSnapshot::new(Some(10.0), "USD", "en", true);
        let output = convert_html(
            b"<html><body><p>Total: $50</p></body></html>",
            None,
            snapshot,
            &EngineConfig::default(),
        )
        .unwrap();
        let html = String::from_utf8(output).unwrap();
        assert!(html.contains("Total: $50 (5 h of work)"), "{}", html);
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging();
        init_logging();
    }
}
