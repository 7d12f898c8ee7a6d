use std::cell::RefCell;
use std::rc::Rc;

use markup5ever_rcdom::Handle;

use super::document::LiveDocument;
use super::mutation::{MutationKind, MutationRecord, ObserverId, ObserverOptions};
use crate::error::WorkTimeError;
use crate::parsers::html::{
    find_nodes, get_node_name, get_parent_node, is_connected, is_element, is_text,
};
use crate::rewrite::TextRewriter;

/// 文档观察器
///
/// 激活时先完整扫描一次，然后观察整个文档的子节点、文本和属性变更。
pub struct DomWatcher {
    document: LiveDocument,
    rewriter: Rc<RefCell<TextRewriter>>,
    observer: Option<ObserverId>,
}

impl DomWatcher {
    pub fn new(document: LiveDocument, rewriter: Rc<RefCell<TextRewriter>>) -> Self {
        Self {
            document,
            rewriter,
            observer: None,
        }
    }

    /// 初次扫描并开始观察，返回扫描改写的节点数
    pub fn activate(&mut self) -> usize {
        if self.observer.is_some() {
            return 0;
        }

        let rewritten = self.sweep();

        let rewriter = self.rewriter.clone();
        let id = self.document.observe(
            &self.document.document(),
            ObserverOptions::all(),
            Box::new(move |records: &[MutationRecord], document: &LiveDocument| match rewriter.try_borrow_mut() {
                Ok(mut rewriter) => {
                    handle_mutations(&mut rewriter, records, document);
                }
                Err(_) => WorkTimeError::ObserverError(format!(
                    "改写器正忙，丢弃 {} 条变更记录",
                    records.len()
                ))
                .log(),
            }),
        );
        self.observer = Some(id);

        tracing::info!("开始观察文档变更");
        rewritten
    }

    /// 完整扫描整个文档
    pub fn sweep(&self) -> usize {
        match self.rewriter.try_borrow_mut() {
            Ok(mut rewriter) => rewriter.sweep(&self.document),
            Err(_) => {
                WorkTimeError::ObserverError("改写器正忙，跳过完整扫描".to_string()).log();
                0
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.observer.is_some()
    }

    /// 停止观察
    pub fn disconnect(&mut self) -> bool {
        match self.observer.take() {
            Some(id) => {
                tracing::info!("停止观察文档变更");
                self.document.disconnect(id)
            }
            None => false,
        }
    }
}

/// 处理一批变更记录，返回改写的节点数
///
/// 新增元素处理其子树，新增或改变的文本处理该节点，属性变化重新处理该元素。
/// 涉及 `<style>` 的批次会先刷新样式表。
pub fn handle_mutations(
    rewriter: &mut TextRewriter,
    records: &[MutationRecord],
    document: &LiveDocument,
) -> usize {
    let root = document.document();

    if records.iter().any(touches_stylesheet) {
        tracing::debug!("样式表发生变化，重新读取");
        rewriter.refresh_styles(&root);
    }

    let mut rewritten = 0;

    for record in records {
        match record.kind {
            MutationKind::ChildList => {
                for node in &record.added_nodes {
                    // 同一批次中可能已被移除
                    if !is_connected(&root, node) {
                        continue;
                    }
                    if is_element(node) {
                        rewritten += rewriter.process_element(document, node);
                    } else if is_text(node) && rewriter.process_text_node(document, node) {
                        rewritten += 1;
                    }
                }
            }
            MutationKind::CharacterData => {
                if !is_connected(&root, &record.target) {
                    continue;
                }
                rewriter.forget_replaced_text(&record.target);
                if rewriter.process_text_node(document, &record.target) {
                    rewritten += 1;
                }
            }
            MutationKind::Attributes => {
                if is_element(&record.target) && is_connected(&root, &record.target) {
                    rewritten += rewriter.process_element(document, &record.target);
                }
            }
        }
    }

    tracing::debug!("处理 {} 条变更记录，改写 {} 个文本节点", records.len(), rewritten);
    rewritten
}

fn touches_stylesheet(record: &MutationRecord) -> bool {
    let is_style = |node: &Handle| get_node_name(node) == Some("style");
    let contains_style = |node: &Handle| is_style(node) || !find_nodes(node, &["style"]).is_empty();

    match record.kind {
        MutationKind::ChildList => {
            is_style(&record.target)
                || record.added_nodes.iter().any(contains_style)
                || record.removed_nodes.iter().any(contains_style)
        }
        MutationKind::CharacterData => get_parent_node(&record.target)
            .map_or(false, |parent| is_style(&parent)),
        MutationKind::Attributes => is_style(&record.target),
    }
}
