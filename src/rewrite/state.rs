//! 按节点记录的附加状态
//!
//! 两张以节点地址为键的表：原始文本缓存和本代已处理集合。表中只保存
//! `Weak` 引用，节点的生命周期完全由文档树决定。`Weak` 会保留节点的分配，
//! 因此记录存在期间地址不会被其他节点复用。

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use markup5ever_rcdom::{Handle, Node};

use crate::config::constants;

/// 节点标识：rcdom 节点的地址
pub type NodeKey = usize;

pub fn node_key(node: &Handle) -> NodeKey {
    Rc::as_ptr(node) as usize
}

/// 一个文本节点的缓存记录
#[derive(Debug, Clone)]
pub struct TextRecord {
    node: Weak<Node>,
    /// 第一次改写之前的文本
    pub original: String,
    /// 最近一次写入节点的文本
    pub rendered: Option<String>,
}

impl TextRecord {
    pub fn is_alive(&self) -> bool {
        self.node.strong_count() > 0
    }

    /// 当前文本是否仍是原文或我们写入的内容
    pub fn owns_text(&self, current: &str) -> bool {
        self.original == current || self.rendered.as_deref() == Some(current)
    }
}

/// 原始文本缓存
#[derive(Debug, Default)]
pub struct TextCache {
    records: HashMap<NodeKey, TextRecord>,
    inserts_since_prune: usize,
}

impl TextCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: &Handle) -> Option<&TextRecord> {
        self.records
            .get(&node_key(node))
            .filter(|record| record.is_alive())
    }

    /// 尚无记录时以 `text` 作为原文建立记录；已有记录时保持不变
    pub fn capture(&mut self, node: &Handle, text: &str) -> &TextRecord {
        let key = node_key(node);
        let is_new = !self.records.contains_key(&key);

        if is_new {
            self.inserts_since_prune += 1;
            if self.inserts_since_prune >= constants::PRUNE_INTERVAL {
                self.prune();
            }
        }

        self.records.entry(key).or_insert_with(|| TextRecord {
            node: Rc::downgrade(node),
            original: text.to_string(),
            rendered: None,
        })
    }

    /// 记录最近一次写入的文本
    pub fn set_rendered(&mut self, node: &Handle, text: &str) {
        if let Some(record) = self.records.get_mut(&node_key(node)) {
            record.rendered = Some(text.to_string());
        }
    }

    pub fn remove(&mut self, node: &Handle) -> Option<TextRecord> {
        self.records.remove(&node_key(node))
    }

    /// 删除已失效节点的记录，返回删除数量
    pub fn prune(&mut self) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| record.is_alive());
        self.inserts_since_prune = 0;
        before - self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// 本代已改写的节点集合
#[derive(Debug, Default)]
pub struct ProcessedSet {
    nodes: HashMap<NodeKey, Weak<Node>>,
    inserts_since_prune: usize,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, node: &Handle) -> bool {
        self.nodes
            .get(&node_key(node))
            .map_or(false, |weak| weak.strong_count() > 0)
    }

    /// 返回是否为新加入
    pub fn insert(&mut self, node: &Handle) -> bool {
        self.inserts_since_prune += 1;
        if self.inserts_since_prune >= constants::PRUNE_INTERVAL {
            self.prune();
        }
        self.nodes
            .insert(node_key(node), Rc::downgrade(node))
            .is_none()
    }

    pub fn remove(&mut self, node: &Handle) -> bool {
        self.nodes.remove(&node_key(node)).is_some()
    }

    pub fn prune(&mut self) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|_, weak| weak.strong_count() > 0);
        self.inserts_since_prune = 0;
        before - self.nodes.len()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
