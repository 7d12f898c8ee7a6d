//! 文本改写
//!
//! - `format` - 工作时长格式化
//! - `visibility` - 文本节点是否可以转换
//! - `state` - 原文缓存与已处理集合
//! - `rewriter` - 单个节点与整棵子树的改写和恢复

pub mod format;
pub mod rewriter;
pub mod state;
pub mod visibility;

pub use format::{format_work_time, work_hours};
pub use rewriter::{RewriteStats, TextRewriter};
pub use state::{node_key, NodeKey, ProcessedSet, TextCache, TextRecord};
pub use visibility::{ComputedStyle, Eligibility, VisibilityClassifier};
