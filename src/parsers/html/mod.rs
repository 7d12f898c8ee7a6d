//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作
//! - `metadata`: 字符编码声明
//! - `serializer`: 序列化功能
//! - `walker`: DOM遍历

pub mod dom;
pub mod metadata;
pub mod serializer;
pub mod walker;

pub use dom::{
    find_nodes, get_child_node_by_name, get_node_attr, get_node_name, get_parent_node, get_text,
    html_to_dom, is_document, is_element, is_text, set_node_attr,
};
pub use metadata::get_charset;
pub use serializer::serialize_document;
pub use walker::{ancestors, is_connected, is_inclusive_ancestor, text_descendants, walk_descendants, WalkControl};
