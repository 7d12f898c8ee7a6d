use encoding_rs::Encoding;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::error::{WorkTimeError, WorkTimeResult};

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> WorkTimeResult<RcDom> {
    let s: String = if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
        let (string, _, _) = encoding.decode(data);
        string.to_string()
    } else {
        String::from_utf8_lossy(data).to_string()
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
        .map_err(|e| WorkTimeError::IoError(format!("无法解析HTML: {}", e)))
}

/// 查找指定路径的DOM节点
pub fn find_nodes(node: &Handle, node_names: &[&str]) -> Vec<Handle> {
    let mut found_nodes = Vec::new();

    let Some((node_name, rest)) = node_names.split_first() else {
        return found_nodes;
    };

    match get_node_name(node) {
        Some(name) if name == *node_name => {
            if rest.is_empty() {
                found_nodes.push(node.clone());
                for child_node in node.children.borrow().iter() {
                    found_nodes.append(&mut find_nodes(child_node, node_names));
                }
            } else {
                for child_node in node.children.borrow().iter() {
                    found_nodes.append(&mut find_nodes(child_node, rest));
                }
            }
        }
        _ => {
            for child_node in node.children.borrow().iter() {
                found_nodes.append(&mut find_nodes(child_node, node_names));
            }
        }
    }

    found_nodes
}

/// 根据名称获取子节点
pub fn get_child_node_by_name(parent: &Handle, node_name: &str) -> Option<Handle> {
    let children = parent.children.borrow();
    let matching_children = children.iter().find(|child| match child.data {
        NodeData::Element { ref name, .. } => &*name.local == node_name,
        _ => false,
    });
    matching_children.cloned()
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => {
            for attr in attrs.borrow().iter() {
                if &*attr.name.local == attr_name {
                    return Some(attr.value.to_string());
                }
            }
            None
        }
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 获取父节点
///
/// rcdom 把父指针存放在 `Cell` 中，这里取出后立即放回。
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let parent = child.parent.take();
    child.parent.set(parent.clone());
    parent.and_then(|node| node.upgrade())
}

/// 获取文本节点内容
pub fn get_text(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

/// 是否为元素节点
pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

/// 是否为文本节点
pub fn is_text(node: &Handle) -> bool {
    matches!(node.data, NodeData::Text { .. })
}

/// 是否为文档节点
pub fn is_document(node: &Handle) -> bool {
    matches!(node.data, NodeData::Document)
}

/// 设置节点属性
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    use html5ever::interface::{Attribute, QualName};
    use html5ever::tendril::format_tendril;
    use html5ever::{namespace_url, ns, LocalName};

    if let NodeData::Element { attrs, .. } = &node.data {
        let attrs_mut = &mut attrs.borrow_mut();
        let mut i = 0;
        let mut found_existing_attr: bool = false;

        while i < attrs_mut.len() {
            if &attrs_mut[i].name.local == attr_name {
                found_existing_attr = true;

                if let Some(attr_value) = attr_value.clone() {
                    let _ = &attrs_mut[i].value.clear();
                    let _ = &attrs_mut[i].value.push_slice(attr_value.as_str());
                } else {
                    // Remove attr completely if attr_value is not defined
                    attrs_mut.remove(i);
                    continue;
                }
            }

            i += 1;
        }

        if !found_existing_attr {
            // Add new attribute (since originally the target node didn't have it)
            if let Some(attr_value) = attr_value.clone() {
                let name = LocalName::from(attr_name);

                attrs_mut.push(Attribute {
                    name: QualName::new(None, ns!(), name),
                    value: format_tendril!("{}", attr_value),
                });
            }
        }
    };
}
