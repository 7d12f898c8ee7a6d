//! HTML 文档元数据
//!
//! 只处理字符编码声明：`<meta charset>` 与
//! `<meta http-equiv="content-type" content="text/html; charset=...">`。

use markup5ever_rcdom::Handle;

use super::dom::{find_nodes, get_node_attr};

/// 获取文档声明的字符编码
pub fn get_charset(node: &Handle) -> Option<String> {
    for meta_node in find_nodes(node, &["html", "head", "meta"]).iter() {
        if let Some(meta_charset_node_attr_value) = get_node_attr(meta_node, "charset") {
            // 处理 <meta charset="..." /> 格式
            return Some(meta_charset_node_attr_value);
        }

        if get_node_attr(meta_node, "http-equiv")
            .unwrap_or_default()
            .eq_ignore_ascii_case("content-type")
        {
            if let Some(meta_content_type_node_attr_value) = get_node_attr(meta_node, "content") {
                return Some(parse_charset(&meta_content_type_node_attr_value));
            }
        }
    }

    None
}

/// 从 Content-Type 值中取出 charset 参数
pub fn parse_charset(content_type: &str) -> String {
    content_type
        .split(';')
        .skip(1)
        .map(str::trim)
        .find_map(|part| {
            let (name, value) = part.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"').to_string())
        })
        .unwrap_or_default()
}
