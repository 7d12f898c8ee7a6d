//! 页面动态变化时的改写

mod common;

use common::*;
use worktime::parsers::html::get_text;

#[test]
fn test_inserted_content_is_converted() {
    let doc = document(r#"<div id="list"><p>$10</p></div>"#);
    let store = store_with_income(10.0);
    let engine = attach(&doc, &store);

    let list = element(&doc, "list");
    let item = doc.create_element("p", &[("id", "new")]);
    doc.append_child(&item, &doc.create_text_node("Now only £25"));
    doc.append_child(&list, &item);
    assert_eq!(text_of(&doc, "new"), "Now only £25", "records wait for flush");

    engine.flush();
    assert_eq!(text_of(&doc, "new"), "Now only £25 (2 h and 30 min of work)");
    assert_eq!(engine.stats().rewritten, 2);
}

#[test]
fn test_host_text_change_is_reconverted() {
    let doc = document(r#"<span id="price">$10</span>"#);
    let store = store_with_income(10.0);
    let engine = attach(&doc, &store);
    assert_eq!(text_of(&doc, "price"), "$10 (1 h of work)");

    let node = first_text(&doc, "price");
    doc.set_text(&node, "$20");
    engine.flush();
    assert_eq!(text_of(&doc, "price"), "$20 (2 h of work)");

    // 禁用后恢复的是宿主写入的新原文
    store
        .set(worktime::StorageArea::Sync, "extensionEnabled", serde_json::json!(false))
        .unwrap();
    assert_eq!(get_text(&node).as_deref(), Some("$20"));
}

#[test]
fn test_own_writes_do_not_loop() {
    let doc = document(r#"<p id="t">$10</p>"#);
    let store = store_with_income(10.0);
    let engine = attach(&doc, &store);

    for i in 0..5 {
        let p = doc.create_element("p", &[]);
        doc.append_child(&p, &doc.create_text_node(&format!("${}", i + 1)));
        doc.append_child(&doc.body().unwrap(), &p);
    }
    engine.flush();

    assert_eq!(doc.pending_records(), 0);
    assert_eq!(engine.stats().rewritten, 6);
    assert_eq!(text_of(&doc, "t"), "$10 (1 h of work)");
}

#[test]
fn test_revealed_content_is_converted() {
    let doc = document(r#"<div id="box" style="display:none"><span id="t">$30</span></div>"#);
    let store = store_with_income(10.0);
    let engine = attach(&doc, &store);
    assert_eq!(text_of(&doc, "t"), "$30");

    doc.remove_attribute(&element(&doc, "box"), "style");
    engine.flush();
    assert_eq!(text_of(&doc, "t"), "$30 (3 h of work)");
}

#[test]
fn test_new_stylesheet_is_honoured() {
    let doc = document(
        r#"<html><head><style id="css"></style></head><body><p class="old" id="t">x</p></body></html>"#,
    );
    let store = store_with_income(10.0);
    let engine = attach(&doc, &store);

    let css = element(&doc, "css");
    doc.append_child(&css, &doc.create_text_node(".old { text-decoration: line-through }"));
    let p = element(&doc, "t");
    doc.append_child(&p, &doc.create_text_node(" was $40"));
    engine.flush();

    assert_eq!(text_of(&doc, "t"), "x was $40");
}

#[test]
fn test_removed_nodes_are_ignored() {
    let doc = document(r#"<div id="box"><p id="t">$10</p></div>"#);
    let store = store_with_income(10.0);
    let engine = attach(&doc, &store);

    let p = element(&doc, "t");
    let text = doc.create_text_node(" and $5");
    doc.append_child(&p, &text);
    doc.remove_child(&element(&doc, "box"), &p);
    engine.flush();

    assert_eq!(get_text(&text).as_deref(), Some(" and $5"));
}

#[test]
fn test_detached_engine_ignores_mutations() {
    let doc = document(r#"<div id="box"></div>"#);
    let store = store_with_income(10.0);
    let mut engine = attach(&doc, &store);
    engine.detach();

    doc.append_child(&element(&doc, "box"), &doc.create_text_node("$10"));
    engine.flush();
    assert_eq!(text_of(&doc, "box"), "$10");
}
