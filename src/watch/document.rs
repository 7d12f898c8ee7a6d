//! 可观察的文档
//!
//! `LiveDocument` 包装一棵 rcdom 树并维护观察者注册表。所有需要被观察到的
//! 修改都经由它进行：每次修改为匹配的观察者排队变更记录，
//! `flush_mutations` 再把记录按批投递给回调，直到不再产生新记录。

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use html5ever::interface::{Attribute, QualName};
use html5ever::tendril::{format_tendril, StrTendril};
use html5ever::tree_builder::create_element;
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

use super::mutation::{MutationRecord, ObserverId, ObserverOptions};
use crate::config::constants;
use crate::error::WorkTimeResult;
use crate::parsers::html::{
    get_child_node_by_name, get_node_attr, get_parent_node, html_to_dom, is_inclusive_ancestor,
    serialize_document, set_node_attr, walk_descendants, WalkControl,
};

/// 变更回调：一批记录和产生它们的文档
pub type MutationCallback = Box<dyn FnMut(&[MutationRecord], &LiveDocument)>;

struct Observer {
    id: ObserverId,
    target: Handle,
    options: ObserverOptions,
    callback: Rc<RefCell<MutationCallback>>,
    pending: Vec<MutationRecord>,
}

struct DocumentInner {
    dom: RcDom,
    observers: RefCell<Vec<Observer>>,
    next_observer: Cell<u64>,
    delivering: Cell<bool>,
    max_delivery_rounds: Cell<usize>,
}

/// 可观察的文档句柄，克隆开销很小
#[derive(Clone)]
pub struct LiveDocument {
    inner: Rc<DocumentInner>,
}

impl LiveDocument {
    pub fn new(dom: RcDom) -> Self {
        Self {
            inner: Rc::new(DocumentInner {
                dom,
                observers: RefCell::new(Vec::new()),
                next_observer: Cell::new(0),
                delivering: Cell::new(false),
                max_delivery_rounds: Cell::new(constants::DEFAULT_MAX_DELIVERY_ROUNDS),
            }),
        }
    }

    /// 解析 UTF-8 HTML
    pub fn parse(html: &str) -> WorkTimeResult<Self> {
        Self::from_bytes(html.as_bytes(), "utf-8")
    }

    /// 按给定字符集解析 HTML 字节
    pub fn from_bytes(data: &[u8], encoding: &str) -> WorkTimeResult<Self> {
        Ok(Self::new(html_to_dom(data, encoding)?))
    }

    /// 文档根节点
    pub fn document(&self) -> Handle {
        self.inner.dom.document.clone()
    }

    pub fn dom(&self) -> &RcDom {
        &self.inner.dom
    }

    /// `<body>` 元素
    pub fn body(&self) -> Option<Handle> {
        let html = get_child_node_by_name(&self.inner.dom.document, "html")?;
        get_child_node_by_name(&html, "body")
    }

    /// 按 id 查找元素
    pub fn get_element_by_id(&self, id: &str) -> Option<Handle> {
        let mut found = None;
        walk_descendants(&self.document(), &mut |node| {
            if found.is_some() {
                return WalkControl::SkipChildren;
            }
            if get_node_attr(node, "id").as_deref() == Some(id) {
                found = Some(node.clone());
                return WalkControl::SkipChildren;
            }
            WalkControl::Continue
        });
        found
    }

    pub fn set_max_delivery_rounds(&self, rounds: usize) {
        self.inner.max_delivery_rounds.set(rounds.max(1));
    }

    /// 序列化整个文档
    pub fn serialize(&self, encoding: &str) -> WorkTimeResult<Vec<u8>> {
        serialize_document(&self.inner.dom.document, encoding)
    }

    /// 序列化为 UTF-8 字符串
    pub fn to_html(&self) -> WorkTimeResult<String> {
        let bytes = self.serialize("utf-8")?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    // ---- 节点创建 ----

    /// 创建 HTML 元素（尚未插入文档）
    pub fn create_element(&self, name: &str, attrs: &[(&str, &str)]) -> Handle {
        let attrs = attrs
            .iter()
            .map(|(name, value)| Attribute {
                name: QualName::new(None, ns!(), LocalName::from(*name)),
                value: format_tendril!("{}", value),
            })
            .collect();

        create_element(
            &self.inner.dom,
            QualName::new(None, ns!(html), LocalName::from(name)),
            attrs,
        )
    }

    /// 创建文本节点（尚未插入文档）
    pub fn create_text_node(&self, text: &str) -> Handle {
        Node::new(NodeData::Text {
            contents: RefCell::new(StrTendril::from_slice(text)),
        })
    }

    // ---- 可观察的修改 ----

    /// 追加子节点；节点若已在树中会先被移走
    pub fn append_child(&self, parent: &Handle, child: &Handle) {
        self.insert_before(parent, child, None);
    }

    /// 在 `reference` 之前插入；`reference` 为 None 或不是子节点时追加到末尾
    pub fn insert_before(&self, parent: &Handle, child: &Handle, reference: Option<&Handle>) {
        self.detach(child);

        {
            let mut children = parent.children.borrow_mut();
            let index = reference
                .and_then(|reference| children.iter().position(|c| Rc::ptr_eq(c, reference)))
                .unwrap_or(children.len());
            children.insert(index, child.clone());
        }
        child.parent.set(Some(Rc::downgrade(parent)));

        self.queue(MutationRecord::child_list(
            parent.clone(),
            vec![child.clone()],
            Vec::new(),
        ));
    }

    /// 移除子节点，返回是否确实移除
    pub fn remove_child(&self, parent: &Handle, child: &Handle) -> bool {
        let removed = {
            let mut children = parent.children.borrow_mut();
            match children.iter().position(|c| Rc::ptr_eq(c, child)) {
                Some(index) => {
                    children.remove(index);
                    true
                }
                None => false,
            }
        };

        if removed {
            child.parent.set(None);
            self.queue(MutationRecord::child_list(
                parent.clone(),
                Vec::new(),
                vec![child.clone()],
            ));
        }

        removed
    }

    /// 修改文本节点内容，内容相同时不产生记录
    pub fn set_text(&self, node: &Handle, text: &str) -> bool {
        let NodeData::Text { contents } = &node.data else {
            return false;
        };

        let old_value = contents.borrow().to_string();
        if old_value == text {
            return false;
        }

        *contents.borrow_mut() = StrTendril::from_slice(text);
        self.queue(MutationRecord::character_data(node.clone(), old_value));
        true
    }

    /// 设置属性
    pub fn set_attribute(&self, element: &Handle, name: &str, value: &str) {
        if !matches!(element.data, NodeData::Element { .. }) {
            return;
        }

        let old_value = get_node_attr(element, name);
        set_node_attr(element, name, Some(value.to_string()));
        self.queue(MutationRecord::attributes(element.clone(), name, old_value));
    }

    /// 删除属性，返回属性是否存在
    pub fn remove_attribute(&self, element: &Handle, name: &str) -> bool {
        let Some(old_value) = get_node_attr(element, name) else {
            return false;
        };

        set_node_attr(element, name, None);
        self.queue(MutationRecord::attributes(
            element.clone(),
            name,
            Some(old_value),
        ));
        true
    }

    fn detach(&self, child: &Handle) {
        if let Some(old_parent) = get_parent_node(child) {
            self.remove_child(&old_parent, child);
        }
    }

    // ---- 观察者 ----

    /// 注册观察者
    pub fn observe(
        &self,
        target: &Handle,
        options: ObserverOptions,
        callback: MutationCallback,
    ) -> ObserverId {
        let id = ObserverId(self.inner.next_observer.get());
        self.inner.next_observer.set(id.0 + 1);

        self.inner.observers.borrow_mut().push(Observer {
            id,
            target: target.clone(),
            options,
            callback: Rc::new(RefCell::new(callback)),
            pending: Vec::new(),
        });

        tracing::debug!("注册观察者 {:?}: {:?}", id, options);
        id
    }

    /// 注销观察者，未投递的记录一并丢弃
    pub fn disconnect(&self, id: ObserverId) -> bool {
        let mut observers = self.inner.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|observer| observer.id != id);
        observers.len() != before
    }

    /// 取走观察者尚未投递的记录
    pub fn take_records(&self, id: ObserverId) -> Vec<MutationRecord> {
        self.inner
            .observers
            .borrow_mut()
            .iter_mut()
            .find(|observer| observer.id == id)
            .map(|observer| std::mem::take(&mut observer.pending))
            .unwrap_or_default()
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    /// 所有观察者待投递的记录总数
    pub fn pending_records(&self) -> usize {
        self.inner
            .observers
            .borrow()
            .iter()
            .map(|observer| observer.pending.len())
            .sum()
    }

    fn queue(&self, record: MutationRecord) {
        for observer in self.inner.observers.borrow_mut().iter_mut() {
            if !observer.options.selects(record.kind) {
                continue;
            }

            let in_scope = if observer.options.subtree {
                is_inclusive_ancestor(&observer.target, &record.target)
            } else {
                Rc::ptr_eq(&observer.target, &record.target)
            };

            if in_scope {
                observer.pending.push(record.for_options(&observer.options));
            }
        }
    }

    /// 投递待处理的记录，返回投递的记录数
    ///
    /// 回调中产生的新记录在下一轮投递；超过最大轮数时剩余记录被丢弃。
    /// 在回调内部再次调用时直接返回 0。
    pub fn flush_mutations(&self) -> usize {
        if self.inner.delivering.get() {
            return 0;
        }
        let _guard = DeliveryGuard::enter(&self.inner.delivering);

        let max_rounds = self.inner.max_delivery_rounds.get();
        let mut delivered = 0;
        let mut rounds = 0;

        loop {
            let batches: Vec<(Rc<RefCell<MutationCallback>>, Vec<MutationRecord>)> = self
                .inner
                .observers
                .borrow_mut()
                .iter_mut()
                .filter(|observer| !observer.pending.is_empty())
                .map(|observer| {
                    (
                        observer.callback.clone(),
                        std::mem::take(&mut observer.pending),
                    )
                })
                .collect();

            if batches.is_empty() {
                break;
            }

            if rounds >= max_rounds {
                let dropped: usize = batches.iter().map(|(_, records)| records.len()).sum();
                tracing::warn!(
                    "变更投递超过 {} 轮，丢弃 {} 条记录",
                    max_rounds,
                    dropped
                );
                break;
            }
            rounds += 1;

            for (callback, records) in batches {
                delivered += records.len();
                match callback.try_borrow_mut() {
                    Ok(mut callback) => (*callback)(&records, self),
                    Err(_) => tracing::warn!("观察者回调正在执行，跳过 {} 条记录", records.len()),
                }
            }
        }

        if delivered > 0 {
            tracing::debug!("投递 {} 条变更记录，共 {} 轮", delivered, rounds);
        }
        delivered
    }
}

impl fmt::Debug for LiveDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveDocument")
            .field("observers", &self.observer_count())
            .field("pending_records", &self.pending_records())
            .finish()
    }
}

/// 投递期间置位，回调 panic 时也会复位
struct DeliveryGuard<'a>(&'a Cell<bool>);

impl<'a> DeliveryGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
