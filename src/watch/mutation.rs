//! 变更记录与观察选项

use markup5ever_rcdom::Handle;

/// 变更类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// 子节点增删
    ChildList,
    /// 文本内容改变
    CharacterData,
    /// 属性改变
    Attributes,
}

/// 一条变更记录
#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub kind: MutationKind,
    /// 发生变更的节点：子节点变更时为父节点
    pub target: Handle,
    pub added_nodes: Vec<Handle>,
    pub removed_nodes: Vec<Handle>,
    pub attribute_name: Option<String>,
    /// 仅在对应的 *_old_value 选项开启时记录
    pub old_value: Option<String>,
}

impl MutationRecord {
    pub(crate) fn child_list(target: Handle, added: Vec<Handle>, removed: Vec<Handle>) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            added_nodes: added,
            removed_nodes: removed,
            attribute_name: None,
            old_value: None,
        }
    }

    pub(crate) fn character_data(target: Handle, old_value: String) -> Self {
        Self {
            kind: MutationKind::CharacterData,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            attribute_name: None,
            old_value: Some(old_value),
        }
    }

    pub(crate) fn attributes(target: Handle, name: &str, old_value: Option<String>) -> Self {
        Self {
            kind: MutationKind::Attributes,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            attribute_name: Some(name.to_string()),
            old_value,
        }
    }

    /// 按观察选项裁剪旧值
    pub(crate) fn for_options(&self, options: &ObserverOptions) -> Self {
        let mut record = self.clone();
        let keep_old_value = match self.kind {
            MutationKind::ChildList => false,
            MutationKind::CharacterData => options.character_data_old_value,
            MutationKind::Attributes => options.attribute_old_value,
        };
        if !keep_old_value {
            record.old_value = None;
        }
        record
    }
}

/// 观察选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObserverOptions {
    pub child_list: bool,
    pub character_data: bool,
    pub attributes: bool,
    /// 观察整棵子树，而不仅是目标节点
    pub subtree: bool,
    pub character_data_old_value: bool,
    pub attribute_old_value: bool,
}

impl ObserverOptions {
    /// 子树中的全部变更，含旧值
    pub fn all() -> Self {
        Self {
            child_list: true,
            character_data: true,
            attributes: true,
            subtree: true,
            character_data_old_value: true,
            attribute_old_value: true,
        }
    }

    /// 是否关心该类型的记录
    pub fn selects(&self, kind: MutationKind) -> bool {
        match kind {
            MutationKind::ChildList => self.child_list,
            MutationKind::CharacterData => self.character_data,
            MutationKind::Attributes => self.attributes,
        }
    }
}

/// 观察者标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub(crate) u64);
