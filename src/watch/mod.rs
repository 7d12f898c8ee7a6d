//! 文档变更观察
//!
//! - `document` - 可观察的文档与变更投递
//! - `mutation` - 变更记录与观察选项
//! - `watcher` - 初次扫描并把变更分派给改写器

pub mod document;
pub mod mutation;
pub mod watcher;

pub use document::{LiveDocument, MutationCallback};
pub use mutation::{MutationKind, MutationRecord, ObserverId, ObserverOptions};
pub use watcher::{handle_mutations, DomWatcher};
