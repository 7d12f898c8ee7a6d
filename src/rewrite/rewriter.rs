//! 文本改写器
//!
//! 对单个文本节点：检查设置 → 本代是否已处理 → 可见性 → 缓存原文 →
//! 匹配并替换金额 → 写回节点。改写始终基于缓存的原文，
//! 因此重复处理和设置变化都不会叠加出 "$5 (…) (…)"。

use markup5ever_rcdom::Handle;

use super::format::{format_work_time, work_hours};
use super::state::{ProcessedSet, TextCache};
use super::visibility::{is_editable, Eligibility, VisibilityClassifier};
use crate::config::EngineConfig;
use crate::error::WorkTimeResult;
use crate::i18n::{MessageCatalog, WorkTimeMessages};
use crate::parsers::currency::CurrencyMatcher;
use crate::parsers::html::{get_node_name, get_text, is_element, text_descendants};
use crate::parsers::number::parse_amount;
use crate::settings::SettingsSnapshot;
use crate::watch::LiveDocument;

/// 处理统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// 写回改写结果的次数
    pub rewritten: usize,
    /// 恢复原文的次数
    pub restored: usize,
    pub skipped_struck_through: usize,
    pub skipped_hidden: usize,
    pub skipped_editable: usize,
    /// 无法解析而保留原样的金额
    pub unparsed: usize,
    /// 完整扫描次数
    pub sweeps: usize,
}

/// 文本改写器
#[derive(Debug)]
pub struct TextRewriter {
    snapshot: SettingsSnapshot,
    catalog: MessageCatalog,
    messages: WorkTimeMessages,
    matcher: CurrencyMatcher,
    classifier: VisibilityClassifier,
    config: EngineConfig,
    cache: TextCache,
    processed: ProcessedSet,
    generation: u64,
    stats: RewriteStats,
}

impl TextRewriter {
    pub fn new(config: &EngineConfig, snapshot: SettingsSnapshot) -> WorkTimeResult<Self> {
        config.validate()?;

        let catalog = config.message_catalog();
        let messages = catalog.resolve(&snapshot.language);

        Ok(Self {
            snapshot,
            catalog,
            messages,
            matcher: CurrencyMatcher::new(&config.currencies)?,
            classifier: VisibilityClassifier::new(),
            config: config.clone(),
            cache: TextCache::new(),
            processed: ProcessedSet::new(),
            generation: 0,
            stats: RewriteStats::default(),
        })
    }

    pub fn snapshot(&self) -> &SettingsSnapshot {
        &self.snapshot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stats(&self) -> RewriteStats {
        self.stats
    }

    pub fn classifier(&self) -> &VisibilityClassifier {
        &self.classifier
    }

    /// 已缓存原文的节点数
    pub fn cached_nodes(&self) -> usize {
        self.cache.len()
    }

    /// 本代已改写的节点数
    pub fn processed_nodes(&self) -> usize {
        self.processed.len()
    }

    /// 是否应当改写：已启用且时薪有效
    pub fn is_active(&self) -> bool {
        self.snapshot.is_active()
    }

    /// 整体替换设置快照并开始新的一代
    pub fn apply_settings(&mut self, snapshot: SettingsSnapshot) {
        self.messages = self.catalog.resolve(&snapshot.language);
        self.snapshot = snapshot;
        self.new_generation();
    }

    /// 清空已处理集合，之前处理过的节点可以被重新考虑
    pub fn new_generation(&mut self) {
        self.generation += 1;
        self.processed = ProcessedSet::new();
        let pruned = self.cache.prune();
        tracing::debug!("开始第 {} 代，清理 {} 条失效缓存", self.generation, pruned);
    }

    /// 重新读取文档中的样式表
    pub fn refresh_styles(&mut self, document: &Handle) {
        self.classifier.refresh(document);
    }

    /// 节点文本被他人改写时，丢弃旧记录并允许重新处理
    ///
    /// 返回是否丢弃了记录。当前文本仍是原文或我们写入的内容时不做任何事。
    pub fn forget_replaced_text(&mut self, node: &Handle) -> bool {
        let Some(current) = get_text(node) else {
            return false;
        };

        let replaced = self
            .cache
            .get(node)
            .map_or(false, |record| !record.owns_text(&current));

        if replaced {
            tracing::trace!("文本节点被外部改写，重新捕获原文");
            self.cache.remove(node);
            self.processed.remove(node);
        }
        replaced
    }

    /// 处理单个文本节点，返回是否写回了新文本
    ///
    /// 原文只在第一次改写前记录一次，之后始终基于它改写。例外：节点当前文本既不是
    /// 原文也不是最近一次写入的内容时，说明页面自己替换了文本，此时丢弃旧原文并以
    /// 当前文本重新记录，恢复时写回的是页面的新文本。
    pub fn process_text_node(&mut self, document: &LiveDocument, node: &Handle) -> bool {
        let Some(hourly_income) = self.active_income() else {
            return false;
        };

        if self.processed.contains(node) {
            return false;
        }

        let Some(current) = get_text(node) else {
            return false;
        };

        match self.classifier.classify(node) {
            Eligibility::Eligible => {}
            reason => {
                tracing::trace!("跳过文本节点: {:?}", reason);
                self.count_skip(reason);
                return false;
            }
        }

        // 当前文本既不是原文也不是我们写入的内容时，原文已过期
        let stale = self
            .cache
            .get(node)
            .map_or(false, |record| !record.owns_text(&current));
        if stale {
            self.cache.remove(node);
        }
        let original = self.cache.capture(node, &current).original.clone();

        let rewritten = self.rewrite_text(&original, hourly_income);
        if rewritten == current {
            return false;
        }

        document.set_text(node, &rewritten);
        self.cache.set_rendered(node, &rewritten);
        self.processed.insert(node);
        self.stats.rewritten += 1;
        tracing::trace!("改写文本节点: {:?} -> {:?}", original, rewritten);
        true
    }

    /// 处理元素下的全部文本节点，返回改写的节点数
    pub fn process_element(&mut self, document: &LiveDocument, element: &Handle) -> usize {
        if !self.is_active() {
            return 0;
        }

        if is_element(element) {
            let name = get_node_name(element).unwrap_or_default();
            if self.config.is_skip_element(name) {
                return 0;
            }
            if is_editable(element) {
                return 0;
            }
        }

        text_descendants(element)
            .iter()
            .filter(|node| self.process_text_node(document, node))
            .count()
    }

    /// 完整扫描：刷新样式表后处理整个文档
    pub fn sweep(&mut self, document: &LiveDocument) -> usize {
        let root = document.document();
        self.refresh_styles(&root);
        self.stats.sweeps += 1;

        let rewritten = self.process_element(document, &root);
        tracing::debug!("完整扫描改写了 {} 个文本节点", rewritten);
        rewritten
    }

    /// 恢复元素下所有被改写的文本，返回恢复的节点数
    ///
    /// 只恢复当前仍是我们写入内容的节点；外部改写过的文本保持不变。
    pub fn restore_original_text(&mut self, document: &LiveDocument, element: &Handle) -> usize {
        let mut restored = 0;

        for node in text_descendants(element) {
            let Some(current) = get_text(&node) else {
                continue;
            };
            let Some(record) = self.cache.get(&node).cloned() else {
                continue;
            };

            if record.original == current {
                continue;
            }

            if record.rendered.as_deref() == Some(current.as_str()) {
                document.set_text(&node, &record.original);
                self.cache.set_rendered(&node, &record.original);
                self.processed.remove(&node);
                restored += 1;
            } else {
                self.cache.remove(&node);
            }
        }

        self.stats.restored += restored;
        if restored > 0 {
            tracing::debug!("恢复了 {} 个文本节点的原文", restored);
        }
        restored
    }

    /// 把文本中的金额替换为 "金额 (工作时长)"，无法解析的金额保留原样
    pub fn rewrite_text(&mut self, text: &str, hourly_income: f64) -> String {
        let messages = &self.messages;
        let mut unparsed = 0;

        let result = self.matcher.replace_all(text, |found| {
            let amount = match parse_amount(&found.amount) {
                Ok(amount) => amount,
                Err(e) => {
                    tracing::debug!("{}", e);
                    unparsed += 1;
                    return None;
                }
            };

            let hours = work_hours(amount, hourly_income).ok()?;
            Some(format!(
                "{}{} ({})",
                found.currency,
                found.amount,
                format_work_time(hours, messages)
            ))
        });

        self.stats.unparsed += unparsed;
        result
    }

    fn active_income(&self) -> Option<f64> {
        if self.snapshot.enabled {
            self.snapshot.effective_income()
        } else {
            None
        }
    }

    fn count_skip(&mut self, reason: Eligibility) {
        match reason {
            Eligibility::StruckThrough => self.stats.skipped_struck_through += 1,
            Eligibility::Hidden => self.stats.skipped_hidden += 1,
            Eligibility::Editable => self.stats.skipped_editable += 1,
            Eligibility::Eligible => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter(income: Option<f64>) -> TextRewriter {
        TextRewriter::new(
            &EngineConfig::default(),
            SettingsSnapshot::new(income, "EUR", "en", true),
        )
        .unwrap()
    }

    fn first_text(document: &LiveDocument, id: &str) -> Handle {
        let element = document.get_element_by_id(id).unwrap();
        text_descendants(&element).remove(0)
    }

    #[test]
    fn test_rewrite_text_keeps_source_order() {
        let mut rewriter = rewriter(Some(10.0));
        assert_eq!(
            rewriter.rewrite_text("Buy now for $50", 10.0),
            "Buy now for $50 (5 h of work)"
        );
        // 金额在前时输出仍是 "货币金额"
        assert_eq!(
            rewriter.rewrite_text("only 15 EUR", 10.0),
            "only EUR15 (1 h and 30 min of work)"
        );
        assert_eq!(rewriter.rewrite_text("no prices", 10.0), "no prices");
    }

    #[test]
    fn test_process_text_node_is_idempotent() {
        let document = LiveDocument::parse("<p id=p>Buy now for $50</p>").unwrap();
        let node = first_text(&document, "p");
        let mut rewriter = rewriter(Some(10.0));

        assert!(rewriter.process_text_node(&document, &node));
        assert!(!rewriter.process_text_node(&document, &node));
        assert_eq!(
            get_text(&node).as_deref(),
            Some("Buy now for $50 (5 h of work)")
        );
        assert_eq!(rewriter.stats().rewritten, 1);
    }

    #[test]
    fn test_unset_income_is_a_no_op() {
        let document = LiveDocument::parse("<p id=p>Buy now for $50</p>").unwrap();
        let node = first_text(&document, "p");

        for income in [None, Some(0.0), Some(-4.0)] {
            let mut rewriter = rewriter(income);
            assert!(!rewriter.process_text_node(&document, &node));
            assert_eq!(rewriter.process_element(&document, &document.document()), 0);
        }
        assert_eq!(get_text(&node).as_deref(), Some("Buy now for $50"));
    }

    #[test]
    fn test_new_generation_rerenders_from_original() {
        let document = LiveDocument::parse("<p id=p>$50</p>").unwrap();
        let node = first_text(&document, "p");
        let mut rewriter = rewriter(Some(10.0));

        rewriter.process_text_node(&document, &node);
        rewriter.apply_settings(SettingsSnapshot::new(Some(100.0), "EUR", "it", true));
        assert_eq!(rewriter.generation(), 1);
        assert!(rewriter.process_text_node(&document, &node));

        assert_eq!(get_text(&node).as_deref(), Some("$50 (30 min di lavoro)"));
    }

    #[test]
    fn test_restore_round_trip() {
        let document =
            LiveDocument::parse("<div id=d><p>$50</p><p>£1.234,50 total</p><p>none</p></div>")
                .unwrap();
        let div = document.get_element_by_id("d").unwrap();
        let mut rewriter = rewriter(Some(10.0));

        assert_eq!(rewriter.process_element(&document, &div), 2);
        rewriter.new_generation();
        rewriter.process_element(&document, &div);

        assert_eq!(rewriter.restore_original_text(&document, &div), 2);
        let texts: Vec<String> = text_descendants(&div).iter().filter_map(get_text).collect();
        assert_eq!(texts, vec!["$50", "£1.234,50 total", "none"]);
        assert_eq!(rewriter.restore_original_text(&document, &div), 0);
    }

    #[test]
    fn test_skip_elements_and_ineligible_nodes() {
        let document = LiveDocument::parse(
            "<div id=d><del>$5</del><span style=\"display:none\">$6</span><p>$7</p></div><pre id=pre>$8</pre><div id=e contenteditable>$9</div>",
        )
        .unwrap();
        let mut rewriter = rewriter(Some(10.0));

        let pre = document.get_element_by_id("pre").unwrap();
        let editable = document.get_element_by_id("e").unwrap();
        assert_eq!(rewriter.process_element(&document, &pre), 0);
        assert_eq!(rewriter.process_element(&document, &editable), 0);

        let div = document.get_element_by_id("d").unwrap();
        assert_eq!(rewriter.process_element(&document, &div), 1);

        let stats = rewriter.stats();
        assert_eq!(stats.skipped_struck_through, 1);
        assert_eq!(stats.skipped_hidden, 1);
    }

    #[test]
    fn test_unparsable_amount_is_left_verbatim() {
        let mut rewriter = rewriter(Some(10.0));
        // 数字模式允许任意多组千位，超出 f64 范围的金额无法解析
        let huge = format!("${}", "1".to_string() + &".000".repeat(110));
        let text = format!("{} or $5", huge);

        assert_eq!(
            rewriter.rewrite_text(&text, 10.0),
            format!("{} or $5 (30 min of work)", huge)
        );
        assert_eq!(rewriter.stats().unparsed, 1);
    }

    #[test]
    fn test_text_replaced_by_host_is_recaptured() {
        let document = LiveDocument::parse("<p id=p>$50</p>").unwrap();
        let node = first_text(&document, "p");
        let mut rewriter = rewriter(Some(10.0));

        rewriter.process_text_node(&document, &node);
        document.set_text(&node, "now $20");
        assert!(rewriter.forget_replaced_text(&node));
        assert!(rewriter.process_text_node(&document, &node));
        assert_eq!(get_text(&node).as_deref(), Some("now $20 (2 h of work)"));

        // 我们自己的写入不会被当作外部改写
        assert!(!rewriter.forget_replaced_text(&node));
        let p = document.get_element_by_id("p").unwrap();
        rewriter.restore_original_text(&document, &p);
        assert_eq!(get_text(&node).as_deref(), Some("now $20"));
    }
}
