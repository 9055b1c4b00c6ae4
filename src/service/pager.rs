//! 地址分页窗口
//!
//! 在带占位符的模板上维护 `page_size` 个连续索引的视图。
//! 翻页按整页对齐，夹在 `[0, max_base]` 内，永不溢出：
//! `max_base` 是不超过 `2^31-1 - page_size + 1` 的最大 `page_size` 倍数。
//! 每次 `render` 都重新派生，不缓存地址。

use crate::domain::address_format::AddressFormat;
use crate::domain::path::{PathTemplate, MAX_INDEX};
use crate::error::{DerivationError, PathError};
use crate::infrastructure::keystore::KeyDerivation;
use crate::service::derivation_engine::{DerivationEngine, DerivationResult};

/// 默认每页地址数
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// 第一页顶部的按键说明
pub const SCREEN_INSTRUCTIONS: &str = "Press 1 to save to MicroSD. 9/7 to page, x to leave.";

/// 对齐后的最大起始索引
pub fn max_aligned_base(page_size: u32) -> u32 {
    let page = u64::from(page_size.max(1));
    let limit = u64::from(MAX_INDEX) + 1 - page.min(u64::from(MAX_INDEX) + 1);
    // limit <= MAX_INDEX，结果必然落在 u32 内
    ((limit / page) * page) as u32
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    base_index: u32,
    page_size: u32,
    template: PathTemplate,
    format: AddressFormat,
}

impl Window {
    /// 从索引 0 开始的窗口；模板必须带占位符
    pub fn new(
        template: PathTemplate,
        format: AddressFormat,
        page_size: u32,
    ) -> Result<Self, PathError> {
        Self::starting_at(template, format, page_size, 0)
    }

    /// 从 `base_index` 所在的页开始（向下对齐并夹住）
    pub fn starting_at(
        template: PathTemplate,
        format: AddressFormat,
        page_size: u32,
        base_index: u32,
    ) -> Result<Self, PathError> {
        if !template.is_ranging() {
            return Err(PathError::MalformedPath(format!(
                "{} has no range placeholder",
                template
            )));
        }
        if page_size == 0 || page_size > MAX_INDEX {
            return Err(PathError::InvalidIndex(format!("page size {}", page_size)));
        }

        let aligned = base_index - base_index % page_size;
        Ok(Self {
            base_index: aligned.min(max_aligned_base(page_size)),
            page_size,
            template,
            format,
        })
    }

    pub fn base_index(&self) -> u32 {
        self.base_index
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// 本页最后一个索引
    pub fn last_index(&self) -> u32 {
        self.base_index + (self.page_size - 1)
    }

    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    pub fn format(&self) -> AddressFormat {
        self.format
    }

    pub fn max_base(&self) -> u32 {
        max_aligned_base(self.page_size)
    }

    /// 移动 `delta_pages` 页（正数向前，负数向后），越界时夹住
    pub fn advance(&self, delta_pages: i64) -> Window {
        let step = delta_pages.saturating_mul(i64::from(self.page_size));
        let target = i64::from(self.base_index).saturating_add(step);
        let base_index = target.clamp(0, i64::from(self.max_base())) as u32;

        Window {
            base_index,
            ..self.clone()
        }
    }

    pub fn forward(&self) -> Window {
        self.advance(1)
    }

    pub fn backward(&self) -> Window {
        self.advance(-1)
    }

    /// 按索引升序派生本页所有地址
    pub fn render<K: KeyDerivation>(
        &self,
        engine: &DerivationEngine<'_, K>,
    ) -> Result<Vec<DerivationResult>, DerivationError> {
        (0..self.page_size)
            .map(|offset| engine.derive_at(&self.template, self.base_index + offset, self.format))
            .collect()
    }
}

/// 交给显示层的一屏文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub lines: Vec<String>,
}

impl Screen {
    /// 一页地址：索引范围标题，每行 `<path> => <address>`，末尾一个空行；
    /// 会话的第一页在最上方额外带按键说明
    pub fn page(window: &Window, results: &[DerivationResult], first_page: bool) -> Self {
        let mut lines = Vec::with_capacity(results.len() + 5);
        if first_page {
            lines.push(SCREEN_INSTRUCTIONS.to_string());
            lines.push(String::new());
        }
        lines.push(format!(
            "Addresses {}..{}:",
            window.base_index(),
            window.last_index()
        ));
        lines.push(String::new());
        lines.extend(
            results
                .iter()
                .map(|r| format!("{} => {}", r.path, r.address)),
        );
        lines.push(String::new());
        Self { lines }
    }

    /// 单个地址（无占位符的自定义路径）
    pub fn single(result: &DerivationResult) -> Self {
        Self {
            lines: vec![
                "Showing single addr.".to_string(),
                String::new(),
                format!("{} => {}", result.path, result.address),
                String::new(),
            ],
        }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::address_format::Network;
    use crate::service::derivation_engine::tests::abandon_store;
    use proptest::prelude::*;

    fn window() -> Window {
        Window::new(
            "m/84'/0'/0'/0/{idx}".parse().unwrap(),
            AddressFormat::SegwitNative,
            DEFAULT_PAGE_SIZE,
        )
        .unwrap()
    }

    #[test]
    fn test_navigation_sequence() {
        let mut w = window();
        for step in ["forward", "forward", "forward", "backward", "backward", "forward"] {
            w = if step == "forward" { w.forward() } else { w.backward() };
        }
        assert_eq!(w.base_index(), 20);
    }

    #[test]
    fn test_backward_from_zero_is_noop() {
        let w = window();
        assert_eq!(w.backward().base_index(), 0);
        assert_eq!(w.backward().backward().backward().base_index(), 0);
        assert_eq!(w.advance(i64::MIN).base_index(), 0);
    }

    #[test]
    fn test_forward_ten_pages() {
        let mut w = window();
        for _ in 0..10 {
            w = w.forward();
        }
        assert_eq!(w.base_index(), 100);
    }

    #[test]
    fn test_clamped_at_top() {
        let w = window();
        assert_eq!(w.max_base(), 2_147_483_630);

        let top = w.advance(i64::MAX);
        assert_eq!(top.base_index(), 2_147_483_630);
        assert_eq!(top.last_index(), 2_147_483_639);
        assert_eq!(top.forward(), top);
        assert_eq!(top.backward().base_index(), 2_147_483_620);
    }

    #[test]
    fn test_max_aligned_base() {
        assert_eq!(max_aligned_base(10), 2_147_483_630);
        assert_eq!(max_aligned_base(1), MAX_INDEX);
        assert_eq!(max_aligned_base(16), 2_147_483_632);
    }

    #[test]
    fn test_starting_at_aligns_down() {
        let template: PathTemplate = "m/0/{idx}".parse().unwrap();
        let w = Window::starting_at(template.clone(), AddressFormat::Classic, 10, 37).unwrap();
        assert_eq!(w.base_index(), 30);

        let w = Window::starting_at(template, AddressFormat::Classic, 10, MAX_INDEX).unwrap();
        assert_eq!(w.base_index(), 2_147_483_630);
    }

    #[test]
    fn test_requires_ranging_template() {
        let fixed: PathTemplate = "m/0/5".parse().unwrap();
        assert!(matches!(
            Window::new(fixed, AddressFormat::Classic, 10),
            Err(PathError::MalformedPath(_))
        ));
        let ranging: PathTemplate = "m/0/{idx}".parse().unwrap();
        assert!(Window::new(ranging, AddressFormat::Classic, 0).is_err());
    }

    #[test]
    fn test_render_ascending() {
        let store = abandon_store();
        let engine = DerivationEngine::new(&store, Network::Mainnet);
        let w = window().forward();
        let results = w.render(&engine).unwrap();

        assert_eq!(results.len(), 10);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.path.to_string(), format!("m/84'/0'/0'/0/{}", 10 + i));
            assert!(result.address.starts_with("bc1q"));
        }
    }

    #[test]
    fn test_render_top_page_does_not_overflow() {
        let store = abandon_store();
        let engine = DerivationEngine::new(&store, Network::Mainnet);
        let w = Window::new("m/0/{idx}".parse().unwrap(), AddressFormat::Classic, 10)
            .unwrap()
            .advance(i64::MAX);
        let results = w.render(&engine).unwrap();
        assert_eq!(
            results.last().map(|r| r.path.to_string()),
            Some("m/0/2147483639".to_string())
        );
    }

    #[test]
    fn test_screen_layout() {
        let store = abandon_store();
        let engine = DerivationEngine::new(&store, Network::Mainnet);
        let w = window();
        let results = w.render(&engine).unwrap();

        let first = Screen::page(&w, &results, true);
        assert_eq!(first.lines[0], SCREEN_INSTRUCTIONS);
        assert_eq!(first.lines[2], "Addresses 0..9:");
        assert_eq!(first.lines.len(), 4 + 10 + 1);
        assert_eq!(
            first.lines[4],
            "m/84'/0'/0'/0/0 => bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu"
        );
        assert_eq!(first.lines.last().map(String::as_str), Some(""));

        let next = w.forward();
        let results = next.render(&engine).unwrap();
        let later = Screen::page(&next, &results, false);
        assert_eq!(later.lines[0], "Addresses 10..19:");
        assert_eq!(later.lines[1], "");
        assert_eq!(later.lines.len(), 2 + 10 + 1);
        assert!(later.lines[2].starts_with("m/84'/0'/0'/0/10 => "));
        assert!(!later.text().contains(SCREEN_INSTRUCTIONS));
    }

    proptest! {
        #[test]
        fn prop_advance_stays_aligned_and_bounded(
            start in 0u32..=MAX_INDEX,
            moves in proptest::collection::vec(-1_000_000i64..1_000_000, 1..8)
        ) {
            let mut w = Window::starting_at(
                "m/0/{idx}".parse().unwrap(),
                AddressFormat::Classic,
                10,
                start,
            ).unwrap();
            for delta in moves {
                w = w.advance(delta);
                prop_assert_eq!(w.base_index() % 10, 0);
                prop_assert!(w.last_index() <= MAX_INDEX);
            }
        }
    }
}
