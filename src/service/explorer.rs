//! 地址浏览会话
//!
//! 把菜单、账户选择、分页、导出和自定义路径串在一起。
//! 会话期间借用密钥句柄，退出会话即释放；不缓存任何地址。
//!
//! 地址列表屏幕的按键：`9` 下一页，`7` 上一页，`1` 导出到存储卡，`x` 返回菜单。

use crate::config::ExplorerConfig;
use crate::domain::address_format::{AddressFormat, Network};
use crate::domain::path::{parse_index, PathComponent};
use crate::domain::templates::{common_templates, TemplateEntry};
use crate::error::{ExplorerError, PathError};
use crate::infrastructure::keystore::KeyDerivation;
use crate::infrastructure::storage::RemovableStorage;
use crate::service::derivation_engine::DerivationEngine;
use crate::service::exporter::{ExportSummary, Exporter};
use crate::service::pager::{Screen, Window};
use crate::service::path_builder::CustomSelection;
use crate::service::stub::StubComputer;

pub const CUSTOM_PATH_LABEL: &str = "Custom Path";
pub const ACCOUNT_LABEL: &str = "Account Number";

/// 顶层菜单条目，以地址摘要为标签
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub label: String,
    pub entry: TemplateEntry,
}

/// 地址列表屏幕上的按键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keypress {
    NextPage,
    PreviousPage,
    Export,
    Leave,
}

impl Keypress {
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            '9' => Some(Keypress::NextPage),
            '7' => Some(Keypress::PreviousPage),
            '1' => Some(Keypress::Export),
            'x' | 'X' => Some(Keypress::Leave),
            _ => None,
        }
    }
}

/// 按键处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Screen(Screen),
    Exported(ExportSummary),
    Left,
}

pub struct ExplorerSession<'k, K: KeyDerivation> {
    engine: DerivationEngine<'k, K>,
    stubs: StubComputer,
    page_size: u32,
    export_count: u32,
    account: Option<u32>,
    window: Option<Window>,
}

impl<'k, K: KeyDerivation> ExplorerSession<'k, K> {
    pub fn new(
        engine: DerivationEngine<'k, K>,
        stubs: StubComputer,
        page_size: u32,
        export_count: u32,
    ) -> Self {
        Self {
            engine,
            stubs,
            page_size,
            export_count,
            account: None,
            window: None,
        }
    }

    pub fn from_config(keys: &'k K, config: &ExplorerConfig) -> Self {
        let engine = DerivationEngine::new(keys, config.derivation.network).with_policy(
            config.derivation.invalid_child_policy,
            config.derivation.max_skips,
        );
        let stubs = StubComputer::new(config.display.stub_prefix, config.display.stub_suffix);
        Self::new(engine, stubs, config.display.page_size, config.export.count)
    }

    pub fn network(&self) -> Network {
        self.engine.network()
    }

    pub fn engine(&self) -> &DerivationEngine<'k, K> {
        &self.engine
    }

    pub fn account(&self) -> Option<u32> {
        self.account
    }

    /// 键盘录入的账户号，规则与路径分量相同但不接受硬化标记
    pub fn set_account(&mut self, text: &str) -> Result<(), PathError> {
        let account = match parse_index(text)? {
            PathComponent::Index(value) => value,
            _ => return Err(PathError::InvalidIndex(text.to_string())),
        };
        tracing::info!(account, "account selected");
        self.account = Some(account);
        Ok(())
    }

    pub fn clear_account(&mut self) {
        self.account = None;
    }

    /// 菜单标题行（选择账户后才有）
    pub fn menu_title(&self) -> Option<String> {
        self.account.map(|n| format!("Account: {}", n))
    }

    /// 顶层菜单：每个常用模板一个摘要
    pub fn menu(&self) -> Result<Vec<MenuEntry>, ExplorerError> {
        let entries = common_templates(self.network(), self.account)?;
        let mut menu = Vec::with_capacity(entries.len());
        for entry in entries {
            let label = self.stubs.stub(&self.engine, &entry.template, entry.format)?;
            menu.push(MenuEntry { label, entry });
        }
        tracing::debug!(entries = menu.len(), account = ?self.account, "menu built");
        Ok(menu)
    }

    /// 菜单全部文本行，包括账户与自定义路径入口
    pub fn menu_lines(&self) -> Result<Vec<String>, ExplorerError> {
        let mut lines = Vec::new();
        if let Some(title) = self.menu_title() {
            lines.push(title);
        }
        for item in self.menu()? {
            lines.push(item.label);
        }
        lines.push(ACCOUNT_LABEL.to_string());
        lines.push(CUSTOM_PATH_LABEL.to_string());
        Ok(lines)
    }

    /// 打开一个模板的地址列表，显示第一页
    pub fn open(&mut self, entry: &TemplateEntry) -> Result<Screen, ExplorerError> {
        let window = Window::new(entry.template.clone(), entry.format, self.page_size)?;
        let results = window.render(&self.engine)?;
        let screen = Screen::page(&window, &results, true);
        tracing::info!(template = %entry.template, format = entry.format.as_str(), "address list opened");
        self.window = Some(window);
        Ok(screen)
    }

    /// 打开已通过风险确认的自定义路径
    pub fn open_custom(&mut self, selection: CustomSelection) -> Result<Screen, ExplorerError> {
        if selection.is_single() {
            let path = selection.template().resolve()?;
            let result = self.engine.derive(&path, selection.format())?;
            self.window = None;
            return Ok(Screen::single(&result));
        }
        self.open(&TemplateEntry {
            template: selection.template().clone(),
            format: selection.format(),
        })
    }

    pub fn current_window(&self) -> Option<&Window> {
        self.window.as_ref()
    }

    /// 处理地址列表屏幕上的按键
    pub fn press<S: RemovableStorage>(
        &mut self,
        key: Keypress,
        storage: &mut S,
    ) -> Result<KeyOutcome, ExplorerError> {
        let window = self.window.as_ref().ok_or(ExplorerError::NoActiveWindow)?;

        match key {
            Keypress::NextPage | Keypress::PreviousPage => {
                let moved = if key == Keypress::NextPage {
                    window.forward()
                } else {
                    window.backward()
                };
                let results = moved.render(&self.engine)?;
                let screen = Screen::page(&moved, &results, false);
                tracing::debug!(base_index = moved.base_index(), "page changed");
                self.window = Some(moved);
                Ok(KeyOutcome::Screen(screen))
            }
            Keypress::Export => {
                let summary = Exporter::new(&self.engine).export_to_storage(
                    storage,
                    window.template(),
                    window.format(),
                    self.export_count,
                )?;
                Ok(KeyOutcome::Exported(summary))
            }
            Keypress::Leave => {
                self.window = None;
                Ok(KeyOutcome::Left)
            }
        }
    }

    /// 按字符处理，未定义的键忽略
    pub fn press_key<S: RemovableStorage>(
        &mut self,
        key: char,
        storage: &mut S,
    ) -> Result<Option<KeyOutcome>, ExplorerError> {
        match Keypress::from_key(key) {
            Some(press) => self.press(press, storage).map(Some),
            None => Ok(None),
        }
    }
}

/// 自定义路径的格式菜单
pub fn format_menu() -> Vec<&'static str> {
    AddressFormat::ALL.iter().map(|f| f.label()).collect()
}
