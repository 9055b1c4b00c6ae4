//! 自定义路径录入状态机
//!
//! 由数字键盘事件驱动，所有中间状态都在 `CustomPathBuilder` 内部。
//! 非法输入返回错误且状态不变；只有在 `Confirmed`（已接受风险提示）后
//! 才能通过 `into_selection` 取得可派生的路径。
//!
//! ```text
//! Root --Digit--> AwaitingComponent --ConfirmComponent--> AwaitingRangeOrFinalIndex
//!                       ^                                     |  |  |
//!                       +-------------Digit-------------------+  |  |
//! AwaitingComponent / AwaitingRangeOrFinalIndex --ChooseRange--> AwaitingFormat
//! AwaitingRangeOrFinalIndex --Finish--> AwaitingFormat（单地址）
//! AwaitingFormat --SelectFormat--> AwaitingRiskAcceptance --AcceptRisk--> Confirmed
//! 任意非终态 --Cancel--> Cancelled
//! ```

use crate::domain::address_format::AddressFormat;
use crate::domain::path::{parse_index, PathComponent, PathTemplate, MAX_INDEX};
use crate::error::{BuilderError, PathError};

/// 录入阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderPhase {
    Root,
    AwaitingComponent,
    AwaitingRangeOrFinalIndex,
    AwaitingFormat,
    AwaitingRiskAcceptance,
    Confirmed,
    Cancelled,
}

impl BuilderPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuilderPhase::Root => "root",
            BuilderPhase::AwaitingComponent => "awaiting_component",
            BuilderPhase::AwaitingRangeOrFinalIndex => "awaiting_range_or_final_index",
            BuilderPhase::AwaitingFormat => "awaiting_format",
            BuilderPhase::AwaitingRiskAcceptance => "awaiting_risk_acceptance",
            BuilderPhase::Confirmed => "confirmed",
            BuilderPhase::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BuilderPhase::Confirmed | BuilderPhase::Cancelled)
    }
}

/// 键盘事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderEvent {
    Digit(u8),
    Backspace,
    ToggleHardened,
    ConfirmComponent,
    ChooseRange,
    Finish,
    Back,
    SelectFormat(AddressFormat),
    AcceptRisk,
    Cancel,
}

impl BuilderEvent {
    fn name(&self) -> &'static str {
        match self {
            BuilderEvent::Digit(_) => "digit",
            BuilderEvent::Backspace => "backspace",
            BuilderEvent::ToggleHardened => "toggle_hardened",
            BuilderEvent::ConfirmComponent => "confirm_component",
            BuilderEvent::ChooseRange => "choose_range",
            BuilderEvent::Finish => "finish",
            BuilderEvent::Back => "back",
            BuilderEvent::SelectFormat(_) => "select_format",
            BuilderEvent::AcceptRisk => "accept_risk",
            BuilderEvent::Cancel => "cancel",
        }
    }
}

/// 风险提示屏
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskWarning {
    pub title: String,
    pub body: String,
}

/// 录入完成且已接受风险的自定义路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomSelection {
    template: PathTemplate,
    format: AddressFormat,
}

impl CustomSelection {
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    pub fn format(&self) -> AddressFormat {
        self.format
    }

    /// 无占位符，只显示一个地址
    pub fn is_single(&self) -> bool {
        !self.template.is_ranging()
    }
}

#[derive(Debug, Clone)]
pub struct CustomPathBuilder {
    phase: BuilderPhase,
    accumulated: Vec<PathComponent>,
    pending_digits: String,
    pending_hardened: bool,
    format: Option<AddressFormat>,
}

impl Default for CustomPathBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomPathBuilder {
    pub fn new() -> Self {
        Self {
            phase: BuilderPhase::Root,
            accumulated: Vec::new(),
            pending_digits: String::new(),
            pending_hardened: false,
            format: None,
        }
    }

    pub fn phase(&self) -> BuilderPhase {
        self.phase
    }

    pub fn depth(&self) -> usize {
        self.accumulated.len()
    }

    pub fn components(&self) -> &[PathComponent] {
        &self.accumulated
    }

    /// 正在录入的分量文本，如 `12'`
    pub fn pending(&self) -> String {
        if self.pending_hardened {
            format!("{}'", self.pending_digits)
        } else {
            self.pending_digits.clone()
        }
    }

    /// 当前屏幕上显示的路径
    pub fn preview(&self) -> String {
        let mut text = String::from("m");
        for component in &self.accumulated {
            text.push('/');
            text.push_str(&component.to_string());
        }
        if !self.pending_digits.is_empty() {
            text.push('/');
            text.push_str(&self.pending());
        }
        text
    }

    /// 处理一个事件，返回新阶段；出错时状态不变
    pub fn handle(&mut self, event: BuilderEvent) -> Result<BuilderPhase, BuilderError> {
        if self.phase.is_terminal() {
            return Err(BuilderError::Finished);
        }

        match (self.phase, event) {
            (_, BuilderEvent::Cancel) => {
                self.accumulated.clear();
                self.clear_pending();
                self.format = None;
                self.phase = BuilderPhase::Cancelled;
            }

            (
                BuilderPhase::Root
                | BuilderPhase::AwaitingComponent
                | BuilderPhase::AwaitingRangeOrFinalIndex,
                BuilderEvent::Digit(d),
            ) => {
                self.push_digit(d)?;
                self.phase = BuilderPhase::AwaitingComponent;
            }
            (BuilderPhase::AwaitingComponent, BuilderEvent::Backspace) => {
                self.pending_digits.pop();
                if self.pending_digits.is_empty() {
                    self.pending_hardened = false;
                    self.phase = self.idle_phase();
                }
            }
            (BuilderPhase::AwaitingComponent, BuilderEvent::ToggleHardened) => {
                self.pending_hardened = !self.pending_hardened;
            }
            (BuilderPhase::AwaitingComponent, BuilderEvent::ConfirmComponent) => {
                self.commit_pending()?;
                self.phase = BuilderPhase::AwaitingRangeOrFinalIndex;
            }

            (
                BuilderPhase::AwaitingComponent | BuilderPhase::AwaitingRangeOrFinalIndex,
                BuilderEvent::ChooseRange,
            ) => {
                if !self.pending_digits.is_empty() {
                    self.commit_pending()?;
                }
                self.accumulated.push(PathComponent::RangePlaceholder);
                self.phase = BuilderPhase::AwaitingFormat;
            }

            (BuilderPhase::Root, BuilderEvent::Finish) => {
                return Err(PathError::MalformedPath(
                    "path needs at least one component".to_string(),
                )
                .into());
            }
            (BuilderPhase::AwaitingComponent, BuilderEvent::Finish) => {
                self.commit_pending()?;
                self.phase = BuilderPhase::AwaitingFormat;
            }
            (BuilderPhase::AwaitingRangeOrFinalIndex, BuilderEvent::Finish) => {
                self.phase = BuilderPhase::AwaitingFormat;
            }

            (
                BuilderPhase::AwaitingComponent | BuilderPhase::AwaitingRangeOrFinalIndex,
                BuilderEvent::Back,
            ) => {
                // 先丢弃正在录入的分量，再回退上一级
                if self.pending_digits.is_empty() {
                    self.accumulated.pop();
                }
                self.clear_pending();
                self.phase = self.idle_phase();
            }
            (BuilderPhase::AwaitingFormat, BuilderEvent::Back) => {
                if self.accumulated.last() == Some(&PathComponent::RangePlaceholder) {
                    self.accumulated.pop();
                }
                self.phase = self.idle_phase();
            }

            (BuilderPhase::AwaitingFormat, BuilderEvent::SelectFormat(format)) => {
                // 占位符只能在末尾且至多一个，这里最后确认一次
                PathTemplate::new(self.accumulated.clone())?;
                self.format = Some(format);
                self.phase = BuilderPhase::AwaitingRiskAcceptance;
            }
            (BuilderPhase::AwaitingRiskAcceptance, BuilderEvent::Back) => {
                self.format = None;
                self.phase = BuilderPhase::AwaitingFormat;
            }
            (BuilderPhase::AwaitingRiskAcceptance, BuilderEvent::AcceptRisk) => {
                tracing::info!(path = %self.preview(), "custom path risk accepted");
                self.phase = BuilderPhase::Confirmed;
            }

            (phase, event) => {
                return Err(BuilderError::UnexpectedEvent {
                    phase: phase.as_str(),
                    event: event.name(),
                })
            }
        }

        Ok(self.phase)
    }

    /// 依次处理多个事件，遇到第一个错误即停止
    pub fn handle_all(
        &mut self,
        events: impl IntoIterator<Item = BuilderEvent>,
    ) -> Result<BuilderPhase, BuilderError> {
        for event in events {
            self.handle(event)?;
        }
        Ok(self.phase)
    }

    /// 风险提示，只在等待确认时存在
    pub fn risk_warning(&self) -> Option<RiskWarning> {
        if self.phase != BuilderPhase::AwaitingRiskAcceptance {
            return None;
        }
        let path = self.preview();
        Some(RiskWarning {
            title: "DANGER".to_string(),
            body: format!(
                "You have entered a non-standard derivation path:\n\n{}\n\n\
                 DO NOT DEPOSIT to addresses on this path unless you are certain \
                 you can reproduce it to spend the funds later.\n\n\
                 Accept the risk to continue.",
                path
            ),
        })
    }

    /// 消费状态机，取出已确认的选择
    pub fn into_selection(self) -> Result<CustomSelection, BuilderError> {
        match (self.phase, self.format) {
            (BuilderPhase::Confirmed, Some(format)) => Ok(CustomSelection {
                template: PathTemplate::new(self.accumulated)?,
                format,
            }),
            (phase, _) => Err(BuilderError::UnexpectedEvent {
                phase: phase.as_str(),
                event: "into_selection",
            }),
        }
    }

    fn idle_phase(&self) -> BuilderPhase {
        if self.accumulated.is_empty() {
            BuilderPhase::Root
        } else {
            BuilderPhase::AwaitingRangeOrFinalIndex
        }
    }

    fn clear_pending(&mut self) {
        self.pending_digits.clear();
        self.pending_hardened = false;
    }

    fn push_digit(&mut self, digit: u8) -> Result<(), BuilderError> {
        if digit > 9 {
            return Err(PathError::InvalidIndex(format!("key {} is not a digit", digit)).into());
        }
        let mut candidate = self.pending_digits.clone();
        candidate.push(char::from(b'0' + digit));
        parse_index(&candidate)?;
        if candidate.len() > MAX_INDEX.to_string().len() {
            return Err(PathError::InvalidIndex(candidate).into());
        }
        self.pending_digits = candidate;
        Ok(())
    }

    fn commit_pending(&mut self) -> Result<(), BuilderError> {
        let component = parse_index(&self.pending())?;
        self.accumulated.push(component);
        self.clear_pending();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::address_format::Network;
    use crate::service::derivation_engine::tests::abandon_store;
    use crate::service::derivation_engine::DerivationEngine;
    use super::BuilderEvent::*;

    fn digits(text: &str) -> Vec<BuilderEvent> {
        text.bytes().map(|b| Digit(b - b'0')).collect()
    }

    #[test]
    fn test_hardened_then_range() {
        let mut builder = CustomPathBuilder::new();
        builder.handle(Digit(1)).unwrap();
        builder.handle(ToggleHardened).unwrap();
        builder.handle(ConfirmComponent).unwrap();
        assert_eq!(builder.handle(ChooseRange).unwrap(), BuilderPhase::AwaitingFormat);
        builder.handle(SelectFormat(AddressFormat::Classic)).unwrap();
        builder.handle(AcceptRisk).unwrap();

        let selection = builder.into_selection().unwrap();
        assert_eq!(
            selection.template().components(),
            &[PathComponent::HardenedIndex(1), PathComponent::RangePlaceholder]
        );
        assert!(!selection.is_single());

        let store = abandon_store();
        let engine = DerivationEngine::new(&store, Network::Mainnet);
        let via_builder = engine
            .derive_at(selection.template(), 0, selection.format())
            .unwrap();
        let direct = engine
            .derive(&"m/1'/0".parse().unwrap(), AddressFormat::Classic)
            .unwrap();
        assert_eq!(via_builder, direct);
    }

    #[test]
    fn test_single_address_path() {
        let mut builder = CustomPathBuilder::new();
        builder.handle_all(digits("44")).unwrap();
        builder.handle_all([ToggleHardened, ConfirmComponent]).unwrap();
        builder.handle_all(digits("2147483647")).unwrap();
        builder.handle(Finish).unwrap();
        builder.handle(SelectFormat(AddressFormat::SegwitNative)).unwrap();
        builder.handle(AcceptRisk).unwrap();

        let selection = builder.into_selection().unwrap();
        assert!(selection.is_single());
        assert_eq!(selection.template().to_string(), "m/44'/2147483647");
    }

    #[test]
    fn test_empty_path_rejected() {
        let mut builder = CustomPathBuilder::new();
        assert!(matches!(
            builder.handle(Finish),
            Err(BuilderError::Path(PathError::MalformedPath(_)))
        ));
        assert_eq!(builder.phase(), BuilderPhase::Root);
    }

    #[test]
    fn test_out_of_range_digit_leaves_state_unchanged() {
        let mut builder = CustomPathBuilder::new();
        builder.handle_all(digits("214748364")).unwrap();
        assert!(matches!(
            builder.handle(Digit(8)),
            Err(BuilderError::Path(PathError::InvalidIndex(_)))
        ));
        assert_eq!(builder.pending(), "214748364");
        builder.handle(Digit(7)).unwrap();
        assert_eq!(builder.pending(), "2147483647");

        assert!(builder.handle(Digit(12)).is_err());
        assert_eq!(builder.pending(), "2147483647");
    }

    #[test]
    fn test_back_pops_components() {
        let mut builder = CustomPathBuilder::new();
        builder.handle_all(digits("1")).unwrap();
        builder.handle(ConfirmComponent).unwrap();
        builder.handle_all(digits("2")).unwrap();
        builder.handle(ConfirmComponent).unwrap();
        assert_eq!(builder.preview(), "m/1/2");

        builder.handle(Back).unwrap();
        assert_eq!(builder.preview(), "m/1");
        assert_eq!(builder.phase(), BuilderPhase::AwaitingRangeOrFinalIndex);

        builder.handle(Back).unwrap();
        assert_eq!(builder.phase(), BuilderPhase::Root);
        assert_eq!(builder.depth(), 0);
    }

    #[test]
    fn test_back_from_format_removes_placeholder() {
        let mut builder = CustomPathBuilder::new();
        builder.handle_all(digits("0")).unwrap();
        builder.handle(ChooseRange).unwrap();
        assert_eq!(builder.preview(), "m/0/{idx}");

        builder.handle(Back).unwrap();
        assert_eq!(builder.preview(), "m/0");
        assert_eq!(builder.phase(), BuilderPhase::AwaitingRangeOrFinalIndex);

        // 不会出现第二个占位符
        builder.handle(ChooseRange).unwrap();
        assert_eq!(builder.preview(), "m/0/{idx}");
        assert!(matches!(
            builder.handle(ChooseRange),
            Err(BuilderError::UnexpectedEvent { .. })
        ));
    }

    #[test]
    fn test_backspace() {
        let mut builder = CustomPathBuilder::new();
        builder.handle_all(digits("12")).unwrap();
        builder.handle(Backspace).unwrap();
        assert_eq!(builder.pending(), "1");
        builder.handle(Backspace).unwrap();
        assert_eq!(builder.phase(), BuilderPhase::Root);
    }

    #[test]
    fn test_risk_gate_is_mandatory() {
        let mut builder = CustomPathBuilder::new();
        builder.handle_all(digits("7")).unwrap();
        builder.handle_all([ToggleHardened, ChooseRange]).unwrap();
        assert!(builder.risk_warning().is_none());
        builder.handle(SelectFormat(AddressFormat::SegwitWrapped)).unwrap();

        let warning = builder.risk_warning().unwrap();
        assert_eq!(warning.title, "DANGER");
        assert!(warning.body.contains("DO NOT DEPOSIT"));
        assert!(warning.body.contains("m/7'/{idx}"));

        assert!(builder.clone().into_selection().is_err());
        assert!(matches!(
            builder.handle(ConfirmComponent),
            Err(BuilderError::UnexpectedEvent { .. })
        ));
        assert_eq!(builder.phase(), BuilderPhase::AwaitingRiskAcceptance);
    }

    #[test]
    fn test_cancel_discards_everything() {
        let mut builder = CustomPathBuilder::new();
        builder.handle_all(digits("5")).unwrap();
        builder.handle(ConfirmComponent).unwrap();
        assert_eq!(builder.handle(Cancel).unwrap(), BuilderPhase::Cancelled);
        assert_eq!(builder.depth(), 0);
        assert_eq!(builder.handle(Digit(1)), Err(BuilderError::Finished));
        assert!(builder.into_selection().is_err());
    }

    #[test]
    fn test_confirm_without_digits_rejected() {
        let mut builder = CustomPathBuilder::new();
        builder.handle_all(digits("3")).unwrap();
        builder.handle(ConfirmComponent).unwrap();
        assert!(matches!(
            builder.handle(ConfirmComponent),
            Err(BuilderError::UnexpectedEvent { .. })
        ));
        assert!(matches!(
            builder.handle(ToggleHardened),
            Err(BuilderError::UnexpectedEvent { .. })
        ));
    }
}
