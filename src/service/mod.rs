pub mod derivation_engine; // 派生引擎：路径 -> 地址
pub mod explorer; // 会话：菜单、账户、翻页、导出、自定义路径
pub mod exporter; // 批量导出 CSV
pub mod pager; // 窗口翻页
pub mod path_builder; // 自定义路径状态机
pub mod stub; // 菜单摘要

pub use derivation_engine::{DerivationEngine, DerivationResult, InvalidChildPolicy};
pub use explorer::{format_menu, ExplorerSession, KeyOutcome, Keypress, MenuEntry};
pub use exporter::{write_csv, ExportRow, ExportSummary, Exporter};
pub use pager::{Screen, Window, SCREEN_INSTRUCTIONS};
pub use path_builder::{
    BuilderEvent, BuilderPhase, CustomPathBuilder, CustomSelection, RiskWarning,
};
pub use stub::StubComputer;
