//! Domain 模块
//!
//! 路径模型、地址格式、常用模板

pub mod address_format;
pub mod path;
pub mod templates;

// 重新导出常用类型
pub use address_format::{AddressFormat, Network};
pub use path::{parse_index, PathComponent, PathTemplate, ResolvedPath, MAX_INDEX};
pub use templates::{common_templates, DerivationStandard, TemplateEntry};
