//! Address Explorer - 硬件钱包地址浏览核心
//!
//! 路径模型、BIP32 派生、三种地址编码、分页浏览、自定义路径录入与 CSV 导出。
//! 核心只借用密钥句柄，不持久化任何私钥材料。

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;

// 重新导出常用类型
pub use config::ExplorerConfig;
pub use error::{ExplorerError, Result};

// 统一模块导出
pub mod prelude {
    pub use crate::{
        config::ExplorerConfig,
        domain::{AddressFormat, Network, PathComponent, PathTemplate, ResolvedPath},
        error::{DerivationError, ExplorerError, ExportError, PathError},
        infrastructure::{DirectoryStorage, KeyDerivation, RemovableStorage, SoftwareKeyStore},
        service::{
            BuilderEvent, CustomPathBuilder, DerivationEngine, ExplorerSession, Exporter,
            StubComputer, Window,
        },
    };
}
