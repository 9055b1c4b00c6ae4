//! 错误类型
//!
//! 地址浏览器的错误分类：
//! - `PathError`：路径分量解析 / 路径结构校验（录入时立即拒绝）
//! - `KeyStoreError`：外部密钥派生原语上报的失败
//! - `DerivationError`：派生引擎失败（绝不吞掉，绝不显示错误地址）
//! - `ExportError`：可移动存储不可用 / 写入失败
//! - `BuilderError`：自定义路径状态机拒绝的输入

use thiserror::Error;

/// 路径模型错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// 索引文本为空、非数字，或数值超出 [0, 2^31-1]
    #[error("invalid index: {0}")]
    InvalidIndex(String),
    /// 多于一个范围占位符，或占位符不在末尾，或空路径
    #[error("malformed path: {0}")]
    MalformedPath(String),
}

/// 密钥派生原语错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyStoreError {
    /// BIP32 无效子密钥（IL >= n 或子私钥为零），可尝试下一个索引
    #[error("invalid child key at index {index} (hardened: {hardened})")]
    InvalidChild { index: u32, hardened: bool },
    /// 其他原语失败，视为致命
    #[error("key store unavailable: {0}")]
    Unavailable(String),
}

/// 派生引擎错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerivationError {
    #[error("index {0} is outside 0..=2147483647")]
    IndexOutOfRange(u32),
    #[error("invalid child key while deriving {path}")]
    InvalidChild { path: String },
    #[error("no valid child key after {attempts} attempts starting at {path}")]
    RetriesExhausted { path: String, attempts: u32 },
    #[error("key derivation primitive failed: {0}")]
    Primitive(String),
    #[error("address encoding failed: {0}")]
    Encoding(String),
    #[error(transparent)]
    Path(#[from] PathError),
}

/// 导出错误
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("write to storage failed: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Derivation(#[from] DerivationError),
}

/// 自定义路径状态机错误（状态保持不变）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("event {event} is not accepted while {phase}")]
    UnexpectedEvent {
        phase: &'static str,
        event: &'static str,
    },
    #[error("builder already finished")]
    Finished,
}

/// 顶层错误
#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),
    #[error(transparent)]
    Derivation(#[from] DerivationError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Builder(#[from] BuilderError),
    /// 当前没有打开的地址列表（翻页 / 导出键无效）
    #[error("no address list is open")]
    NoActiveWindow,
}

impl ExplorerError {
    /// 是否为录入阶段错误（操作员可直接重试输入）
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ExplorerError::Path(_) | ExplorerError::Builder(_)
        )
    }
}

pub type Result<T, E = ExplorerError> = std::result::Result<T, E>;
