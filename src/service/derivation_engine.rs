//! 派生引擎
//!
//! 给定借用的密钥句柄、已解析路径与地址格式，逐级派生子密钥，
//! 再由末级公钥编码地址。交互显示、菜单摘要和批量导出都走同一个 `derive`。
//!
//! 无效子密钥（BIP32 中 IL >= n 或 k_i == 0）：
//! - 末级分量 + `Skip` 策略：按 BIP32 跳到下一个索引，结果中的路径是实际使用的索引
//! - 中间分量或 `Fail` 策略：返回错误，不产生任何地址

use serde::{Deserialize, Serialize};

use crate::domain::address_format::{AddressFormat, Network};
use crate::domain::path::{PathComponent, PathTemplate, ResolvedPath, MAX_INDEX};
use crate::error::{DerivationError, KeyStoreError};
use crate::infrastructure::keystore::KeyDerivation;

/// 默认最多跳过的无效索引数
pub const DEFAULT_MAX_SKIPS: u32 = 8;

/// 无效子密钥处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidChildPolicy {
    Skip,
    Fail,
}

impl std::str::FromStr for InvalidChildPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(InvalidChildPolicy::Skip),
            "fail" => Ok(InvalidChildPolicy::Fail),
            _ => Err(format!("unknown invalid-child policy: {}", s)),
        }
    }
}

/// 派生结果（不含任何私钥字节）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationResult {
    pub path: ResolvedPath,
    pub address: String,
    pub script_format: AddressFormat,
}

enum Failure {
    FinalInvalidChild,
    Fatal(DerivationError),
}

/// 派生引擎，会话期间借用密钥句柄
pub struct DerivationEngine<'k, K: KeyDerivation> {
    keys: &'k K,
    network: Network,
    policy: InvalidChildPolicy,
    max_skips: u32,
}

impl<'k, K: KeyDerivation> DerivationEngine<'k, K> {
    pub fn new(keys: &'k K, network: Network) -> Self {
        Self {
            keys,
            network,
            policy: InvalidChildPolicy::Skip,
            max_skips: DEFAULT_MAX_SKIPS,
        }
    }

    pub fn with_policy(mut self, policy: InvalidChildPolicy, max_skips: u32) -> Self {
        self.policy = policy;
        self.max_skips = max_skips;
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// 派生单个地址
    pub fn derive(
        &self,
        path: &ResolvedPath,
        format: AddressFormat,
    ) -> Result<DerivationResult, DerivationError> {
        let mut current = path.clone();
        let mut skipped = 0u32;

        loop {
            match self.public_key_for(&current) {
                Ok(public_key) => {
                    let address = format.encode(&public_key, self.network)?;
                    tracing::trace!(path = %current, format = format.as_str(), "address derived");
                    return Ok(DerivationResult {
                        path: current,
                        address,
                        script_format: format,
                    });
                }
                Err(Failure::Fatal(e)) => {
                    tracing::error!(path = %current, error = %e, "derivation failed");
                    return Err(e);
                }
                Err(Failure::FinalInvalidChild) => {
                    if self.policy == InvalidChildPolicy::Fail {
                        return Err(DerivationError::InvalidChild {
                            path: current.to_string(),
                        });
                    }

                    let next = current.last().value().map(|v| v + 1).unwrap_or(u32::MAX);
                    skipped += 1;
                    if skipped > self.max_skips || next > MAX_INDEX {
                        return Err(DerivationError::RetriesExhausted {
                            path: path.to_string(),
                            attempts: skipped,
                        });
                    }

                    tracing::warn!(path = %current, "invalid child key, skipping to next index");
                    current = current.with_last_value(next)?;
                }
            }
        }
    }

    /// 将模板的占位符绑定到 `index` 后派生
    pub fn derive_at(
        &self,
        template: &PathTemplate,
        index: u32,
        format: AddressFormat,
    ) -> Result<DerivationResult, DerivationError> {
        if index > MAX_INDEX {
            return Err(DerivationError::IndexOutOfRange(index));
        }
        let path = template.bind(index)?;
        self.derive(&path, format)
    }

    fn public_key_for(&self, path: &ResolvedPath) -> Result<[u8; 33], Failure> {
        let components = path.components();
        let last = components.len() - 1;
        let mut key: Option<K::Key> = None;

        for (depth, component) in components.iter().enumerate() {
            let (value, hardened) = match *component {
                PathComponent::Index(v) => (v, false),
                PathComponent::HardenedIndex(v) => (v, true),
                PathComponent::RangePlaceholder => {
                    return Err(Failure::Fatal(DerivationError::Primitive(format!(
                        "unbound placeholder in {}",
                        path
                    ))))
                }
            };
            if value > MAX_INDEX {
                return Err(Failure::Fatal(DerivationError::IndexOutOfRange(value)));
            }

            let parent = key.as_ref().unwrap_or_else(|| self.keys.master());
            let child = self
                .keys
                .derive_child(parent, value, hardened)
                .map_err(|e| match e {
                    KeyStoreError::InvalidChild { .. } if depth == last => {
                        Failure::FinalInvalidChild
                    }
                    KeyStoreError::InvalidChild { .. } => {
                        Failure::Fatal(DerivationError::InvalidChild {
                            path: path.to_string(),
                        })
                    }
                    KeyStoreError::Unavailable(msg) => {
                        Failure::Fatal(DerivationError::Primitive(msg))
                    }
                })?;
            key = Some(child);
        }

        let key = key.ok_or_else(|| {
            Failure::Fatal(DerivationError::Primitive("empty path".to_string()))
        })?;
        self.keys
            .public_key(&key)
            .map_err(|e| Failure::Fatal(DerivationError::Primitive(e.to_string())))
    }
}
