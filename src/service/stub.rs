//! 菜单摘要 `PREFIX-SUFFIX`
//!
//! 每个菜单项只派生索引 0 的地址一次，截取首尾作为可辨认的指纹。

use crate::domain::address_format::AddressFormat;
use crate::domain::path::PathTemplate;
use crate::error::DerivationError;
use crate::infrastructure::keystore::KeyDerivation;
use crate::service::derivation_engine::DerivationEngine;

pub const DEFAULT_PREFIX_LEN: usize = 8;
pub const DEFAULT_SUFFIX_LEN: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StubComputer {
    prefix_len: usize,
    suffix_len: usize,
}

impl Default for StubComputer {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX_LEN, DEFAULT_SUFFIX_LEN)
    }
}

impl StubComputer {
    pub fn new(prefix_len: usize, suffix_len: usize) -> Self {
        Self {
            prefix_len,
            suffix_len,
        }
    }

    /// 模板在索引 0 处地址的摘要；无占位符的模板直接用其自身路径
    pub fn stub<K: KeyDerivation>(
        &self,
        engine: &DerivationEngine<'_, K>,
        template: &PathTemplate,
        format: AddressFormat,
    ) -> Result<String, DerivationError> {
        let path = if template.is_ranging() {
            template.bind(0)?
        } else {
            template.resolve()?
        };
        let result = engine.derive(&path, format)?;
        Ok(self.abbreviate(&result.address))
    }

    /// 地址都是 ASCII，按字节截取即可；短地址的首尾两段可以重叠
    pub fn abbreviate(&self, address: &str) -> String {
        let len = address.len();
        format!(
            "{}-{}",
            &address[..self.prefix_len.min(len)],
            &address[len.saturating_sub(self.suffix_len)..]
        )
    }
}
