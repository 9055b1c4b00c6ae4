//! 常用派生模板
//!
//! 顶层菜单的固定条目（change 固定为 0）：
//! - `m/{change}/{idx}` Classic（仅在未选择账户时显示）
//! - BIP44 `m/44'/coin'/account'/change/{idx}` Classic
//! - BIP49 `m/49'/coin'/account'/change/{idx}` P2SH-P2WPKH
//! - BIP84 `m/84'/coin'/account'/change/{idx}` P2WPKH

use crate::domain::address_format::{AddressFormat, Network};
use crate::domain::path::{PathComponent, PathTemplate};
use crate::error::PathError;

/// 外部链（收款地址）
pub const EXTERNAL_CHAIN: u32 = 0;

/// 模板 + 地址格式，一个菜单条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateEntry {
    pub template: PathTemplate,
    pub format: AddressFormat,
}

/// BIP 派生标准
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationStandard {
    /// BIP44: m/44'/coin_type'/account'/change/index
    Bip44,
    /// BIP49: m/49'/coin_type'/account'/change/index (P2SH-wrapped segwit)
    Bip49,
    /// BIP84: m/84'/coin_type'/account'/change/index (native segwit)
    Bip84,
}

impl DerivationStandard {
    pub fn purpose(&self) -> u32 {
        match self {
            DerivationStandard::Bip44 => 44,
            DerivationStandard::Bip49 => 49,
            DerivationStandard::Bip84 => 84,
        }
    }

    pub fn format(&self) -> AddressFormat {
        match self {
            DerivationStandard::Bip44 => AddressFormat::Classic,
            DerivationStandard::Bip49 => AddressFormat::SegwitWrapped,
            DerivationStandard::Bip84 => AddressFormat::SegwitNative,
        }
    }

    /// 生成范围模板
    pub fn template(
        &self,
        network: Network,
        account: u32,
        change: u32,
    ) -> Result<PathTemplate, PathError> {
        PathTemplate::new(vec![
            PathComponent::hardened(self.purpose())?,
            PathComponent::hardened(network.coin_type())?,
            PathComponent::hardened(account)?,
            PathComponent::index(change)?,
            PathComponent::RangePlaceholder,
        ])
    }
}

/// 顶层菜单条目
///
/// `account` 为 None 时包含无账户的 `m/0/{idx}` 条目，三个 BIP 模板使用账户 0。
pub fn common_templates(
    network: Network,
    account: Option<u32>,
) -> Result<Vec<TemplateEntry>, PathError> {
    let mut entries = Vec::with_capacity(4);

    if account.is_none() {
        entries.push(TemplateEntry {
            template: PathTemplate::new(vec![
                PathComponent::index(EXTERNAL_CHAIN)?,
                PathComponent::RangePlaceholder,
            ])?,
            format: AddressFormat::Classic,
        });
    }

    let account = account.unwrap_or(0);
    for standard in [
        DerivationStandard::Bip44,
        DerivationStandard::Bip49,
        DerivationStandard::Bip84,
    ] {
        entries.push(TemplateEntry {
            template: standard.template(network, account, EXTERNAL_CHAIN)?,
            format: standard.format(),
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_menu_mainnet() {
        let entries = common_templates(Network::Mainnet, None).unwrap();
        let rendered: Vec<_> = entries
            .iter()
            .map(|e| (e.template.to_string(), e.format))
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("m/0/{idx}".to_string(), AddressFormat::Classic),
                ("m/44'/0'/0'/0/{idx}".to_string(), AddressFormat::Classic),
                ("m/49'/0'/0'/0/{idx}".to_string(), AddressFormat::SegwitWrapped),
                ("m/84'/0'/0'/0/{idx}".to_string(), AddressFormat::SegwitNative),
            ]
        );
    }

    #[test]
    fn test_account_menu_testnet() {
        let entries = common_templates(Network::Testnet, Some(9999)).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].template.to_string(), "m/44'/1'/9999'/0/{idx}");
        assert_eq!(entries[2].template.to_string(), "m/84'/1'/9999'/0/{idx}");
        assert!(entries.iter().all(|e| e.template.is_ranging()));
    }

    #[test]
    fn test_account_out_of_range() {
        assert!(matches!(
            common_templates(Network::Mainnet, Some(0x8000_0000)),
            Err(PathError::InvalidIndex(_))
        ));
    }
}
