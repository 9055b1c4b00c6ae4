//! 地址格式与网络
//!
//! 三种脚本类型，使用 bitcoin crate 编码：
//! - Classic (P2PKH): base58check(version ++ hash160(pubkey))
//! - SegwitNative (P2WPKH): bech32(hrp, v0, hash160(pubkey))
//! - SegwitWrapped (P2SH-P2WPKH): base58check(p2sh_version ++ hash160(OP_0 PUSH20 hash160(pubkey)))

use std::fmt;
use std::str::FromStr;

use bitcoin::{Address, PublicKey};
use serde::{Deserialize, Serialize};

use crate::error::DerivationError;

/// 地址格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressFormat {
    /// P2PKH，主网 1xxx / 测试网 m、n 开头
    Classic,
    /// P2WPKH，bc1q / tb1q 开头
    SegwitNative,
    /// P2SH-P2WPKH，主网 3xxx / 测试网 2 开头
    SegwitWrapped,
}

impl AddressFormat {
    /// 格式菜单的顺序
    pub const ALL: [AddressFormat; 3] = [
        AddressFormat::Classic,
        AddressFormat::SegwitNative,
        AddressFormat::SegwitWrapped,
    ];

    /// 菜单标签
    pub fn label(&self) -> &'static str {
        match self {
            AddressFormat::Classic => "Classic P2PKH",
            AddressFormat::SegwitNative => "Segwit P2WPKH",
            AddressFormat::SegwitWrapped => "P2SH-P2WPKH",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AddressFormat::Classic => "classic",
            AddressFormat::SegwitNative => "segwit_native",
            AddressFormat::SegwitWrapped => "segwit_wrapped",
        }
    }

    /// 从压缩公钥（33 字节 SEC1）编码地址
    pub fn encode(&self, public_key: &[u8; 33], network: Network) -> Result<String, DerivationError> {
        let public_key = PublicKey::from_slice(public_key)
            .map_err(|e| DerivationError::Encoding(format!("invalid public key: {}", e)))?;
        let network = network.as_bitcoin();

        let address = match self {
            AddressFormat::Classic => Address::p2pkh(&public_key, network),
            AddressFormat::SegwitNative => Address::p2wpkh(&public_key, network)
                .map_err(|e| DerivationError::Encoding(format!("P2WPKH: {}", e)))?,
            AddressFormat::SegwitWrapped => Address::p2shwpkh(&public_key, network)
                .map_err(|e| DerivationError::Encoding(format!("P2SH-P2WPKH: {}", e)))?,
        };
        Ok(address.to_string())
    }
}

impl fmt::Display for AddressFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AddressFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "classic" | "p2pkh" | "legacy" => Ok(AddressFormat::Classic),
            "segwit" | "segwit_native" | "p2wpkh" | "bech32" => Ok(AddressFormat::SegwitNative),
            "segwit_wrapped" | "p2sh-p2wpkh" | "p2wpkh-p2sh" | "wrapped" => {
                Ok(AddressFormat::SegwitWrapped)
            }
            _ => Err(format!("unknown address format: {}", s)),
        }
    }
}

/// 网络：决定版本字节、bech32 HRP 与 BIP44 coin type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// SLIP-44 coin type（BTC=0，测试网=1）
    pub fn coin_type(&self) -> u32 {
        match self {
            Network::Mainnet => 0,
            Network::Testnet => 1,
        }
    }

    pub fn as_bitcoin(&self) -> bitcoin::Network {
        match self {
            Network::Mainnet => bitcoin::Network::Bitcoin,
            Network::Testnet => bitcoin::Network::Testnet,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "bitcoin" | "btc" | "main" => Ok(Network::Mainnet),
            "testnet" | "xtn" | "test" => Ok(Network::Testnet),
            _ => Err(format!("unknown network: {}", s)),
        }
    }
}
