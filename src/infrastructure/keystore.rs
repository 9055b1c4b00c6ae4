//! 密钥派生原语
//!
//! `KeyDerivation` 是地址浏览器与安全密钥存储之间的唯一接口：
//! `derive_child(parent, index, hardened) -> child | 失败`，以及取压缩公钥。
//! 核心逻辑只借用句柄，从不复制或持久化私钥。
//!
//! `SoftwareKeyStore` 是主机端实现（BIP32 CKDpriv，HMAC-SHA512 + secp256k1），
//! 用于模拟器与测试；设备上由安全元件实现同一 trait。

use std::fmt;

use bip39::{Language, Mnemonic};
use bitcoin::hashes::{hash160, Hash};
use bitcoin::secp256k1::{All, PublicKey, Scalar, Secp256k1, SecretKey};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::domain::path::{HARDENED_FLAG, MAX_INDEX};
use crate::error::KeyStoreError;

type HmacSha512 = Hmac<Sha512>;

/// 外部密钥派生原语
pub trait KeyDerivation {
    /// 不透明的密钥句柄
    type Key;

    /// 主密钥句柄（会话期间借用）
    fn master(&self) -> &Self::Key;

    /// 派生一个子密钥
    fn derive_child(
        &self,
        parent: &Self::Key,
        index: u32,
        hardened: bool,
    ) -> Result<Self::Key, KeyStoreError>;

    /// 33 字节压缩公钥
    fn public_key(&self, key: &Self::Key) -> Result<[u8; 33], KeyStoreError>;
}

/// 扩展私钥（私钥 + 链码），drop 时擦除
pub struct ExtendedKey {
    secret: SecretKey,
    chain_code: Zeroizing<[u8; 32]>,
}

impl Drop for ExtendedKey {
    fn drop(&mut self) {
        self.secret.non_secure_erase();
    }
}

impl fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ExtendedKey([REDACTED])")
    }
}

/// 软件 BIP32 密钥存储
pub struct SoftwareKeyStore {
    secp: Secp256k1<All>,
    master: ExtendedKey,
}

impl fmt::Debug for SoftwareKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftwareKeyStore")
            .field("fingerprint", &self.fingerprint_hex())
            .finish()
    }
}

fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<Zeroizing<[u8; 64]>, KeyStoreError> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| KeyStoreError::Unavailable(format!("HMAC initialization failed: {}", e)))?;
    mac.update(data);
    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// k_i = parse256(IL) + k_par (mod n)；IL >= n 或 k_i == 0 时该索引无效，IL == 0 本身合法
fn child_secret(parent: &SecretKey, i: &[u8; 64]) -> Option<SecretKey> {
    let mut il = Zeroizing::new([0u8; 32]);
    il.copy_from_slice(&i[..32]);
    let tweak = Scalar::from_be_bytes(*il).ok()?;
    parent.add_tweak(&tweak).ok()
}

fn split_chain_code(i: &[u8; 64]) -> Zeroizing<[u8; 32]> {
    let mut chain_code = Zeroizing::new([0u8; 32]);
    chain_code.copy_from_slice(&i[32..]);
    chain_code
}

impl SoftwareKeyStore {
    /// 从 BIP32 种子创建主密钥: I = HMAC-SHA512("Bitcoin seed", seed)
    pub fn from_seed(seed: &[u8]) -> Result<Self, KeyStoreError> {
        if seed.len() < 16 || seed.len() > 64 {
            return Err(KeyStoreError::Unavailable(format!(
                "seed length must be 16..=64 bytes, got {}",
                seed.len()
            )));
        }

        let i = hmac_sha512(b"Bitcoin seed", seed)?;
        let secret = SecretKey::from_slice(&i[..32]).map_err(|_| {
            KeyStoreError::Unavailable("seed produces an invalid master key".to_string())
        })?;

        let store = Self {
            secp: Secp256k1::new(),
            master: ExtendedKey {
                secret,
                chain_code: split_chain_code(&i),
            },
        };
        tracing::debug!(fingerprint = %store.fingerprint_hex(), "software key store opened");
        Ok(store)
    }

    /// 从 BIP39 助记词创建（不支持 passphrase）
    pub fn from_mnemonic(phrase: &str) -> Result<Self, KeyStoreError> {
        let mnemonic = Mnemonic::parse_in(Language::English, phrase)
            .map_err(|e| KeyStoreError::Unavailable(format!("invalid mnemonic: {}", e)))?;
        let seed = Zeroizing::new(mnemonic.to_seed(""));
        Self::from_seed(&seed[..])
    }

    /// 主密钥指纹：hash160(主公钥) 的前 4 字节
    pub fn fingerprint(&self) -> [u8; 4] {
        let public_key = PublicKey::from_secret_key(&self.secp, &self.master.secret).serialize();
        let digest = hash160::Hash::hash(&public_key).to_byte_array();
        [digest[0], digest[1], digest[2], digest[3]]
    }

    pub fn fingerprint_hex(&self) -> String {
        hex::encode(self.fingerprint())
    }
}

impl KeyDerivation for SoftwareKeyStore {
    type Key = ExtendedKey;

    fn master(&self) -> &ExtendedKey {
        &self.master
    }

    fn derive_child(
        &self,
        parent: &ExtendedKey,
        index: u32,
        hardened: bool,
    ) -> Result<ExtendedKey, KeyStoreError> {
        if index > MAX_INDEX {
            return Err(KeyStoreError::Unavailable(format!(
                "child index {} out of range",
                index
            )));
        }
        let child_number = if hardened { index | HARDENED_FLAG } else { index };

        let mut data = Zeroizing::new(Vec::with_capacity(37));
        if hardened {
            // 0x00 || ser256(k_par) || ser32(i)
            let secret_bytes = Zeroizing::new(parent.secret.secret_bytes());
            data.push(0x00);
            data.extend_from_slice(&secret_bytes[..]);
        } else {
            // serP(point(k_par)) || ser32(i)
            let public_key = PublicKey::from_secret_key(&self.secp, &parent.secret);
            data.extend_from_slice(&public_key.serialize());
        }
        data.extend_from_slice(&child_number.to_be_bytes());

        let i = hmac_sha512(&parent.chain_code[..], &data)?;

        let secret = child_secret(&parent.secret, &i)
            .ok_or(KeyStoreError::InvalidChild { index, hardened })?;

        Ok(ExtendedKey {
            secret,
            chain_code: split_chain_code(&i),
        })
    }

    fn public_key(&self, key: &ExtendedKey) -> Result<[u8; 33], KeyStoreError> {
        Ok(PublicKey::from_secret_key(&self.secp, &key.secret).serialize())
    }
}
