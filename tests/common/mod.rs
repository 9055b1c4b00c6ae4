//! 测试辅助模块
//! 独立解码地址、coins-bip32 交叉验证公钥、把路径文本转成键盘事件

#![allow(dead_code)]

use address_explorer::domain::{AddressFormat, PathComponent, PathTemplate};
use address_explorer::infrastructure::SoftwareKeyStore;
use address_explorer::service::BuilderEvent;
use bitcoin::hashes::{hash160, Hash};

/// BIP39 标准测试助记词
pub const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

pub fn abandon_store() -> SoftwareKeyStore {
    SoftwareKeyStore::from_mnemonic(ABANDON).unwrap()
}

pub fn abandon_seed() -> [u8; 64] {
    bip39::Mnemonic::parse_in(bip39::Language::English, ABANDON)
        .unwrap()
        .to_seed("")
}

/// 用 coins-bip32 独立派生压缩公钥
pub fn oracle_public_key(path: &str) -> [u8; 33] {
    use coins_bip32::path::DerivationPath;
    use coins_bip32::prelude::*;
    use k256::ecdsa::SigningKey;

    let derivation_path = path.parse::<DerivationPath>().unwrap();
    let master_key = XPriv::root_from_seed(&abandon_seed(), None).unwrap();
    let derived_key = master_key.derive_path(&derivation_path).unwrap();

    let signing_key: &SigningKey = derived_key.as_ref();
    let encoded = signing_key.verifying_key().to_encoded_point(true);
    let mut out = [0u8; 33];
    out.copy_from_slice(encoded.as_bytes());
    out
}

pub fn hash160(data: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(data).to_byte_array()
}

/// 地址解码结果
#[derive(Debug, PartialEq, Eq)]
pub enum Decoded {
    PubkeyHash { version: u8, hash: [u8; 20] },
    ScriptHash { version: u8, hash: [u8; 20] },
    WitnessV0 { hrp: String, program: [u8; 20] },
}

/// 不经过被测代码，按地址格式独立解码
pub fn decode_address(address: &str) -> Decoded {
    if address.starts_with("bc1") || address.starts_with("tb1") {
        let (hrp, version, program) = bech32::segwit::decode(address).unwrap();
        assert_eq!(version.to_u8(), 0, "witness version");
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&program);
        return Decoded::WitnessV0 {
            hrp: hrp.to_string(),
            program: hash,
        };
    }

    let payload = bs58::decode(address).with_check(None).into_vec().unwrap();
    assert_eq!(payload.len(), 21);
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&payload[1..]);
    match payload[0] {
        0x00 | 0x6f => Decoded::PubkeyHash {
            version: payload[0],
            hash,
        },
        0x05 | 0xc4 => Decoded::ScriptHash {
            version: payload[0],
            hash,
        },
        other => panic!("unexpected version byte {:#x}", other),
    }
}

/// 断言地址确实属于该公钥
pub fn assert_address_covers(address: &str, format: AddressFormat, public_key: &[u8; 33]) {
    let key_hash = hash160(public_key);
    match (format, decode_address(address)) {
        (AddressFormat::Classic, Decoded::PubkeyHash { hash, .. }) => assert_eq!(hash, key_hash),
        (AddressFormat::SegwitNative, Decoded::WitnessV0 { program, .. }) => {
            assert_eq!(program, key_hash)
        }
        (AddressFormat::SegwitWrapped, Decoded::ScriptHash { hash, .. }) => {
            let mut redeem_script = vec![0x00, 0x14];
            redeem_script.extend_from_slice(&key_hash);
            assert_eq!(hash, hash160(&redeem_script));
        }
        (format, decoded) => panic!("{} decoded as {:?}", format, decoded),
    }
}

/// 路径文本对应的键盘操作
pub fn keypad_events(path: &str) -> Vec<BuilderEvent> {
    let template: PathTemplate = path.parse().unwrap();
    let mut events = Vec::new();
    for component in template.components() {
        match component {
            PathComponent::RangePlaceholder => events.push(BuilderEvent::ChooseRange),
            PathComponent::Index(value) | PathComponent::HardenedIndex(value) => {
                for b in value.to_string().bytes() {
                    events.push(BuilderEvent::Digit(b - b'0'));
                }
                if component.is_hardened() {
                    events.push(BuilderEvent::ToggleHardened);
                }
                events.push(BuilderEvent::ConfirmComponent);
            }
        }
    }
    if !template.is_ranging() {
        events.push(BuilderEvent::Finish);
    }
    events
}
