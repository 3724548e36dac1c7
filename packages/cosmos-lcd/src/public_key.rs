//! Public keys as they appear in signer infos and accounts.

use base64::Engine;
use bitcoin::hashes::{ripemd160, sha256, Hash};
use cosmos_sdk_proto::{
    cosmos::crypto::{ed25519, multisig::LegacyAminoPubKey, secp256k1},
    traits::Message,
    Any,
};
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

use crate::{
    address::{Address, AddressHrp, RawAddress},
    error::ChainParseError,
};

pub(crate) const SECP256K1_TYPE_URL: &str = "/cosmos.crypto.secp256k1.PubKey";
pub(crate) const ED25519_TYPE_URL: &str = "/cosmos.crypto.ed25519.PubKey";
pub(crate) const LEGACY_AMINO_MULTISIG_TYPE_URL: &str =
    "/cosmos.crypto.multisig.LegacyAminoPubKey";

/// A public key known to the chain.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "PublicKeyJson", into = "PublicKeyJson")]
pub enum PublicKey {
    /// Compressed secp256k1 key. Empty bytes stand for a key not known yet,
    /// which is what simulation uses.
    Secp256k1(Vec<u8>),
    Ed25519(Vec<u8>),
    /// Threshold multisig made of other keys.
    LegacyAminoMultisig {
        threshold: u32,
        public_keys: Vec<PublicKey>,
    },
}

impl PublicKey {
    pub fn type_url(&self) -> &'static str {
        match self {
            PublicKey::Secp256k1(_) => SECP256K1_TYPE_URL,
            PublicKey::Ed25519(_) => ED25519_TYPE_URL,
            PublicKey::LegacyAminoMultisig { .. } => LEGACY_AMINO_MULTISIG_TYPE_URL,
        }
    }

    pub fn is_multisig(&self) -> bool {
        matches!(self, PublicKey::LegacyAminoMultisig { .. })
    }

    /// Is this the empty placeholder key used when the real key is unknown?
    pub fn is_placeholder(&self) -> bool {
        matches!(self, PublicKey::Secp256k1(key) if key.is_empty())
    }

    pub fn pack_any(&self) -> Any {
        let value = match self {
            PublicKey::Secp256k1(key) => secp256k1::PubKey { key: key.clone() }.encode_to_vec(),
            PublicKey::Ed25519(key) => ed25519::PubKey { key: key.clone() }.encode_to_vec(),
            PublicKey::LegacyAminoMultisig {
                threshold,
                public_keys,
            } => LegacyAminoPubKey {
                threshold: *threshold,
                public_keys: public_keys.iter().map(PublicKey::pack_any).collect(),
            }
            .encode_to_vec(),
        };
        Any {
            type_url: self.type_url().to_owned(),
            value,
        }
    }

    pub fn unpack_any(any: &Any) -> Result<Self, ChainParseError> {
        let decode_error = |source| ChainParseError::Decode {
            type_url: any.type_url.clone(),
            source,
        };
        match any.type_url.as_str() {
            SECP256K1_TYPE_URL => secp256k1::PubKey::decode(any.value.as_slice())
                .map(|x| PublicKey::Secp256k1(x.key))
                .map_err(decode_error),
            ED25519_TYPE_URL => ed25519::PubKey::decode(any.value.as_slice())
                .map(|x| PublicKey::Ed25519(x.key))
                .map_err(decode_error),
            LEGACY_AMINO_MULTISIG_TYPE_URL => {
                let multisig = LegacyAminoPubKey::decode(any.value.as_slice()).map_err(decode_error)?;
                Ok(PublicKey::LegacyAminoMultisig {
                    threshold: multisig.threshold,
                    public_keys: multisig
                        .public_keys
                        .iter()
                        .map(PublicKey::unpack_any)
                        .collect::<Result<_, _>>()?,
                })
            }
            _ => Err(ChainParseError::UnsupportedPublicKey {
                type_url: any.type_url.clone(),
            }),
        }
    }

    /// Account address bytes for single keys.
    ///
    /// secp256k1 uses ripemd160(sha256(key)), ed25519 (consensus keys) the
    /// first 20 bytes of sha256(key). Multisig addresses need the amino
    /// encoding of the key and are not derived here.
    pub fn raw_address(&self) -> Option<RawAddress> {
        match self {
            PublicKey::Secp256k1(key) if !key.is_empty() => {
                let sha = sha256::Hash::hash(key);
                Some(ripemd160::Hash::hash(sha.as_ref()).into_inner().into())
            }
            PublicKey::Ed25519(key) if !key.is_empty() => {
                let sha = sha256::Hash::hash(key).into_inner();
                let mut raw = [0u8; 20];
                raw.copy_from_slice(&sha[..20]);
                Some(raw.into())
            }
            _ => None,
        }
    }

    pub fn address(&self, hrp: AddressHrp) -> Option<Address> {
        self.raw_address().map(|raw| raw.with_hrp(hrp))
    }

    /// Amino JSON representation, used by legacy signing.
    pub fn to_amino_json(&self) -> serde_json::Value {
        let engine = base64::engine::general_purpose::STANDARD;
        match self {
            PublicKey::Secp256k1(key) => serde_json::json!({
                "type": "tendermint/PubKeySecp256k1",
                "value": engine.encode(key),
            }),
            PublicKey::Ed25519(key) => serde_json::json!({
                "type": "tendermint/PubKeyEd25519",
                "value": engine.encode(key),
            }),
            PublicKey::LegacyAminoMultisig {
                threshold,
                public_keys,
            } => serde_json::json!({
                "type": "tendermint/PubKeyMultisigThreshold",
                "value": {
                    "threshold": threshold.to_string(),
                    "pubkeys": public_keys.iter().map(PublicKey::to_amino_json).collect::<Vec<_>>(),
                },
            }),
        }
    }
}

/// LCD JSON form, tagged with `@type`.
#[serde_as]
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "@type")]
enum PublicKeyJson {
    #[serde(rename = "/cosmos.crypto.secp256k1.PubKey")]
    Secp256k1 {
        #[serde_as(as = "Base64")]
        key: Vec<u8>,
    },
    #[serde(rename = "/cosmos.crypto.ed25519.PubKey")]
    Ed25519 {
        #[serde_as(as = "Base64")]
        key: Vec<u8>,
    },
    #[serde(rename = "/cosmos.crypto.multisig.LegacyAminoPubKey")]
    LegacyAminoMultisig {
        threshold: u32,
        public_keys: Vec<PublicKey>,
    },
}

impl From<PublicKeyJson> for PublicKey {
    fn from(json: PublicKeyJson) -> Self {
        match json {
            PublicKeyJson::Secp256k1 { key } => PublicKey::Secp256k1(key),
            PublicKeyJson::Ed25519 { key } => PublicKey::Ed25519(key),
            PublicKeyJson::LegacyAminoMultisig {
                threshold,
                public_keys,
            } => PublicKey::LegacyAminoMultisig {
                threshold,
                public_keys,
            },
        }
    }
}

impl From<PublicKey> for PublicKeyJson {
    fn from(key: PublicKey) -> Self {
        match key {
            PublicKey::Secp256k1(key) => PublicKeyJson::Secp256k1 { key },
            PublicKey::Ed25519(key) => PublicKeyJson::Ed25519 { key },
            PublicKey::LegacyAminoMultisig {
                threshold,
                public_keys,
            } => PublicKeyJson::LegacyAminoMultisig {
                threshold,
                public_keys,
            },
        }
    }
}
