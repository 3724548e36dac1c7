//! Building blocks of a transaction: body, auth info and signatures.

mod bitarray;
mod info;

pub use bitarray::CompactBitArray;
pub use info::{
    parse_events_by_type, parse_tx_logs, parse_tx_logs_proto, Attribute, EventsByType,
    StringEvent, TxInfo, TxLog,
};

use base64::Engine;
use cosmos_sdk_proto::{
    cosmos::tx::v1beta1::{self as proto, mode_info},
    traits::Message,
};
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as, DisplayFromStr, PickFirst};
use sha2::{Digest, Sha256};

use crate::{error::ChainParseError, Fee, Msg, PublicKey};

/// How a signer produced its signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignMode {
    #[serde(rename = "SIGN_MODE_UNSPECIFIED")]
    Unspecified,
    /// Sign the protobuf encoded `SignDoc`.
    #[serde(rename = "SIGN_MODE_DIRECT")]
    Direct,
    #[serde(rename = "SIGN_MODE_TEXTUAL")]
    Textual,
    #[serde(rename = "SIGN_MODE_DIRECT_AUX")]
    DirectAux,
    /// Sign the canonical Amino JSON `StdSignDoc`, needed for Ledger and multisig.
    #[serde(rename = "SIGN_MODE_LEGACY_AMINO_JSON")]
    LegacyAminoJson,
}

impl From<SignMode> for i32 {
    fn from(mode: SignMode) -> Self {
        match mode {
            SignMode::Unspecified => 0,
            SignMode::Direct => 1,
            SignMode::Textual => 2,
            SignMode::DirectAux => 3,
            SignMode::LegacyAminoJson => 127,
        }
    }
}

impl TryFrom<i32> for SignMode {
    type Error = ChainParseError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SignMode::Unspecified),
            1 => Ok(SignMode::Direct),
            2 => Ok(SignMode::Textual),
            3 => Ok(SignMode::DirectAux),
            127 => Ok(SignMode::LegacyAminoJson),
            _ => Err(ChainParseError::UnknownSignMode(value)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeInfoSingle {
    pub mode: SignMode,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeInfoMulti {
    pub bitarray: CompactBitArray,
    pub mode_infos: Vec<ModeInfo>,
}

/// Signing mode of a single key, or of each member of a multisig key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeInfo {
    Single(ModeInfoSingle),
    Multi(ModeInfoMulti),
}

impl ModeInfo {
    pub fn single(mode: SignMode) -> Self {
        ModeInfo::Single(ModeInfoSingle { mode })
    }

    pub fn to_proto(&self) -> proto::ModeInfo {
        let sum = match self {
            ModeInfo::Single(single) => mode_info::Sum::Single(mode_info::Single {
                mode: single.mode.into(),
            }),
            ModeInfo::Multi(multi) => mode_info::Sum::Multi(mode_info::Multi {
                bitarray: Some(multi.bitarray.to_proto()),
                mode_infos: multi.mode_infos.iter().map(ModeInfo::to_proto).collect(),
            }),
        };
        proto::ModeInfo { sum: Some(sum) }
    }

    pub fn from_proto(proto: proto::ModeInfo) -> Result<Self, ChainParseError> {
        match proto.sum {
            Some(mode_info::Sum::Single(single)) => Ok(ModeInfo::Single(ModeInfoSingle {
                mode: single.mode.try_into()?,
            })),
            Some(mode_info::Sum::Multi(multi)) => Ok(ModeInfo::Multi(ModeInfoMulti {
                bitarray: multi
                    .bitarray
                    .map(CompactBitArray::from_proto)
                    .unwrap_or_default(),
                mode_infos: multi
                    .mode_infos
                    .into_iter()
                    .map(ModeInfo::from_proto)
                    .collect::<Result<_, _>>()?,
            })),
            None => Err(ChainParseError::MissingField {
                field: "sum",
                context: "ModeInfo",
            }),
        }
    }
}

/// Public key, signing mode and sequence of one transaction signer.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerInfo {
    pub public_key: Option<PublicKey>,
    pub mode_info: ModeInfo,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub sequence: u64,
}

impl SignerInfo {
    pub fn to_proto(&self) -> proto::SignerInfo {
        proto::SignerInfo {
            public_key: self.public_key.as_ref().map(PublicKey::pack_any),
            mode_info: Some(self.mode_info.to_proto()),
            sequence: self.sequence,
        }
    }

    pub fn from_proto(proto: proto::SignerInfo) -> Result<Self, ChainParseError> {
        Ok(SignerInfo {
            public_key: proto
                .public_key
                .as_ref()
                .map(PublicKey::unpack_any)
                .transpose()?,
            mode_info: ModeInfo::from_proto(proto.mode_info.ok_or(
                ChainParseError::MissingField {
                    field: "mode_info",
                    context: "SignerInfo",
                },
            )?)?,
            sequence: proto.sequence,
        })
    }
}

/// What is known about a signer before it signs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignerData {
    pub sequence: u64,
    /// `None` when the account has never signed and we do not have its key.
    pub public_key: Option<PublicKey>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    pub signer_infos: Vec<SignerInfo>,
    pub fee: Fee,
}

impl AuthInfo {
    pub fn to_proto(&self) -> proto::AuthInfo {
        proto::AuthInfo {
            signer_infos: self.signer_infos.iter().map(SignerInfo::to_proto).collect(),
            fee: Some(self.fee.to_proto()),
            ..Default::default()
        }
    }

    pub fn from_proto(proto: proto::AuthInfo) -> Result<Self, ChainParseError> {
        Ok(AuthInfo {
            signer_infos: proto
                .signer_infos
                .into_iter()
                .map(SignerInfo::from_proto)
                .collect::<Result<_, _>>()?,
            fee: Fee::from_proto(proto.fee.ok_or(ChainParseError::MissingField {
                field: "fee",
                context: "AuthInfo",
            })?)?,
        })
    }
}

/// The processable content of a transaction.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TxBody {
    pub messages: Vec<Msg>,
    #[serde(default)]
    pub memo: String,
    /// Block height after which the transaction is invalid, 0 for none.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[serde(default)]
    pub timeout_height: u64,
}

impl TxBody {
    pub fn new(messages: Vec<Msg>) -> Self {
        TxBody {
            messages,
            memo: String::new(),
            timeout_height: 0,
        }
    }

    pub fn to_proto(&self) -> Result<proto::TxBody, ChainParseError> {
        Ok(proto::TxBody {
            messages: self
                .messages
                .iter()
                .map(Msg::pack_any)
                .collect::<Result<_, _>>()?,
            memo: self.memo.clone(),
            timeout_height: self.timeout_height,
            ..Default::default()
        })
    }

    pub fn from_proto(proto: proto::TxBody) -> Result<Self, ChainParseError> {
        Ok(TxBody {
            messages: proto
                .messages
                .iter()
                .map(Msg::unpack_any)
                .collect::<Result<_, _>>()?,
            memo: proto.memo,
            timeout_height: proto.timeout_height,
        })
    }
}

pub(crate) const TX_TYPE_URL: &str = "/cosmos.tx.v1beta1.Tx";

/// A transaction which can be broadcast.
///
/// `signatures` matches `auth_info.signer_infos` in length and order.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tx {
    pub body: TxBody,
    pub auth_info: AuthInfo,
    #[serde_as(as = "Vec<Base64>")]
    pub signatures: Vec<Vec<u8>>,
}

impl Tx {
    /// Unsigned transaction with no signer infos yet.
    pub fn new(body: TxBody, fee: Fee) -> Self {
        Tx {
            body,
            auth_info: AuthInfo {
                signer_infos: vec![],
                fee,
            },
            signatures: vec![],
        }
    }

    /// Add a signer info and an empty signature for each signer.
    ///
    /// Used to build transactions for simulation, where signatures are not
    /// checked but must be present.
    pub fn append_empty_signatures(&mut self, signers: &[SignerData]) {
        for signer in signers {
            let (public_key, mode_info) = match &signer.public_key {
                Some(PublicKey::LegacyAminoMultisig { public_keys, .. }) => (
                    signer.public_key.clone(),
                    ModeInfo::Multi(ModeInfoMulti {
                        bitarray: CompactBitArray::from_bits(public_keys.len()),
                        mode_infos: vec![],
                    }),
                ),
                Some(_) => (signer.public_key.clone(), ModeInfo::single(SignMode::Direct)),
                None => (
                    Some(PublicKey::Secp256k1(vec![])),
                    ModeInfo::single(SignMode::Direct),
                ),
            };
            self.auth_info.signer_infos.push(SignerInfo {
                public_key,
                mode_info,
                sequence: signer.sequence,
            });
            self.signatures.push(vec![]);
        }
    }

    /// Fails if the body holds a message only known as JSON.
    pub fn to_proto(&self) -> Result<proto::Tx, ChainParseError> {
        Ok(proto::Tx {
            body: Some(self.body.to_proto()?),
            auth_info: Some(self.auth_info.to_proto()),
            signatures: self.signatures.clone(),
        })
    }

    pub fn from_proto(proto: proto::Tx) -> Result<Self, ChainParseError> {
        Ok(Tx {
            body: TxBody::from_proto(proto.body.ok_or(ChainParseError::MissingField {
                field: "body",
                context: "Tx",
            })?)?,
            auth_info: AuthInfo::from_proto(proto.auth_info.ok_or(
                ChainParseError::MissingField {
                    field: "auth_info",
                    context: "Tx",
                },
            )?)?,
            signatures: proto.signatures,
        })
    }

    /// Protobuf encoding, as broadcast to the chain.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ChainParseError> {
        self.to_proto().map(|tx| tx.encode_to_vec())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChainParseError> {
        let proto = proto::Tx::decode(bytes).map_err(|source| ChainParseError::Decode {
            type_url: TX_TYPE_URL.to_owned(),
            source,
        })?;
        Tx::from_proto(proto)
    }

    pub fn to_base64(&self) -> Result<String, ChainParseError> {
        self.to_bytes()
            .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn from_base64(encoded: &str) -> anyhow::Result<Self> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
        Ok(Tx::from_bytes(&bytes)?)
    }

    /// Transaction hash as reported by the chain: upper case hex SHA-256 of the bytes.
    pub fn hash(&self) -> Result<String, ChainParseError> {
        self.to_bytes()
            .map(|bytes| hex::encode_upper(Sha256::digest(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use crate::MsgSend;

    use super::*;

    fn unsigned_tx() -> Tx {
        let msg: Msg = MsgSend {
            from_address: "cosmos1from".to_owned(),
            to_address: "cosmos1to".to_owned(),
            amount: "100uatom".parse().unwrap(),
        }
        .into();
        Tx::new(
            TxBody::new(vec![msg]),
            Fee::new(200000, "5000uatom".parse().unwrap()),
        )
    }

    #[test]
    fn empty_signatures_unknown_key() {
        let mut tx = unsigned_tx();
        tx.append_empty_signatures(&[SignerData {
            sequence: 4,
            public_key: None,
        }]);
        assert_eq!(tx.signatures, vec![Vec::<u8>::new()]);
        let info = &tx.auth_info.signer_infos[0];
        assert_eq!(info.sequence, 4);
        assert_eq!(info.public_key, Some(PublicKey::Secp256k1(vec![])));
        assert_eq!(info.mode_info, ModeInfo::single(SignMode::Direct));
    }

    #[test]
    fn empty_signatures_multisig() {
        let mut tx = unsigned_tx();
        let multisig = PublicKey::LegacyAminoMultisig {
            threshold: 2,
            public_keys: vec![
                PublicKey::Secp256k1(vec![2; 33]),
                PublicKey::Secp256k1(vec![3; 33]),
                PublicKey::Secp256k1(vec![4; 33]),
            ],
        };
        tx.append_empty_signatures(&[
            SignerData {
                sequence: 1,
                public_key: Some(PublicKey::Secp256k1(vec![2; 33])),
            },
            SignerData {
                sequence: 9,
                public_key: Some(multisig.clone()),
            },
        ]);
        assert_eq!(tx.signatures.len(), 2);
        assert_eq!(tx.auth_info.signer_infos.len(), 2);
        assert_eq!(
            tx.auth_info.signer_infos[0].mode_info,
            ModeInfo::single(SignMode::Direct)
        );
        match &tx.auth_info.signer_infos[1].mode_info {
            ModeInfo::Multi(multi) => assert_eq!(multi.bitarray.len(), 3),
            ModeInfo::Single(_) => panic!("Expected multi mode info"),
        }
        assert_eq!(tx.auth_info.signer_infos[1].public_key, Some(multisig));
    }

    #[test]
    fn proto_roundtrip_and_hash() {
        let mut tx = unsigned_tx();
        tx.body.memo = "hello".to_owned();
        tx.body.timeout_height = 1000;
        tx.append_empty_signatures(&[SignerData {
            sequence: 0,
            public_key: None,
        }]);
        let decoded = Tx::from_bytes(&tx.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(Tx::from_base64(&tx.to_base64().unwrap()).unwrap(), tx);

        let hash = tx.hash().unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn sign_mode_numbers() {
        for mode in [
            SignMode::Unspecified,
            SignMode::Direct,
            SignMode::Textual,
            SignMode::DirectAux,
            SignMode::LegacyAminoJson,
        ] {
            assert_eq!(SignMode::try_from(i32::from(mode)).unwrap(), mode);
        }
        assert!(matches!(
            SignMode::try_from(4),
            Err(ChainParseError::UnknownSignMode(4))
        ));
    }

    #[test]
    fn lcd_json() {
        let json = serde_json::json!({
            "@type": "/cosmos.tx.v1beta1.Tx",
            "body": {
                "messages": [{
                    "@type": "/cosmos.bank.v1beta1.MsgSend",
                    "from_address": "cosmos1from",
                    "to_address": "cosmos1to",
                    "amount": [{"denom": "uatom", "amount": "100"}]
                }],
                "memo": "",
                "timeout_height": "0",
                "extension_options": [],
                "non_critical_extension_options": []
            },
            "auth_info": {
                "signer_infos": [{
                    "public_key": {
                        "@type": "/cosmos.crypto.secp256k1.PubKey",
                        "key": "AgICAgICAgICAgICAgICAgICAgICAgICAgICAgICAgIC"
                    },
                    "mode_info": {"single": {"mode": "SIGN_MODE_DIRECT"}},
                    "sequence": "12"
                }],
                "fee": {
                    "amount": [{"denom": "uatom", "amount": "5000"}],
                    "gas_limit": "200000",
                    "payer": "",
                    "granter": ""
                },
                "tip": null
            },
            "signatures": ["AQID"]
        });
        let tx: Tx = serde_json::from_value(json).unwrap();
        assert_eq!(tx.signatures, vec![vec![1, 2, 3]]);
        assert_eq!(tx.auth_info.signer_infos[0].sequence, 12);
        assert_eq!(tx.auth_info.fee.gas_limit, 200000);
        assert_eq!(tx.body.messages[0].type_url(), "/cosmos.bank.v1beta1.MsgSend");

        let out = serde_json::to_value(&tx).unwrap();
        assert_eq!(out["auth_info"]["signer_infos"][0]["sequence"], "12");
        assert_eq!(out["body"]["timeout_height"], "0");
        assert_eq!(out["signatures"][0], "AQID");
    }
}
