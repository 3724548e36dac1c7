//! Documents which are signed for each signing mode.

use anyhow::{Context, Result};
use cosmos_sdk_proto::{
    cosmos::{crypto::multisig::v1beta1 as multisig, tx::v1beta1 as proto},
    traits::Message,
};
use serde_json::Value;

use crate::{
    error::ChainParseError,
    tx::{CompactBitArray, ModeInfo, ModeInfoMulti, SignMode, SignerInfo},
    Fee, Msg, PublicKey, Tx,
};

/// Document signed in [SignMode::Direct].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignDoc {
    pub body_bytes: Vec<u8>,
    pub auth_info_bytes: Vec<u8>,
    pub chain_id: String,
    pub account_number: u64,
}

impl SignDoc {
    pub fn new(
        tx: &Tx,
        chain_id: impl Into<String>,
        account_number: u64,
    ) -> Result<Self, ChainParseError> {
        Ok(SignDoc {
            body_bytes: tx.body.to_proto()?.encode_to_vec(),
            auth_info_bytes: tx.auth_info.to_proto().encode_to_vec(),
            chain_id: chain_id.into(),
            account_number,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        proto::SignDoc {
            body_bytes: self.body_bytes.clone(),
            auth_info_bytes: self.auth_info_bytes.clone(),
            chain_id: self.chain_id.clone(),
            account_number: self.account_number,
        }
        .encode_to_vec()
    }
}

/// Document signed in [SignMode::LegacyAminoJson].
#[derive(Clone, Debug, PartialEq)]
pub struct StdSignDoc {
    pub account_number: u64,
    pub chain_id: String,
    pub fee: Fee,
    pub memo: String,
    pub msgs: Vec<Msg>,
    pub sequence: u64,
    pub timeout_height: u64,
}

impl StdSignDoc {
    pub fn new(tx: &Tx, chain_id: impl Into<String>, account_number: u64, sequence: u64) -> Self {
        StdSignDoc {
            account_number,
            chain_id: chain_id.into(),
            fee: tx.auth_info.fee.clone(),
            memo: tx.body.memo.clone(),
            msgs: tx.body.messages.clone(),
            sequence,
            timeout_height: tx.body.timeout_height,
        }
    }

    pub fn to_json(&self) -> Result<Value, ChainParseError> {
        let mut json = serde_json::json!({
            "account_number": self.account_number.to_string(),
            "chain_id": self.chain_id,
            "fee": self.fee.to_amino_json(),
            "memo": self.memo,
            "msgs": self.msgs.iter().map(Msg::to_amino_json).collect::<Result<Vec<_>, _>>()?,
            "sequence": self.sequence.to_string(),
        });
        if self.timeout_height != 0 {
            if let Some(map) = json.as_object_mut() {
                map.insert(
                    "timeout_height".to_owned(),
                    self.timeout_height.to_string().into(),
                );
            }
        }
        Ok(json)
    }

    /// Canonical bytes: sorted keys, no whitespace, HTML characters escaped.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ChainParseError> {
        let json = serde_json::to_string(&sorted(self.to_json()?)).map_err(|source| {
            ChainParseError::Json {
                type_url: "StdSignDoc".to_owned(),
                source,
            }
        })?;
        Ok(json
            .replace('&', "\\u0026")
            .replace('<', "\\u003c")
            .replace('>', "\\u003e")
            .into_bytes())
    }
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries = map.into_iter().collect::<Vec<_>>();
            entries.sort_by(|x, y| x.0.cmp(&y.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sorted(v))).collect())
        }
        Value::Array(values) => Value::Array(values.into_iter().map(sorted).collect()),
        value => value,
    }
}

/// Collects member signatures for a legacy amino multisig key.
#[derive(Clone, Debug)]
pub struct MultiSignature {
    public_keys: Vec<PublicKey>,
    threshold: u32,
    bitarray: CompactBitArray,
    signatures: Vec<Vec<u8>>,
}

impl MultiSignature {
    pub fn new(multisig_key: &PublicKey) -> Result<Self> {
        match multisig_key {
            PublicKey::LegacyAminoMultisig {
                threshold,
                public_keys,
            } => Ok(MultiSignature {
                public_keys: public_keys.clone(),
                threshold: *threshold,
                bitarray: CompactBitArray::from_bits(public_keys.len()),
                signatures: vec![],
            }),
            _ => Err(anyhow::anyhow!(
                "Expected a multisig public key, got {}",
                multisig_key.type_url()
            )),
        }
    }

    /// Record a member's signature, replacing any earlier one from the same key.
    pub fn add_signature(&mut self, member: &PublicKey, signature: Vec<u8>) -> Result<()> {
        let index = self
            .public_keys
            .iter()
            .position(|key| key == member)
            .context("Public key is not a member of this multisig")?;
        let position = self.bitarray.num_true_bits_before(index);
        if self.bitarray.get_index(index) {
            self.signatures[position] = signature;
        } else {
            self.bitarray.set_index(index, true);
            self.signatures.insert(position, signature);
        }
        Ok(())
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    pub fn threshold_reached(&self) -> bool {
        self.signatures.len() >= self.threshold as usize
    }

    /// Mode info for the multisig signer: one amino JSON entry per signature.
    pub fn mode_info(&self) -> ModeInfo {
        ModeInfo::Multi(ModeInfoMulti {
            bitarray: self.bitarray.clone(),
            mode_infos: self
                .signatures
                .iter()
                .map(|_| ModeInfo::single(SignMode::LegacyAminoJson))
                .collect(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        multisig::MultiSignature {
            signatures: self.signatures.clone(),
        }
        .encode_to_vec()
    }

    pub fn signer_info(&self, sequence: u64) -> SignerInfo {
        SignerInfo {
            public_key: Some(PublicKey::LegacyAminoMultisig {
                threshold: self.threshold,
                public_keys: self.public_keys.clone(),
            }),
            mode_info: self.mode_info(),
            sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{MsgSend, TxBody};

    use super::*;

    fn tx() -> Tx {
        let mut tx = Tx::new(
            TxBody::new(vec![MsgSend {
                from_address: "cosmos1from".to_owned(),
                to_address: "cosmos1to".to_owned(),
                amount: "100uatom".parse().unwrap(),
            }
            .into()]),
            Fee::new(200000, "5000uatom".parse().unwrap()),
        );
        tx.body.memo = "a<b>&c".to_owned();
        tx
    }

    #[test]
    fn std_sign_doc_is_canonical() {
        let bytes = StdSignDoc::new(&tx(), "cosmoshub-4", 12, 3).to_bytes().unwrap();
        let expected = concat!(
            r#"{"account_number":"12","chain_id":"cosmoshub-4","#,
            r#""fee":{"amount":[{"amount":"5000","denom":"uatom"}],"gas":"200000"},"#,
            r#""memo":"a\u003cb\u003e\u0026c","#,
            r#""msgs":[{"type":"cosmos-sdk/MsgSend","value":{"amount":[{"amount":"100","denom":"uatom"}],"from_address":"cosmos1from","to_address":"cosmos1to"}}],"#,
            r#""sequence":"3"}"#
        );
        assert_eq!(String::from_utf8(bytes).unwrap(), expected);
    }

    #[test]
    fn std_sign_doc_timeout_height() {
        let mut tx = tx();
        tx.body.timeout_height = 50;
        let json = StdSignDoc::new(&tx, "cosmoshub-4", 1, 1).to_json().unwrap();
        assert_eq!(json["timeout_height"], "50");
    }

    #[test]
    fn sign_doc_bytes_decode() {
        let doc = SignDoc::new(&tx(), "cosmoshub-4", 7).unwrap();
        let decoded = proto::SignDoc::decode(doc.to_bytes().as_slice()).unwrap();
        assert_eq!(decoded.chain_id, "cosmoshub-4");
        assert_eq!(decoded.account_number, 7);
        assert_eq!(decoded.body_bytes, doc.body_bytes);
    }

    #[test]
    fn multisig_orders_by_member() {
        let members = vec![
            PublicKey::Secp256k1(vec![2; 33]),
            PublicKey::Secp256k1(vec![3; 33]),
            PublicKey::Secp256k1(vec![4; 33]),
        ];
        let key = PublicKey::LegacyAminoMultisig {
            threshold: 2,
            public_keys: members.clone(),
        };
        let mut multi = MultiSignature::new(&key).unwrap();
        multi.add_signature(&members[2], vec![2]).unwrap();
        assert!(!multi.threshold_reached());
        multi.add_signature(&members[0], vec![0]).unwrap();
        multi.add_signature(&members[2], vec![22]).unwrap();
        multi
            .add_signature(&PublicKey::Secp256k1(vec![9; 33]), vec![9])
            .unwrap_err();
        assert!(multi.threshold_reached());
        assert_eq!(multi.signature_count(), 2);

        let decoded = multisig::MultiSignature::decode(multi.to_bytes().as_slice()).unwrap();
        assert_eq!(decoded.signatures, vec![vec![0], vec![22]]);

        let info = multi.signer_info(5);
        assert_eq!(info.public_key, Some(key));
        match info.mode_info {
            ModeInfo::Multi(multi) => {
                assert_eq!(multi.bitarray.elems, vec![0b1010_0000]);
                assert_eq!(multi.mode_infos.len(), 2);
            }
            ModeInfo::Single(_) => panic!("Expected multi mode info"),
        }
        MultiSignature::new(&PublicKey::Secp256k1(vec![2; 33])).unwrap_err();
    }
}
