//! Messages which can be included in a transaction.

mod bank;
mod distribution;
mod staking;

pub use bank::{Input, MsgMultiSend, MsgSend, Output};
pub use distribution::MsgWithdrawDelegatorReward;
pub use staking::{MsgBeginRedelegate, MsgDelegate, MsgUndelegate};

use cosmos_sdk_proto::{traits::Message, Any};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChainParseError;

/// A concrete message type known to this library.
pub trait ChainMsg: Serialize + DeserializeOwned + Clone + Into<Msg> {
    /// Protobuf type URL, e.g. `/cosmos.bank.v1beta1.MsgSend`.
    const TYPE_URL: &'static str;
    /// Name used in Amino JSON, e.g. `cosmos-sdk/MsgSend`.
    const AMINO_NAME: &'static str;

    type Proto: Message + Default;

    fn to_proto(&self) -> Self::Proto;

    fn from_proto(proto: Self::Proto) -> Result<Self, ChainParseError>;

    /// Human readable summary for logs and error messages.
    fn describe(&self) -> String;

    fn pack_any(&self) -> Any {
        Any {
            type_url: Self::TYPE_URL.to_owned(),
            value: self.to_proto().encode_to_vec(),
        }
    }
}

/// Any message that can go into a [crate::TxBody].
///
/// Messages this library does not know about are kept as they arrived:
/// [Msg::Other] from protobuf, which cannot be converted to JSON, and
/// [Msg::OtherJson] from JSON, which cannot be encoded as protobuf.
#[derive(Clone, Debug, PartialEq)]
pub enum Msg {
    Send(MsgSend),
    MultiSend(MsgMultiSend),
    Delegate(MsgDelegate),
    Undelegate(MsgUndelegate),
    BeginRedelegate(MsgBeginRedelegate),
    WithdrawDelegatorReward(MsgWithdrawDelegatorReward),
    Other(Any),
    /// LCD JSON of an unknown message, including its `@type` field.
    OtherJson(Value),
}

/// Run the same generic expression against whichever known message is inside.
macro_rules! with_known {
    ($msg:expr, $inner:ident => $known:expr, $any:ident => $other:expr, $json:ident => $other_json:expr) => {
        match $msg {
            Msg::Send($inner) => $known,
            Msg::MultiSend($inner) => $known,
            Msg::Delegate($inner) => $known,
            Msg::Undelegate($inner) => $known,
            Msg::BeginRedelegate($inner) => $known,
            Msg::WithdrawDelegatorReward($inner) => $known,
            Msg::Other($any) => $other,
            Msg::OtherJson($json) => $other_json,
        }
    };
}

struct KnownMsg {
    type_url: &'static str,
    from_json: fn(Value) -> Result<Msg, ChainParseError>,
    from_any: fn(&Any) -> Result<Msg, ChainParseError>,
}

impl KnownMsg {
    fn of<T: ChainMsg>() -> Self {
        KnownMsg {
            type_url: T::TYPE_URL,
            from_json: msg_from_json::<T>,
            from_any: msg_from_any::<T>,
        }
    }
}

fn known_msgs() -> [KnownMsg; 6] {
    [
        KnownMsg::of::<MsgSend>(),
        KnownMsg::of::<MsgMultiSend>(),
        KnownMsg::of::<MsgDelegate>(),
        KnownMsg::of::<MsgUndelegate>(),
        KnownMsg::of::<MsgBeginRedelegate>(),
        KnownMsg::of::<MsgWithdrawDelegatorReward>(),
    ]
}

fn find_known(type_url: &str) -> Option<KnownMsg> {
    known_msgs().into_iter().find(|x| x.type_url == type_url)
}

fn msg_from_json<T: ChainMsg>(value: Value) -> Result<Msg, ChainParseError> {
    serde_json::from_value::<T>(value)
        .map(Into::into)
        .map_err(|source| ChainParseError::Json {
            type_url: T::TYPE_URL.to_owned(),
            source,
        })
}

fn msg_from_any<T: ChainMsg>(any: &Any) -> Result<Msg, ChainParseError> {
    let proto = T::Proto::decode(any.value.as_slice()).map_err(|source| {
        ChainParseError::Decode {
            type_url: any.type_url.clone(),
            source,
        }
    })?;
    T::from_proto(proto).map(Into::into)
}

fn type_url_of<T: ChainMsg>(_: &T) -> &'static str {
    T::TYPE_URL
}

fn tagged_json<T: ChainMsg>(msg: &T) -> Result<Value, ChainParseError> {
    let mut value = serde_json::to_value(msg).map_err(|source| ChainParseError::Json {
        type_url: T::TYPE_URL.to_owned(),
        source,
    })?;
    if let Value::Object(map) = &mut value {
        map.insert("@type".to_owned(), Value::String(T::TYPE_URL.to_owned()));
    }
    Ok(value)
}

fn amino_json<T: ChainMsg>(msg: &T) -> Result<Value, ChainParseError> {
    let value = serde_json::to_value(msg).map_err(|source| ChainParseError::Json {
        type_url: T::TYPE_URL.to_owned(),
        source,
    })?;
    Ok(serde_json::json!({
        "type": T::AMINO_NAME,
        "value": value,
    }))
}

fn json_type_url(value: &Value) -> &str {
    value
        .get("@type")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn unsupported(type_url: &str) -> ChainParseError {
    ChainParseError::UnsupportedMessage {
        type_url: type_url.to_owned(),
    }
}

impl Msg {
    pub fn type_url(&self) -> &str {
        with_known!(self, msg => type_url_of(msg), any => &any.type_url, json => json_type_url(json))
    }

    /// Protobuf `Any`. Fails for [Msg::OtherJson], whose encoding is unknown.
    pub fn pack_any(&self) -> Result<Any, ChainParseError> {
        with_known!(
            self,
            msg => Ok(msg.pack_any()),
            any => Ok(any.clone()),
            json => Err(unsupported(json_type_url(json)))
        )
    }

    /// Decode a protobuf `Any`. Unknown type URLs are kept as [Msg::Other].
    pub fn unpack_any(any: &Any) -> Result<Self, ChainParseError> {
        match find_known(&any.type_url) {
            Some(known) => (known.from_any)(any),
            None => Ok(Msg::Other(any.clone())),
        }
    }

    /// Amino JSON form (`{"type": ..., "value": ...}`) used in legacy sign docs.
    pub fn to_amino_json(&self) -> Result<Value, ChainParseError> {
        with_known!(
            self,
            msg => amino_json(msg),
            any => Err(unsupported(&any.type_url)),
            json => Err(unsupported(json_type_url(json)))
        )
    }

    pub fn describe(&self) -> String {
        with_known!(
            self,
            msg => msg.describe(),
            any => format!("Message of type {}", any.type_url),
            json => format!("Message of type {}", json_type_url(json))
        )
    }

    /// LCD JSON form with the `@type` field inlined.
    pub fn to_json(&self) -> Result<Value, ChainParseError> {
        with_known!(
            self,
            msg => tagged_json(msg),
            any => Err(unsupported(&any.type_url)),
            json => Ok(json.clone())
        )
    }

    /// Unknown `@type`s are kept as [Msg::OtherJson].
    pub fn from_json(mut value: Value) -> Result<Self, ChainParseError> {
        let type_url = value
            .get("@type")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
            .ok_or(ChainParseError::MissingField {
                field: "@type",
                context: "message",
            })?;
        match find_known(&type_url) {
            Some(known) => {
                if let Some(map) = value.as_object_mut() {
                    map.remove("@type");
                }
                (known.from_json)(value)
            }
            None => Ok(Msg::OtherJson(value)),
        }
    }
}

impl Serialize for Msg {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Msg {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Msg::from_json(Value::deserialize(deserializer)?).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Coin, Coins};

    use super::*;

    fn send() -> Msg {
        MsgSend {
            from_address: "cosmos1from".to_owned(),
            to_address: "cosmos1to".to_owned(),
            amount: "100uatom".parse().unwrap(),
        }
        .into()
    }

    #[test]
    fn json_has_type_tag() {
        let json = serde_json::to_value(send()).unwrap();
        assert_eq!(json["@type"], "/cosmos.bank.v1beta1.MsgSend");
        assert_eq!(json["amount"][0]["amount"], "100");
        let back: Msg = serde_json::from_value(json).unwrap();
        assert_eq!(back, send());
    }

    #[test]
    fn unknown_json_type_is_preserved() {
        let json = serde_json::json!({
            "@type": "/ibc.applications.transfer.v1.MsgTransfer",
            "source_port": "transfer",
            "token": {"denom": "uatom", "amount": "5"}
        });
        let msg: Msg = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(msg, Msg::OtherJson(json.clone()));
        assert_eq!(msg.type_url(), "/ibc.applications.transfer.v1.MsgTransfer");
        assert_eq!(
            msg.describe(),
            "Message of type /ibc.applications.transfer.v1.MsgTransfer"
        );
        assert_eq!(serde_json::to_value(&msg).unwrap(), json);
        assert!(matches!(
            msg.pack_any(),
            Err(ChainParseError::UnsupportedMessage { type_url })
                if type_url == "/ibc.applications.transfer.v1.MsgTransfer"
        ));
        msg.to_amino_json().unwrap_err();

        Msg::from_json(serde_json::json!({"from_address": "x"})).unwrap_err();
    }

    #[test]
    fn any_roundtrip() {
        let delegate: Msg = MsgDelegate {
            delegator_address: "cosmos1del".to_owned(),
            validator_address: "cosmosvaloper1val".to_owned(),
            amount: Coin::new(5, "uatom"),
        }
        .into();
        let any = delegate.pack_any().unwrap();
        assert_eq!(any.type_url, "/cosmos.staking.v1beta1.MsgDelegate");
        assert_eq!(Msg::unpack_any(&any).unwrap(), delegate);
    }

    #[test]
    fn unknown_any_is_preserved() {
        let any = Any {
            type_url: "/cosmwasm.wasm.v1.MsgExecuteContract".to_owned(),
            value: vec![1, 2, 3],
        };
        let msg = Msg::unpack_any(&any).unwrap();
        assert_eq!(msg.type_url(), "/cosmwasm.wasm.v1.MsgExecuteContract");
        assert_eq!(msg.pack_any().unwrap(), any);
        msg.to_json().unwrap_err();
        msg.to_amino_json().unwrap_err();
    }

    #[test]
    fn amino_json_shape() {
        let json = send().to_amino_json().unwrap();
        assert_eq!(json["type"], "cosmos-sdk/MsgSend");
        assert_eq!(json["value"]["to_address"], "cosmos1to");

        let withdraw: Msg = MsgWithdrawDelegatorReward {
            delegator_address: "cosmos1del".to_owned(),
            validator_address: "cosmosvaloper1val".to_owned(),
        }
        .into();
        assert_eq!(
            withdraw.to_amino_json().unwrap()["type"],
            "cosmos-sdk/MsgWithdrawDelegationReward"
        );
    }

    #[test]
    fn multi_send_any_roundtrip() {
        let coins: Coins = "7uatom".parse().unwrap();
        let msg: Msg = MsgMultiSend {
            inputs: vec![Input {
                address: "cosmos1a".to_owned(),
                coins: coins.clone(),
            }],
            outputs: vec![Output {
                address: "cosmos1b".to_owned(),
                coins,
            }],
        }
        .into();
        assert_eq!(Msg::unpack_any(&msg.pack_any().unwrap()).unwrap(), msg);
        assert_eq!(msg.describe(), "cosmos1a sending 7uatom to cosmos1b");
    }
}
