use std::collections::BTreeMap;

use anyhow::Context;
use chrono::{DateTime, Utc};
use cosmos_sdk_proto::{
    cosmos::{base::abci::v1beta1 as abci, tx::v1beta1 as proto},
    traits::Message,
    Any,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use crate::error::ChainParseError;

use super::{Tx, TX_TYPE_URL};

/// Attribute values per attribute key, per event type.
pub type EventsByType = BTreeMap<String, BTreeMap<String, Vec<String>>>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub value: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringEvent {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl From<abci::StringEvent> for StringEvent {
    fn from(event: abci::StringEvent) -> Self {
        StringEvent {
            type_: event.r#type,
            attributes: event
                .attributes
                .into_iter()
                .map(|attr| Attribute {
                    key: attr.key,
                    value: attr.value,
                })
                .collect(),
        }
    }
}

impl From<&StringEvent> for abci::StringEvent {
    fn from(event: &StringEvent) -> Self {
        abci::StringEvent {
            r#type: event.type_.clone(),
            attributes: event
                .attributes
                .iter()
                .map(|attr| abci::Attribute {
                    key: attr.key.clone(),
                    value: attr.value.clone(),
                })
                .collect(),
        }
    }
}

/// Index event attributes by event type and attribute key, keeping order of values.
pub fn parse_events_by_type(events: &[StringEvent]) -> EventsByType {
    let mut by_type = EventsByType::new();
    for event in events {
        for attr in &event.attributes {
            by_type
                .entry(event.type_.clone())
                .or_default()
                .entry(attr.key.clone())
                .or_default()
                .push(attr.value.clone());
        }
    }
    by_type
}

/// Events emitted by one message of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTxLog")]
pub struct TxLog {
    /// Position of the message inside its transaction.
    pub msg_index: u32,
    /// Error details of the message, if any.
    pub log: String,
    pub events: Vec<StringEvent>,
    #[serde(skip_serializing)]
    pub events_by_type: EventsByType,
}

impl TxLog {
    pub fn new(msg_index: u32, log: String, events: Vec<StringEvent>) -> Self {
        let events_by_type = parse_events_by_type(&events);
        TxLog {
            msg_index,
            log,
            events,
            events_by_type,
        }
    }

    /// All values for an attribute of an event type, empty if none.
    pub fn attribute_values(&self, event_type: &str, key: &str) -> &[String] {
        self.events_by_type
            .get(event_type)
            .and_then(|attrs| attrs.get(key))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn to_proto(&self) -> abci::AbciMessageLog {
        abci::AbciMessageLog {
            msg_index: self.msg_index,
            log: self.log.clone(),
            events: self.events.iter().map(Into::into).collect(),
        }
    }

    pub fn from_proto(log: abci::AbciMessageLog) -> Self {
        TxLog::new(
            log.msg_index,
            log.log,
            log.events.into_iter().map(Into::into).collect(),
        )
    }
}

#[serde_as]
#[derive(Deserialize)]
struct RawTxLog {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default)]
    msg_index: u32,
    #[serde(default, deserialize_with = "null_as_empty")]
    log: String,
    #[serde(default)]
    events: Vec<StringEvent>,
}

impl From<RawTxLog> for TxLog {
    fn from(raw: RawTxLog) -> Self {
        TxLog::new(raw.msg_index, raw.log, raw.events)
    }
}

/// Wire layout of a Tendermint ABCI event.
///
/// Attributes are `bytes` in Tendermint 0.34 and `string` afterwards, both
/// encode identically.
#[derive(Clone, PartialEq, prost::Message)]
struct AbciEvent {
    #[prost(string, tag = "1")]
    r#type: String,
    #[prost(message, repeated, tag = "2")]
    attributes: Vec<AbciEventAttribute>,
}

#[derive(Clone, PartialEq, prost::Message)]
struct AbciEventAttribute {
    #[prost(bytes = "vec", tag = "1")]
    key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    value: Vec<u8>,
}

const ABCI_EVENT: &str = "/tendermint.abci.Event";

fn event_from_proto<E: Message>(event: &E) -> Result<StringEvent, ChainParseError> {
    let event = AbciEvent::decode(event.encode_to_vec().as_slice()).map_err(|source| {
        ChainParseError::Decode {
            type_url: ABCI_EVENT.to_owned(),
            source,
        }
    })?;
    Ok(StringEvent {
        type_: event.r#type,
        attributes: event
            .attributes
            .into_iter()
            .map(|attr| Attribute {
                key: String::from_utf8_lossy(&attr.key).into_owned(),
                value: String::from_utf8_lossy(&attr.value).into_owned(),
            })
            .collect(),
    })
}

fn event_to_proto<E: Message + Default>(event: &StringEvent) -> Result<E, ChainParseError> {
    let event = AbciEvent {
        r#type: event.type_.clone(),
        attributes: event
            .attributes
            .iter()
            .map(|attr| AbciEventAttribute {
                key: attr.key.clone().into_bytes(),
                value: attr.value.clone().into_bytes(),
            })
            .collect(),
    };
    E::decode(event.encode_to_vec().as_slice()).map_err(|source| ChainParseError::Decode {
        type_url: ABCI_EVENT.to_owned(),
        source,
    })
}

const ABCI_MESSAGE_LOG: &str = "/cosmos.base.abci.v1beta1.ABCIMessageLog";

/// Parse the `logs` array of a transaction response.
///
/// The message index is taken from each entry's position. Returns `None`
/// when there are no logs.
pub fn parse_tx_logs(logs: &[serde_json::Value]) -> Result<Option<Vec<TxLog>>, ChainParseError> {
    if logs.is_empty() {
        return Ok(None);
    }
    logs.iter()
        .enumerate()
        .map(|(idx, log)| {
            let raw = RawTxLog::deserialize(log).map_err(|source| ChainParseError::Json {
                type_url: ABCI_MESSAGE_LOG.to_owned(),
                source,
            })?;
            Ok(TxLog::new(idx as u32, raw.log, raw.events))
        })
        .collect::<Result<_, _>>()
        .map(Some)
}

/// Same as [parse_tx_logs] for protobuf logs, which carry their own index.
pub fn parse_tx_logs_proto(logs: Vec<abci::AbciMessageLog>) -> Option<Vec<TxLog>> {
    if logs.is_empty() {
        None
    } else {
        Some(logs.into_iter().map(TxLog::from_proto).collect())
    }
}

fn deserialize_logs<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<TxLog>>, D::Error> {
    let logs = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    parse_tx_logs(&logs).map_err(serde::de::Error::custom)
}

fn deserialize_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(Option::<u32>::deserialize(deserializer)?.filter(|code| *code != 0))
}

fn deserialize_codespace<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.filter(|codespace| !codespace.is_empty()))
}

/// A transaction which has been included in a block.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TxInfo {
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub height: i64,
    pub txhash: String,
    #[serde(default)]
    pub raw_log: String,
    #[serde(
        default,
        deserialize_with = "deserialize_logs",
        skip_serializing_if = "Option::is_none"
    )]
    pub logs: Option<Vec<TxLog>>,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub gas_wanted: i64,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub gas_used: i64,
    pub tx: Tx,
    pub timestamp: String,
    /// Events of the whole transaction, reported by newer nodes instead of `logs`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<StringEvent>,
    /// Set when the transaction failed during execution.
    #[serde(
        default,
        deserialize_with = "deserialize_code",
        skip_serializing_if = "Option::is_none"
    )]
    pub code: Option<u32>,
    #[serde(
        default,
        deserialize_with = "deserialize_codespace",
        skip_serializing_if = "Option::is_none"
    )]
    pub codespace: Option<String>,
}

impl TxInfo {
    pub fn is_success(&self) -> bool {
        self.code.is_none()
    }

    pub fn parse_timestamp(&self) -> anyhow::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|x| x.with_timezone(&Utc))
            .with_context(|| format!("Invalid transaction timestamp {:?}", self.timestamp))
    }

    /// Values of an event attribute across all messages, falling back to the
    /// transaction level events when there are no logs.
    pub fn attribute_values(&self, event_type: &str, key: &str) -> Vec<&str> {
        match &self.logs {
            Some(logs) => logs
                .iter()
                .flat_map(|log| log.attribute_values(event_type, key))
                .map(String::as_str)
                .collect(),
            None => self
                .events
                .iter()
                .filter(|event| event.type_ == event_type)
                .flat_map(|event| &event.attributes)
                .filter(|attr| attr.key == key)
                .map(|attr| attr.value.as_str())
                .collect(),
        }
    }

    pub fn from_proto(proto: abci::TxResponse) -> Result<Self, ChainParseError> {
        let any = proto.tx.ok_or(ChainParseError::MissingField {
            field: "tx",
            context: "TxResponse",
        })?;
        if any.type_url != TX_TYPE_URL {
            return Err(ChainParseError::InvalidValue {
                field: "tx.type_url",
                value: any.type_url,
            });
        }
        let tx = proto::Tx::decode(any.value.as_slice()).map_err(|source| {
            ChainParseError::Decode {
                type_url: TX_TYPE_URL.to_owned(),
                source,
            }
        })?;
        Ok(TxInfo {
            height: proto.height,
            txhash: proto.txhash,
            raw_log: proto.raw_log,
            logs: parse_tx_logs_proto(proto.logs),
            gas_wanted: proto.gas_wanted,
            gas_used: proto.gas_used,
            tx: Tx::from_proto(tx)?,
            timestamp: proto.timestamp,
            events: proto
                .events
                .iter()
                .map(event_from_proto)
                .collect::<Result<_, _>>()?,
            code: Some(proto.code).filter(|code| *code != 0),
            codespace: Some(proto.codespace).filter(|codespace| !codespace.is_empty()),
        })
    }

    pub fn to_proto(&self) -> Result<abci::TxResponse, ChainParseError> {
        Ok(abci::TxResponse {
            height: self.height,
            txhash: self.txhash.clone(),
            codespace: self.codespace.clone().unwrap_or_default(),
            code: self.code.unwrap_or_default(),
            raw_log: self.raw_log.clone(),
            logs: self
                .logs
                .iter()
                .flatten()
                .map(TxLog::to_proto)
                .collect(),
            gas_wanted: self.gas_wanted,
            gas_used: self.gas_used,
            tx: Some(Any {
                type_url: TX_TYPE_URL.to_owned(),
                value: self.tx.to_bytes()?,
            }),
            timestamp: self.timestamp.clone(),
            events: self
                .events
                .iter()
                .map(event_to_proto)
                .collect::<Result<_, _>>()?,
            ..Default::default()
        })
    }
}
