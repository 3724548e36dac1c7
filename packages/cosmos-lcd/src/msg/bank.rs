use cosmos_sdk_proto::cosmos::bank::v1beta1 as proto;
use serde::{Deserialize, Serialize};

use crate::{address::HasAddress, error::ChainParseError, Coins};

use super::{ChainMsg, Msg};

/// Send coins from one account to another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSend {
    pub from_address: String,
    pub to_address: String,
    pub amount: Coins,
}

impl MsgSend {
    pub fn new(from: impl HasAddress, to: impl HasAddress, amount: Coins) -> Self {
        MsgSend {
            from_address: from.get_address_string(),
            to_address: to.get_address_string(),
            amount,
        }
    }
}

impl ChainMsg for MsgSend {
    const TYPE_URL: &'static str = "/cosmos.bank.v1beta1.MsgSend";
    const AMINO_NAME: &'static str = "cosmos-sdk/MsgSend";

    type Proto = proto::MsgSend;

    fn to_proto(&self) -> Self::Proto {
        proto::MsgSend {
            from_address: self.from_address.clone(),
            to_address: self.to_address.clone(),
            amount: self.amount.to_proto(),
        }
    }

    fn from_proto(proto: Self::Proto) -> Result<Self, ChainParseError> {
        Ok(MsgSend {
            from_address: proto.from_address,
            to_address: proto.to_address,
            amount: Coins::from_proto(proto.amount)?,
        })
    }

    fn describe(&self) -> String {
        format!(
            "{} sending {} to {}",
            self.from_address, self.amount, self.to_address
        )
    }
}

impl From<MsgSend> for Msg {
    fn from(msg: MsgSend) -> Self {
        Msg::Send(msg)
    }
}

/// One side of a [MsgMultiSend].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub address: String,
    pub coins: Coins,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub address: String,
    pub coins: Coins,
}

/// Send from one or more inputs to many outputs. The sums must match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgMultiSend {
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
}

impl ChainMsg for MsgMultiSend {
    const TYPE_URL: &'static str = "/cosmos.bank.v1beta1.MsgMultiSend";
    const AMINO_NAME: &'static str = "cosmos-sdk/MsgMultiSend";

    type Proto = proto::MsgMultiSend;

    fn to_proto(&self) -> Self::Proto {
        proto::MsgMultiSend {
            inputs: self
                .inputs
                .iter()
                .map(|input| proto::Input {
                    address: input.address.clone(),
                    coins: input.coins.to_proto(),
                })
                .collect(),
            outputs: self
                .outputs
                .iter()
                .map(|output| proto::Output {
                    address: output.address.clone(),
                    coins: output.coins.to_proto(),
                })
                .collect(),
        }
    }

    fn from_proto(proto: Self::Proto) -> Result<Self, ChainParseError> {
        Ok(MsgMultiSend {
            inputs: proto
                .inputs
                .into_iter()
                .map(|input| {
                    Ok(Input {
                        address: input.address,
                        coins: Coins::from_proto(input.coins)?,
                    })
                })
                .collect::<Result<_, ChainParseError>>()?,
            outputs: proto
                .outputs
                .into_iter()
                .map(|output| {
                    Ok(Output {
                        address: output.address,
                        coins: Coins::from_proto(output.coins)?,
                    })
                })
                .collect::<Result<_, ChainParseError>>()?,
        })
    }

    fn describe(&self) -> String {
        let from = self
            .inputs
            .iter()
            .map(|x| x.address.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let total = self
            .outputs
            .iter()
            .fold(Coins::new(), |acc, x| acc.add(&x.coins));
        let to = self
            .outputs
            .iter()
            .map(|x| x.address.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("{from} sending {total} to {to}")
    }
}

impl From<MsgMultiSend> for Msg {
    fn from(msg: MsgMultiSend) -> Self {
        Msg::MultiSend(msg)
    }
}
