use cosmos_sdk_proto::cosmos::staking::v1beta1 as proto;
use serde::{Deserialize, Serialize};

use crate::{error::ChainParseError, Coin};

use super::{ChainMsg, Msg};

fn required_amount(
    amount: Option<cosmos_sdk_proto::cosmos::base::v1beta1::Coin>,
    context: &'static str,
) -> Result<Coin, ChainParseError> {
    amount
        .ok_or(ChainParseError::MissingField {
            field: "amount",
            context,
        })?
        .try_into()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDelegate {
    pub delegator_address: String,
    pub validator_address: String,
    pub amount: Coin,
}

impl ChainMsg for MsgDelegate {
    const TYPE_URL: &'static str = "/cosmos.staking.v1beta1.MsgDelegate";
    const AMINO_NAME: &'static str = "cosmos-sdk/MsgDelegate";

    type Proto = proto::MsgDelegate;

    fn to_proto(&self) -> Self::Proto {
        proto::MsgDelegate {
            delegator_address: self.delegator_address.clone(),
            validator_address: self.validator_address.clone(),
            amount: Some(self.amount.clone().into()),
        }
    }

    fn from_proto(proto: Self::Proto) -> Result<Self, ChainParseError> {
        Ok(MsgDelegate {
            delegator_address: proto.delegator_address,
            validator_address: proto.validator_address,
            amount: required_amount(proto.amount, "MsgDelegate")?,
        })
    }

    fn describe(&self) -> String {
        format!(
            "{} delegating {} to {}",
            self.delegator_address, self.amount, self.validator_address
        )
    }
}

impl From<MsgDelegate> for Msg {
    fn from(msg: MsgDelegate) -> Self {
        Msg::Delegate(msg)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUndelegate {
    pub delegator_address: String,
    pub validator_address: String,
    pub amount: Coin,
}

impl ChainMsg for MsgUndelegate {
    const TYPE_URL: &'static str = "/cosmos.staking.v1beta1.MsgUndelegate";
    const AMINO_NAME: &'static str = "cosmos-sdk/MsgUndelegate";

    type Proto = proto::MsgUndelegate;

    fn to_proto(&self) -> Self::Proto {
        proto::MsgUndelegate {
            delegator_address: self.delegator_address.clone(),
            validator_address: self.validator_address.clone(),
            amount: Some(self.amount.clone().into()),
        }
    }

    fn from_proto(proto: Self::Proto) -> Result<Self, ChainParseError> {
        Ok(MsgUndelegate {
            delegator_address: proto.delegator_address,
            validator_address: proto.validator_address,
            amount: required_amount(proto.amount, "MsgUndelegate")?,
        })
    }

    fn describe(&self) -> String {
        format!(
            "{} undelegating {} from {}",
            self.delegator_address, self.amount, self.validator_address
        )
    }
}

impl From<MsgUndelegate> for Msg {
    fn from(msg: MsgUndelegate) -> Self {
        Msg::Undelegate(msg)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgBeginRedelegate {
    pub delegator_address: String,
    pub validator_src_address: String,
    pub validator_dst_address: String,
    pub amount: Coin,
}

impl ChainMsg for MsgBeginRedelegate {
    const TYPE_URL: &'static str = "/cosmos.staking.v1beta1.MsgBeginRedelegate";
    const AMINO_NAME: &'static str = "cosmos-sdk/MsgBeginRedelegate";

    type Proto = proto::MsgBeginRedelegate;

    fn to_proto(&self) -> Self::Proto {
        proto::MsgBeginRedelegate {
            delegator_address: self.delegator_address.clone(),
            validator_src_address: self.validator_src_address.clone(),
            validator_dst_address: self.validator_dst_address.clone(),
            amount: Some(self.amount.clone().into()),
        }
    }

    fn from_proto(proto: Self::Proto) -> Result<Self, ChainParseError> {
        Ok(MsgBeginRedelegate {
            delegator_address: proto.delegator_address,
            validator_src_address: proto.validator_src_address,
            validator_dst_address: proto.validator_dst_address,
            amount: required_amount(proto.amount, "MsgBeginRedelegate")?,
        })
    }

    fn describe(&self) -> String {
        format!(
            "{} redelegating {} from {} to {}",
            self.delegator_address,
            self.amount,
            self.validator_src_address,
            self.validator_dst_address
        )
    }
}

impl From<MsgBeginRedelegate> for Msg {
    fn from(msg: MsgBeginRedelegate) -> Self {
        Msg::BeginRedelegate(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_amount() {
        let proto = proto::MsgUndelegate {
            delegator_address: "cosmos1del".to_owned(),
            validator_address: "cosmosvaloper1val".to_owned(),
            amount: None,
        };
        assert!(matches!(
            MsgUndelegate::from_proto(proto),
            Err(ChainParseError::MissingField {
                field: "amount",
                context: "MsgUndelegate"
            })
        ));
    }

    #[test]
    fn redelegate_json() {
        let msg: MsgBeginRedelegate = serde_json::from_value(serde_json::json!({
            "delegator_address": "cosmos1del",
            "validator_src_address": "cosmosvaloper1a",
            "validator_dst_address": "cosmosvaloper1b",
            "amount": {"denom": "uatom", "amount": "42"},
        }))
        .unwrap();
        assert_eq!(msg.amount, Coin::new(42, "uatom"));
        assert_eq!(
            MsgBeginRedelegate::from_proto(msg.to_proto()).unwrap(),
            msg
        );
    }
}
