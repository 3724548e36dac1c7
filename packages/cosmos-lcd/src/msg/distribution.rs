use cosmos_sdk_proto::cosmos::distribution::v1beta1 as proto;
use serde::{Deserialize, Serialize};

use crate::error::ChainParseError;

use super::{ChainMsg, Msg};

/// Claim staking rewards from a single validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgWithdrawDelegatorReward {
    pub delegator_address: String,
    pub validator_address: String,
}

impl ChainMsg for MsgWithdrawDelegatorReward {
    const TYPE_URL: &'static str = "/cosmos.distribution.v1beta1.MsgWithdrawDelegatorReward";
    const AMINO_NAME: &'static str = "cosmos-sdk/MsgWithdrawDelegationReward";

    type Proto = proto::MsgWithdrawDelegatorReward;

    fn to_proto(&self) -> Self::Proto {
        proto::MsgWithdrawDelegatorReward {
            delegator_address: self.delegator_address.clone(),
            validator_address: self.validator_address.clone(),
        }
    }

    fn from_proto(proto: Self::Proto) -> Result<Self, ChainParseError> {
        Ok(MsgWithdrawDelegatorReward {
            delegator_address: proto.delegator_address,
            validator_address: proto.validator_address,
        })
    }

    fn describe(&self) -> String {
        format!(
            "{} withdrawing rewards from {}",
            self.delegator_address, self.validator_address
        )
    }
}

impl From<MsgWithdrawDelegatorReward> for Msg {
    fn from(msg: MsgWithdrawDelegatorReward) -> Self {
        Msg::WithdrawDelegatorReward(msg)
    }
}
