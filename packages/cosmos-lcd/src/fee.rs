//! Transaction fee.

use cosmos_sdk_proto::cosmos::tx::v1beta1 as proto;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use crate::{error::ChainParseError, Coins};

/// Amount paid for a transaction along with its gas limit.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Fee {
    pub amount: Coins,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub gas_limit: u64,
    /// Account paying the fee, empty for the first signer.
    #[serde(default)]
    pub payer: String,
    /// Fee grant account, empty if none.
    #[serde(default)]
    pub granter: String,
}

impl Fee {
    pub fn new(gas_limit: u64, amount: Coins) -> Self {
        Fee {
            amount,
            gas_limit,
            payer: String::new(),
            granter: String::new(),
        }
    }

    pub fn to_proto(&self) -> proto::Fee {
        proto::Fee {
            amount: self.amount.to_proto(),
            gas_limit: self.gas_limit,
            payer: self.payer.clone(),
            granter: self.granter.clone(),
        }
    }

    pub fn from_proto(proto: proto::Fee) -> Result<Self, ChainParseError> {
        Ok(Fee {
            amount: Coins::from_proto(proto.amount)?,
            gas_limit: proto.gas_limit,
            payer: proto.payer,
            granter: proto.granter,
        })
    }

    /// `StdFee` as used in legacy amino sign docs.
    pub fn to_amino_json(&self) -> serde_json::Value {
        let mut json = serde_json::json!({
            "amount": self.amount,
            "gas": self.gas_limit.to_string(),
        });
        if let Some(map) = json.as_object_mut() {
            if !self.payer.is_empty() {
                map.insert("payer".to_owned(), self.payer.clone().into());
            }
            if !self.granter.is_empty() {
                map.insert("granter".to_owned(), self.granter.clone().into());
            }
        }
        json
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lcd_json() {
        let fee: Fee = serde_json::from_str(
            r#"{"amount":[{"denom":"uatom","amount":"5000"}],"gas_limit":"200000","payer":"","granter":""}"#,
        )
        .unwrap();
        assert_eq!(fee, Fee::new(200000, "5000uatom".parse().unwrap()));
        assert_eq!(serde_json::to_value(&fee).unwrap()["gas_limit"], "200000");

        let numeric: Fee = serde_json::from_str(r#"{"amount":[],"gas_limit":10}"#).unwrap();
        assert_eq!(numeric.gas_limit, 10);
    }

    #[test]
    fn amino_json() {
        let mut fee = Fee::new(100, "3uatom".parse().unwrap());
        assert_eq!(
            fee.to_amino_json(),
            serde_json::json!({"amount": [{"denom": "uatom", "amount": "3"}], "gas": "100"})
        );
        fee.granter = "cosmos1granter".to_owned();
        assert_eq!(fee.to_amino_json()["granter"], "cosmos1granter");
    }

    #[test]
    fn proto_roundtrip() {
        let fee = Fee::new(7, "1uatom,2uluna".parse().unwrap());
        assert_eq!(Fee::from_proto(fee.to_proto()).unwrap(), fee);
    }
}
