use std::{fmt::Display, str::FromStr};

use anyhow::Result;
use serde::de::Visitor;

use crate::{key::TERRA_COIN_TYPE, AddressHrp, GasPrices, LcdClient, LcdClientBuilder};

/// Well-known networks with public LCD endpoints.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum LcdNetwork {
    CosmosHubMainnet,
    CosmosHubTestnet,
    CosmosLocal,
    TerraClassic,
}

impl LcdNetwork {
    pub fn all() -> [LcdNetwork; 4] {
        [
            LcdNetwork::CosmosHubMainnet,
            LcdNetwork::CosmosHubTestnet,
            LcdNetwork::CosmosLocal,
            LcdNetwork::TerraClassic,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LcdNetwork::CosmosHubMainnet => "cosmoshub-mainnet",
            LcdNetwork::CosmosHubTestnet => "cosmoshub-testnet",
            LcdNetwork::CosmosLocal => "cosmos-local",
            LcdNetwork::TerraClassic => "terra-classic",
        }
    }

    pub async fn connect(self) -> Result<LcdClient> {
        self.builder().build().await
    }

    pub fn builder(self) -> LcdClientBuilder {
        match self {
            LcdNetwork::CosmosHubMainnet => LcdClientBuilder::new(
                "cosmoshub-4",
                GasPrices::new("uatom", 0.025),
                AddressHrp::Cosmos,
                "https://cosmos-rest.publicnode.com",
            ),
            LcdNetwork::CosmosHubTestnet => LcdClientBuilder::new(
                "theta-testnet-001",
                GasPrices::new("uatom", 0.025),
                AddressHrp::Cosmos,
                "https://rest.sentry-01.theta-testnet.polypore.xyz",
            ),
            LcdNetwork::CosmosLocal => {
                let mut builder = LcdClientBuilder::new(
                    "testing",
                    GasPrices::new("stake", 0.025),
                    AddressHrp::Cosmos,
                    "http://localhost:1317",
                );
                builder.set_transaction_attempts(Some(10));
                builder
            }
            LcdNetwork::TerraClassic => {
                let mut builder = LcdClientBuilder::new(
                    "columbus-5",
                    GasPrices::new("uluna", 28.325),
                    AddressHrp::Terra,
                    "https://terra-classic-lcd.publicnode.com",
                );
                builder.set_coin_type(Some(TERRA_COIN_TYPE));
                builder
            }
        }
    }
}

impl serde::Serialize for LcdNetwork {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for LcdNetwork {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(LcdNetworkVisitor)
    }
}

struct LcdNetworkVisitor;

impl<'de> Visitor<'de> for LcdNetworkVisitor {
    type Value = LcdNetwork;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("LcdNetwork")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        LcdNetwork::from_str(v).map_err(E::custom)
    }
}

impl Display for LcdNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LcdNetwork {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LcdNetwork::all()
            .into_iter()
            .find(|network| network.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown network: {s}"))
    }
}
