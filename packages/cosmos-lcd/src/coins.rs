//! Coin amounts and gas prices.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use anyhow::Context;
use cosmos_sdk_proto::cosmos::base::v1beta1::Coin as ProtoCoin;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::error::ChainParseError;

/// A single amount of a single denomination.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde_as(as = "DisplayFromStr")]
    pub amount: u128,
}

impl Coin {
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Coin {
            denom: denom.into(),
            amount,
        }
    }
}

impl Display for Coin {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

fn validate_denom(denom: &str) -> anyhow::Result<()> {
    let mut chars = denom.chars();
    let first = chars.next().context("Must not have an empty denom")?;
    anyhow::ensure!(
        first.is_ascii_alphabetic(),
        "Denom must start with an ASCII letter"
    );
    anyhow::ensure!(
        chars.all(|c| c.is_ascii_alphanumeric() || "/:._-".contains(c)),
        "Denom contains invalid characters"
    );
    Ok(())
}

/// Split `"123uatom"` into its amount and denom parts.
fn split_amount(s: &str, is_amount_char: impl Fn(char) -> bool) -> anyhow::Result<(&str, &str)> {
    anyhow::ensure!(!s.is_empty(), "Cannot parse empty string");
    let idx = s
        .find(|c: char| !is_amount_char(c))
        .context("No denom found")?;
    let (amount, denom) = s.split_at(idx);
    anyhow::ensure!(!amount.is_empty(), "Must not have an empty amount");
    validate_denom(denom)?;
    Ok((amount, denom))
}

impl FromStr for Coin {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        (|| -> anyhow::Result<Coin> {
            let (amount, denom) = split_amount(s, |c| c.is_ascii_digit())?;
            Ok(Coin {
                denom: denom.to_owned(),
                amount: amount.parse()?,
            })
        })()
        .with_context(|| format!("Could not parse coin value {s:?}"))
    }
}

impl From<Coin> for ProtoCoin {
    fn from(Coin { denom, amount }: Coin) -> Self {
        ProtoCoin {
            denom,
            amount: amount.to_string(),
        }
    }
}

impl TryFrom<ProtoCoin> for Coin {
    type Error = ChainParseError;

    fn try_from(ProtoCoin { denom, amount }: ProtoCoin) -> Result<Self, Self::Error> {
        match amount.parse() {
            Ok(parsed) => Ok(Coin {
                denom,
                amount: parsed,
            }),
            Err(_) => Err(ChainParseError::InvalidCoinAmount { denom, amount }),
        }
    }
}

/// A set of coins with at most one entry per denom, ordered by denom.
///
/// Zero amounts are never stored.
#[derive(Clone, PartialEq, Eq, Default, Hash)]
pub struct Coins(BTreeMap<String, u128>);

impl Coins {
    pub fn new() -> Self {
        Coins::default()
    }

    /// Amount held for the given denom, 0 if absent.
    pub fn get(&self, denom: &str) -> u128 {
        self.0.get(denom).copied().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn denoms(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|x| x.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = Coin> + '_ {
        self.0.iter().map(|(denom, amount)| Coin {
            denom: denom.clone(),
            amount: *amount,
        })
    }

    pub fn add_coin(&mut self, coin: Coin) {
        if coin.amount == 0 {
            return;
        }
        let amount = self.0.entry(coin.denom).or_default();
        *amount = amount.saturating_add(coin.amount);
    }

    pub fn add(&self, other: &Coins) -> Coins {
        let mut res = self.clone();
        for coin in other.iter() {
            res.add_coin(coin);
        }
        res
    }

    /// Subtract, returning `None` if any denom would go negative.
    pub fn checked_sub(&self, other: &Coins) -> Option<Coins> {
        let mut res = self.clone();
        for (denom, amount) in &other.0 {
            let current = res.0.get_mut(denom)?;
            *current = current.checked_sub(*amount)?;
            if *current == 0 {
                res.0.remove(denom);
            }
        }
        Some(res)
    }

    pub fn to_proto(&self) -> Vec<ProtoCoin> {
        self.iter().map(ProtoCoin::from).collect()
    }

    pub fn from_proto(coins: Vec<ProtoCoin>) -> Result<Self, ChainParseError> {
        coins
            .into_iter()
            .map(Coin::try_from)
            .collect::<Result<_, _>>()
    }
}

impl FromIterator<Coin> for Coins {
    fn from_iter<T: IntoIterator<Item = Coin>>(iter: T) -> Self {
        let mut coins = Coins::new();
        for coin in iter {
            coins.add_coin(coin);
        }
        coins
    }
}

impl From<Coin> for Coins {
    fn from(coin: Coin) -> Self {
        std::iter::once(coin).collect()
    }
}

impl FromStr for Coins {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Coin::from_str)
            .collect()
    }
}

impl Display for Coins {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (idx, coin) in self.iter().enumerate() {
            if idx > 0 {
                write!(f, ",")?;
            }
            write!(f, "{coin}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Coins {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Coins({self})")
    }
}

impl Serialize for Coins {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for Coins {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Vec::<Coin>::deserialize(deserializer).map(|coins| coins.into_iter().collect())
    }
}

/// Price paid per unit of gas, per denom.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct GasPrices(BTreeMap<String, f64>);

impl GasPrices {
    pub fn new(denom: impl Into<String>, price: f64) -> Self {
        GasPrices(std::iter::once((denom.into(), price)).collect())
    }

    pub fn get(&self, denom: &str) -> Option<f64> {
        self.0.get(denom).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn denoms(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|x| x.as_str())
    }

    /// Every price multiplied by the same factor.
    pub fn scaled(&self, multiplier: f64) -> GasPrices {
        GasPrices(
            self.0
                .iter()
                .map(|(denom, price)| (denom.clone(), price * multiplier))
                .collect(),
        )
    }

    /// Fee owed for the given amount of gas, rounding each amount up.
    ///
    /// When `denoms` is provided, only those denoms are charged.
    pub fn fee_for(&self, gas: u64, denoms: Option<&[String]>) -> Coins {
        self.0
            .iter()
            .filter(|(denom, _)| denoms.map_or(true, |denoms| denoms.contains(*denom)))
            .map(|(denom, price)| Coin {
                denom: denom.clone(),
                amount: (gas as f64 * price).ceil() as u128,
            })
            .collect()
    }
}

impl FromStr for GasPrices {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                (|| -> anyhow::Result<(String, f64)> {
                    let (price, denom) = split_amount(s, |c| c.is_ascii_digit() || c == '.')?;
                    let price: f64 = price.parse()?;
                    anyhow::ensure!(price.is_finite() && price >= 0.0, "Invalid gas price");
                    Ok((denom.to_owned(), price))
                })()
                .with_context(|| format!("Could not parse gas price {s:?}"))
            })
            .collect::<anyhow::Result<_>>()
            .map(GasPrices)
    }
}

impl Display for GasPrices {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (idx, (denom, price)) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ",")?;
            }
            write!(f, "{price}{denom}")?;
        }
        Ok(())
    }
}
