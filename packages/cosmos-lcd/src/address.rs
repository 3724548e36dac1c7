use std::{
    convert::TryFrom,
    fmt::{Debug, Display},
    str::FromStr,
};

use anyhow::{Context, Result};
use bech32::{FromBase32, ToBase32};
use serde::de::Visitor;

/// A raw address value not connected to a specific blockchain. You usually want [Address].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum RawAddress {
    Twenty { raw_address: [u8; 20] },
    ThirtyTwo { raw_address: [u8; 32] },
}

/// Parse a raw address and its HRP from a string. Supports any Cosmos-compatible blockchain.
pub fn parse_raw_address(s: &str) -> Result<(String, RawAddress)> {
    let (hrp, data, variant) = bech32::decode(s).context("Invalid bech32 data")?;
    match variant {
        bech32::Variant::Bech32 => (),
        bech32::Variant::Bech32m => anyhow::bail!("Must use Bech32 variant"),
    }
    let data = Vec::<u8>::from_base32(&data)?;
    let raw_address = data
        .as_slice()
        .try_into()
        .with_context(|| format!("Total bytes found: {}", data.len()))?;
    Ok((hrp, raw_address))
}

/// Note that using this instance throws away the Human Readable Part (HRP) of the address!
impl FromStr for RawAddress {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_raw_address(s).map(|x| x.1)
    }
}

impl AsRef<[u8]> for RawAddress {
    fn as_ref(&self) -> &[u8] {
        match self {
            RawAddress::Twenty { raw_address } => raw_address,
            RawAddress::ThirtyTwo { raw_address } => raw_address,
        }
    }
}

impl From<[u8; 20]> for RawAddress {
    fn from(raw_address: [u8; 20]) -> Self {
        RawAddress::Twenty { raw_address }
    }
}

impl From<[u8; 32]> for RawAddress {
    fn from(raw_address: [u8; 32]) -> Self {
        RawAddress::ThirtyTwo { raw_address }
    }
}

impl TryFrom<&[u8]> for RawAddress {
    type Error = anyhow::Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        match value.try_into().ok() {
            Some(raw_address) => Ok(RawAddress::Twenty { raw_address }),
            None => value
                .try_into()
                .map(|raw_address| RawAddress::ThirtyTwo { raw_address })
                .context("Invalid data size for a RawAddress, need either 20 or 32 bytes"),
        }
    }
}

impl RawAddress {
    /// Attach a human readable prefix to this raw address.
    pub fn with_hrp(self, hrp: AddressHrp) -> Address {
        Address {
            raw_address: self,
            hrp,
        }
    }
}

/// An address on a Cosmos blockchain
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    raw_address: RawAddress,
    hrp: AddressHrp,
}

impl Address {
    pub fn raw(&self) -> &RawAddress {
        &self.raw_address
    }

    pub fn hrp(&self) -> AddressHrp {
        self.hrp
    }

    /// The same underlying bytes with a different prefix, e.g. an account's
    /// `cosmosvaloper` operator address.
    pub fn for_hrp(&self, hrp: AddressHrp) -> Self {
        Address {
            raw_address: self.raw_address,
            hrp,
        }
    }
}

/// Human readable part of a bech32 address.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum AddressHrp {
    Cosmos,
    CosmosValoper,
    CosmosValcons,
    Terra,
    TerraValoper,
    Osmo,
    Juno,
}

impl AddressHrp {
    pub fn all() -> [AddressHrp; 7] {
        [
            AddressHrp::Cosmos,
            AddressHrp::CosmosValoper,
            AddressHrp::CosmosValcons,
            AddressHrp::Terra,
            AddressHrp::TerraValoper,
            AddressHrp::Osmo,
            AddressHrp::Juno,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AddressHrp::Cosmos => "cosmos",
            AddressHrp::CosmosValoper => "cosmosvaloper",
            AddressHrp::CosmosValcons => "cosmosvalcons",
            AddressHrp::Terra => "terra",
            AddressHrp::TerraValoper => "terravaloper",
            AddressHrp::Osmo => "osmo",
            AddressHrp::Juno => "juno",
        }
    }
}

impl Display for AddressHrp {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressHrp {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AddressHrp::all()
            .into_iter()
            .find(|hrp| hrp.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unsupported address prefix {s:?}"))
    }
}

impl Display for Address {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        AddressAnyHrp {
            raw_address: self.raw_address,
            hrp: self.hrp.as_str(),
        }
        .fmt(fmt)
    }
}

/// Display helper for prefixes not covered by [AddressHrp].
pub struct AddressAnyHrp<'a> {
    pub raw_address: RawAddress,
    pub hrp: &'a str,
}

impl<'a> Display for AddressAnyHrp<'a> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        bech32::encode_to_fmt(
            fmt,
            self.hrp,
            self.raw_address.to_base32(),
            bech32::Variant::Bech32,
        )
        .map_err(|_| std::fmt::Error)?
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl From<&Address> for String {
    fn from(address: &Address) -> Self {
        address.to_string()
    }
}

impl FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        (|| -> Result<Address> {
            let (hrp, raw_address) = parse_raw_address(s)?;
            hrp.parse().map(|hrp| Address { raw_address, hrp })
        })()
        .with_context(|| format!("Unable to parse Cosmos address {s}"))
    }
}

/// Anything with an on-chain address: addresses themselves, keys, wallets.
pub trait HasAddress {
    fn get_address(&self) -> Address;

    fn get_address_string(&self) -> String {
        self.get_address().to_string()
    }

    fn get_address_hrp(&self) -> AddressHrp {
        self.get_address().hrp
    }
}

impl HasAddress for Address {
    fn get_address(&self) -> Address {
        *self
    }
}

impl<T: HasAddress> HasAddress for &T {
    fn get_address(&self) -> Address {
        HasAddress::get_address(*self)
    }
}

impl serde::Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(AddressVisitor)
    }
}

struct AddressVisitor;

impl<'de> Visitor<'de> for AddressVisitor {
    type Value = Address;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("Cosmos address")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse().map_err(|e| E::custom(e))
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod tests {
    use quickcheck::Arbitrary;

    use super::*;

    impl Arbitrary for AddressHrp {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            *g.choose(&AddressHrp::all()).unwrap()
        }
    }

    impl Arbitrary for RawAddress {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            if bool::arbitrary(g) {
                let mut raw_address = [0; 20];
                for byte in &mut raw_address {
                    *byte = u8::arbitrary(g);
                }
                RawAddress::Twenty { raw_address }
            } else {
                let mut raw_address = [0; 32];
                for byte in &mut raw_address {
                    *byte = u8::arbitrary(g);
                }
                RawAddress::ThirtyTwo { raw_address }
            }
        }
    }

    quickcheck::quickcheck! {
        fn roundtrip_address(hrp: AddressHrp, raw_address: RawAddress) -> bool {
            let address1 = raw_address.with_hrp(hrp);
            let s1 = address1.to_string();
            let address2: Address = s1.parse().unwrap();
            let s2 = address2.to_string();
            assert_eq!(s1, s2);
            assert_eq!(address1, address2);
            true
        }
    }

    #[test]
    fn spot_roundtrip_osmo() {
        const S: &str = "osmo168gdk6r58jdwfv49kuesq2rs747jawnn4ryvyk";
        let address: Address = S.parse().unwrap();
        assert_eq!(S, &address.to_string());
    }

    #[test]
    fn reprefix_keeps_bytes() {
        let juno: Address = "juno168gdk6r58jdwfv49kuesq2rs747jawnnt2584c".parse().unwrap();
        let cosmos = juno.for_hrp(AddressHrp::Cosmos);
        assert!(cosmos.to_string().starts_with("cosmos1"));
        let reparsed: Address = cosmos.to_string().parse().unwrap();
        assert_eq!(reparsed.raw(), juno.raw());
        assert_eq!(reparsed.hrp(), AddressHrp::Cosmos);
    }

    #[test]
    fn rejects_bech32m() {
        let s = bech32::encode("cosmos", [7u8; 20].to_base32(), bech32::Variant::Bech32m).unwrap();
        parse_raw_address(&s).unwrap_err();
    }

    #[test]
    fn rejects_bad_length() {
        let s = bech32::encode("cosmos", [7u8; 10].to_base32(), bech32::Variant::Bech32).unwrap();
        parse_raw_address(&s).unwrap_err();
    }

    #[test]
    fn rejects_unknown_prefix() {
        let s = bech32::encode("unknown", [7u8; 20].to_base32(), bech32::Variant::Bech32).unwrap();
        let (hrp, _) = parse_raw_address(&s).unwrap();
        assert_eq!(hrp, "unknown");
        s.parse::<Address>().unwrap_err();
    }
}
