//! Key derivation from mnemonics and transaction signing.

use std::{fmt::Display, str::FromStr};

use anyhow::{Context, Result};
use bitcoin::hashes::{sha256, Hash};
use bitcoin::secp256k1::ecdsa::Signature;
use bitcoin::secp256k1::{All, Message, Secp256k1, SecretKey};
use bitcoin::util::bip32::{DerivationPath, ExtendedPrivKey};
use once_cell::sync::OnceCell;
use rand::Rng;

use crate::{
    address::{Address, AddressHrp, RawAddress},
    sign_doc::{SignDoc, StdSignDoc},
    tx::{ModeInfo, SignMode, SignerInfo},
    PublicKey, Tx,
};

/// A BIP-39 seed phrase.
#[derive(Clone)]
pub struct SeedPhrase {
    mnemonic: bip39::Mnemonic,
}

impl SeedPhrase {
    /// Generate a new random 24 word phrase.
    pub fn random() -> Result<SeedPhrase> {
        let mut rng = rand::thread_rng();
        let mut entropy: [u8; 32] = [0; 32];
        for b in &mut entropy {
            *b = rng.gen();
        }
        Ok(SeedPhrase {
            mnemonic: bip39::Mnemonic::from_entropy(&entropy)?,
        })
    }

    pub fn phrase(&self) -> String {
        self.mnemonic.to_string()
    }

    pub fn word_count(&self) -> usize {
        self.mnemonic.word_count()
    }
}

impl From<bip39::Mnemonic> for SeedPhrase {
    fn from(mnemonic: bip39::Mnemonic) -> Self {
        SeedPhrase { mnemonic }
    }
}

impl FromStr for SeedPhrase {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mnemonic = bip39::Mnemonic::parse_normalized(s.trim())
            .ok()
            .context("Unable to parse mnemonic from phrase")?;
        Ok(SeedPhrase { mnemonic })
    }
}

impl std::fmt::Debug for SeedPhrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SeedPhrase({} words)", self.word_count())
    }
}

pub const COSMOS_COIN_TYPE: u32 = 118;
pub const TERRA_COIN_TYPE: u32 = 330;

/// BIP-44 path `m/44'/coin_type'/account'/0/index`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DerivationPathConfig {
    pub coin_type: u32,
    pub account: u32,
    pub index: u32,
}

impl DerivationPathConfig {
    pub const fn cosmos_numbered(index: u32) -> Self {
        DerivationPathConfig {
            coin_type: COSMOS_COIN_TYPE,
            account: 0,
            index,
        }
    }

    pub const fn terra_numbered(index: u32) -> Self {
        DerivationPathConfig {
            coin_type: TERRA_COIN_TYPE,
            account: 0,
            index,
        }
    }

    pub fn as_derivation_path(&self) -> Result<DerivationPath> {
        let path_str = self.to_string();
        path_str
            .parse()
            .with_context(|| format!("Generated an invalid derivation path: {path_str}"))
    }
}

impl Default for DerivationPathConfig {
    fn default() -> Self {
        DerivationPathConfig::cosmos_numbered(0)
    }
}

impl Display for DerivationPathConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "m/44'/{}'/{}'/0/{}",
            self.coin_type, self.account, self.index
        )
    }
}

impl FromStr for DerivationPathConfig {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        (|| -> Result<DerivationPathConfig> {
            let rest = s
                .strip_prefix("m/44'/")
                .context("Path must start with m/44'/")?;
            let parts = rest.split('/').collect::<Vec<_>>();
            match parts.as_slice() {
                [coin_type, account, "0", index] => Ok(DerivationPathConfig {
                    coin_type: hardened(coin_type)?,
                    account: hardened(account)?,
                    index: index.parse()?,
                }),
                _ => Err(anyhow::anyhow!("Expected coin_type'/account'/0/index")),
            }
        })()
        .with_context(|| format!("Invalid derivation path {s:?}"))
    }
}

fn hardened(component: &str) -> Result<u32> {
    component
        .strip_suffix('\'')
        .with_context(|| format!("Component {component} must be hardened"))?
        .parse()
        .map_err(Into::into)
}

/// Builder for a [Key] derived from a seed phrase.
#[derive(Clone, Debug)]
pub struct MnemonicKey {
    seed_phrase: SeedPhrase,
    derivation_path: DerivationPathConfig,
}

impl MnemonicKey {
    pub fn new(seed_phrase: SeedPhrase) -> Self {
        MnemonicKey {
            seed_phrase,
            derivation_path: DerivationPathConfig::default(),
        }
    }

    pub fn with_derivation_path(mut self, derivation_path: DerivationPathConfig) -> Self {
        self.derivation_path = derivation_path;
        self
    }

    pub fn with_coin_type(mut self, coin_type: u32) -> Self {
        self.derivation_path.coin_type = coin_type;
        self
    }

    pub fn with_account(mut self, account: u32) -> Self {
        self.derivation_path.account = account;
        self
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.derivation_path.index = index;
        self
    }

    pub fn derivation_path(&self) -> DerivationPathConfig {
        self.derivation_path
    }

    pub fn seed_phrase(&self) -> &SeedPhrase {
        &self.seed_phrase
    }

    pub fn derive(&self) -> Result<Key> {
        let secp = global_secp();
        let root_private_key = ExtendedPrivKey::new_master(
            bitcoin::Network::Bitcoin,
            &self.seed_phrase.mnemonic.to_seed(""),
        )?;
        let privkey =
            root_private_key.derive_priv(secp, &self.derivation_path.as_derivation_path()?)?;
        Ok(Key::from_secret_key(privkey.private_key))
    }
}

/// Accepts a bare phrase, or a derivation path followed by a space and the phrase.
impl FromStr for MnemonicKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("m/44") {
            let (path, phrase) = s
                .split_once(' ')
                .context("Missing seed phrase after derivation path")?;
            Ok(MnemonicKey::new(phrase.parse()?).with_derivation_path(path.parse()?))
        } else {
            Ok(MnemonicKey::new(s.parse()?))
        }
    }
}

fn global_secp() -> &'static Secp256k1<All> {
    static CELL: OnceCell<Secp256k1<All>> = OnceCell::new();
    CELL.get_or_init(Secp256k1::new)
}

/// How to sign a transaction: which chain, which account, which mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignOptions {
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
    pub sign_mode: SignMode,
}

/// A secp256k1 key able to sign transactions.
#[derive(Clone)]
pub struct Key {
    secret_key: SecretKey,
    public_key_bytes: [u8; 33],
}

impl Key {
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key_bytes =
            bitcoin::secp256k1::PublicKey::from_secret_key(global_secp(), &secret_key).serialize();
        Key {
            secret_key,
            public_key_bytes,
        }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Key::from_secret_key(
            SecretKey::from_slice(bytes).context("Invalid secp256k1 private key")?,
        ))
    }

    /// Compressed public key bytes.
    pub fn public_key_bytes(&self) -> &[u8; 33] {
        &self.public_key_bytes
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::Secp256k1(self.public_key_bytes.to_vec())
    }

    pub fn raw_address(&self) -> RawAddress {
        let sha = sha256::Hash::hash(&self.public_key_bytes);
        bitcoin::hashes::ripemd160::Hash::hash(sha.as_ref())
            .into_inner()
            .into()
    }

    pub fn address(&self, hrp: AddressHrp) -> Address {
        self.raw_address().with_hrp(hrp)
    }

    /// ECDSA signature over the SHA-256 of `msg`, in 64 byte compact form.
    pub fn sign_bytes(&self, msg: &[u8]) -> Result<[u8; 64]> {
        let msg = Message::from_slice(sha256::Hash::hash(msg).as_ref())?;
        Ok(global_secp()
            .sign_ecdsa(&msg, &self.secret_key)
            .serialize_compact())
    }

    pub fn verify_bytes(&self, msg: &[u8], signature: &[u8]) -> bool {
        verify_signature(&self.public_key_bytes, msg, signature)
    }

    /// Sign `tx` in place.
    ///
    /// Sets the signer info for this key, replacing an existing entry for the
    /// same key or an empty placeholder, and stores the signature at the
    /// matching position.
    pub fn sign_tx(&self, tx: &mut Tx, options: &SignOptions) -> Result<()> {
        anyhow::ensure!(
            matches!(
                options.sign_mode,
                SignMode::Direct | SignMode::LegacyAminoJson
            ),
            "Unsupported sign mode for signing: {:?}",
            options.sign_mode
        );
        let public_key = self.public_key();
        let signer_info = SignerInfo {
            public_key: Some(public_key.clone()),
            mode_info: ModeInfo::single(options.sign_mode),
            sequence: options.sequence,
        };
        let position = tx
            .auth_info
            .signer_infos
            .iter()
            .position(|info| match &info.public_key {
                Some(key) => key == &public_key || key.is_placeholder(),
                None => true,
            });
        let position = match position {
            Some(position) => {
                tx.auth_info.signer_infos[position] = signer_info;
                position
            }
            None => {
                tx.auth_info.signer_infos.push(signer_info);
                tx.auth_info.signer_infos.len() - 1
            }
        };
        if tx.signatures.len() < tx.auth_info.signer_infos.len() {
            tx.signatures
                .resize(tx.auth_info.signer_infos.len(), Vec::new());
        }

        let sign_bytes = match options.sign_mode {
            SignMode::Direct => {
                SignDoc::new(tx, options.chain_id.clone(), options.account_number)?.to_bytes()
            }
            SignMode::LegacyAminoJson => self.amino_sign_bytes(tx, options)?,
            mode => anyhow::bail!("Unsupported sign mode for signing: {mode:?}"),
        };
        tx.signatures[position] = self.sign_bytes(&sign_bytes)?.to_vec();
        Ok(())
    }

    /// Signature of a multisig member, which always signs the amino JSON document.
    ///
    /// The transaction is left untouched.
    pub fn create_amino_signature(&self, tx: &Tx, options: &SignOptions) -> Result<Vec<u8>> {
        let sign_bytes = self.amino_sign_bytes(tx, options)?;
        Ok(self.sign_bytes(&sign_bytes)?.to_vec())
    }

    fn amino_sign_bytes(&self, tx: &Tx, options: &SignOptions) -> Result<Vec<u8>> {
        StdSignDoc::new(
            tx,
            options.chain_id.clone(),
            options.account_number,
            options.sequence,
        )
        .to_bytes()
        .context("Unable to build amino JSON sign document")
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Key({})", hex::encode(self.public_key_bytes))
    }
}

/// Check a compact ECDSA signature over the SHA-256 of `msg`.
pub fn verify_signature(public_key: &[u8], msg: &[u8], signature: &[u8]) -> bool {
    (|| -> Result<()> {
        let public_key = bitcoin::secp256k1::PublicKey::from_slice(public_key)?;
        let signature = Signature::from_compact(signature)?;
        let msg = Message::from_slice(sha256::Hash::hash(msg).as_ref())?;
        global_secp().verify_ecdsa(&msg, &signature, &public_key)?;
        Ok(())
    })()
    .is_ok()
}

#[cfg(test)]
mod tests {
    use crate::{tx::SignerData, Fee, MsgSend, TxBody};

    use super::*;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn key() -> Key {
        MnemonicKey::new(ABANDON.parse().unwrap()).derive().unwrap()
    }

    #[test]
    fn known_addresses() {
        assert_eq!(
            key().address(AddressHrp::Cosmos).to_string(),
            "cosmos19rl4cm2hmr8afy4kldpxz3fka4jguq0auqdal4"
        );
        let second = MnemonicKey::new(ABANDON.parse().unwrap())
            .with_index(1)
            .derive()
            .unwrap();
        assert_eq!(
            second.address(AddressHrp::Cosmos).to_string(),
            "cosmos1jrkmdcwgq94uaamx6zax2luewlhf7u4kucx3kz"
        );
        let terra = MnemonicKey::new(ABANDON.parse().unwrap())
            .with_derivation_path(DerivationPathConfig::terra_numbered(0))
            .derive()
            .unwrap();
        assert_eq!(
            terra.address(AddressHrp::Terra).to_string(),
            "terra1amdttz2937a3dytmxmkany53pp6ma6dy4vsllv"
        );
        assert_eq!(
            hex::encode(key().public_key_bytes()),
            "024f4e2ad99c34d60b9ba6283c9431a8418af8673212961f97a77b6377fcd05b62"
        );
        assert_eq!(key().public_key().raw_address(), Some(key().raw_address()));
    }

    #[test]
    fn derivation_paths() {
        let path = DerivationPathConfig::terra_numbered(3);
        assert_eq!(path.to_string(), "m/44'/330'/0'/0/3");
        assert_eq!(path.to_string().parse::<DerivationPathConfig>().unwrap(), path);
        path.as_derivation_path().unwrap();
        "m/44'/118/0'/0/0".parse::<DerivationPathConfig>().unwrap_err();
        "m/44'/118'/0'/1/0".parse::<DerivationPathConfig>().unwrap_err();

        let key: MnemonicKey = format!("m/44'/118'/0'/0/1 {ABANDON}").parse().unwrap();
        assert_eq!(key.derivation_path(), DerivationPathConfig::cosmos_numbered(1));
    }

    #[test]
    fn random_phrase() {
        let phrase = SeedPhrase::random().unwrap();
        assert_eq!(phrase.word_count(), 24);
        let reparsed: SeedPhrase = phrase.phrase().parse().unwrap();
        assert_eq!(reparsed.phrase(), phrase.phrase());
        "not a real mnemonic".parse::<SeedPhrase>().unwrap_err();
    }

    #[test]
    fn sign_and_verify() {
        let key = key();
        let sig = key.sign_bytes(b"hello").unwrap();
        assert!(key.verify_bytes(b"hello", &sig));
        assert!(!key.verify_bytes(b"hello!", &sig));
        assert!(!key.verify_bytes(b"hello", &sig[..63]));
    }

    fn unsigned_tx() -> Tx {
        let key = key();
        Tx::new(
            TxBody::new(vec![MsgSend::new(
                key.address(AddressHrp::Cosmos),
                key.address(AddressHrp::Cosmos),
                "1uatom".parse().unwrap(),
            )
            .into()]),
            Fee::new(100000, "2500uatom".parse().unwrap()),
        )
    }

    fn options(sign_mode: SignMode) -> SignOptions {
        SignOptions {
            chain_id: "cosmoshub-4".to_owned(),
            account_number: 42,
            sequence: 7,
            sign_mode,
        }
    }

    #[test]
    fn sign_tx_replaces_placeholder() {
        let key = key();
        let mut tx = unsigned_tx();
        tx.append_empty_signatures(&[SignerData {
            sequence: 7,
            public_key: None,
        }]);
        key.sign_tx(&mut tx, &options(SignMode::Direct)).unwrap();

        assert_eq!(tx.auth_info.signer_infos.len(), 1);
        assert_eq!(tx.signatures.len(), 1);
        assert_eq!(tx.auth_info.signer_infos[0].public_key, Some(key.public_key()));
        let doc = SignDoc::new(&tx, "cosmoshub-4", 42).unwrap().to_bytes();
        assert!(key.verify_bytes(&doc, &tx.signatures[0]));
    }

    #[test]
    fn sign_tx_amino() {
        let key = key();
        let mut tx = unsigned_tx();
        key.sign_tx(&mut tx, &options(SignMode::LegacyAminoJson)).unwrap();
        assert_eq!(tx.signatures.len(), 1);
        assert_eq!(
            tx.auth_info.signer_infos[0].mode_info,
            ModeInfo::single(SignMode::LegacyAminoJson)
        );
        let doc = StdSignDoc::new(&tx, "cosmoshub-4", 42, 7).to_bytes().unwrap();
        assert!(key.verify_bytes(&doc, &tx.signatures[0]));
        assert_eq!(
            key.create_amino_signature(&tx, &options(SignMode::LegacyAminoJson))
                .unwrap()
                .len(),
            64
        );

        key.sign_tx(&mut tx, &options(SignMode::Textual)).unwrap_err();
    }
}
