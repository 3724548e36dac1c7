pub use address::{
    parse_raw_address, Address, AddressAnyHrp, AddressHrp, HasAddress, RawAddress,
};
pub use client::{
    Account, BlockInfo, BroadcastMode, BroadcastResult, GasInfo, HasLcdClient, LcdClient,
    NodeInfo,
};
pub use coins::{Coin, Coins, GasPrices};
pub use cosmos_sdk_proto as proto;
pub use error::{ChainParseError, LcdError};
pub use fee::Fee;
pub use key::{
    verify_signature, DerivationPathConfig, Key, MnemonicKey, SeedPhrase, SignOptions,
    COSMOS_COIN_TYPE, TERRA_COIN_TYPE,
};
pub use lcd_builder::LcdClientBuilder;
pub use lcd_network::LcdNetwork;
pub use msg::{
    ChainMsg, Input, Msg, MsgBeginRedelegate, MsgDelegate, MsgMultiSend, MsgSend,
    MsgUndelegate, MsgWithdrawDelegatorReward, Output,
};
pub use public_key::PublicKey;
pub use sign_doc::{MultiSignature, SignDoc, StdSignDoc};
pub use tx::{
    parse_events_by_type, parse_tx_logs, parse_tx_logs_proto, Attribute, AuthInfo,
    CompactBitArray, EventsByType, ModeInfo, ModeInfoMulti, ModeInfoSingle, SignMode,
    SignerData, SignerInfo, StringEvent, Tx, TxBody, TxInfo, TxLog,
};
pub use txbuilder::TxBuilder;
pub use wallet::Wallet;

mod address;
#[cfg(feature = "clap")]
mod clap;
mod client;
mod coins;
mod error;
mod fee;
mod key;
mod lcd_builder;
mod lcd_network;
mod msg;
mod public_key;
mod sign_doc;
mod tx;
mod txbuilder;
mod wallet;

#[cfg(feature = "clap")]
pub use crate::clap::LcdOpt;
