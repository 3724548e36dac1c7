use anyhow::{Context, Result};
use clap::Parser;
use cosmos_lcd::{
    Address, AddressHrp, Coin, Coins, HasAddress, LcdClient, LcdOpt, MnemonicKey, SeedPhrase,
    Tx, TxBuilder, TxInfo, Wallet,
};
use tracing_subscriber::EnvFilter;

/// Command line tool for talking to Cosmos SDK chains over LCD
#[derive(clap::Parser)]
struct Cmd {
    #[clap(flatten)]
    opt: Opt,
    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[derive(clap::Parser)]
struct Opt {
    #[clap(flatten)]
    network_opt: LcdOpt,
    /// Turn on verbose output
    #[clap(long, short, global = true)]
    verbose: bool,
}

impl Opt {
    fn init_logger(&self) {
        let filter = if self.verbose {
            format!("{}=debug,cosmos_lcd=debug,info", env!("CARGO_CRATE_NAME"))
        } else {
            "info".to_owned()
        };
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

#[derive(clap::Parser)]
struct TxOpt {
    /// Mnemonic phrase, optionally prefixed by a derivation path such as m/44'/118'/0'/0/0
    #[clap(long, env = "COSMOS_WALLET")]
    wallet: String,
    /// Coin type to derive with when the wallet has no explicit path, defaults to the network's
    #[clap(long)]
    coin_type: Option<u32>,
    /// Memo to put on transaction
    #[clap(long)]
    memo: Option<String>,
}

impl TxOpt {
    fn get_wallet(&self, lcd: &LcdClient) -> Result<Wallet> {
        let key = derive_key(&self.wallet, self.coin_type, lcd.get_builder().coin_type())?;
        Ok(lcd.wallet(key))
    }

    fn tx_builder(&self) -> TxBuilder {
        let mut builder = TxBuilder::default();
        builder.set_optional_memo(self.memo.clone());
        builder
    }
}

fn derive_key(
    wallet: &str,
    coin_type: Option<u32>,
    default_coin_type: u32,
) -> Result<cosmos_lcd::Key> {
    let mut key: MnemonicKey = wallet.parse()?;
    if let Some(coin_type) = coin_type {
        key = key.with_coin_type(coin_type);
    } else if !wallet.trim().starts_with("m/") {
        key = key.with_coin_type(default_coin_type);
    }
    key.derive()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cmd::parse();
    cmd.opt.init_logger();

    cmd.subcommand.go(cmd.opt).await
}

#[derive(clap::Parser)]
enum Subcommand {
    /// Show config
    ShowConfig {},
    /// Generate wallet
    GenWallet {
        /// Address prefix to print the address with
        #[clap(default_value = "cosmos")]
        hrp: AddressHrp,
        /// BIP-44 coin type
        #[clap(long, default_value_t = cosmos_lcd::COSMOS_COIN_TYPE)]
        coin_type: u32,
    },
    /// Print the address for the given phrase
    PrintAddress {
        /// Address prefix
        hrp: AddressHrp,
        /// Phrase, optionally prefixed by a derivation path
        phrase: String,
        /// BIP-44 coin type, when the phrase has no explicit path
        #[clap(long, default_value_t = cosmos_lcd::COSMOS_COIN_TYPE)]
        coin_type: u32,
    },
    /// Print balances
    PrintBalances {
        /// Address on COSMOS blockchain
        address: Address,
        /// Optional height to do the query at
        #[clap(long)]
        height: Option<u64>,
    },
    /// Show account number, sequence and public key
    AccountInfo { address: Address },
    /// Send coins to the given address
    SendCoins {
        #[clap(flatten)]
        tx_opt: TxOpt,
        /// Destination address
        dest: Address,
        /// Coins to send
        coins: Vec<Coin>,
    },
    /// Simulate sending coins and print the estimated fee
    SimulateSend {
        #[clap(flatten)]
        tx_opt: TxOpt,
        /// Destination address
        dest: Address,
        /// Coins to send
        coins: Vec<Coin>,
    },
    /// Show transaction details
    ShowTx {
        txhash: String,
        /// Show all the data in the transaction?
        #[clap(long)]
        complete: bool,
        /// Pretty-print JSON output?
        #[clap(long)]
        pretty: bool,
    },
    /// List transactions sent by a given address
    ListTxsFor {
        address: Address,
        /// Maximum number of transactions to return
        #[clap(long)]
        limit: Option<u64>,
        /// Offset
        #[clap(long)]
        offset: Option<u64>,
    },
    /// Show information on the node
    NodeInfo {},
    /// Show the latest block
    LatestBlock {},
    /// Show block metadata and transaction hashes within the block
    ShowBlock {
        /// Height of the block to show
        height: i64,
    },
    /// Encode a JSON transaction into base64 protobuf
    EncodeTx {
        /// Transaction JSON
        json: String,
    },
    /// Decode a base64 protobuf transaction into JSON
    DecodeTx {
        /// Base64 encoded transaction
        tx_bytes: String,
    },
}

impl Subcommand {
    pub(crate) async fn go(self, opt: Opt) -> Result<()> {
        match self {
            Subcommand::ShowConfig {} => {
                let builder = opt.network_opt.builder()?;
                println!("{builder:#?}");
            }
            Subcommand::GenWallet { hrp, coin_type } => {
                let phrase = SeedPhrase::random()?;
                let key = MnemonicKey::new(phrase.clone())
                    .with_coin_type(coin_type)
                    .derive()?;
                println!("Mnemonic: {}", phrase.phrase());
                println!("Address: {}", key.address(hrp));
            }
            Subcommand::PrintAddress {
                hrp,
                phrase,
                coin_type,
            } => {
                let key = derive_key(&phrase, None, coin_type)?;
                println!("{}", key.address(hrp));
            }
            Subcommand::PrintBalances { address, height } => {
                let lcd = opt.network_opt.build().await?;
                let balances = lcd.balance_at(address, height).await?;
                for coin in balances.iter() {
                    println!("{coin}");
                }
                if balances.is_empty() {
                    println!("0");
                }
            }
            Subcommand::AccountInfo { address } => {
                let lcd = opt.network_opt.build().await?;
                let account = lcd.account_info(address).await?;
                println!("Address: {}", account.address);
                println!("Account number: {}", account.account_number);
                println!("Sequence: {}", account.sequence);
                match account.public_key {
                    Some(public_key) => {
                        println!("Public key: {}", serde_json::to_string(&public_key)?)
                    }
                    None => println!("Public key: none"),
                }
            }
            Subcommand::SendCoins {
                tx_opt,
                dest,
                coins,
            } => {
                let lcd = opt.network_opt.build().await?;
                let wallet = tx_opt.get_wallet(&lcd)?;
                let mut builder = tx_opt.tx_builder();
                builder.add_send(&wallet, dest, coins.into_iter().collect::<Coins>());
                tracing::info!("Broadcasting: {builder}");
                let txres = wallet.broadcast(&builder).await?;

                println!("{}", txres.txhash);
            }
            Subcommand::SimulateSend {
                tx_opt,
                dest,
                coins,
            } => {
                let lcd = opt.network_opt.build().await?;
                let wallet = tx_opt.get_wallet(&lcd)?;
                let mut builder = tx_opt.tx_builder();
                builder.add_send(&wallet, dest, coins.into_iter().collect::<Coins>());
                let fee = wallet.estimate_fee(&builder).await?;
                println!("Sender: {}", wallet.get_address());
                println!("Gas limit: {}", fee.gas_limit);
                println!("Fee: {}", fee.amount);
            }
            Subcommand::ShowTx {
                txhash,
                complete,
                pretty,
            } => {
                let lcd = opt.network_opt.build().await?;
                let info = lcd.wait_for_transaction(&txhash).await?;
                print_tx_info(&info, complete, pretty)?;
            }
            Subcommand::ListTxsFor {
                address,
                limit,
                offset,
            } => {
                let lcd = opt.network_opt.build().await?;
                for info in lcd.txs_by_sender(address, limit, offset).await? {
                    println!("{}", info.txhash);
                }
            }
            Subcommand::NodeInfo {} => {
                let lcd = opt.network_opt.build_lazy()?;
                let info = lcd.node_info().await?;
                println!("Network: {}", info.network);
                println!("Moniker: {}", info.moniker);
                println!("Version: {}", info.version);
                println!("Application: {} {}", info.app_name, info.app_version);
                println!("Cosmos SDK: {}", info.cosmos_sdk_version);
            }
            Subcommand::LatestBlock {} => {
                let lcd = opt.network_opt.build_lazy()?;
                print_block(lcd.latest_block_info().await?);
            }
            Subcommand::ShowBlock { height } => {
                let lcd = opt.network_opt.build().await?;
                print_block(lcd.block_info(height).await?);
            }
            Subcommand::EncodeTx { json } => {
                let tx: Tx = serde_json::from_str(&json).context("Invalid transaction JSON")?;
                println!("{}", tx.to_base64()?);
            }
            Subcommand::DecodeTx { tx_bytes } => {
                let tx = Tx::from_base64(&tx_bytes)?;
                println!("Hash: {}", tx.hash()?);
                serde_json::to_writer_pretty(std::io::stdout(), &tx)?;
                println!();
            }
        }

        Ok(())
    }
}

fn print_block(block: cosmos_lcd::BlockInfo) {
    let cosmos_lcd::BlockInfo {
        height,
        block_hash,
        timestamp,
        txhashes,
        chain_id,
    } = block;
    println!("Chain ID: {chain_id}");
    println!("Height: {height}");
    println!("Timestamp: {timestamp}");
    println!("Block hash: {block_hash}");
    for (idx, txhash) in txhashes.into_iter().enumerate() {
        println!("Transaction #{}: {txhash}", idx + 1);
    }
}

fn print_tx_info(info: &TxInfo, complete: bool, pretty: bool) -> Result<()> {
    println!("Height: {}", info.height);
    println!("Code: {}", info.code.unwrap_or_default());
    if let Some(codespace) = &info.codespace {
        println!("Codespace: {codespace}");
    }
    if pretty {
        match serde_json::from_str::<serde_json::Value>(&info.raw_log) {
            Err(_) => println!("Raw log is not JSON: {}", info.raw_log),
            Ok(raw_log) => {
                serde_json::to_writer_pretty(std::io::stdout(), &raw_log)?;
                println!();
            }
        }
    } else {
        println!("Raw log: {}", info.raw_log);
    }
    println!("Gas wanted: {}", info.gas_wanted);
    println!("Gas used: {}", info.gas_used);
    println!("Timestamp: {}", info.timestamp);
    for msg in &info.tx.body.messages {
        println!("Message: {}", msg.describe());
    }
    if complete {
        for (idx, log) in info.logs.iter().flatten().enumerate() {
            println!("Log #{idx}: {log:?}");
        }
        for (idx, event) in info.events.iter().enumerate() {
            println!("Event #{idx}: {event:?}");
        }
        serde_json::to_writer_pretty(std::io::stdout(), &info.tx)?;
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn key_coin_types() {
        let cosmos = derive_key(PHRASE, None, 118).unwrap();
        assert_eq!(
            cosmos.address(AddressHrp::Cosmos).to_string(),
            "cosmos19rl4cm2hmr8afy4kldpxz3fka4jguq0auqdal4"
        );
        let terra = derive_key(PHRASE, None, 330).unwrap();
        assert_eq!(
            terra.address(AddressHrp::Terra).to_string(),
            "terra1amdttz2937a3dytmxmkany53pp6ma6dy4vsllv"
        );
        // Explicit paths win over the network default
        let explicit = derive_key(&format!("m/44'/118'/0'/0/0 {PHRASE}"), None, 330).unwrap();
        assert_eq!(explicit.raw_address(), cosmos.raw_address());
    }

    #[test]
    fn parses_send() {
        Cmd::try_parse_from([
            "cosmos-lcd",
            "--network",
            "cosmoshub-mainnet",
            "send-coins",
            "--wallet",
            PHRASE,
            "cosmos19rl4cm2hmr8afy4kldpxz3fka4jguq0auqdal4",
            "1uatom",
            "2uosmo",
        ])
        .unwrap();
    }
}
