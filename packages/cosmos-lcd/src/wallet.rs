use std::fmt::Display;

use anyhow::{Context, Result};

use crate::{
    address::HasAddress,
    client::{BroadcastMode, HasLcdClient},
    key::{Key, SignOptions},
    Address, Coins, Fee, LcdClient, Msg, SignerData, Tx, TxBuilder, TxInfo,
};

/// A signing key paired with the chain it signs for.
#[derive(Clone)]
pub struct Wallet {
    lcd: LcdClient,
    key: Key,
    address: Address,
}

/// How the fee of a transaction is determined when broadcasting.
enum FeePlan {
    /// Used as is, no gas price retries.
    Fixed(Fee),
    /// Gas amount, priced on each attempt.
    Gas(u64),
}

impl Wallet {
    pub fn new(lcd: LcdClient, key: Key) -> Self {
        let address = key.address(lcd.hrp());
        Wallet { lcd, key, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub async fn account_number_and_sequence(&self) -> Result<(u64, u64)> {
        let account = self
            .lcd
            .account_info(self.address)
            .await
            .with_context(|| format!("Unable to load account {}", self.address))?;
        Ok((account.account_number, account.sequence))
    }

    pub async fn account_number(&self) -> Result<u64> {
        self.account_number_and_sequence().await.map(|x| x.0)
    }

    pub async fn sequence(&self) -> Result<u64> {
        self.account_number_and_sequence().await.map(|x| x.1)
    }

    fn signer_data(&self, sequence: u64) -> SignerData {
        SignerData {
            sequence,
            public_key: Some(self.key.public_key()),
        }
    }

    /// Account and sequence number to sign with, preferring the builder's.
    async fn signing_numbers(&self, builder: &TxBuilder) -> Result<(u64, u64)> {
        match (builder.get_account_number(), builder.get_sequence()) {
            (Some(account_number), Some(sequence)) => Ok((account_number, sequence)),
            (account_number, sequence) => {
                let (chain_account_number, chain_sequence) =
                    self.account_number_and_sequence().await?;
                Ok((
                    account_number.unwrap_or(chain_account_number),
                    sequence.unwrap_or(chain_sequence),
                ))
            }
        }
    }

    /// Sequence number to simulate with. Wallets which have never received
    /// funds don't exist on chain yet, but can still be simulated.
    async fn simulation_sequence(&self, builder: &TxBuilder) -> Result<u64> {
        if let Some(sequence) = builder.get_sequence() {
            return Ok(sequence);
        }
        match self.lcd.account_info(self.address).await {
            Ok(account) => Ok(account.sequence),
            Err(e) if e.is_not_found() => {
                tracing::warn!("Simulating with a non-existent wallet. Setting sequence number to 0");
                Ok(0)
            }
            Err(e) => Err(e).with_context(|| format!("Unable to load account {}", self.address)),
        }
    }

    async fn estimate_fee_inner(
        &self,
        builder: &TxBuilder,
        sequence: u64,
    ) -> Result<Fee, ExpectedSequenceError> {
        match self
            .lcd
            .estimate_fee(&[self.signer_data(sequence)], builder)
            .await
        {
            Ok(fee) => Ok(fee),
            Err(e) => {
                let is_sequence = e.endpoint_message().and_then(get_expected_sequence);
                let e = anyhow::Error::from(e).context("Unable to simulate transaction");
                Err(match is_sequence {
                    None => ExpectedSequenceError::RealError(e),
                    Some(number) => ExpectedSequenceError::NewNumber(number, e),
                })
            }
        }
    }

    /// Simulate, retrying once with the sequence number the node asks for.
    ///
    /// Returns the fee and the sequence number which worked.
    async fn estimate_fee_with_sequence(
        &self,
        builder: &TxBuilder,
        sequence: u64,
    ) -> Result<(Fee, u64)> {
        // The node may expect a different sequence number than the account
        // query reported, see https://github.com/cosmos/cosmos-sdk/issues/11597
        match self.estimate_fee_inner(builder, sequence).await {
            Ok(fee) => Ok((fee, sequence)),
            Err(ExpectedSequenceError::RealError(e)) => Err(e),
            Err(ExpectedSequenceError::NewNumber(x, e)) => {
                tracing::warn!("Received an account sequence error while simulating a transaction, retrying with new number {x}: {e:?}");
                Ok((self.estimate_fee_inner(builder, x).await?, x))
            }
        }
    }

    /// Estimate the fee for a transaction signed by this wallet.
    pub async fn estimate_fee(&self, builder: &TxBuilder) -> Result<Fee> {
        let sequence = self.simulation_sequence(builder).await?;
        self.estimate_fee_with_sequence(builder, sequence)
            .await
            .map(|x| x.0)
    }

    /// Fee from the builder if set, otherwise from its gas limit, otherwise simulated.
    async fn resolve_fee(&self, builder: &TxBuilder, sequence: u64) -> Result<(Fee, u64)> {
        if let Some(fee) = builder.get_fee() {
            Ok((fee.clone(), sequence))
        } else if let Some(gas) = builder.get_gas_limit() {
            Ok((self.lcd.fee_for_gas(gas, builder, None), sequence))
        } else {
            self.estimate_fee_with_sequence(builder, sequence).await
        }
    }

    /// Unsigned transaction with a placeholder signature for this wallet and an
    /// estimated fee.
    pub async fn create_tx(&self, builder: &TxBuilder) -> Result<Tx> {
        let sequence = self.simulation_sequence(builder).await?;
        let (fee, sequence) = self.resolve_fee(builder, sequence).await?;
        let mut tx = Tx::new(builder.make_tx_body(), fee);
        tx.append_empty_signatures(&[self.signer_data(sequence)]);
        Ok(tx)
    }

    /// Signed transaction, ready to broadcast.
    pub async fn create_and_sign_tx(&self, builder: &TxBuilder) -> Result<Tx> {
        let (account_number, sequence) = self.signing_numbers(builder).await?;
        let (fee, sequence) = self.resolve_fee(builder, sequence).await?;
        self.sign_with(builder, fee, account_number, sequence)
    }

    fn sign_with(
        &self,
        builder: &TxBuilder,
        fee: Fee,
        account_number: u64,
        sequence: u64,
    ) -> Result<Tx> {
        let mut tx = Tx::new(builder.make_tx_body(), fee);
        tx.append_empty_signatures(&[self.signer_data(sequence)]);
        self.key.sign_tx(
            &mut tx,
            &SignOptions {
                chain_id: self.lcd.chain_id().to_owned(),
                account_number,
                sequence,
                sign_mode: builder.get_sign_mode(),
            },
        )?;
        Ok(tx)
    }

    /// Sign transaction, broadcast, wait for it to complete, confirm that it was successful
    ///
    /// Without an explicit fee, gas is simulated and padded by the gas
    /// adjustment, and insufficient fee errors are retried at increasing gas
    /// prices.
    pub async fn broadcast(&self, builder: &TxBuilder) -> Result<TxInfo> {
        let (account_number, sequence) = self.signing_numbers(builder).await?;
        let (plan, sequence) = if let Some(fee) = builder.get_fee() {
            (FeePlan::Fixed(fee.clone()), sequence)
        } else if let Some(gas) = builder.get_gas_limit() {
            (FeePlan::Gas(gas), sequence)
        } else {
            let (fee, sequence) = self.estimate_fee_with_sequence(builder, sequence).await?;
            (FeePlan::Gas(fee.gas_limit), sequence)
        };

        match self
            .sign_and_broadcast_with(builder, account_number, sequence, &plan)
            .await
        {
            Ok(res) => Ok(res),
            Err(ExpectedSequenceError::RealError(e)) => Err(e),
            Err(ExpectedSequenceError::NewNumber(x, e)) => {
                tracing::warn!("Received an account sequence error while broadcasting a transaction, retrying with new number {x}: {e:?}");
                self.sign_and_broadcast_with(builder, account_number, x, &plan)
                    .await
                    .map_err(|x| x.into())
            }
        }
    }

    async fn sign_and_broadcast_with(
        &self,
        builder: &TxBuilder,
        account_number: u64,
        sequence: u64,
        plan: &FeePlan,
    ) -> Result<TxInfo, ExpectedSequenceError> {
        enum AttemptError {
            Inner(ExpectedSequenceError),
            InsufficientGas(anyhow::Error),
        }
        impl From<anyhow::Error> for AttemptError {
            fn from(e: anyhow::Error) -> Self {
                AttemptError::Inner(e.into())
            }
        }
        let skip_code_check = builder.get_skip_code_check();
        let retry_with_fee = |fee: Fee| async move {
            let tx = self.sign_with(builder, fee, account_number, sequence)?;
            let res = self.lcd.broadcast(&tx, BroadcastMode::Sync).await?;

            if !skip_code_check && !res.is_success() {
                let e = anyhow::anyhow!(
                    "Initial transaction broadcast failed with code {}. Raw log: {}",
                    res.code,
                    res.raw_log
                );
                if res.code == INSUFFICIENT_FEE_CODE {
                    return Err(AttemptError::InsufficientGas(e));
                }
                let is_sequence = get_expected_sequence(&res.raw_log);
                return Err(AttemptError::Inner(match is_sequence {
                    None => ExpectedSequenceError::RealError(e),
                    Some(number) => ExpectedSequenceError::NewNumber(number, e),
                }));
            }

            let res = self.lcd.wait_for_transaction(&res.txhash).await?;
            if !skip_code_check && !res.is_success() {
                // Once a transaction lands on chain we never retry it.
                return Err(AttemptError::Inner(ExpectedSequenceError::RealError(
                    anyhow::anyhow!(
                        "Transaction failed with code {}. Raw log: {}",
                        res.code.unwrap_or_default(),
                        res.raw_log
                    ),
                )));
            }

            tracing::debug!("Transaction {} landed at height {}", res.txhash, res.height);

            Ok(res)
        };

        let gas = match plan {
            FeePlan::Fixed(fee) => {
                return match retry_with_fee(fee.clone()).await {
                    Ok(x) => Ok(x),
                    Err(AttemptError::InsufficientGas(e)) => Err(e.into()),
                    Err(AttemptError::Inner(e)) => Err(e),
                }
            }
            FeePlan::Gas(gas) => *gas,
        };

        let config = self.lcd.get_builder();
        let attempts = config.gas_price_retry_attempts();
        let max_multiplier = config.gas_price_max_multiplier();
        for attempt_number in 0..attempts {
            let multiplier = gas_price_multiplier(attempt_number, attempts, max_multiplier);
            let fee = self.lcd.fee_for_gas(gas, builder, Some(multiplier));
            match retry_with_fee(fee).await {
                Ok(x) => return Ok(x),
                Err(AttemptError::InsufficientGas(e)) => {
                    tracing::debug!(
                        "Insufficient gas in attempt #{attempt_number}, retrying. Error: {e:?}"
                    );
                }
                Err(AttemptError::Inner(e)) => return Err(e),
            }
        }

        let fee = self.lcd.fee_for_gas(gas, builder, Some(max_multiplier));
        match retry_with_fee(fee).await {
            Ok(x) => Ok(x),
            Err(AttemptError::InsufficientGas(e)) => Err(e.into()),
            Err(AttemptError::Inner(e)) => Err(e),
        }
    }

    /// A simple helper function for signing and broadcasting a single message and waiting for a response.
    ///
    /// Generates an error if the transaction failed.
    pub async fn broadcast_message(&self, msg: impl Into<Msg>) -> Result<TxInfo> {
        let mut builder = TxBuilder::default();
        builder.add_message(msg);
        self.broadcast(&builder).await
    }

    /// Send coins to the given address
    pub async fn send_coins(&self, dest: impl HasAddress, amount: Coins) -> Result<TxInfo> {
        let mut builder = TxBuilder::default();
        builder.add_send(self.address, dest, amount);
        self.broadcast(&builder).await
    }
}

/// `ErrInsufficientFee` in the `sdk` codespace.
const INSUFFICIENT_FEE_CODE: u32 = 13;

/// Multiplier applied to the configured gas prices on a given attempt.
///
/// attempt_number starts at 0. Steps evenly from 1 to `max_multiplier`,
/// reaching it once `attempt_number >= attempts`.
fn gas_price_multiplier(attempt_number: u64, attempts: u64, max_multiplier: f64) -> f64 {
    if attempt_number >= attempts {
        max_multiplier
    } else {
        let step = (max_multiplier - 1.0) / attempts as f64;
        1.0 + step * attempt_number as f64
    }
}

impl Display for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.address)
    }
}

impl HasAddress for Wallet {
    fn get_address(&self) -> Address {
        self.address
    }
}

impl HasLcdClient for Wallet {
    fn get_lcd_client(&self) -> &LcdClient {
        &self.lcd
    }
}

/// Returned the expected account sequence mismatch based on an error message, if present
fn get_expected_sequence(message: &str) -> Option<u64> {
    for line in message.lines() {
        if let Some(x) = get_expected_sequence_single(line) {
            return Some(x);
        }
    }
    None
}

fn get_expected_sequence_single(message: &str) -> Option<u64> {
    const NEEDLE: &str = "account sequence mismatch, expected ";
    let s = &message[message.find(NEEDLE)? + NEEDLE.len()..];
    let comma = s.find(',')?;
    s[..comma].parse().ok()
}

/// Either a real error that should be propagated, or a new account sequence number to try
enum ExpectedSequenceError {
    RealError(anyhow::Error),
    NewNumber(u64, anyhow::Error),
}

impl From<anyhow::Error> for ExpectedSequenceError {
    fn from(e: anyhow::Error) -> Self {
        ExpectedSequenceError::RealError(e)
    }
}

impl From<ExpectedSequenceError> for anyhow::Error {
    fn from(e: ExpectedSequenceError) -> Self {
        match e {
            ExpectedSequenceError::RealError(e) => e,
            ExpectedSequenceError::NewNumber(_, e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use crate::{
        client::tests::{client_for, tx_response_json},
        key::MnemonicKey,
    };

    use super::*;

    const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn wallet(server: &mockito::ServerGuard) -> Wallet {
        let key = PHRASE.parse::<MnemonicKey>().unwrap().derive().unwrap();
        client_for(server).wallet(key)
    }

    fn account_body(sequence: u64) -> String {
        serde_json::json!({
            "account": {
                "@type": "/cosmos.auth.v1beta1.BaseAccount",
                "address": "cosmos19rl4cm2hmr8afy4kldpxz3fka4jguq0auqdal4",
                "pub_key": null,
                "account_number": "12",
                "sequence": sequence.to_string()
            }
        })
        .to_string()
    }

    fn broadcast_body(code: u32, raw_log: &str) -> String {
        serde_json::json!({
            "tx_response": {"height": "0", "txhash": "ABCD", "code": code, "raw_log": raw_log}
        })
        .to_string()
    }

    const ACCOUNT_PATH: &str =
        "/cosmos/auth/v1beta1/accounts/cosmos19rl4cm2hmr8afy4kldpxz3fka4jguq0auqdal4";

    #[test]
    fn get_expected_sequence_good() {
        assert_eq!(
            get_expected_sequence("account sequence mismatch, expected 5, got 0"),
            Some(5)
        );
        assert_eq!(
            get_expected_sequence("account sequence mismatch, expected 2, got 7"),
            Some(2)
        );
        assert_eq!(
            get_expected_sequence("account sequence mismatch, expected 20000001, got 7"),
            Some(20000001)
        );
    }

    #[test]
    fn get_expected_sequence_extra_prelude() {
        assert_eq!(
            get_expected_sequence("blah blah blah\n\naccount sequence mismatch, expected 5, got 0"),
            Some(5)
        );
        assert_eq!(
            get_expected_sequence(
                "foajodifjaolkdfjas aiodjfaof\n\n\naccount sequence mismatch, expected 2, got 7"
            ),
            Some(2)
        );
        assert_eq!(
            get_expected_sequence(
                "rpc error: code = Unknown desc = account sequence mismatch, expected 7, got 6: incorrect account sequence"
            ),
            Some(7)
        );
    }

    #[test]
    fn get_expected_sequence_bad() {
        assert_eq!(
            get_expected_sequence("Totally different error message"),
            None
        );
        assert_eq!(
            get_expected_sequence("account sequence mismatch, expected XXXXX, got 7"),
            None
        );
    }

    #[test]
    fn gas_price_ladder() {
        assert_eq!(gas_price_multiplier(0, 3, 1.6), 1.0);
        assert!((gas_price_multiplier(1, 3, 1.6) - 1.2).abs() < 1e-9);
        assert!((gas_price_multiplier(2, 3, 1.6) - 1.4).abs() < 1e-9);
        assert_eq!(gas_price_multiplier(3, 3, 1.6), 1.6);
        // No retries means straight to the maximum
        assert_eq!(gas_price_multiplier(0, 0, 1.5), 1.5);
    }

    #[tokio::test]
    async fn simulate_missing_account() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", ACCOUNT_PATH)
            .with_status(404)
            .with_body(r#"{"code":5,"message":"account cosmos19rl4cm2hmr8afy4kldpxz3fka4jguq0auqdal4 not found","details":[]}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/cosmos/tx/v1beta1/simulate")
            .with_body(r#"{"gas_info":{"gas_wanted":"0","gas_used":"50000"}}"#)
            .create_async()
            .await;
        let wallet = wallet(&server);
        let mut builder = TxBuilder::default();
        builder.add_send(wallet.address(), wallet.address(), "1uatom".parse().unwrap());
        let tx = wallet.create_tx(&builder).await.unwrap();
        assert_eq!(tx.auth_info.fee.gas_limit, 65000);
        assert_eq!(tx.auth_info.signer_infos[0].sequence, 0);
        assert_eq!(tx.signatures, vec![Vec::<u8>::new()]);
    }

    #[tokio::test]
    async fn simulate_sequence_recovery() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", ACCOUNT_PATH)
            .with_body(account_body(3))
            .create_async()
            .await;
        let mismatch = server
            .mock("POST", "/cosmos/tx/v1beta1/simulate")
            .with_status(500)
            .with_body(r#"{"code":32,"message":"account sequence mismatch, expected 4, got 3: incorrect account sequence","details":[]}"#)
            .expect(2)
            .create_async()
            .await;
        let wallet = wallet(&server);
        let mut builder = TxBuilder::default();
        builder.add_send(wallet.address(), wallet.address(), "1uatom".parse().unwrap());

        // Both simulations hit the same mock, the retry happens with the new number
        let err = wallet.estimate_fee(&builder).await.unwrap_err();
        assert!(format!("{err:?}").contains("Unable to simulate transaction"));
        mismatch.assert_async().await;
    }

    fn mismatch_body(expected: u64, got: u64) -> String {
        serde_json::json!({
            "code": 32,
            "message": format!("account sequence mismatch, expected {expected}, got {got}: incorrect account sequence"),
            "details": []
        })
        .to_string()
    }

    /// Simulation request body for the given signer sequence.
    fn simulate_request(wallet: &Wallet, builder: &TxBuilder, sequence: u64) -> Matcher {
        let mut tx = Tx::new(builder.make_tx_body(), Fee::default());
        tx.append_empty_signatures(&[wallet.signer_data(sequence)]);
        Matcher::PartialJson(serde_json::json!({"tx_bytes": tx.to_base64().unwrap()}))
    }

    /// Broadcast request body for the transaction signed with the given sequence.
    fn broadcast_request(wallet: &Wallet, builder: &TxBuilder, fee: &Fee, sequence: u64) -> Matcher {
        let tx = wallet.sign_with(builder, fee.clone(), 12, sequence).unwrap();
        Matcher::PartialJson(serde_json::json!({"tx_bytes": tx.to_base64().unwrap()}))
    }

    #[tokio::test]
    async fn simulate_retries_with_expected_sequence() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", ACCOUNT_PATH)
            .with_body(account_body(3))
            .create_async()
            .await;
        let wallet = wallet(&server);
        let mut builder = TxBuilder::default();
        builder.add_send(wallet.address(), wallet.address(), "1uatom".parse().unwrap());
        let stale = server
            .mock("POST", "/cosmos/tx/v1beta1/simulate")
            .match_body(simulate_request(&wallet, &builder, 3))
            .with_status(500)
            .with_body(mismatch_body(4, 3))
            .expect(1)
            .create_async()
            .await;
        let fresh = server
            .mock("POST", "/cosmos/tx/v1beta1/simulate")
            .match_body(simulate_request(&wallet, &builder, 4))
            .with_body(r#"{"gas_info":{"gas_wanted":"0","gas_used":"100000"}}"#)
            .expect(1)
            .create_async()
            .await;

        let tx = wallet.create_tx(&builder).await.unwrap();
        stale.assert_async().await;
        fresh.assert_async().await;
        assert_eq!(tx.auth_info.signer_infos[0].sequence, 4);
        assert_eq!(tx.auth_info.fee.gas_limit, 130000);
    }

    #[tokio::test]
    async fn broadcast_retries_with_expected_sequence() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", ACCOUNT_PATH)
            .with_body(account_body(1))
            .create_async()
            .await;
        let wallet = wallet(&server);
        let fee = Fee::new(100000, "2500uatom".parse().unwrap());
        let mut builder = TxBuilder::default();
        builder
            .add_send(wallet.address(), wallet.address(), "1uatom".parse().unwrap())
            .set_fee(fee.clone());
        let stale = server
            .mock("POST", "/cosmos/tx/v1beta1/txs")
            .match_body(broadcast_request(&wallet, &builder, &fee, 1))
            .with_body(broadcast_body(
                32,
                "account sequence mismatch, expected 2, got 1: incorrect account sequence",
            ))
            .expect(1)
            .create_async()
            .await;
        let fresh = server
            .mock("POST", "/cosmos/tx/v1beta1/txs")
            .match_body(broadcast_request(&wallet, &builder, &fee, 2))
            .with_body(broadcast_body(0, "[]"))
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/cosmos/tx/v1beta1/txs/ABCD")
            .with_body(serde_json::json!({"tx_response": tx_response_json("ABCD", 0, "")}).to_string())
            .create_async()
            .await;

        let res = wallet.broadcast(&builder).await.unwrap();
        stale.assert_async().await;
        fresh.assert_async().await;
        assert!(res.is_success());
        assert_eq!(res.txhash, "ABCD");
    }

    #[tokio::test]
    async fn explicit_fee_broadcast() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", ACCOUNT_PATH)
            .with_body(account_body(1))
            .create_async()
            .await;
        let broadcast = server
            .mock("POST", "/cosmos/tx/v1beta1/txs")
            .match_body(Matcher::PartialJson(
                serde_json::json!({"mode": "BROADCAST_MODE_SYNC"}),
            ))
            .with_body(broadcast_body(0, "[]"))
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/cosmos/tx/v1beta1/txs/ABCD")
            .with_body(serde_json::json!({"tx_response": tx_response_json("ABCD", 0, "")}).to_string())
            .create_async()
            .await;
        let wallet = wallet(&server);
        let mut builder = TxBuilder::default();
        builder
            .add_send(wallet.address(), wallet.address(), "1uatom".parse().unwrap())
            .set_fee(Fee::new(100000, "2500uatom".parse().unwrap()));
        let res = wallet.broadcast(&builder).await.unwrap();
        broadcast.assert_async().await;
        assert_eq!(res.txhash, "ABCD");
    }

    #[tokio::test]
    async fn insufficient_fee_ladder() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", ACCOUNT_PATH)
            .with_body(account_body(1))
            .create_async()
            .await;
        let broadcast = server
            .mock("POST", "/cosmos/tx/v1beta1/txs")
            .with_body(broadcast_body(13, "insufficient fees; got: 1uatom required: 5000uatom: insufficient fee"))
            .expect(4)
            .create_async()
            .await;
        let wallet = wallet(&server);
        let mut builder = TxBuilder::default();
        builder
            .add_send(wallet.address(), wallet.address(), "1uatom".parse().unwrap())
            .set_gas_limit(100000);
        let err = wallet.broadcast(&builder).await.unwrap_err();
        broadcast.assert_async().await;
        assert!(err
            .to_string()
            .starts_with("Initial transaction broadcast failed with code 13"));
    }

    #[tokio::test]
    async fn failed_transaction_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", ACCOUNT_PATH)
            .with_body(account_body(1))
            .create_async()
            .await;
        server
            .mock("POST", "/cosmos/tx/v1beta1/txs")
            .with_body(broadcast_body(0, "[]"))
            .create_async()
            .await;
        server
            .mock("GET", "/cosmos/tx/v1beta1/txs/ABCD")
            .with_body(
                serde_json::json!({"tx_response": tx_response_json("ABCD", 5, "insufficient funds")})
                    .to_string(),
            )
            .create_async()
            .await;
        let wallet = wallet(&server);
        let mut builder = TxBuilder::default();
        builder
            .add_send(wallet.address(), wallet.address(), "1uatom".parse().unwrap())
            .set_gas_limit(100000);
        let err = wallet.broadcast(&builder).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Transaction failed with code 5. Raw log: insufficient funds"
        );

        builder.set_skip_code_check(true);
        let res = wallet.broadcast(&builder).await.unwrap();
        assert_eq!(res.code, Some(5));
    }
}
