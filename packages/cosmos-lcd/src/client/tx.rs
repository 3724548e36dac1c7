use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use crate::{
    address::HasAddress,
    error::{ChainParseError, LcdError},
    Fee, GasPrices, SignerData, Tx, TxBuilder, TxInfo,
};

use super::LcdClient;

/// How long [LcdClient::broadcast] waits before returning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BroadcastMode {
    /// Return after the transaction passes `CheckTx`.
    Sync,
    /// Return immediately.
    Async,
    /// Return once the transaction is in a block.
    Block,
}

impl BroadcastMode {
    fn as_lcd_mode(self) -> &'static str {
        match self {
            BroadcastMode::Sync | BroadcastMode::Block => "BROADCAST_MODE_SYNC",
            BroadcastMode::Async => "BROADCAST_MODE_ASYNC",
        }
    }
}

/// Outcome of [LcdClient::broadcast].
#[serde_as]
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BroadcastResult {
    /// 0 unless included in a block
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[serde(default)]
    pub height: i64,
    pub txhash: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub codespace: String,
    #[serde(default)]
    pub raw_log: String,
    /// Only set for [BroadcastMode::Block].
    #[serde(skip)]
    pub tx_info: Option<TxInfo>,
}

impl BroadcastResult {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Gas figures returned by a simulation.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct GasInfo {
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub gas_wanted: u64,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub gas_used: u64,
}

#[derive(Deserialize)]
struct SimulateResponse {
    gas_info: GasInfo,
}

#[derive(Serialize)]
struct TxBytesRequest<'a> {
    tx_bytes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<&'a str>,
}

#[derive(Deserialize)]
struct BroadcastResponse {
    tx_response: BroadcastResult,
}

#[derive(Deserialize)]
struct GetTxResponse {
    tx_response: TxInfo,
}

#[derive(Deserialize)]
struct GetTxsEventResponse {
    #[serde(default)]
    tx_responses: Vec<TxInfo>,
}

/// Gas to request after padding a simulated amount.
pub(crate) fn adjusted_gas(gas_used: u64, gas_adjustment: f64) -> u64 {
    (gas_used as f64 * gas_adjustment).ceil() as u64
}

impl LcdClient {
    /// Simulate a transaction. Signatures do not need to be valid, but there
    /// must be one per signer.
    pub async fn simulate(&self, tx: &Tx) -> Result<GasInfo, LcdError> {
        let res: SimulateResponse = self
            .post(
                "/cosmos/tx/v1beta1/simulate",
                &TxBytesRequest {
                    tx_bytes: tx.to_base64()?,
                    mode: None,
                },
            )
            .await?;
        Ok(res.gas_info)
    }

    /// Estimate the fee for the messages in `builder`, signed by `signers`.
    ///
    /// Uses the gas adjustment, gas prices and fee denoms of the builder,
    /// falling back to the client configuration.
    pub async fn estimate_fee(
        &self,
        signers: &[SignerData],
        builder: &TxBuilder,
    ) -> Result<Fee, LcdError> {
        let mut tx = Tx::new(builder.make_tx_body(), Fee::default());
        tx.append_empty_signatures(signers);
        let gas_info = self.simulate(&tx).await?;
        let gas_adjustment = builder
            .get_gas_adjustment()
            .unwrap_or_else(|| self.get_builder().gas_adjustment());
        let gas = adjusted_gas(gas_info.gas_used, gas_adjustment);
        tracing::debug!(
            "Simulated gas used {}, requesting {gas} with adjustment {gas_adjustment}",
            gas_info.gas_used
        );
        Ok(self.fee_for_gas(gas, builder, None))
    }

    /// Fee for a given gas limit, at `multiplier` times the configured prices.
    pub(crate) fn fee_for_gas(&self, gas: u64, builder: &TxBuilder, multiplier: Option<f64>) -> Fee {
        let prices = builder
            .get_gas_prices()
            .unwrap_or_else(|| self.gas_prices());
        let prices = match multiplier {
            Some(multiplier) => prices.scaled(multiplier),
            None => GasPrices::clone(prices),
        };
        let denoms = builder
            .get_fee_denoms()
            .or_else(|| self.get_builder().fee_denoms());
        Fee::new(gas, prices.fee_for(gas, denoms))
    }

    /// Broadcast a signed transaction.
    ///
    /// [BroadcastMode::Block] broadcasts synchronously and then waits for the
    /// transaction to land, see [Self::wait_for_transaction].
    pub async fn broadcast(&self, tx: &Tx, mode: BroadcastMode) -> Result<BroadcastResult> {
        let res: BroadcastResponse = self
            .post(
                "/cosmos/tx/v1beta1/txs",
                &TxBytesRequest {
                    tx_bytes: tx.to_base64()?,
                    mode: Some(mode.as_lcd_mode()),
                },
            )
            .await
            .context("Unable to broadcast transaction")?;
        let mut res = res.tx_response;
        tracing::debug!("Initial broadcast response: {res:?}");
        if mode != BroadcastMode::Block || !res.is_success() {
            return Ok(res);
        }

        let info = self.wait_for_transaction(&res.txhash).await?;
        res.height = info.height;
        res.code = info.code.unwrap_or_default();
        res.codespace = info.codespace.clone().unwrap_or_default();
        res.raw_log = info.raw_log.clone();
        res.tx_info = Some(info);
        Ok(res)
    }

    /// Get a transaction, failing immediately if not present
    pub async fn tx_info(&self, txhash: &str) -> Result<TxInfo, LcdError> {
        let res: GetTxResponse = self
            .get(&format!("/cosmos/tx/v1beta1/txs/{txhash}"), &[])
            .await?;
        Ok(res.tx_response)
    }

    /// Implements a retry loop waiting for a transaction to be ready
    pub async fn wait_for_transaction(&self, txhash: &str) -> Result<TxInfo> {
        const DELAY_SECONDS: u64 = 2;
        let attempts = self.get_builder().transaction_attempts();
        for attempt in 1..=attempts {
            match self.tx_info(txhash).await {
                Ok(info) => return Ok(info),
                Err(e) if e.is_not_found() => {
                    tracing::debug!("Transaction {txhash} not ready, attempt #{attempt}/{attempts}");
                    tokio::time::sleep(tokio::time::Duration::from_secs(DELAY_SECONDS)).await;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Unable to get transaction {txhash}"))
                }
            }
        }
        Err(anyhow::anyhow!("Timed out waiting for {txhash} to be ready"))
    }

    /// Transactions sent by an address, oldest first.
    pub async fn txs_by_sender(
        &self,
        address: impl HasAddress,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<TxInfo>, LcdError> {
        let query = [
            ("events", format!("message.sender='{}'", address.get_address_string())),
            ("pagination.limit", limit.unwrap_or(10).to_string()),
            ("pagination.offset", offset.unwrap_or_default().to_string()),
            ("order_by", "ORDER_BY_ASC".to_owned()),
        ];
        let res: GetTxsEventResponse = self.get("/cosmos/tx/v1beta1/txs", &query).await?;
        Ok(res.tx_responses)
    }

    /// Base64 of the protobuf encoding, as accepted by the broadcast endpoint.
    pub fn encode(&self, tx: &Tx) -> Result<String, ChainParseError> {
        tx.to_base64()
    }

    pub fn decode(&self, tx_bytes: &str) -> Result<Tx> {
        Tx::from_base64(tx_bytes)
    }

    /// Hash the chain will assign to this transaction.
    pub fn hash(&self, tx: &Tx) -> Result<String, ChainParseError> {
        tx.hash()
    }
}
