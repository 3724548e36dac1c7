use std::fmt::Display;

use crate::{
    address::HasAddress, msg::Msg, Coins, Fee, GasPrices, MsgSend, SignMode, TxBody,
};

/// Transaction builder
///
/// Collects the messages of a transaction together with the options used to
/// create, sign and broadcast it. Anything left unset is looked up from the
/// chain or taken from the [crate::LcdClient] configuration.
#[derive(Default, Clone, Debug)]
pub struct TxBuilder {
    messages: Vec<Msg>,
    memo: Option<String>,
    timeout_height: Option<u64>,
    fee: Option<Fee>,
    gas_limit: Option<u64>,
    gas_prices: Option<GasPrices>,
    gas_adjustment: Option<f64>,
    fee_denoms: Option<Vec<String>>,
    account_number: Option<u64>,
    sequence: Option<u64>,
    sign_mode: Option<SignMode>,
    skip_code_check: bool,
}

impl Display for TxBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (idx, msg) in self.messages.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            f.write_str(&msg.describe())?;
        }
        if let Some(memo) = &self.memo {
            write!(f, " (memo: {memo})")?;
        }
        Ok(())
    }
}

impl TxBuilder {
    /// Add a message to this transaction.
    pub fn add_message(&mut self, msg: impl Into<Msg>) -> &mut Self {
        self.messages.push(msg.into());
        self
    }

    /// Add a bank send message.
    pub fn add_send(
        &mut self,
        from: impl HasAddress,
        to: impl HasAddress,
        amount: Coins,
    ) -> &mut Self {
        self.add_message(MsgSend::new(from, to, amount))
    }

    pub fn messages(&self) -> &[Msg] {
        &self.messages
    }

    /// Set the memo field.
    pub fn set_memo(&mut self, memo: impl Into<String>) -> &mut Self {
        self.memo = Some(memo.into());
        self
    }

    /// Clear the memo field
    pub fn clear_memo(&mut self) -> &mut Self {
        self.memo = None;
        self
    }

    /// Either set or clear the memo field.
    pub fn set_optional_memo(&mut self, memo: impl Into<Option<String>>) -> &mut Self {
        self.memo = memo.into();
        self
    }

    pub fn get_memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    /// Block height after which the transaction is no longer valid.
    pub fn set_timeout_height(&mut self, timeout_height: u64) -> &mut Self {
        self.timeout_height = Some(timeout_height);
        self
    }

    /// Use this fee as is, skipping simulation and gas price retries.
    pub fn set_fee(&mut self, fee: Fee) -> &mut Self {
        self.fee = Some(fee);
        self
    }

    pub fn get_fee(&self) -> Option<&Fee> {
        self.fee.as_ref()
    }

    /// Request this much gas instead of simulating.
    pub fn set_gas_limit(&mut self, gas_limit: u64) -> &mut Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn get_gas_limit(&self) -> Option<u64> {
        self.gas_limit
    }

    /// Override [crate::LcdClientBuilder::gas_prices] for this transaction.
    pub fn set_gas_prices(&mut self, gas_prices: GasPrices) -> &mut Self {
        self.gas_prices = Some(gas_prices);
        self
    }

    pub fn get_gas_prices(&self) -> Option<&GasPrices> {
        self.gas_prices.as_ref()
    }

    /// Override [crate::LcdClientBuilder::gas_adjustment] for this transaction.
    pub fn set_gas_adjustment(&mut self, gas_adjustment: f64) -> &mut Self {
        self.gas_adjustment = Some(gas_adjustment);
        self
    }

    pub fn get_gas_adjustment(&self) -> Option<f64> {
        self.gas_adjustment
    }

    /// Override [crate::LcdClientBuilder::fee_denoms] for this transaction.
    pub fn set_fee_denoms(&mut self, fee_denoms: Vec<String>) -> &mut Self {
        self.fee_denoms = Some(fee_denoms);
        self
    }

    pub fn get_fee_denoms(&self) -> Option<&[String]> {
        self.fee_denoms.as_deref()
    }

    /// Use this account number instead of querying it.
    pub fn set_account_number(&mut self, account_number: u64) -> &mut Self {
        self.account_number = Some(account_number);
        self
    }

    pub fn get_account_number(&self) -> Option<u64> {
        self.account_number
    }

    /// Use this sequence number instead of querying it.
    pub fn set_sequence(&mut self, sequence: u64) -> &mut Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn get_sequence(&self) -> Option<u64> {
        self.sequence
    }

    /// Defaults to [SignMode::Direct].
    pub fn set_sign_mode(&mut self, sign_mode: SignMode) -> &mut Self {
        self.sign_mode = Some(sign_mode);
        self
    }

    pub fn get_sign_mode(&self) -> SignMode {
        self.sign_mode.unwrap_or(SignMode::Direct)
    }

    /// When calling [crate::Wallet::broadcast], skip the check of whether the code is 0
    pub fn set_skip_code_check(&mut self, skip_code_check: bool) -> &mut Self {
        self.skip_code_check = skip_code_check;
        self
    }

    pub fn get_skip_code_check(&self) -> bool {
        self.skip_code_check
    }

    /// Make a [TxBody] for this builder
    pub fn make_tx_body(&self) -> TxBody {
        TxBody {
            messages: self.messages.clone(),
            memo: self.memo.clone().unwrap_or_default(),
            timeout_height: self.timeout_height.unwrap_or_default(),
        }
    }
}
