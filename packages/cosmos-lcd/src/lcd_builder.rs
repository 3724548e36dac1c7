use crate::{AddressHrp, GasPrices};

/// Used to build a [crate::LcdClient].
#[derive(Clone, Debug)]
pub struct LcdClientBuilder {
    lcd_url: String,
    fallback_urls: Vec<String>,
    chain_id: String,
    gas_prices: GasPrices,
    hrp: AddressHrp,

    // Values with defaults
    coin_type: Option<u32>,
    gas_adjustment: Option<f64>,
    gas_price_retry_attempts: Option<u64>,
    gas_price_max_multiplier: Option<f64>,
    fee_denoms: Option<Vec<String>>,
    transaction_attempts: Option<usize>,
    referer_header: Option<String>,
    query_timeout_seconds: Option<u32>,
    query_retries: Option<u32>,
}

impl LcdClientBuilder {
    /// Create a new [LcdClientBuilder] with default options where possible.
    pub fn new(
        chain_id: impl Into<String>,
        gas_prices: GasPrices,
        hrp: AddressHrp,
        lcd_url: impl Into<String>,
    ) -> LcdClientBuilder {
        Self {
            lcd_url: lcd_url.into(),
            fallback_urls: vec![],
            chain_id: chain_id.into(),
            gas_prices,
            hrp,
            coin_type: None,
            gas_adjustment: None,
            gas_price_retry_attempts: None,
            gas_price_max_multiplier: None,
            fee_denoms: None,
            transaction_attempts: None,
            referer_header: None,
            query_timeout_seconds: None,
            query_retries: None,
        }
    }

    /// LCD endpoint to talk to
    pub fn lcd_url(&self) -> &str {
        self.lcd_url.as_ref()
    }

    /// See [Self::lcd_url]
    pub fn set_lcd_url(&mut self, lcd_url: impl Into<String>) {
        self.lcd_url = lcd_url.into();
    }

    /// Additional endpoints, used in round-robin order with the primary URL
    pub fn fallback_urls(&self) -> &[String] {
        &self.fallback_urls
    }

    /// See [Self::fallback_urls]
    pub fn add_fallback_url(&mut self, url: impl Into<String>) {
        self.fallback_urls.push(url.into());
    }

    /// Chain ID we want to communicate with
    pub fn chain_id(&self) -> &str {
        self.chain_id.as_ref()
    }

    /// See [Self::chain_id]
    pub fn set_chain_id(&mut self, chain_id: String) {
        self.chain_id = chain_id;
    }

    /// Price per unit of gas used for fees
    pub fn gas_prices(&self) -> &GasPrices {
        &self.gas_prices
    }

    /// See [Self::gas_prices]
    pub fn set_gas_prices(&mut self, gas_prices: GasPrices) {
        self.gas_prices = gas_prices;
    }

    /// Human-readable part (HRP) of chain addresses
    pub fn hrp(&self) -> AddressHrp {
        self.hrp
    }

    /// See [Self::hrp]
    pub fn set_hrp(&mut self, hrp: AddressHrp) {
        self.hrp = hrp;
    }

    /// BIP-44 coin type used when deriving keys for this chain
    ///
    /// Default: 118
    pub fn coin_type(&self) -> u32 {
        self.coin_type.unwrap_or(crate::key::COSMOS_COIN_TYPE)
    }

    /// See [Self::coin_type]
    pub fn set_coin_type(&mut self, coin_type: Option<u32>) {
        self.coin_type = coin_type;
    }

    /// Multiplier applied to simulated gas to account for fluctuations
    ///
    /// Default: 1.3
    pub fn gas_adjustment(&self) -> f64 {
        self.gas_adjustment.unwrap_or(1.3)
    }

    /// See [Self::gas_adjustment]
    pub fn set_gas_adjustment(&mut self, gas_adjustment: Option<f64>) {
        self.gas_adjustment = gas_adjustment;
    }

    /// How many retries at increasing gas prices on an insufficient fee error
    ///
    /// Default: 3
    ///
    /// If this is 0, we'll always go straight to the maximum price. 1 means
    /// we'll try the configured price and the maximum. 2 means the configured
    /// price, the midpoint, and the maximum. And so on from there.
    pub fn gas_price_retry_attempts(&self) -> u64 {
        self.gas_price_retry_attempts.unwrap_or(3)
    }

    /// See [Self::gas_price_retry_attempts]
    pub fn set_gas_price_retry_attempts(&mut self, gas_price_retry_attempts: Option<u64>) {
        self.gas_price_retry_attempts = gas_price_retry_attempts;
    }

    /// Highest gas price we'll pay, as a multiple of [Self::gas_prices]
    ///
    /// Default: 1.5
    pub fn gas_price_max_multiplier(&self) -> f64 {
        self.gas_price_max_multiplier.unwrap_or(1.5)
    }

    /// See [Self::gas_price_max_multiplier]
    pub fn set_gas_price_max_multiplier(&mut self, gas_price_max_multiplier: Option<f64>) {
        self.gas_price_max_multiplier = gas_price_max_multiplier;
    }

    /// Denoms to pay fees in
    ///
    /// Default: every denom in [Self::gas_prices]
    pub fn fee_denoms(&self) -> Option<&[String]> {
        self.fee_denoms.as_deref()
    }

    /// See [Self::fee_denoms]
    pub fn set_fee_denoms(&mut self, fee_denoms: Option<Vec<String>>) {
        self.fee_denoms = fee_denoms;
    }

    /// How many attempts to give a transaction before giving up
    ///
    /// Default: 30
    pub fn transaction_attempts(&self) -> usize {
        self.transaction_attempts.unwrap_or(30)
    }

    /// See [Self::transaction_attempts]
    pub fn set_transaction_attempts(&mut self, transaction_attempts: Option<usize>) {
        self.transaction_attempts = transaction_attempts;
    }

    /// Referrer header sent to the server
    pub fn referer_header(&self) -> Option<&str> {
        self.referer_header.as_deref()
    }

    /// See [Self::referer_header]
    pub fn set_referer_header(&mut self, referer_header: Option<String>) {
        self.referer_header = referer_header;
    }

    /// Sets the number of seconds before timing out an LCD request
    ///
    /// Defaults to 5 seconds
    pub fn query_timeout_seconds(&self) -> u32 {
        self.query_timeout_seconds.unwrap_or(5)
    }

    /// See [Self::query_timeout_seconds]
    pub fn set_query_timeout_seconds(&mut self, query_timeout_seconds: Option<u32>) {
        self.query_timeout_seconds = query_timeout_seconds;
    }

    /// Number of attempts to make at a query before giving up.
    ///
    /// Only retries on network errors, timeouts and overloaded gateways.
    ///
    /// Defaults to 3
    pub fn query_retries(&self) -> u32 {
        self.query_retries.unwrap_or(3)
    }

    /// See [Self::query_retries]
    pub fn set_query_retries(&mut self, query_retries: Option<u32>) {
        self.query_retries = query_retries;
    }
}
