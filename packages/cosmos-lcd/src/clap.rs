use anyhow::{Context, Result};

use crate::{AddressHrp, GasPrices, LcdClient, LcdClientBuilder, LcdNetwork};

/// Command line options for connecting to a Cosmos network
#[derive(clap::Parser, Clone, Debug)]
pub struct LcdOpt {
    /// Which blockchain to connect to
    #[clap(long, env = "COSMOS_NETWORK", global = true)]
    pub network: Option<LcdNetwork>,
    /// Optional LCD endpoint override
    #[clap(long, env = "COSMOS_LCD", global = true)]
    pub lcd_url: Option<String>,
    /// Additional LCD endpoints used in round-robin order
    #[clap(long, env = "COSMOS_LCD_FALLBACKS", global = true, value_delimiter = ',')]
    pub lcd_fallbacks: Vec<String>,
    /// Optional chain ID override
    #[clap(long, env = "COSMOS_CHAIN_ID", global = true)]
    pub chain_id: Option<String>,
    /// Optional address prefix override
    #[clap(long, env = "COSMOS_HRP", global = true)]
    pub hrp: Option<AddressHrp>,
    /// Optional gas prices override, e.g. 0.025uatom
    #[clap(long, env = "COSMOS_GAS_PRICES", global = true)]
    pub gas_prices: Option<GasPrices>,
    /// Optional gas adjustment override
    #[clap(long, env = "COSMOS_GAS_ADJUSTMENT", global = true)]
    pub gas_adjustment: Option<f64>,
    /// Referer header
    #[clap(long, short, global = true, env = "COSMOS_REFERER_HEADER")]
    referer_header: Option<String>,
}

impl LcdOpt {
    pub fn builder(&self) -> Result<LcdClientBuilder> {
        self.clone().into_builder()
    }

    pub fn into_builder(self) -> Result<LcdClientBuilder> {
        let LcdOpt {
            network,
            lcd_url,
            lcd_fallbacks,
            chain_id,
            hrp,
            gas_prices,
            gas_adjustment,
            referer_header,
        } = self;

        let mut builder = network.context("No network specified, either provide the COSMOS_NETWORK env var or --network option")?.builder();
        if let Some(lcd_url) = lcd_url {
            builder.set_lcd_url(lcd_url);
        }
        for url in lcd_fallbacks {
            builder.add_fallback_url(url);
        }
        if let Some(chain_id) = chain_id {
            builder.set_chain_id(chain_id);
        }
        if let Some(hrp) = hrp {
            builder.set_hrp(hrp);
        }
        if let Some(gas_prices) = gas_prices {
            builder.set_gas_prices(gas_prices);
        }

        builder.set_gas_adjustment(gas_adjustment);
        builder.set_referer_header(referer_header);

        Ok(builder)
    }

    pub async fn build(&self) -> Result<LcdClient> {
        self.builder()?.build().await
    }

    pub fn build_lazy(&self) -> Result<LcdClient> {
        self.builder()?.build_lazy()
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(clap::Parser)]
    struct Cmd {
        #[clap(flatten)]
        opt: LcdOpt,
    }

    #[test]
    fn overrides() {
        let cmd = Cmd::try_parse_from([
            "test",
            "--network",
            "cosmoshub-testnet",
            "--lcd-url",
            "http://localhost:1317",
            "--gas-prices",
            "0.1uatom",
            "--lcd-fallbacks",
            "http://a,http://b",
        ])
        .unwrap();
        let builder = cmd.opt.into_builder().unwrap();
        assert_eq!(builder.chain_id(), "theta-testnet-001");
        assert_eq!(builder.lcd_url(), "http://localhost:1317");
        assert_eq!(builder.fallback_urls(), ["http://a", "http://b"]);
        assert_eq!(builder.gas_prices().get("uatom"), Some(0.1));
    }
}
