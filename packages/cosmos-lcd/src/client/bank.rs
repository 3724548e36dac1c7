use serde::Deserialize;

use crate::{address::HasAddress, error::LcdError, Coin, Coins};

use super::LcdClient;

#[derive(Deserialize)]
struct BalancesResponse {
    balances: Vec<Coin>,
    #[serde(default)]
    pagination: Option<PageResponse>,
}

#[derive(Deserialize)]
struct PageResponse {
    #[serde(default)]
    next_key: Option<String>,
}

impl LcdClient {
    /// All balances held by an address, following pagination.
    pub async fn balance(&self, address: impl HasAddress) -> Result<Coins, LcdError> {
        self.balance_at(address, None).await
    }

    /// Same as [Self::balance], as of an earlier block height.
    pub async fn balance_at(
        &self,
        address: impl HasAddress,
        height: Option<u64>,
    ) -> Result<Coins, LcdError> {
        let path = format!(
            "/cosmos/bank/v1beta1/balances/{}",
            address.get_address_string()
        );
        let mut coins = Coins::new();
        let mut next_key = None;
        loop {
            let query = match next_key.take() {
                None => vec![],
                Some(key) => vec![("pagination.key", key)],
            };
            let res: BalancesResponse = self.get_at_height(&path, &query, height).await?;
            for coin in res.balances {
                coins.add_coin(coin);
            }
            match res.pagination.and_then(|x| x.next_key) {
                Some(key) if !key.is_empty() => next_key = Some(key),
                _ => break Ok(coins),
            }
        }
    }
}
