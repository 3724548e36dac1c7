use serde::Deserialize;
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use crate::{address::HasAddress, error::LcdError, PublicKey};

use super::LcdClient;

/// On-chain account state relevant for signing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub address: String,
    /// `None` until the account has signed its first transaction.
    pub public_key: Option<PublicKey>,
    pub account_number: u64,
    pub sequence: u64,
}

#[derive(Deserialize)]
struct AccountResponse {
    account: Value,
}

#[serde_as]
#[derive(Deserialize)]
struct BaseAccountJson {
    address: String,
    #[serde(default)]
    pub_key: Option<Value>,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    account_number: u64,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    sequence: u64,
}

/// Vesting and module accounts wrap the base account.
fn find_base_account(account: Value) -> Value {
    let mut account = account;
    if let Some(base) = account
        .get_mut("base_vesting_account")
        .and_then(|x| x.get_mut("base_account"))
    {
        return base.take();
    }
    if let Some(base) = account.get_mut("base_account") {
        return base.take();
    }
    account
}

impl Account {
    pub(crate) fn from_json(account: Value) -> Result<Self, serde_json::Error> {
        let base: BaseAccountJson = serde_json::from_value(find_base_account(account))?;
        let public_key = base.pub_key.and_then(|pub_key| {
            serde_json::from_value(pub_key.clone())
                .map_err(|e| {
                    tracing::debug!("Ignoring unsupported public key {pub_key}: {e}");
                })
                .ok()
        });
        Ok(Account {
            address: base.address,
            public_key,
            account_number: base.account_number,
            sequence: base.sequence,
        })
    }
}

impl LcdClient {
    /// Look up an account. Accounts that never received funds are reported
    /// as not found, see [LcdError::is_not_found].
    pub async fn account_info(&self, address: impl HasAddress) -> Result<Account, LcdError> {
        let path = format!(
            "/cosmos/auth/v1beta1/accounts/{}",
            address.get_address_string()
        );
        let res: AccountResponse = self.get(&path, &[]).await?;
        Account::from_json(res.account).map_err(|source| LcdError::InvalidJson {
            url: path,
            body: String::new(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{client::tests::client_for, Address};

    use super::*;

    const ADDRESS: &str = "cosmos19rl4cm2hmr8afy4kldpxz3fka4jguq0auqdal4";

    #[test]
    fn base_account() {
        let account = Account::from_json(serde_json::json!({
            "@type": "/cosmos.auth.v1beta1.BaseAccount",
            "address": ADDRESS,
            "pub_key": {
                "@type": "/cosmos.crypto.secp256k1.PubKey",
                "key": "AgICAgICAgICAgICAgICAgICAgICAgICAgICAgICAgIC"
            },
            "account_number": "42",
            "sequence": "7"
        }))
        .unwrap();
        assert_eq!(account.account_number, 42);
        assert_eq!(account.sequence, 7);
        assert_eq!(account.public_key, Some(PublicKey::Secp256k1(vec![2; 33])));
    }

    #[test]
    fn vesting_account() {
        let account = Account::from_json(serde_json::json!({
            "@type": "/cosmos.vesting.v1beta1.ContinuousVestingAccount",
            "base_vesting_account": {
                "base_account": {
                    "address": ADDRESS,
                    "pub_key": null,
                    "account_number": "3",
                    "sequence": "0"
                },
                "original_vesting": []
            },
            "start_time": "0"
        }))
        .unwrap();
        assert_eq!(account.account_number, 3);
        assert_eq!(account.public_key, None);
    }

    #[test]
    fn unknown_public_key_is_dropped() {
        let account = Account::from_json(serde_json::json!({
            "@type": "/cosmos.auth.v1beta1.ModuleAccount",
            "base_account": {
                "address": ADDRESS,
                "pub_key": {"@type": "/ethermint.crypto.v1.ethsecp256k1.PubKey", "key": "AA=="},
                "account_number": "1",
                "sequence": "2"
            },
            "name": "distribution"
        }))
        .unwrap();
        assert_eq!(account.public_key, None);
        assert_eq!(account.sequence, 2);
    }

    #[tokio::test]
    async fn account_info_request() {
        let mut server = mockito::Server::new_async().await;
        let path = format!("/cosmos/auth/v1beta1/accounts/{ADDRESS}");
        server
            .mock("GET", path.as_str())
            .with_body(
                serde_json::json!({
                    "account": {
                        "@type": "/cosmos.auth.v1beta1.BaseAccount",
                        "address": ADDRESS,
                        "pub_key": null,
                        "account_number": "9",
                        "sequence": "1"
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;
        let lcd = client_for(&server);
        let address: Address = ADDRESS.parse().unwrap();
        let account = lcd.account_info(address).await.unwrap();
        assert_eq!(account.address, ADDRESS);
        assert_eq!(account.account_number, 9);
    }
}
