use super::http::fetch_json;
use crate::domain::errors::CollaboratorError;
use crate::domain::models::{AccountIndex, AccountName, AccountRecord, Action, TokenDescriptor};
use serde::de::DeserializeOwned;

const SERVICE: &str = "account index";

/// Client for the REST API of the account index.
#[derive(Clone)]
pub struct AccountIndexClient {
    http: reqwest::Client,
    base_url: String,
}

impl AccountIndexClient {
    pub fn from_url(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn account_url(&self, name: &AccountName, resource: &str) -> String {
        let mut url = format!("{}/accounts/{}", self.base_url, name);
        if !resource.is_empty() {
            url.push('/');
            url.push_str(resource);
        }
        url
    }

    async fn get<T: DeserializeOwned>(
        &self,
        name: &AccountName,
        resource: &str,
    ) -> Result<T, CollaboratorError> {
        let url = self.account_url(name, resource);
        tracing::debug!("GET {}", url);
        fetch_json(SERVICE, self.http.get(url)).await
    }
}

#[async_trait::async_trait]
impl AccountIndex for AccountIndexClient {
    async fn get_account(&self, name: &AccountName) -> Result<AccountRecord, CollaboratorError> {
        self.get(name, "").await
    }

    async fn get_account_tokens(
        &self,
        name: &AccountName,
    ) -> Result<Vec<TokenDescriptor>, CollaboratorError> {
        self.get(name, "tokens").await
    }

    async fn get_account_actions_sent(
        &self,
        name: &AccountName,
    ) -> Result<Vec<Action>, CollaboratorError> {
        self.get(name, "actions/sent").await
    }

    async fn get_account_actions_received(
        &self,
        name: &AccountName,
    ) -> Result<Vec<Action>, CollaboratorError> {
        self.get(name, "actions/received").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resources_hang_off_the_account_path() {
        let client = AccountIndexClient::from_url("http://index.local/api/");
        let alice = AccountName::new("alice");

        assert_eq!(client.account_url(&alice, ""), "http://index.local/api/accounts/alice");
        assert_eq!(
            client.account_url(&alice, "actions/received"),
            "http://index.local/api/accounts/alice/actions/received"
        );
    }
}
