//! Safe-deployment backend client
//!
//! The backend deploys a per-user Safe proxy whose owner is derived from a
//! signed message, and reports Safe balances. Both endpoints are plain JSON.

use eyre::{eyre, Result, WrapErr};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::SafeBackendError;

/// Body of `POST /deploy-safe`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploySafeRequest {
    /// Signature over the deployment message, 0x-prefixed
    pub signature: String,
}

/// Response of `POST /deploy-safe`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeploySafeResponse {
    pub safe_address: String,
    /// Deployment transaction, empty when the Safe already existed
    #[serde(default)]
    pub txn_hash: Option<String>,
    /// Owner address recovered from the signature
    #[serde(rename = "derivedEOA")]
    pub derived_eoa: String,
    pub is_existing: bool,
}

/// Response of `GET /safe/{address}/balance`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SafeBalance {
    pub safe: String,
    /// USDC balance in whole tokens, as a decimal string
    #[serde(rename = "balanceUSDC")]
    pub balance_usdc: String,
    /// Native balance in wei, as a decimal string
    #[serde(rename = "balanceWei")]
    pub balance_wei: String,
}

/// HTTP client for the Safe-deployment backend
#[derive(Debug, Clone)]
pub struct SafeBackendClient {
    base_url: String,
    client: Client,
}

impl SafeBackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        url::Url::parse(base_url)
            .map_err(|e| eyre!("Invalid Safe backend URL {}: {}", base_url, e))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .wrap_err("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Deploy (or look up) the Safe owned by the signer of `signature`
    pub async fn deploy_safe(&self, signature: &str) -> Result<DeploySafeResponse, SafeBackendError> {
        let url = format!("{}/deploy-safe", self.base_url);
        let body = DeploySafeRequest {
            signature: signature.to_string(),
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let deployed: DeploySafeResponse = decode(response).await?;

        info!(
            safe = %deployed.safe_address,
            owner = %deployed.derived_eoa,
            existing = deployed.is_existing,
            tx_hash = ?deployed.txn_hash,
            "Safe deployment resolved"
        );
        Ok(deployed)
    }

    /// Fetch the USDC and native balance of `safe`
    pub async fn safe_balance(&self, safe: &str) -> Result<SafeBalance, SafeBackendError> {
        let url = format!("{}/safe/{}/balance", self.base_url, safe);
        debug!(safe = %safe, "Requesting Safe balance");

        let response = self.client.get(&url).send().await?;
        decode(response).await
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, SafeBackendError> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(SafeBackendError::Http {
            status: status.as_u16(),
            body: text,
        });
    }
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_response_field_names() {
        let json = r#"{
            "safeAddress": "0x1111111111111111111111111111111111111111",
            "txnHash": "0xabc",
            "derivedEOA": "0x2222222222222222222222222222222222222222",
            "isExisting": false
        }"#;
        let response: DeploySafeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.txn_hash.as_deref(), Some("0xabc"));
        assert!(!response.is_existing);
    }

    #[test]
    fn test_existing_safe_without_tx() {
        let json = r#"{
            "safeAddress": "0x1111111111111111111111111111111111111111",
            "derivedEOA": "0x2222222222222222222222222222222222222222",
            "isExisting": true
        }"#;
        let response: DeploySafeResponse = serde_json::from_str(json).unwrap();
        assert!(response.txn_hash.is_none());
    }

    #[test]
    fn test_balance_serializes_camel_case() {
        let balance = SafeBalance {
            safe: "0x1111111111111111111111111111111111111111".to_string(),
            balance_usdc: "12.5".to_string(),
            balance_wei: "1000".to_string(),
        };
        let value = serde_json::to_value(&balance).unwrap();
        assert_eq!(value["balanceUSDC"], "12.5");
        assert_eq!(value["balanceWei"], "1000");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(SafeBackendClient::new("nope", Duration::from_secs(1)).is_err());
    }
}
