//! OAuth device-code flow: start the flow, then poll the token endpoint
//! until the user completes sign-in, the code expires, or the caller
//! cancels.

use super::errors::ConnectError;
use super::manager::{scope_for, token_endpoint_error};
use super::types::{AuthToken, AzureEnvironment, DeviceCodeInfo};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

#[derive(Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    expires_in: u64,
    interval: u64,
    message: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: u64,
}

/// Drives one device-code sign-in against an Azure AD tenant.
pub struct DeviceCodeClient {
    http_client: reqwest::Client,
    environment: AzureEnvironment,
    client_id: String,
    scope: String,
}

impl DeviceCodeClient {
    /// `resource` is the audience the resulting token is for, e.g.
    /// `https://contoso.sharepoint.com`.
    pub fn new(
        http_client: reqwest::Client,
        environment: AzureEnvironment,
        client_id: impl Into<String>,
        resource: &str,
    ) -> Self {
        Self {
            http_client,
            environment,
            client_id: client_id.into(),
            scope: scope_for(resource),
        }
    }

    /// Requests a device code and the user-facing instructions.
    pub async fn start(&self) -> Result<DeviceCodeInfo, ConnectError> {
        let device_code_url = format!(
            "{}/organizations/oauth2/v2.0/devicecode",
            self.environment.authority_host()
        );
        let params = [
            ("client_id", self.client_id.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .http_client
            .post(&device_code_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                ConnectError::AuthenticationFailed(format!(
                    "unable to initiate the device code flow: {e}"
                ))
            })?;

        if !response.status().is_success() {
            return Err(token_endpoint_error(response).await);
        }

        let body: DeviceCodeResponse = response.json().await.map_err(|e| {
            ConnectError::AuthenticationFailed(format!(
                "unable to parse the device code response: {e}"
            ))
        })?;

        Ok(DeviceCodeInfo {
            device_code: body.device_code,
            user_code: body.user_code,
            verification_uri: body.verification_uri,
            expires_in: body.expires_in,
            interval: body.interval,
            message: body.message,
        })
    }

    /// Polls the token endpoint until the sign-in completes.
    ///
    /// Cancellation is cooperative: the token is checked every iteration,
    /// so the loop terminates within one poll interval of a cancel and
    /// resolves to `Ok(None)`.
    pub async fn poll(
        &self,
        info: &DeviceCodeInfo,
        cancel: &CancellationToken,
    ) -> Result<Option<AuthToken>, ConnectError> {
        let token_url = format!(
            "{}/organizations/oauth2/v2.0/token",
            self.environment.authority_host()
        );

        let mut interval = std::time::Duration::from_secs(info.interval.max(1));
        let timeout = std::time::Duration::from_secs(info.expires_in);
        let start = std::time::Instant::now();

        loop {
            if cancel.is_cancelled() {
                log::debug!("device login cancelled before completion");
                return Ok(None);
            }
            if start.elapsed() > timeout {
                return Err(ConnectError::AuthenticationFailed(
                    "the device code has expired; connect again to restart the sign-in"
                        .to_string(),
                ));
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    log::debug!("device login cancelled while waiting to poll");
                    return Ok(None);
                }
                _ = tokio::time::sleep(interval) => {}
            }

            let params = [
                ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
                ("client_id", self.client_id.as_str()),
                ("device_code", info.device_code.as_str()),
            ];

            let response = self
                .http_client
                .post(&token_url)
                .form(&params)
                .send()
                .await
                .map_err(|e| {
                    ConnectError::AuthenticationFailed(format!(
                        "unable to poll for the device login token: {e}"
                    ))
                })?;

            if response.status().is_success() {
                let body: TokenResponse = response.json().await.map_err(|e| {
                    ConnectError::AuthenticationFailed(format!(
                        "unable to parse the token response: {e}"
                    ))
                })?;
                return Ok(Some(AuthToken {
                    token: body.access_token,
                    token_type: body.token_type,
                    expires_in_secs: Some(body.expires_in),
                }));
            }

            let error_body: serde_json::Value = response.json().await.unwrap_or_default();
            match error_body["error"].as_str() {
                Some("authorization_pending") => {
                    log::debug!("waiting for the user to complete the device sign-in");
                }
                Some("slow_down") => {
                    log::debug!("token endpoint asked to slow down polling");
                    interval += std::time::Duration::from_secs(5);
                }
                Some("expired_token") => {
                    return Err(ConnectError::AuthenticationFailed(
                        "the device code has expired; connect again to restart the sign-in"
                            .to_string(),
                    ));
                }
                Some("access_denied") => {
                    return Err(ConnectError::AuthenticationFailed(
                        "access was denied while completing the device sign-in".to_string(),
                    ));
                }
                other => {
                    let detail = error_body["error_description"]
                        .as_str()
                        .or(other)
                        .unwrap_or("no error detail supplied");
                    return Err(ConnectError::AuthenticationFailed(format!(
                        "device login failed: {detail}"
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pre_cancelled_poll_resolves_to_none_without_network() {
        let client = DeviceCodeClient::new(
            reqwest::Client::new(),
            AzureEnvironment::Production,
            "client",
            "https://contoso.sharepoint.com",
        );
        let info = DeviceCodeInfo {
            device_code: "dev".into(),
            user_code: "ABC123".into(),
            verification_uri: "https://microsoft.com/devicelogin".into(),
            expires_in: 900,
            interval: 5,
            message: "enter the code".into(),
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = client.poll(&info, &cancel).await.unwrap();
        assert!(outcome.is_none());
    }
}
