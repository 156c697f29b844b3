//! Reqwest-based implementation of the `ProbeHttpClient` trait.
//!
//! Provides a thin adapter around `reqwest::Client` that disables redirect
//! following and defers the body read until the login flow asks for it.

use std::error::Error;

use async_trait::async_trait;
use reqwest::{Client, redirect::Policy};
use url::Url;

use super::{ProbeHttpClient, ProbeHttpClientError, ProbeHttpResponse};
use crate::config::ProbeConfig;
use crate::probe::user_agents::UserAgentProfile;

/// Reqwest-backed HTTP client used for login probes.
pub struct ReqwestProbeClient {
    client: Client,
}

impl ReqwestProbeClient {
    /// Creates a client with redirects disabled, the desktop browser headers,
    /// and the configured timeouts.
    pub fn new(config: &ProbeConfig) -> Result<Self, ProbeHttpClientError> {
        let profile = UserAgentProfile::desktop(Some(&config.user_agent));
        let headers = profile
            .to_header_map()
            .map_err(|err| ProbeHttpClientError::Transport(err.to_string()))?;

        let client = Client::builder()
            .redirect(Policy::none())
            .default_headers(headers)
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|err| ProbeHttpClientError::Transport(err.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ProbeHttpClient for ReqwestProbeClient {
    async fn get(&self, url: &Url) -> Result<ProbeHttpResponse, ProbeHttpClientError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|err| ProbeHttpClientError::Transport(describe(&err)))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let final_url = response.url().clone();
        let body = Box::pin(async move {
            response
                .bytes()
                .await
                .map_err(|err| ProbeHttpClientError::Body(describe(&err)))
        });

        Ok(ProbeHttpResponse::new(status, headers, final_url, body))
    }
}

// "error sending request for url ..." plus every underlying cause.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
