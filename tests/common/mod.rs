#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, LOCATION};
use storefront_probe::config::ProbeConfig;
use storefront_probe::{ProbeHttpClient, ProbeHttpClientError, ProbeHttpResponse, StoreProber};
use url::Url;

pub const LEGACY_PAGE: &str = r#"<html><body>Shopify
<form id="customer_login" action="/account/login" method="post">
  <input type="email" name="customer[email]">
  <input type="password" name="customer[password]">
</form></body></html>"#;

pub const NEW_PAGE: &str =
    r#"<html><script src="https://cdn.shopify.com/init-customer-accounts.js"></script></html>"#;

pub const PLAIN_PAGE: &str = "<html><body>Welcome to our store</body></html>";

#[derive(Clone)]
struct Scripted {
    status: u16,
    headers: HeaderMap,
    body: &'static str,
}

/// Transport answering from a fixed table keyed by full request URL.
/// Unknown URLs fail like a refused connection.
#[derive(Default)]
pub struct ScriptedClient {
    routes: Mutex<HashMap<String, Scripted>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, status: u16, body: &'static str) -> Self {
        self.insert(url, status, HeaderMap::new(), body)
    }

    pub fn shopify_page(self, url: &str, status: u16, body: &'static str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert("x-shopid", HeaderValue::from_static("1"));
        self.insert(url, status, headers, body)
    }

    pub fn redirect(self, url: &str, status: u16, location: &'static str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_static(location));
        self.insert(url, status, headers, "")
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn insert(self, url: &str, status: u16, headers: HeaderMap, body: &'static str) -> Self {
        self.routes.lock().unwrap().insert(
            url.to_string(),
            Scripted {
                status,
                headers,
                body,
            },
        );
        self
    }
}

#[async_trait]
impl ProbeHttpClient for ScriptedClient {
    async fn get(&self, url: &Url) -> Result<ProbeHttpResponse, ProbeHttpClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.routes.lock().unwrap().get(url.as_str()).cloned();
        let Some(scripted) = scripted else {
            return Err(ProbeHttpClientError::Transport(format!(
                "connection refused: {url}"
            )));
        };
        Ok(ProbeHttpResponse::new(
            scripted.status,
            scripted.headers,
            url.clone(),
            Box::pin(async move { Ok(Bytes::from_static(scripted.body.as_bytes())) }),
        ))
    }
}

pub fn prober_with(client: Arc<ScriptedClient>, config: ProbeConfig) -> StoreProber {
    StoreProber::builder()
        .with_config(config)
        .with_client(client)
        .disable_logging()
        .build()
        .unwrap()
}

/// `https://sN.example/account/login` answers with the legacy form for every
/// even N and the hosted-account page for every odd N.
pub fn numbered_stores(count: usize) -> (Arc<ScriptedClient>, Vec<String>) {
    let mut client = ScriptedClient::new();
    let mut urls = Vec::with_capacity(count);
    for n in 0..count {
        let store = format!("https://s{n}.example");
        let body = if n % 2 == 0 { LEGACY_PAGE } else { NEW_PAGE };
        client = client.shopify_page(&format!("{store}/account/login"), 200, body);
        urls.push(store);
    }
    (Arc::new(client), urls)
}
