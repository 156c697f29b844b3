//! Redirect-following probe of a storefront's `/account/login` page.
//!
//! The flow is a small state machine over raw HTTP responses:
//! 1. GET the login URL with redirects disabled at the transport.
//! 2. Inspect `Location` before the status: a hosted-login target ends the
//!    probe as `new` no matter the status code.
//! 3. Follow other 30x responses manually, up to the redirect budget.
//! 4. Settle on the first non-redirect status (406 off-domain, 200, 404, or
//!    anything else).
//!
//! Transport failures never escape; they become `error` results.

use std::time::Instant;

use chrono::Utc;
use url::Url;

use crate::modules::events::{
    ClassifiedEvent, EventDispatcher, FailedEvent, ProbeEvent, RequestEvent, ResponseEvent,
};
use crate::probe::core::{
    AccountType, CheckResult, ProbeHttpClient, ProbeHttpClientError, ProbeHttpResponse,
    resolve_location,
};
use crate::probe::detectors::{
    classify_from_body, has_platform_marker, is_new_account_redirect, is_shopify_platform,
};

/// Path appended to the store URL to reach the customer login page.
pub const LOGIN_PATH: &str = "/account/login";

/// Default number of requests issued per store before giving up.
pub const DEFAULT_MAX_REDIRECTS: usize = 6;

pub const TOO_MANY_REDIRECTS: &str = "Too many redirects";

/// Runs the login probe for one store against a transport.
pub struct LoginProbe<'a> {
    client: &'a dyn ProbeHttpClient,
    events: &'a EventDispatcher,
    max_redirects: usize,
}

impl<'a> LoginProbe<'a> {
    pub fn new(client: &'a dyn ProbeHttpClient, events: &'a EventDispatcher) -> Self {
        Self {
            client,
            events,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects.max(1);
        self
    }

    /// Classify `store_url` (already normalized). Never fails.
    pub async fn classify(&self, store_url: &str) -> CheckResult {
        match self.run(store_url).await {
            Ok((result, hops)) => {
                self.events.dispatch(ProbeEvent::Classified(ClassifiedEvent {
                    store: store_url.to_string(),
                    account_type: result.kind(),
                    status: result.status(),
                    hops,
                    timestamp: Utc::now(),
                }));
                result
            }
            Err(err) => {
                let message = err.to_string();
                self.events.dispatch(ProbeEvent::Failed(FailedEvent {
                    store: store_url.to_string(),
                    error: message.clone(),
                    timestamp: Utc::now(),
                }));
                CheckResult::failed(store_url, message)
            }
        }
    }

    async fn run(&self, store_url: &str) -> Result<(CheckResult, usize), ProbeHttpClientError> {
        let store = Url::parse(store_url)?;
        let login_url = Url::parse(&format!("{store_url}{LOGIN_PATH}"))?;

        let mut current = login_url.clone();
        let mut last_status = None;

        for hop in 0..self.max_redirects {
            let response = self.fetch(store_url, &current, hop).await?;
            let status = response.status;
            last_status = Some(status);

            if let Some(location) = response.location() {
                if is_new_account_redirect(location) {
                    let result = CheckResult::accounts_redirect(store_url, status, location);
                    return Ok((result, hop + 1));
                }
                if response.is_redirect() {
                    current = resolve_location(&current, location)?;
                    continue;
                }
            }

            let result = match status {
                406 if current != login_url && current.host_str() != store.host_str() => {
                    let host = current.host_str().unwrap_or_default();
                    CheckResult::classified(
                        store_url,
                        AccountType::New,
                        Some(status),
                        Some(format!("Custom account domain: {host}")),
                    )
                }
                200 => settle_login_page(store_url, response).await?,
                404 => CheckResult::classified(
                    store_url,
                    AccountType::NotShopify,
                    Some(status),
                    Some("No /account/login page (404), not a Shopify storefront".into()),
                ),
                other => CheckResult::classified(
                    store_url,
                    AccountType::Unknown,
                    Some(other),
                    Some(format!("Unexpected status {other} at {current}")),
                ),
            };
            return Ok((result, hop + 1));
        }

        let result = CheckResult::classified(
            store_url,
            AccountType::Unknown,
            last_status,
            Some(TOO_MANY_REDIRECTS.into()),
        );
        Ok((result, self.max_redirects))
    }

    async fn fetch(
        &self,
        store_url: &str,
        url: &Url,
        hop: usize,
    ) -> Result<ProbeHttpResponse, ProbeHttpClientError> {
        self.events.dispatch(ProbeEvent::Request(RequestEvent {
            store: store_url.to_string(),
            url: url.clone(),
            hop,
            timestamp: Utc::now(),
        }));

        let started = Instant::now();
        let response = self.client.get(url).await?;

        self.events.dispatch(ProbeEvent::Response(ResponseEvent {
            store: store_url.to_string(),
            url: response.url.clone(),
            status: response.status,
            location: response.location().map(str::to_owned),
            latency: started.elapsed(),
            timestamp: Utc::now(),
        }));

        Ok(response)
    }
}

/// 200 on the login page: require a platform fingerprint, then run the body rules.
async fn settle_login_page(
    store_url: &str,
    response: ProbeHttpResponse,
) -> Result<CheckResult, ProbeHttpClientError> {
    let status = response.status;
    let platform = is_shopify_platform(&response.headers);
    let body = response.text().await?;

    if !platform && !has_platform_marker(&body) {
        return Ok(CheckResult::classified(
            store_url,
            AccountType::NotShopify,
            Some(status),
            Some("No Shopify fingerprint in login page headers or body".into()),
        ));
    }

    Ok(classify_from_body(store_url, &body, Some(status)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use http::header::{HeaderMap, HeaderValue, LOCATION};
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    const STORE: &str = "https://shop.example";

    struct StubReply {
        status: u16,
        headers: HeaderMap,
        body: &'static str,
    }

    fn reply(status: u16, body: &'static str) -> StubReply {
        StubReply {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    fn redirect(status: u16, location: &'static str) -> StubReply {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_static(location));
        StubReply {
            status,
            headers,
            body: "",
        }
    }

    struct StubClient {
        replies: Mutex<Vec<StubReply>>,
        requested: Mutex<Vec<String>>,
        body_read: Arc<AtomicBool>,
        fail_with: Option<&'static str>,
    }

    impl StubClient {
        fn new(replies: Vec<StubReply>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                requested: Mutex::new(Vec::new()),
                body_read: Arc::new(AtomicBool::new(false)),
                fail_with: None,
            }
        }

        fn failing(message: &'static str) -> Self {
            Self {
                fail_with: Some(message),
                ..Self::new(Vec::new())
            }
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProbeHttpClient for StubClient {
        async fn get(&self, url: &Url) -> Result<ProbeHttpResponse, ProbeHttpClientError> {
            self.requested.lock().unwrap().push(url.to_string());
            if let Some(message) = self.fail_with {
                return Err(ProbeHttpClientError::Transport(message.into()));
            }
            let next = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .expect("no more stub replies");
            let flag = self.body_read.clone();
            let body = next.body;
            Ok(ProbeHttpResponse::new(
                next.status,
                next.headers,
                url.clone(),
                Box::pin(async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok(Bytes::from_static(body.as_bytes()))
                }),
            ))
        }
    }

    async fn probe(client: &StubClient) -> CheckResult {
        let events = EventDispatcher::new();
        LoginProbe::new(client, &events).classify(STORE).await
    }

    #[tokio::test]
    async fn hosted_login_redirect_is_new() {
        let client = StubClient::new(vec![redirect(
            302,
            "https://accounts.shopify.com/store-login?shop=1",
        )]);
        let result = probe(&client).await;

        assert_eq!(result.kind(), AccountType::New);
        assert_eq!(result.status(), Some(302));
        assert_eq!(
            result.redirect(),
            Some("https://accounts.shopify.com/store-login?shop=1")
        );
        assert_eq!(result.url(), STORE);
        assert_eq!(client.requested(), vec!["https://shop.example/account/login"]);
    }

    #[tokio::test]
    async fn location_signal_checked_before_status() {
        let client = StubClient::new(vec![redirect(200, "/auth/login")]);
        let result = probe(&client).await;
        assert_eq!(result.kind(), AccountType::New);
        assert_eq!(result.redirect(), Some("/auth/login"));
    }

    #[tokio::test]
    async fn follows_relative_redirects_then_reads_body() {
        let client = StubClient::new(vec![
            redirect(301, "https://www.shop.example/account/login"),
            redirect(302, "/customer/sign_in"),
            reply(
                200,
                r#"<form action="/account/login"><input type="password" name="customer[password]"></form> Shopify"#,
            ),
        ]);
        let result = probe(&client).await;

        assert_eq!(result.kind(), AccountType::Legacy);
        assert_eq!(result.status(), Some(200));
        assert_eq!(result.url(), STORE);
        assert!(result.redirect().is_none());
        assert_eq!(
            client.requested(),
            vec![
                "https://shop.example/account/login",
                "https://www.shop.example/account/login",
                "https://www.shop.example/customer/sign_in",
            ]
        );
    }

    #[tokio::test]
    async fn not_found_is_not_shopify_without_reading_body() {
        let client = StubClient::new(vec![reply(404, "Shopify SignInWithShop")]);
        let result = probe(&client).await;

        assert_eq!(result.kind(), AccountType::NotShopify);
        assert_eq!(result.status(), Some(404));
        assert!(result.note().is_some());
        assert!(!client.body_read.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn endless_redirects_exhaust_budget() {
        let replies = (0..DEFAULT_MAX_REDIRECTS)
            .map(|_| redirect(302, "/account/login"))
            .collect();
        let client = StubClient::new(replies);
        let result = probe(&client).await;

        assert_eq!(result.kind(), AccountType::Unknown);
        assert_eq!(result.note(), Some(TOO_MANY_REDIRECTS));
        assert_eq!(result.status(), Some(302));
        assert_eq!(client.requested().len(), DEFAULT_MAX_REDIRECTS);
    }

    #[tokio::test]
    async fn custom_budget_is_respected() {
        let client = StubClient::new(vec![
            redirect(302, "/a"),
            redirect(302, "/b"),
        ]);
        let events = EventDispatcher::new();
        let result = LoginProbe::new(&client, &events)
            .with_max_redirects(2)
            .classify(STORE)
            .await;
        assert_eq!(result.note(), Some(TOO_MANY_REDIRECTS));
        assert_eq!(client.requested().len(), 2);
    }

    #[tokio::test]
    async fn off_domain_406_is_custom_account_domain() {
        let client = StubClient::new(vec![
            redirect(302, "https://account.shop-brand.example/login"),
            reply(406, ""),
        ]);
        let result = probe(&client).await;

        assert_eq!(result.kind(), AccountType::New);
        assert_eq!(result.status(), Some(406));
        assert!(result.redirect().is_none());
        assert!(result.note().unwrap().contains("account.shop-brand.example"));
    }

    #[tokio::test]
    async fn same_host_406_is_unknown() {
        let client = StubClient::new(vec![redirect(302, "/login"), reply(406, "")]);
        let result = probe(&client).await;
        assert_eq!(result.kind(), AccountType::Unknown);
        assert!(result.note().unwrap().contains("406"));
    }

    #[tokio::test]
    async fn direct_406_is_unknown() {
        let client = StubClient::new(vec![reply(406, "")]);
        let result = probe(&client).await;
        assert_eq!(result.kind(), AccountType::Unknown);
    }

    #[tokio::test]
    async fn unexpected_status_names_url() {
        let client = StubClient::new(vec![reply(503, "")]);
        let result = probe(&client).await;
        assert_eq!(result.kind(), AccountType::Unknown);
        assert_eq!(result.status(), Some(503));
        let note = result.note().unwrap();
        assert!(note.contains("503"));
        assert!(note.contains("https://shop.example/account/login"));
    }

    #[tokio::test]
    async fn redirect_without_location_is_unknown() {
        let client = StubClient::new(vec![reply(302, "")]);
        let result = probe(&client).await;
        assert_eq!(result.kind(), AccountType::Unknown);
        assert_eq!(client.requested().len(), 1);
    }

    #[tokio::test]
    async fn plain_page_without_fingerprint_is_not_shopify() {
        let client = StubClient::new(vec![reply(200, "<form><input type=\"password\"></form>")]);
        let result = probe(&client).await;
        assert_eq!(result.kind(), AccountType::NotShopify);
        assert!(result.note().unwrap().contains("fingerprint"));
    }

    #[tokio::test]
    async fn header_fingerprint_lets_body_rules_run() {
        let mut headers = HeaderMap::new();
        headers.insert("x-shopid", HeaderValue::from_static("42"));
        let client = StubClient::new(vec![StubReply {
            status: 200,
            headers,
            body: "<div class=\"password-page\"></div>",
        }]);
        let result = probe(&client).await;
        // Body has no "shopify" text, but the password page rule comes first.
        assert_eq!(result.kind(), AccountType::PasswordProtected);
    }

    #[tokio::test]
    async fn transport_failure_becomes_error_result() {
        let client = StubClient::failing("dns error: no such host");
        let result = probe(&client).await;

        assert_eq!(result.kind(), AccountType::Error);
        assert!(result.error().unwrap().contains("no such host"));
        assert!(result.status().is_none());
        assert!(result.note().is_none());
    }

    #[tokio::test]
    async fn malformed_store_url_becomes_error_result() {
        let client = StubClient::new(Vec::new());
        let events = EventDispatcher::new();
        let result = LoginProbe::new(&client, &events)
            .classify("https://exa mple.com")
            .await;
        assert!(result.is_error());
        assert!(client.requested().is_empty());
    }

    /// Answers 200 with a Shopify header, then fails while reading the body.
    struct BrokenBodyClient;

    #[async_trait]
    impl ProbeHttpClient for BrokenBodyClient {
        async fn get(&self, url: &Url) -> Result<ProbeHttpResponse, ProbeHttpClientError> {
            let mut headers = HeaderMap::new();
            headers.insert("x-shopid", HeaderValue::from_static("42"));
            Ok(ProbeHttpResponse::new(
                200,
                headers,
                url.clone(),
                Box::pin(async {
                    Err::<Bytes, _>(ProbeHttpClientError::Body("connection reset".into()))
                }),
            ))
        }
    }

    #[tokio::test]
    async fn body_read_failure_becomes_error_result() {
        let events = EventDispatcher::new();
        let result = LoginProbe::new(&BrokenBodyClient, &events)
            .classify(STORE)
            .await;

        assert_eq!(result.kind(), AccountType::Error);
        assert!(result.error().unwrap().contains("connection reset"));
        assert!(result.status().is_none());
        assert!(result.note().is_none());
    }

    #[derive(Default)]
    struct RecordingHandler(Mutex<Vec<(u16, String)>>);

    impl crate::modules::events::EventHandler for RecordingHandler {
        fn handle(&self, event: &ProbeEvent) {
            if let ProbeEvent::Response(response) = event {
                self.0
                    .lock()
                    .unwrap()
                    .push((response.status, response.url.to_string()));
            }
        }
    }

    #[tokio::test]
    async fn response_events_report_each_hop() {
        let client = StubClient::new(vec![
            redirect(301, "/account/login/"),
            reply(404, ""),
        ]);
        let recorder = Arc::new(RecordingHandler::default());
        let mut events = EventDispatcher::new();
        events.register_handler(recorder.clone());

        let result = LoginProbe::new(&client, &events).classify(STORE).await;
        assert_eq!(result.kind(), AccountType::NotShopify);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![
                (301, "https://shop.example/account/login".to_string()),
                (404, "https://shop.example/account/login/".to_string()),
            ]
        );
    }
}
