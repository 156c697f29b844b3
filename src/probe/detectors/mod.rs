//! Signal detection for storefront login pages.
//!
//! Everything here is plain, case-sensitive substring matching. Third-party
//! storefront HTML is too varied for a document parser to add accuracy, and
//! the markers being looked for are stable string literals emitted by the
//! platform's themes and scripts.
//!
//! Body classification is an ordered rule list evaluated first-match-wins.
//! The order resolves real ambiguity between pages that carry both kinds of
//! markers and must not be reshuffled or collapsed.

use std::fmt;

use http::HeaderMap;

use crate::probe::core::{AccountType, CheckResult};

/// `Location` fragments that point at the hosted customer-account login.
pub const NEW_ACCOUNT_REDIRECT_SIGNALS: &[&str] = &[
    "shopify.com/authentication",
    "/auth/login",
    "accounts.shopify.com",
];

/// Body markers emitted by the new customer-account flow.
pub const NEW_ACCOUNT_SIGNALS: &[&str] = &[
    "shopify.com/authentication",
    "accounts.shopify.com",
    "init-customer-accounts",
    "initCustomerAccounts",
    "init-shop-for-new-customer-accounts",
    "shopify-login",
    "SignInWithShop",
];

/// Body markers of the legacy password login form.
pub const LEGACY_SIGNALS: &[&str] = &[
    "customer[password]",
    "customer_login",
    r#"name="customer[email]""#,
    r#"action="/account/login""#,
    r#"action="/account""#,
];

const PASSWORD_INPUT: &str = r#"type="password""#;
const CUSTOMER_MARKER: &str = "customer";
const PASSWORD_PAGE_SIGNALS: &[&str] = &["password-page", "storefront-password"];

/// True when a `Location` value points at the hosted customer-account login.
pub fn is_new_account_redirect(location: &str) -> bool {
    contains_any(location, NEW_ACCOUNT_REDIRECT_SIGNALS)
}

/// Detect Shopify platform fingerprints in response headers.
pub fn is_shopify_platform(headers: &HeaderMap) -> bool {
    let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());

    if header("x-powered-by").is_some_and(|value| value.contains("Shopify")) {
        return true;
    }
    if headers.contains_key("x-shopid") {
        return true;
    }
    header("server-timing")
        .is_some_and(|value| value.contains("shopify") || value.contains("pageType"))
}

/// Loose body check used before rule evaluation on a 200 login page.
pub fn has_platform_marker(body: &str) -> bool {
    body.contains("Shopify") || body.contains("myshopify")
}

/// Pre-computed marker presence for one page body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodySignals {
    pub new_account: bool,
    pub legacy: bool,
    pub password_field: bool,
    pub password_page: bool,
    pub shopify_marker: bool,
}

impl BodySignals {
    pub fn scan(body: &str) -> Self {
        Self {
            new_account: contains_any(body, NEW_ACCOUNT_SIGNALS),
            legacy: contains_any(body, LEGACY_SIGNALS),
            password_field: body.contains(PASSWORD_INPUT) && body.contains(CUSTOMER_MARKER),
            password_page: contains_any(body, PASSWORD_PAGE_SIGNALS),
            shopify_marker: body.contains("Shopify") || body.contains("shopify"),
        }
    }
}

/// One entry of the ordered body rule list.
pub struct BodyRule {
    pub id: &'static str,
    pub kind: AccountType,
    pub note: Option<&'static str>,
    matches: fn(&BodySignals) -> bool,
}

impl BodyRule {
    pub fn matches(&self, signals: &BodySignals) -> bool {
        (self.matches)(signals)
    }
}

impl fmt::Debug for BodyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyRule")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Body rules in evaluation order. The first matching rule decides.
pub static BODY_RULES: [BodyRule; 7] = [
    BodyRule {
        id: "new_without_password_field",
        kind: AccountType::New,
        note: None,
        matches: new_without_password_field,
    },
    BodyRule {
        id: "legacy_password_form",
        kind: AccountType::Legacy,
        note: None,
        matches: legacy_password_form,
    },
    BodyRule {
        id: "new_account_marker",
        kind: AccountType::New,
        note: None,
        matches: new_account_marker,
    },
    BodyRule {
        id: "password_field",
        kind: AccountType::Legacy,
        note: None,
        matches: password_field,
    },
    BodyRule {
        id: "storefront_password",
        kind: AccountType::PasswordProtected,
        note: Some("Storefront is password protected and not yet public"),
        matches: storefront_password,
    },
    BodyRule {
        id: "no_shopify_marker",
        kind: AccountType::NotShopify,
        note: Some("Login page carries no Shopify markers"),
        matches: no_shopify_marker,
    },
    BodyRule {
        id: "unresolved",
        kind: AccountType::Unknown,
        note: Some("Login page content did not match any known account signals"),
        matches: always,
    },
];

fn new_without_password_field(s: &BodySignals) -> bool {
    s.new_account && !s.password_field
}

fn legacy_password_form(s: &BodySignals) -> bool {
    s.password_field && s.legacy
}

// Reached only when a password field is also present (rule 1 took the rest).
fn new_account_marker(s: &BodySignals) -> bool {
    s.new_account
}

fn password_field(s: &BodySignals) -> bool {
    s.password_field
}

fn storefront_password(s: &BodySignals) -> bool {
    s.password_page
}

fn no_shopify_marker(s: &BodySignals) -> bool {
    !s.shopify_marker
}

fn always(_: &BodySignals) -> bool {
    true
}

/// First rule matching `body`.
pub fn match_body_rule(body: &str) -> &'static BodyRule {
    let signals = BodySignals::scan(body);
    BODY_RULES
        .iter()
        .find(|rule| rule.matches(&signals))
        .unwrap_or(&BODY_RULES[BODY_RULES.len() - 1])
}

/// Classify a login page purely from its body text.
pub fn classify_from_body(store_url: &str, body: &str, status: Option<u16>) -> CheckResult {
    let rule = match_body_rule(body);
    log::trace!("{store_url}: body matched rule {}", rule.id);
    CheckResult::classified(store_url, rule.kind, status, rule.note.map(str::to_owned))
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
