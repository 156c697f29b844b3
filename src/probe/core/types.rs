//! Core data structures shared by the login flow, body rules, and callers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Customer-account system a storefront was classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountType {
    /// Hosted authentication flow (shop login / accounts.shopify.com).
    New,
    /// Password-based storefront accounts.
    Legacy,
    /// Whole storefront gated behind a shared password.
    PasswordProtected,
    NotShopify,
    Unknown,
    /// The probe itself failed (DNS, connection, timeout...).
    Error,
}

impl AccountType {
    /// Every variant, in the order summaries are rendered.
    pub const ALL: [AccountType; 6] = [
        AccountType::New,
        AccountType::Legacy,
        AccountType::PasswordProtected,
        AccountType::NotShopify,
        AccountType::Unknown,
        AccountType::Error,
    ];

    /// Wire name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::New => "new",
            AccountType::Legacy => "legacy",
            AccountType::PasswordProtected => "password-protected",
            AccountType::NotShopify => "not-shopify",
            AccountType::Unknown => "unknown",
            AccountType::Error => "error",
        }
    }

    /// Short upper-case label used by console output.
    pub fn label(&self) -> &'static str {
        match self {
            AccountType::New => "NEW",
            AccountType::Legacy => "LEGACY",
            AccountType::PasswordProtected => "PASSWORD",
            AccountType::NotShopify => "NOT SHOPIFY",
            AccountType::Unknown => "UNKNOWN",
            AccountType::Error => "ERROR",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            AccountType::New => "✅",
            AccountType::Legacy => "🔑",
            AccountType::PasswordProtected => "🔒",
            AccountType::NotShopify => "🚫",
            AccountType::Unknown => "❓",
            AccountType::Error => "❌",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of probing a single storefront.
///
/// Fields are private and the only way to build a value is through the
/// constructors below, which keep `error` present exactly when the type is
/// [`AccountType::Error`] and `redirect` limited to header-driven `new` results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    url: String,
    #[serde(rename = "type")]
    kind: AccountType,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl CheckResult {
    /// A classification. Passing [`AccountType::Error`] yields a
    /// [`CheckResult::failed`] value carrying `note` as the error text.
    pub fn classified(
        url: impl Into<String>,
        kind: AccountType,
        status: Option<u16>,
        note: Option<String>,
    ) -> Self {
        if kind == AccountType::Error {
            return Self::failed(url, note.unwrap_or_else(|| "probe failed".into()));
        }
        Self {
            url: url.into(),
            kind,
            status,
            redirect: None,
            note,
            error: None,
        }
    }

    /// `new` result driven by a `Location` header pointing at the hosted login.
    pub fn accounts_redirect(
        url: impl Into<String>,
        status: u16,
        location: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            kind: AccountType::New,
            status: Some(status),
            redirect: Some(location.into()),
            note: None,
            error: None,
        }
    }

    /// The probe failed before a classification could be made.
    pub fn failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: AccountType::Error,
            status: None,
            redirect: None,
            note: None,
            error: Some(message.into()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> AccountType {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn redirect(&self) -> Option<&str> {
        self.redirect.as_deref()
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.kind == AccountType::Error
    }

    /// Serialize as one newline-terminated JSON line.
    pub fn to_ndjson_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
