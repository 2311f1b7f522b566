use std::collections::HashSet;
use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};

const MIN_PHONE_DIGITS: usize = 5;
const MIN_ORGANIZATION_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    #[serde(alias = "PHONE", alias = "phone_number")]
    Phone,
    #[serde(alias = "EMAIL")]
    Email,
    #[serde(alias = "URL")]
    Url,
    #[serde(alias = "DOMAIN")]
    Domain,
    #[serde(
        alias = "ORGANIZATION",
        alias = "organization_name",
        alias = "organization-name"
    )]
    Organization,
}

impl IdentifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Url => "url",
            Self::Domain => "domain",
            Self::Organization => "organization",
        }
    }

    /// Label used on the verdict surface.
    pub fn entity_label(&self) -> &'static str {
        match self {
            Self::Phone => "PHONE",
            Self::Email => "EMAIL",
            Self::Url => "URL",
            Self::Domain => "DOMAIN",
            Self::Organization => "ORGANIZATION",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed value handed over by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub kind: IdentifierKind,
    pub value: String,
}

impl Identifier {
    pub fn new(kind: IdentifierKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn phone(value: impl Into<String>) -> Self {
        Self::new(IdentifierKind::Phone, value)
    }

    pub fn email(value: impl Into<String>) -> Self {
        Self::new(IdentifierKind::Email, value)
    }

    pub fn url(value: impl Into<String>) -> Self {
        Self::new(IdentifierKind::Url, value)
    }

    pub fn domain(value: impl Into<String>) -> Self {
        Self::new(IdentifierKind::Domain, value)
    }

    pub fn organization(value: impl Into<String>) -> Self {
        Self::new(IdentifierKind::Organization, value)
    }

    /// Canonical form, or `None` when the value carries nothing checkable.
    pub fn normalized(&self) -> Option<Self> {
        let value = match self.kind {
            IdentifierKind::Phone => normalize_phone(&self.value)?,
            IdentifierKind::Email => normalize_email(&self.value)?,
            IdentifierKind::Url => normalize_url(&self.value)?,
            IdentifierKind::Domain => normalize_domain(&self.value)?,
            IdentifierKind::Organization => normalize_organization(&self.value)?,
        };
        Some(Self::new(self.kind, value))
    }

    /// Key used for per-case uniqueness. Organizations compare case-insensitively.
    pub fn dedup_key(&self) -> (IdentifierKind, String) {
        match self.kind {
            IdentifierKind::Organization => (self.kind, self.value.to_lowercase()),
            _ => (self.kind, self.value.clone()),
        }
    }

    /// The value providers are asked about. URLs collapse onto their host's domain.
    pub fn check_subject(&self) -> Option<Self> {
        match self.kind {
            IdentifierKind::Url => normalize_domain(&self.value).map(Self::domain),
            _ => Some(self.clone()),
        }
    }

    /// Whether evidence about `subject` describes this identifier.
    pub fn matches_subject(&self, subject: &Identifier) -> bool {
        match self.check_subject() {
            Some(own) => own.dedup_key() == subject.dedup_key(),
            None => false,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Normalize and deduplicate, keeping first-seen order.
pub fn dedupe_identifiers(identifiers: &[Identifier]) -> Vec<Identifier> {
    let mut seen = HashSet::new();
    identifiers
        .iter()
        .filter_map(Identifier::normalized)
        .filter(|id| seen.insert(id.dedup_key()))
        .collect()
}

pub fn normalize_domain(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let host = if trimmed.contains("://") {
        Url::parse(trimmed).ok()?.host_str()?.to_string()
    } else {
        let without_path = trimmed.split(['/', '?', '#']).next().unwrap_or_default();
        let without_user = without_path.rsplit('@').next().unwrap_or_default();
        without_user.split(':').next().unwrap_or_default().to_string()
    };

    let host = host.trim_end_matches('.').to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    if host.is_empty() || !host.contains('.') || host.starts_with('.') {
        return None;
    }
    Some(host.to_string())
}

fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };
    let url = Url::parse(&candidate).ok()?;
    url.host_str()?;
    Some(url.to_string())
}

fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || !domain.contains('.') {
        return None;
    }
    Some(email)
}

fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < MIN_PHONE_DIGITS {
        return None;
    }
    if trimmed.starts_with('+') {
        Some(format!("+{}", digits))
    } else {
        Some(digits)
    }
}

fn normalize_organization(raw: &str) -> Option<String> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.chars().count() < MIN_ORGANIZATION_LEN {
        return None;
    }
    Some(name)
}
