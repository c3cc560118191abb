use serde::{Deserialize, Serialize};

/// Leading digit of codes listed on the Shanghai exchange.
const SHANGHAI_LEADING_DIGIT: char = '6';
const SHANGHAI_MARKET_PREFIX: &str = "1";
const SHENZHEN_MARKET_PREFIX: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityIdentity {
    pub code: String,
    pub name: String,
    pub profile: Option<String>,
}

impl SecurityIdentity {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            profile: None,
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Market-qualified id used by the quote upstream (`1.600000`, `0.000001`).
    pub fn market_id(&self) -> String {
        let prefix = if self.code.starts_with(SHANGHAI_LEADING_DIGIT) {
            SHANGHAI_MARKET_PREFIX
        } else {
            SHENZHEN_MARKET_PREFIX
        };
        format!("{prefix}.{}", self.code)
    }

    pub fn profile_text(&self) -> String {
        match &self.profile {
            Some(p) => p.clone(),
            None => format!("当前标的为{}({})，A股上市公司。", self.name, self.code),
        }
    }
}

impl std::fmt::Display for SecurityIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.code)
    }
}

/// Parses `code:name,code:name`. Entries without a separator or with an empty side are
/// skipped; order is preserved.
pub fn parse_security_list(raw: &str) -> Vec<SecurityIdentity> {
    let mut out = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let Some((code, name)) = part.split_once(':') else {
            tracing::warn!(entry = %part, "security entry missing ':' separator; skipping");
            continue;
        };
        let (code, name) = (code.trim(), name.trim());
        if code.is_empty() || name.is_empty() {
            tracing::warn!(entry = %part, "security entry has empty code or name; skipping");
            continue;
        }
        out.push(SecurityIdentity::new(code, name));
    }
    out
}
