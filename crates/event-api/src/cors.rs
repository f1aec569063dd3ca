//! # CORS Policy Selector
//!
//! Named allow-rules for cross-origin callers. A route may name a policy;
//! routes that do not get the process default. Each rule renders to a
//! `tower_http` [`CorsLayer`], which adds the `Access-Control-Allow-*`
//! headers and answers preflight requests itself, before authentication.
//!
//! ## Standard policies
//!
//! | Policy | Origins | Methods | Headers |
//! |---|---|---|---|
//! | `MSPolicy` | `*microsoft.com` | any | any |
//! | `HexaPolicy` | `*hexaware.com` | GET | Authorization, Content-Type, Accept |
//! | `Others` (default) | any | any | any |

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue, Method};
use thiserror::Error;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Name of the policy applied when a route names none.
pub const DEFAULT_POLICY: &str = "Others";

pub const MS_POLICY: &str = "MSPolicy";
pub const HEXA_POLICY: &str = "HexaPolicy";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CorsError {
    #[error("unknown CORS policy {0:?}")]
    UnknownPolicy(String),
}

// ── Rules ───────────────────────────────────────────────────────────────────

/// One allowed origin.
///
/// A leading `*` matches the named domain and its subdomains, so
/// `*microsoft.com` admits `https://events.microsoft.com` but not
/// `https://evilmicrosoft.com`. Anything else must equal the `Origin`
/// header, ignoring ASCII case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPattern {
    HostSuffix(String),
    Exact(String),
}

impl OriginPattern {
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_prefix('*') {
            Some(suffix) => Self::HostSuffix(suffix.trim_start_matches('.').to_ascii_lowercase()),
            None => Self::Exact(pattern.trim_end_matches('/').to_ascii_lowercase()),
        }
    }

    pub fn matches(&self, origin: &str) -> bool {
        match self {
            Self::Exact(expected) => origin.eq_ignore_ascii_case(expected),
            Self::HostSuffix(suffix) => url::Url::parse(origin)
                .ok()
                .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
                .is_some_and(|host| {
                    host == *suffix
                        || host
                            .strip_suffix(suffix.as_str())
                            .is_some_and(|label| label.ends_with('.'))
                }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginRule {
    Any,
    Patterns(Vec<OriginPattern>),
}

impl OriginRule {
    pub fn patterns<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Self {
        Self::Patterns(patterns.into_iter().map(OriginPattern::parse).collect())
    }

    pub fn allows(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Patterns(patterns) => patterns.iter().any(|p| p.matches(origin)),
        }
    }
}

/// `Any`, or an explicit list of methods or header names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowList<T> {
    Any,
    List(Vec<T>),
}

/// Allowed origins, methods and request headers for one named policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsRule {
    pub origins: OriginRule,
    pub methods: AllowList<Method>,
    pub headers: AllowList<HeaderName>,
}

impl CorsRule {
    pub fn permissive() -> Self {
        Self {
            origins: OriginRule::Any,
            methods: AllowList::Any,
            headers: AllowList::Any,
        }
    }

    /// Render this rule as a layer.
    pub fn layer(&self) -> CorsLayer {
        let origin = match &self.origins {
            OriginRule::Any => AllowOrigin::any(),
            OriginRule::Patterns(_) => {
                let rule = Arc::new(self.origins.clone());
                AllowOrigin::predicate(move |origin: &HeaderValue, _| {
                    origin.to_str().is_ok_and(|o| rule.allows(o))
                })
            }
        };
        let methods = match &self.methods {
            AllowList::Any => AllowMethods::any(),
            AllowList::List(methods) => AllowMethods::list(methods.iter().cloned()),
        };
        let headers = match &self.headers {
            AllowList::Any => AllowHeaders::any(),
            AllowList::List(headers) => AllowHeaders::list(headers.iter().cloned()),
        };
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(methods)
            .allow_headers(headers)
    }
}

// ── Registry ────────────────────────────────────────────────────────────────

/// Named CORS rules plus the name of the default.
#[derive(Debug, Clone)]
pub struct CorsPolicies {
    rules: BTreeMap<String, CorsRule>,
    default: String,
}

impl CorsPolicies {
    /// The three standard policies with `Others` as default.
    pub fn standard() -> Self {
        let mut rules = BTreeMap::new();
        rules.insert(
            MS_POLICY.to_string(),
            CorsRule {
                origins: OriginRule::patterns(["*microsoft.com"]),
                methods: AllowList::Any,
                headers: AllowList::Any,
            },
        );
        rules.insert(
            HEXA_POLICY.to_string(),
            CorsRule {
                origins: OriginRule::patterns(["*hexaware.com"]),
                methods: AllowList::List(vec![Method::GET]),
                headers: AllowList::List(vec![
                    header::AUTHORIZATION,
                    header::CONTENT_TYPE,
                    header::ACCEPT,
                ]),
            },
        );
        rules.insert(DEFAULT_POLICY.to_string(), CorsRule::permissive());
        Self {
            rules,
            default: DEFAULT_POLICY.to_string(),
        }
    }

    /// Register or replace a named rule.
    pub fn insert(&mut self, name: impl Into<String>, rule: CorsRule) {
        self.rules.insert(name.into(), rule);
    }

    /// Make `name` the process default.
    pub fn with_default(mut self, name: &str) -> Result<Self, CorsError> {
        if !self.rules.contains_key(name) {
            return Err(CorsError::UnknownPolicy(name.to_string()));
        }
        self.default = name.to_string();
        Ok(self)
    }

    pub fn default_name(&self) -> &str {
        &self.default
    }

    pub fn get(&self, name: &str) -> Option<&CorsRule> {
        self.rules.get(name)
    }

    /// Name of the policy that governs a route declaring `requested`.
    pub fn effective_name<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested {
            Some(name) if self.rules.contains_key(name) => name,
            Some(name) => {
                tracing::warn!(policy = name, default = %self.default, "unknown CORS policy, using default");
                &self.default
            }
            None => &self.default,
        }
    }

    /// The rule for a route declaring `requested`. An explicit, known name
    /// wins; otherwise the default applies.
    pub fn resolve(&self, requested: Option<&str>) -> &CorsRule {
        let name = self.effective_name(requested);
        // `default` is validated on construction, so the fallback never fires.
        self.rules
            .get(name)
            .or_else(|| self.rules.get(DEFAULT_POLICY))
            .unwrap_or(&PERMISSIVE)
    }
}

static PERMISSIVE: CorsRule = CorsRule {
    origins: OriginRule::Any,
    methods: AllowList::Any,
    headers: AllowList::Any,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_suffix_pattern() {
        let p = OriginPattern::parse("*microsoft.com");
        assert!(p.matches("https://events.microsoft.com"));
        assert!(p.matches("https://microsoft.com"));
        assert!(p.matches("HTTPS://WWW.MICROSOFT.COM:8443"));
        assert!(!p.matches("https://microsoft.com.evil.net"));
        assert!(!p.matches("not an origin"));
    }

    #[test]
    fn host_suffix_stops_at_label_boundary() {
        let p = OriginPattern::parse("*microsoft.com");
        assert!(!p.matches("https://evilmicrosoft.com"));
        assert!(!p.matches("https://notmicrosoft.com:443"));

        let dotted = OriginPattern::parse("*.microsoft.com");
        assert_eq!(dotted, p);
        assert!(dotted.matches("https://microsoft.com"));
        assert!(dotted.matches("https://a.b.microsoft.com"));
    }

    #[test]
    fn exact_pattern_ignores_case() {
        let p = OriginPattern::parse("https://app.example.com/");
        assert!(p.matches("https://APP.example.com"));
        assert!(!p.matches("https://other.example.com"));
    }

    #[test]
    fn standard_policies_are_registered() {
        let policies = CorsPolicies::standard();
        assert_eq!(policies.default_name(), "Others");
        assert!(policies.get(MS_POLICY).is_some());

        let hexa = policies.get(HEXA_POLICY).unwrap();
        assert_eq!(hexa.methods, AllowList::List(vec![Method::GET]));
        assert!(hexa.origins.allows("https://www.hexaware.com"));
        assert!(!hexa.origins.allows("https://www.microsoft.com"));
    }

    #[test]
    fn explicit_policy_overrides_default() {
        let policies = CorsPolicies::standard();
        assert_eq!(policies.resolve(Some(HEXA_POLICY)), policies.get(HEXA_POLICY).unwrap());
        assert_eq!(policies.resolve(None), &CorsRule::permissive());
    }

    #[test]
    fn unknown_route_policy_falls_back() {
        let policies = CorsPolicies::standard();
        assert_eq!(policies.effective_name(Some("Nope")), "Others");
        assert_eq!(policies.resolve(Some("Nope")), &CorsRule::permissive());
    }

    #[test]
    fn default_can_be_changed_to_known_policy_only() {
        let policies = CorsPolicies::standard().with_default(MS_POLICY).unwrap();
        assert_eq!(policies.effective_name(None), MS_POLICY);

        let err = CorsPolicies::standard().with_default("Missing").unwrap_err();
        assert_eq!(err, CorsError::UnknownPolicy("Missing".into()));
    }
}
