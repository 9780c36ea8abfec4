// Backend discovery. Candidate base URLs come from an ordered list of
// sources (static override, saved endpoint, serving origin, loopback
// fallbacks); the first one that answers the health check wins and is
// kept until a failed dispatch invalidates it.

use crate::session::SessionStore;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Loopback addresses a locally started backend usually listens on.
pub const FALLBACK_BASES: &[&str] = &[
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:3333",
    "http://127.0.0.1:3333",
    "http://localhost:8765",
    "http://127.0.0.1:8765",
];

/// A base URL that passed a health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoint {
    base_url: String,
    verified_at: SystemTime,
}

impl BackendEndpoint {
    pub fn new(base_url: &str) -> Self {
        BackendEndpoint {
            base_url: normalize_base(base_url),
            verified_at: SystemTime::now(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn verified_at(&self) -> SystemTime {
        self.verified_at
    }
}

/// Liveness check for one candidate base. Implementations must swallow
/// transport failures and report them as unhealthy.
pub trait HealthCheck {
    fn is_healthy(&self, base: &str) -> bool;
}

/// One place candidate bases come from.
pub trait CandidateSource {
    fn name(&self) -> &'static str;
    fn candidates(&self) -> Vec<String>;
}

/// Backend configured explicitly by the operator.
pub struct StaticOverride(pub Option<String>);

impl CandidateSource for StaticOverride {
    fn name(&self) -> &'static str {
        "override"
    }

    fn candidates(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

/// The last endpoint that was verified in a previous session.
pub struct SavedEndpoint(pub SessionStore);

impl CandidateSource for SavedEndpoint {
    fn name(&self) -> &'static str {
        "saved"
    }

    fn candidates(&self) -> Vec<String> {
        self.0.cached_backend().into_iter().collect()
    }
}

/// Origin the front-end itself was served from. Only `http://` and
/// `https://` origins are network addressable.
pub struct ServingOrigin(pub Option<String>);

impl CandidateSource for ServingOrigin {
    fn name(&self) -> &'static str {
        "origin"
    }

    fn candidates(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|origin| is_network_origin(origin))
            .cloned()
            .collect()
    }
}

pub struct FallbackList(pub Vec<String>);

impl Default for FallbackList {
    fn default() -> Self {
        FallbackList(FALLBACK_BASES.iter().map(|b| b.to_string()).collect())
    }
}

impl CandidateSource for FallbackList {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn candidates(&self) -> Vec<String> {
        self.0.clone()
    }
}

/// How a `resolve` call produced its endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Reused the endpoint already verified in this process.
    Reused,
    /// The previously saved endpoint answered first.
    Saved,
    /// A fresh scan found the endpoint.
    Discovered,
}

pub struct BackendLocator {
    sources: Vec<Box<dyn CandidateSource>>,
    session: SessionStore,
    resolved: Option<BackendEndpoint>,
}

impl BackendLocator {
    pub fn new(sources: Vec<Box<dyn CandidateSource>>, session: SessionStore) -> Self {
        BackendLocator {
            sources,
            session,
            resolved: None,
        }
    }

    /// The standard source order: override, saved, origin, loopback list.
    pub fn with_default_sources(
        api_base: Option<String>,
        origin: Option<String>,
        session: SessionStore,
    ) -> Self {
        let sources: Vec<Box<dyn CandidateSource>> = vec![
            Box::new(StaticOverride(api_base)),
            Box::new(SavedEndpoint(session.clone())),
            Box::new(ServingOrigin(origin)),
            Box::new(FallbackList::default()),
        ];
        BackendLocator::new(sources, session)
    }

    /// Candidates in priority order, normalised and without duplicates.
    /// The source that contributed each one is kept alongside.
    pub fn candidates(&self) -> Vec<(&'static str, String)> {
        let mut list: Vec<(&'static str, String)> = Vec::new();
        for source in &self.sources {
            for base in source.candidates() {
                let base = normalize_base(&base);
                if base.is_empty() || list.iter().any(|(_, seen)| *seen == base) {
                    continue;
                }
                list.push((source.name(), base));
            }
        }
        list
    }

    pub fn current(&self) -> Option<&BackendEndpoint> {
        self.resolved.as_ref()
    }

    /// Return the endpoint verified earlier in this process, or check the
    /// candidates in order and keep the first healthy one. `None` when no
    /// candidate answers; nothing is cached or persisted in that case.
    pub fn resolve(&mut self, health: &dyn HealthCheck) -> Option<(BackendEndpoint, Resolution)> {
        if let Some(endpoint) = &self.resolved {
            return Some((endpoint.clone(), Resolution::Reused));
        }

        for (source, base) in self.candidates() {
            debug!(source, %base, "checking backend candidate");
            if !health.is_healthy(&base) {
                continue;
            }
            let endpoint = BackendEndpoint::new(&base);
            info!(source, base = endpoint.base_url(), "backend resolved");
            self.session.remember_backend(endpoint.base_url());
            self.resolved = Some(endpoint.clone());
            let how = if source == "saved" {
                Resolution::Saved
            } else {
                Resolution::Discovered
            };
            return Some((endpoint, how));
        }

        warn!("no backend candidate answered the health check");
        None
    }

    /// Forget the in-process endpoint so the next `resolve` checks again.
    pub fn invalidate(&mut self) {
        if let Some(endpoint) = self.resolved.take() {
            debug!(base = endpoint.base_url(), "backend invalidated");
        }
    }
}

/// Trim whitespace and a single trailing slash.
pub fn normalize_base(base: &str) -> String {
    let base = base.trim();
    base.strip_suffix('/').unwrap_or(base).to_string()
}

fn is_network_origin(origin: &str) -> bool {
    let lower = origin.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
