//! Secure retrieval — the filtered query plus the disambiguation probe.
//!
//! A search resolves to one of three terminal outcomes. The primary query is
//! filtered to the caller's permitted sensitivity labels; when it comes back
//! empty, a second unrestricted probe distinguishes "no matching data" from
//! "data exists but is blocked". The probe's result is discarded: only its
//! existence is disclosed, never its content. Every outcome is recorded in
//! the audit log with the question text — never retrieved text.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::audit::{AuditAction, AuditLog, AuditOutcome};
use crate::error::AppError;
use crate::policy::{Role, permitted_labels};
use crate::store::{DocStore, RetrievalResult};

/// Query sizes for the two phases. Any positive values are acceptable.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalConfig {
    /// Results requested by the primary filtered query.
    pub top_k: usize,
    /// Results requested by the unrestricted probe.
    pub probe_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3, probe_k: 1 }
    }
}

/// Terminal outcome of one search. Stateless per call — nothing intermediate
/// is persisted.
#[derive(Debug)]
pub enum SearchOutcome {
    /// Permitted chunks matched; the caller may compose an answer from them.
    Success(RetrievalResult),
    /// Matching data exists but every match is above the caller's clearance.
    Denied,
    /// Nothing in the store matches the question at all.
    NoData,
}

#[derive(Debug, Clone)]
pub struct SecureRetriever {
    store: Arc<DocStore>,
    audit: Arc<AuditLog>,
    config: RetrievalConfig,
}

impl SecureRetriever {
    pub fn new(store: Arc<DocStore>, audit: Arc<AuditLog>, config: RetrievalConfig) -> Self {
        Self { store, audit, config }
    }

    /// Run the two-phase search for `question` on behalf of `actor`/`role`.
    ///
    /// A storage failure in either phase records a best-effort `Failure`
    /// audit event, then propagates — the caller sees the error, the trail
    /// still shows the attempt.
    pub fn search(
        &self,
        actor: &str,
        role: Role,
        question: &str,
    ) -> Result<SearchOutcome, AppError> {
        let allowed = permitted_labels(role);

        let primary = match self.store.query(question, self.config.top_k, Some(allowed)) {
            Ok(result) => result,
            Err(e) => {
                self.log(actor, role, question, AuditOutcome::Failure);
                return Err(e);
            }
        };

        if !primary.is_empty() {
            debug!(actor, role = role.label(), matches = primary.matches.len(), "search allowed");
            self.log(actor, role, question, AuditOutcome::Allowed);
            return Ok(SearchOutcome::Success(primary));
        }

        let probe = match self.store.query(question, self.config.probe_k, None) {
            Ok(result) => result,
            Err(e) => {
                self.log(actor, role, question, AuditOutcome::Failure);
                return Err(e);
            }
        };

        if !probe.is_empty() {
            debug!(actor, role = role.label(), "search denied: matching data above clearance");
            self.log(actor, role, question, AuditOutcome::DeniedSecurity);
            return Ok(SearchOutcome::Denied);
        }

        debug!(actor, role = role.label(), "search found no data");
        self.log(actor, role, question, AuditOutcome::NoData);
        Ok(SearchOutcome::NoData)
    }

    /// Best-effort audit append: a log-write failure must not fail the search.
    fn log(&self, actor: &str, role: Role, question: &str, outcome: AuditOutcome) {
        if let Err(e) = self
            .audit
            .record(actor, role, AuditAction::Search, question, outcome)
        {
            warn!(error = %e, "audit append failed; search outcome not recorded");
        }
    }
}
