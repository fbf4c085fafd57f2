//! Portal — the request-scoped façade over ingestion, retrieval, composition
//! and audit.
//!
//! A [`Portal`] is an explicit handle built from config: tests construct
//! isolated instances per directory, there is no process-wide state. Each
//! request carries a [`RequestContext`] asserting the caller's identity and
//! role (authentication is out of scope — the role is asserted, not
//! verified). Blocking store and audit I/O is dispatched through
//! `spawn_blocking` so async callers are never blocked on it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AuditAction, AuditEvent, AuditLog, AuditOutcome};
use crate::chunker::Chunker;
use crate::composer::{Composer, NO_INFORMATION};
use crate::config::Config;
use crate::error::AppError;
use crate::extract;
use crate::llm::{ProviderError, providers};
use crate::policy::{Role, Sensitivity};
use crate::retrieval::{RetrievalConfig, SearchOutcome, SecureRetriever};
use crate::store::{ChunkMeta, DocStore};

/// Who is making this request. Supplied per call, never stored.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub actor: String,
    pub role: Role,
}

impl RequestContext {
    pub fn new(actor: impl Into<String>, role: Role) -> Self {
        Self { actor: actor.into(), role }
    }
}

/// Result of one upload attempt.
#[derive(Debug)]
pub enum UploadOutcome {
    /// Extracted, chunked and persisted.
    Indexed { chunks: usize },
    /// Unsupported or unreadable content — nothing was stored.
    Rejected { reason: String },
}

/// Result of one question, one variant per terminal search outcome. Each
/// carries the user-facing message for that outcome.
#[derive(Debug)]
pub enum AskReply {
    Answered(String),
    Denied(String),
    NoData(String),
}

impl AskReply {
    pub fn text(&self) -> &str {
        match self {
            AskReply::Answered(s) | AskReply::Denied(s) | AskReply::NoData(s) => s,
        }
    }
}

/// Counts reported at startup.
#[derive(Debug, Clone, Copy)]
pub struct PortalStatus {
    pub indexed_chunks: usize,
    pub audit_events: usize,
}

#[derive(Clone)]
pub struct Portal {
    data_dir: PathBuf,
    chunker: Chunker,
    store: Arc<DocStore>,
    audit: Arc<AuditLog>,
    retriever: SecureRetriever,
    composer: Composer,
}

impl Portal {
    /// Open every persistent resource under `config.work_dir`.
    pub fn open(config: &Config) -> Result<Self, AppError> {
        let data_dir = config.work_dir.join("data");
        fs::create_dir_all(&data_dir).map_err(|e| {
            AppError::Config(format!("cannot create {}: {e}", data_dir.display()))
        })?;

        let store = Arc::new(DocStore::open(&config.work_dir.join("index"))?);
        let audit = Arc::new(AuditLog::open(&config.work_dir.join("audit"))?);
        let provider =
            providers::build(&config.llm, config.llm_api_key.clone()).map_err(|e| match e {
                ProviderError::UnknownProvider(_) => AppError::Config(e.to_string()),
                ProviderError::Request(_) => AppError::Model(e.to_string()),
            })?;

        let retriever = SecureRetriever::new(
            store.clone(),
            audit.clone(),
            RetrievalConfig {
                top_k: config.retrieval.top_k,
                probe_k: config.retrieval.probe_k,
            },
        );

        Ok(Self {
            data_dir,
            chunker: Chunker::new(config.ingest.chunk_size, config.ingest.chunk_overlap)?,
            store,
            audit,
            retriever,
            composer: Composer::new(provider),
        })
    }

    /// Ingest one uploaded file: extract, chunk, index, audit.
    ///
    /// Extraction failures degrade to [`UploadOutcome::Rejected`]; a storage
    /// failure aborts this upload with no success event.
    pub async fn upload(
        &self,
        ctx: &RequestContext,
        file_name: &str,
        bytes: Vec<u8>,
        sensitivity: Sensitivity,
    ) -> Result<UploadOutcome, AppError> {
        let portal = self.clone();
        let ctx = ctx.clone();
        let file_name = file_name.to_string();
        tokio::task::spawn_blocking(move || {
            portal.upload_blocking(&ctx, &file_name, &bytes, sensitivity)
        })
        .await
        .map_err(|e| AppError::Storage(format!("upload join: {e}")))?
    }

    fn upload_blocking(
        &self,
        ctx: &RequestContext,
        file_name: &str,
        bytes: &[u8],
        sensitivity: Sensitivity,
    ) -> Result<UploadOutcome, AppError> {
        let text = match extract::extract_text(file_name, bytes) {
            Ok(text) => text,
            Err(AppError::Extraction(reason)) => {
                warn!(file = %file_name, %reason, "upload rejected");
                return Ok(UploadOutcome::Rejected { reason });
            }
            Err(e) => return Err(e),
        };

        let chunks: Vec<String> = self.chunker.chunks(&text).map(str::to_string).collect();
        if chunks.is_empty() {
            return Ok(UploadOutcome::Rejected {
                reason: format!("{file_name} contains no text"),
            });
        }

        // Strip any path components from the client-supplied name before it
        // touches the filesystem or the index.
        let source = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file_name);

        fs::write(self.data_dir.join(source), bytes)?;

        // Unique per upload, so re-uploading the same file never collides.
        let ids: Vec<String> = chunks
            .iter()
            .map(|_| format!("{source}_{}", Uuid::new_v4()))
            .collect();
        let metadata: Vec<ChunkMeta> = chunks
            .iter()
            .map(|_| ChunkMeta { source: source.to_string(), sensitivity })
            .collect();

        self.store.add(&chunks, &metadata, &ids)?;

        self.log(ctx, AuditAction::Upload, source, AuditOutcome::Success);
        info!(
            file = %source,
            chunks = chunks.len(),
            sensitivity = sensitivity.as_str(),
            "document indexed"
        );
        Ok(UploadOutcome::Indexed { chunks: chunks.len() })
    }

    /// Answer `question` within the caller's clearance.
    pub async fn ask(&self, ctx: &RequestContext, question: &str) -> Result<AskReply, AppError> {
        let retriever = self.retriever.clone();
        let actor = ctx.actor.clone();
        let role = ctx.role;
        let q = question.to_string();
        let outcome = tokio::task::spawn_blocking(move || retriever.search(&actor, role, &q))
            .await
            .map_err(|e| AppError::Storage(format!("search join: {e}")))??;

        match outcome {
            SearchOutcome::Success(result) => {
                let answer = self.composer.respond(question, &result).await;
                Ok(AskReply::Answered(answer))
            }
            SearchOutcome::Denied => Ok(AskReply::Denied(format!(
                "Access blocked: documents matching your question exist, \
                 but they are classified above your clearance ({}).",
                ctx.role.label()
            ))),
            SearchOutcome::NoData => Ok(AskReply::NoData(NO_INFORMATION.to_string())),
        }
    }

    /// Irrevocably clear the document index. The audit log is kept.
    pub async fn reset(&self, ctx: &RequestContext) -> Result<(), AppError> {
        let portal = self.clone();
        let ctx = ctx.clone();
        tokio::task::spawn_blocking(move || {
            portal.store.reset()?;
            portal.log(&ctx, AuditAction::ResetDb, "N/A", AuditOutcome::Success);
            info!(actor = %ctx.actor, "document store reset");
            Ok(())
        })
        .await
        .map_err(|e| AppError::Storage(format!("reset join: {e}")))?
    }

    /// Full audit trail, newest first.
    pub async fn audit_trail(&self) -> Result<Vec<AuditEvent>, AppError> {
        let audit = self.audit.clone();
        tokio::task::spawn_blocking(move || audit.list())
            .await
            .map_err(|e| AppError::Storage(format!("audit join: {e}")))?
    }

    /// Startup counts for the status line.
    pub fn status(&self) -> Result<PortalStatus, AppError> {
        Ok(PortalStatus {
            indexed_chunks: self.store.count()?,
            audit_events: self.audit.count()?,
        })
    }

    /// Best-effort audit append: a log-write failure must not fail the
    /// caller's primary operation.
    fn log(&self, ctx: &RequestContext, action: AuditAction, detail: &str, outcome: AuditOutcome) {
        if let Err(e) = self
            .audit
            .record(&ctx.actor, ctx.role, action, detail, outcome)
        {
            warn!(error = %e, action = action.as_str(), "audit append failed");
        }
    }
}
