#![allow(rustdoc::broken_intra_doc_links)]
//! # Chat Keyword Extractor
//!
//! Extrai keywords representativas de mensagens de clientes usando
//! embeddings de sentença (receita KeyBERT) e as apresenta de duas formas:
//!
//! - **`extract-keywords`** — pipeline batch: `data/chat_logs.csv` →
//!   `outputs/cleaned_keywords.csv`;
//! - **`chat-keywords`** — dashboard web: upload, extração com progresso,
//!   gráfico de frequência e busca por keyword.
//!
//! ## Camadas
//!
//! ```text
//! dataset (CSV) ──► core::WorkingSet ──► nlu::KeywordService ──► pipeline / session
//!                                          │                        │
//!                                          └── keybert + embedder   ├── analytics
//!                                                                   └── web
//! ```

/// Módulo `config` — parâmetros de extração e configuração de processo.
pub mod config;

/// Módulo `core` — RawTable, WorkingSet, ChatRecord, KeywordResult.
pub mod core;

/// Módulo `dataset` — leitura e escrita de CSV.
pub mod dataset;

/// Módulo `error` — taxonomia de erros do domínio.
pub mod error;

/// Módulo `nlu` — embeddings, candidatos e extração de keyphrases.
pub mod nlu;

/// Módulo `pipeline` — extração em lote com progresso e `RunSummary`.
pub mod pipeline;

/// Módulo `analytics` — frequência de keywords e busca.
pub mod analytics;

/// Módulo `session` — máquina de estados do dashboard.
pub mod session;

/// Módulo `web` — servidor axum, handlers, templates e SSE.
pub mod web;

use tracing_subscriber::EnvFilter;

/// Configura o logging dos binários.
///
/// Aceita `RUST_LOG` (ex.: `RUST_LOG=debug`); sem ela, nível `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
