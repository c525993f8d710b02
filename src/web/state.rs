//! # Estado da Aplicação Web
//!
//! ## Padrão de Inicialização em Duas Fases
//!
//! ```text
//! Fase 1 (imediata):          Fase 2 (background):
//! ┌──────────────────┐        ┌──────────────────┐
//! │ AppState         │        │ KeywordService   │
//! │  ├── session ✓   │        │  └── MiniLM      │
//! │  ├── events_tx ✓ │        │                  │
//! │  └── model: ∅    │◄───────│ (set via OnceLock)
//! └──────────────────┘        └──────────────────┘
//!       ↓ servidor                  ↓ spawn_blocking
//!    disponível                  modelo pronto
//! ```
//!
//! Upload e busca funcionam antes do modelo ficar pronto; só a extração
//! depende dele.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::nlu::KeywordService;
use crate::session::Session;
use crate::web::events::ExtractionEvent;

/// Capacidade do canal broadcast de eventos SSE.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Estado compartilhado da aplicação Axum.
#[derive(Clone)]
pub struct AppState {
    /// Serviço de extração, preenchido em background via `OnceLock::set()`.
    pub model: Arc<OnceLock<Arc<KeywordService>>>,
    /// Sessão interativa. Lock curto: nunca segurado durante a extração.
    pub session: Arc<Mutex<Session>>,
    /// Canal broadcast para eventos SSE de extração.
    pub events_tx: Arc<broadcast::Sender<ExtractionEvent>>,
}

impl AppState {
    /// Estado inicial: sessão vazia, modelo ainda não carregado.
    pub fn new(config: &AppConfig) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            model: Arc::new(OnceLock::new()),
            session: Arc::new(Mutex::new(Session::new(
                config.output_path.clone(),
                config.row_error_policy,
            ))),
            events_tx: Arc::new(events_tx),
        }
    }

    /// Estado com o modelo já publicado, sem a fase de carregamento.
    pub fn with_service(config: &AppConfig, service: Arc<KeywordService>) -> Self {
        let state = Self::new(config);
        // OnceLock recém-criado: set nunca falha aqui.
        let _ = state.model.set(service);
        state
    }

    /// Envia um evento a todos os inscritos; sem inscritos não é erro.
    pub fn emit(&self, event: ExtractionEvent) {
        let _ = self.events_tx.send(event);
    }
}
