//! # Módulo Web — O Dashboard de Keywords
//!
//! Camada web construída com **Axum** + **HTMX** + **Maud** + **SSE**.
//!
//! ## Arquitetura Web
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Browser (HTMX + SSE)                                    │
//! ├─────────────────────────────────────────────────────────┤
//! │ Axum Router (este módulo)                               │
//! │  ├── GET  /              → página principal             │
//! │  ├── GET  /status        → JSON: modelo pronto? estado? │
//! │  ├── GET  /events        → SSE stream (progresso)       │
//! │  ├── POST /upload        → CSV multipart (20MB)         │
//! │  ├── POST /extract       → HTMX fragment (resultados)   │
//! │  ├── GET  /search?q=     → HTMX fragment (busca)        │
//! │  ├── GET  /keywords/top  → JSON top 15                  │
//! │  └── GET  /download      → CSV de resultados            │
//! ├─────────────────────────────────────────────────────────┤
//! │ Static Assets (tower_http::ServeDir → /assets/)         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Submódulos
//!
//! | Módulo | Responsabilidade |
//! |--------|------------------|
//! | [`state`] | Estado compartilhado (`AppState`) |
//! | [`events`] | Eventos SSE de extração |
//! | [`handlers`] | Handlers Axum para cada rota |
//! | [`templates`] | Templates Maud (HTML server-side) |

pub mod events;
pub mod handlers;
pub mod state;
pub mod templates;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Limite de tamanho do upload de CSV.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Cria o router Axum com todas as rotas do dashboard.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // ── Página HTML ───────────────────────────────────────
        .route("/", get(handlers::index))
        // ── API JSON / SSE ────────────────────────────────────
        .route("/status", get(handlers::model_status))
        .route("/events", get(handlers::sse_events))
        .route("/keywords/top", get(handlers::top_keywords))
        .route("/download", get(handlers::download))
        // ── HTMX fragments ───────────────────────────────────
        .route(
            "/upload",
            post(handlers::upload_csv).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/extract", post(handlers::extract))
        .route("/search", get(handlers::search))
        // ── Arquivos estáticos ────────────────────────────────
        .nest_service("/assets", ServeDir::new("assets"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
