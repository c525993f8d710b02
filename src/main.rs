//! # Chat Keyword Extractor — Dashboard
//!
//! Ponto de entrada do dashboard web. A inicialização segue duas fases:
//!
//! 1. **Fase imediata**: o servidor axum começa a aceitar conexões em
//!    `http://localhost:3000` (ou `PORT`);
//! 2. **Fase background**: o modelo MiniLM é carregado em
//!    `tokio::task::spawn_blocking` e publicado no `OnceLock` do estado.
//!
//! ```text
//! main()
//!   ├── Configura tracing/logging
//!   ├── AppConfig::from_env()
//!   ├── Monta AppState (sessão vazia + canal SSE) e Router
//!   ├── Inicia servidor TCP
//!   └── Spawn background:
//!       ├── KeywordService::load(model_id)
//!       └── Publica em OnceLock
//! ```
//!
//! ```bash
//! cargo run --bin chat-keywords
//! RUST_LOG=debug PORT=8080 cargo run --bin chat-keywords
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};

use chat_keywords::config::AppConfig;
use chat_keywords::nlu::KeywordService;
use chat_keywords::web::{self, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    chat_keywords::init_tracing();
    tracing::info!("🔑 Chat Keyword Extractor — Starting...");

    let config = AppConfig::from_env();
    let state = AppState::new(&config);
    let model = state.model.clone();
    let app = web::create_router(state);

    // O servidor fica acessível antes do modelo terminar de carregar.
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "🚀 Server running");

    let model_id = config.model_id.clone();
    tokio::task::spawn_blocking(move || {
        tracing::info!(model = %model_id, "Loading embedding model (first run downloads ~90MB)...");
        match KeywordService::load(&model_id) {
            Ok(service) => {
                let _ = model.set(Arc::new(service));
                tracing::info!("✅ System ready!");
            }
            Err(e) => tracing::error!(error = ?e, "Failed to load embedding model"),
        }
    });

    axum::serve(listener, app).await?;

    Ok(())
}
