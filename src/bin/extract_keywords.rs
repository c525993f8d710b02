//! # extract-keywords — Pipeline Batch
//!
//! Lê `data/chat_logs.csv`, extrai keywords de cada mensagem única de
//! cliente e grava `outputs/cleaned_keywords.csv`. Sem flags; caminhos e
//! modelo podem ser sobrescritos por variáveis de ambiente (ver
//! [`AppConfig`]).
//!
//! ```bash
//! cargo run --release --bin extract-keywords
//! KEYWORDS_FAIL_FAST=1 cargo run --bin extract-keywords
//! ```
//!
//! Qualquer erro não tratado encerra com código de saída diferente de zero.

use std::sync::Arc;

use anyhow::{Context, Result};

use chat_keywords::config::AppConfig;
use chat_keywords::nlu::KeywordService;
use chat_keywords::pipeline::BatchPipeline;

fn main() -> Result<()> {
    chat_keywords::init_tracing();

    let config = AppConfig::from_env();
    tracing::info!(
        input = %config.input_path.display(),
        output = %config.output_path.display(),
        policy = ?config.row_error_policy,
        "Starting batch extraction"
    );

    // Entrada, schema e diretório de saída antes do download do modelo.
    let batch = BatchPipeline::prepare(&config.input_path, &config.output_path)
        .with_context(|| format!("cannot prepare {}", config.input_path.display()))?;

    let service = KeywordService::load(&config.model_id)
        .with_context(|| format!("failed to load embedding model {}", config.model_id))?;

    let summary = BatchPipeline::new(Arc::new(service), config.row_error_policy)
        .execute(&batch)
        .with_context(|| format!("batch extraction of {} failed", config.input_path.display()))?;

    println!("✅ Saved to {}", config.output_path.display());
    if summary.failed > 0 {
        println!("{} of {} messages failed extraction", summary.failed, summary.total);
    }
    tracing::info!(run_id = %summary.run_id, %summary, "Batch finished");

    Ok(())
}
