//! # Eventos SSE de Extração
//!
//! [`ExtractionEvent`] descreve o progresso de uma extração disparada pelo
//! dashboard, enviado em tempo real ao frontend via Server-Sent Events.
//!
//! ## Ciclo de Vida
//!
//! ```text
//! Started → [Progress | RowFailed]×N → Completed
//!                                   ou → Error
//! ```
//!
//! Serializado com `#[serde(tag = "type")]`:
//!
//! ```json
//! { "type": "Progress", "processed": 40, "total": 120 }
//! ```

use serde::Serialize;

use crate::pipeline::{ExtractionProgress, RunSummary};

/// Evento emitido durante a extração, enviado via SSE ao frontend.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ExtractionEvent {
    /// Extração iniciada; `total` mensagens no WorkingSet.
    Started { total: usize },

    /// Mais uma linha concluída. O frontend atualiza a barra de progresso.
    Progress { processed: usize, total: usize },

    /// Extração de uma linha falhou; ela foi registrada sem keywords.
    RowFailed {
        index: usize,
        chat_id: String,
        error: String,
    },

    Completed {
        run_id: String,
        total: usize,
        succeeded: usize,
        failed: usize,
        elapsed_ms: u64,
        /// `None` quando o CSV não pôde ser gravado.
        output_path: Option<String>,
    },

    /// Erro que encerrou a extração (abort, sessão recarregada...).
    Error { message: String },
}

impl ExtractionEvent {
    pub fn from_progress(progress: &ExtractionProgress<'_>) -> Self {
        match progress {
            ExtractionProgress::Row { processed, total } => ExtractionEvent::Progress {
                processed: *processed,
                total: *total,
            },
            ExtractionProgress::RowFailed { record, error } => ExtractionEvent::RowFailed {
                index: record.index,
                chat_id: record.chat_id.clone(),
                error: error.to_string(),
            },
        }
    }

    pub fn completed(summary: &RunSummary) -> Self {
        ExtractionEvent::Completed {
            run_id: summary.run_id.to_string(),
            total: summary.total,
            succeeded: summary.succeeded,
            failed: summary.failed,
            elapsed_ms: summary.elapsed_ms,
            output_path: summary
                .output_path
                .as_ref()
                .map(|p| p.display().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(ExtractionEvent::Progress {
            processed: 3,
            total: 10,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "Progress", "processed": 3, "total": 10 })
        );
    }

    #[test]
    fn row_failure_carries_record_identity() {
        let record = crate::core::ChatRecord {
            index: 4,
            chat_id: "42".into(),
            role: "customer".into(),
            message: "hello".into(),
        };
        let error = crate::error::Error::Extraction {
            message: "tokenizer exploded".into(),
        };
        let event = ExtractionEvent::from_progress(&ExtractionProgress::RowFailed {
            record: &record,
            error: &error,
        });
        match event {
            ExtractionEvent::RowFailed {
                index,
                chat_id,
                error,
            } => {
                assert_eq!(index, 4);
                assert_eq!(chat_id, "42");
                assert!(error.contains("tokenizer exploded"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
