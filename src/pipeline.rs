//! # Pipeline Batch — Extração de Ponta a Ponta
//!
//! ```text
//! data/chat_logs.csv
//!   ├── prepare()  (sem modelo)
//!   │     ├── 1. read_table_from_path()   (Io/Csv → fatal)
//!   │     ├── 2. ensure_output_dir()      (diretório ausente → fatal)
//!   │     └── 3. WorkingSet::build()      (Schema → fatal)
//!   └── execute()
//!         ├── 4. extract_all()            (sequencial, com progresso)
//!         └── 5. write_results()          → outputs/cleaned_keywords.csv
//! ```
//!
//! [`extract_all()`] é compartilhado com a [`Session`](crate::session::Session)
//! do dashboard: o mesmo laço, a mesma política de falhas e o mesmo writer
//! garantem arquivos idênticos nos dois caminhos.
//!
//! ## Falhas por Linha
//!
//! Com [`RowErrorPolicy::RecordEmpty`] uma falha do modelo vira uma linha
//! com `keywords_str` vazio, um `warn!` no log e um incremento em
//! [`RunSummary::failed`]. Com [`RowErrorPolicy::Abort`] o lote para na
//! primeira falha e nada é gravado.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::RowErrorPolicy;
use crate::core::{ChatRecord, KeywordResult, WorkingSet};
use crate::dataset;
use crate::error::{Error, Result};
use crate::nlu::KeywordService;

/// Sumário de uma execução de extração (batch ou dashboard).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub total: usize,
    pub succeeded: usize,
    /// Linhas registradas vazias após falha do modelo.
    pub failed: usize,
    /// Arquivo gravado; `None` se a escrita não aconteceu ou falhou.
    pub output_path: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} messages extracted in {} ms",
            self.succeeded, self.total, self.elapsed_ms
        )?;
        if self.failed > 0 {
            write!(f, " ({} failed)", self.failed)?;
        }
        Ok(())
    }
}

/// Notificações emitidas durante [`extract_all()`].
#[derive(Debug)]
pub enum ExtractionProgress<'a> {
    /// Uma linha terminou (com ou sem keywords).
    Row { processed: usize, total: usize },
    /// A extração de `record` falhou e foi registrada vazia.
    RowFailed { record: &'a ChatRecord, error: &'a Error },
}

/// Resultados de uma extração completa, na ordem do WorkingSet.
#[derive(Debug)]
pub struct ExtractionRun {
    pub results: Vec<KeywordResult>,
    pub summary: RunSummary,
}

/// Aplica o serviço a cada registro, sequencialmente.
///
/// Produz exatamente um [`KeywordResult`] por registro. `on_progress` é
/// chamado após cada linha; o chamador decide como exibir (log, SSE).
///
/// # Erros
///
/// Só com [`RowErrorPolicy::Abort`]: a primeira [`Error::Extraction`].
pub fn extract_all<F>(
    service: &KeywordService,
    working_set: &WorkingSet,
    policy: RowErrorPolicy,
    mut on_progress: F,
) -> Result<ExtractionRun>
where
    F: FnMut(ExtractionProgress<'_>),
{
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let t0 = Instant::now();
    let total = working_set.len();
    let mut results = Vec::with_capacity(total);
    let mut failed = 0;

    for record in working_set {
        let result = match service.extract(&record.message) {
            Ok(keywords) => {
                tracing::debug!(index = record.index, chat_id = %record.chat_id, ?keywords, "Keywords extraídas");
                KeywordResult::new(record, keywords)
            }
            Err(error) => match policy {
                RowErrorPolicy::Abort => {
                    tracing::error!(index = record.index, chat_id = %record.chat_id, error = %error, "Extração abortada");
                    return Err(error);
                }
                RowErrorPolicy::RecordEmpty => {
                    tracing::warn!(index = record.index, chat_id = %record.chat_id, error = %error, "Extração falhou, linha registrada vazia");
                    on_progress(ExtractionProgress::RowFailed {
                        record,
                        error: &error,
                    });
                    failed += 1;
                    KeywordResult::failed(record)
                }
            },
        };
        results.push(result);

        let processed = results.len();
        if is_log_step(processed, total) {
            tracing::info!(processed, total, "Progresso da extração");
        }
        on_progress(ExtractionProgress::Row { processed, total });
    }

    let summary = RunSummary {
        run_id,
        total,
        succeeded: total - failed,
        failed,
        output_path: None,
        started_at,
        finished_at: Utc::now(),
        elapsed_ms: t0.elapsed().as_millis() as u64,
    };
    tracing::info!(run_id = %summary.run_id, %summary, "Extração concluída");

    Ok(ExtractionRun { results, summary })
}

/// Loga a cada ~10% do lote e na última linha.
fn is_log_step(processed: usize, total: usize) -> bool {
    let step = (total / 10).max(1);
    processed % step == 0 || processed == total
}

/// Lote validado: WorkingSet pronto e destino conferido, modelo ainda não
/// envolvido.
#[derive(Debug)]
pub struct PreparedBatch {
    pub working_set: WorkingSet,
    output: PathBuf,
}

impl PreparedBatch {
    pub fn output(&self) -> &Path {
        &self.output
    }
}

/// Execução batch: CSV de entrada → CSV de keywords.
pub struct BatchPipeline {
    service: Arc<KeywordService>,
    policy: RowErrorPolicy,
}

impl BatchPipeline {
    pub fn new(service: Arc<KeywordService>, policy: RowErrorPolicy) -> Self {
        Self { service, policy }
    }

    /// Lê a entrada, confere o diretório de saída e monta o WorkingSet.
    ///
    /// Não precisa do modelo: o binário chama antes de carregá-lo, então
    /// erros de entrada, de schema e de diretório aparecem na hora.
    pub fn prepare(input: &Path, output: &Path) -> Result<PreparedBatch> {
        let table = dataset::read_table_from_path(input)?;
        dataset::ensure_output_dir(output)?;

        let working_set = WorkingSet::build(&table)?;
        let stats = working_set.stats();
        tracing::info!(
            input_rows = stats.input_rows,
            customer_rows = stats.customer_rows,
            missing_message = stats.missing_message,
            duplicates_removed = stats.duplicates_removed,
            messages = working_set.len(),
            "WorkingSet construído"
        );

        Ok(PreparedBatch {
            working_set,
            output: output.to_path_buf(),
        })
    }

    /// Extrai keywords do lote preparado e grava o CSV.
    pub fn execute(&self, batch: &PreparedBatch) -> Result<RunSummary> {
        let ExtractionRun {
            results,
            mut summary,
        } = extract_all(&self.service, &batch.working_set, self.policy, |_| {})?;

        dataset::write_results(&batch.output, &results)?;
        summary.output_path = Some(batch.output.clone());
        Ok(summary)
    }

    /// [`prepare()`](Self::prepare) seguido de [`execute()`](Self::execute).
    pub fn run(&self, input: &Path, output: &Path) -> Result<RunSummary> {
        let batch = Self::prepare(input, output)?;
        self.execute(&batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlu::testing::ScriptedExtractor;

    const INPUT: &str = "chat_id,role,message\n\
        1,customer,Where is my order?\n\
        1,agent,Let me check\n\
        2,customer,Where is my order?\n\
        3,Customer,I want a refund\n";

    fn service() -> Arc<KeywordService> {
        ScriptedExtractor::default()
            .answer("Where is my order?", &["order"])
            .answer("I want a refund", &["refund", "want refund"])
            .into_service()
    }

    fn write_input(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("chat_logs.csv");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn batch_run_writes_one_row_per_unique_customer_message() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), INPUT);
        let output = dir.path().join("cleaned_keywords.csv");

        let summary = BatchPipeline::new(service(), RowErrorPolicy::default())
            .run(&input, &output)
            .unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.output_path.as_deref(), Some(output.as_path()));
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "chat_id,message,keywords_str\n\
             1,Where is my order?,order\n\
             3,I want a refund,\"refund, want refund\"\n"
        );
    }

    #[test]
    fn repeated_runs_produce_identical_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), INPUT);
        let first = dir.path().join("a.csv");
        let second = dir.path().join("b.csv");
        let pipeline = BatchPipeline::new(service(), RowErrorPolicy::default());

        pipeline.run(&input, &first).unwrap();
        pipeline.run(&input, &second).unwrap();

        assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
    }

    #[test]
    fn failed_rows_are_recorded_empty_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), INPUT);
        let output = dir.path().join("out.csv");
        let service = ScriptedExtractor::default()
            .answer("I want a refund", &["refund"])
            .fail_on("Where is my order?")
            .into_service();

        let summary = BatchPipeline::new(service, RowErrorPolicy::RecordEmpty)
            .run(&input, &output)
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "chat_id,message,keywords_str\n\
             1,Where is my order?,\n\
             3,I want a refund,refund\n"
        );
    }

    #[test]
    fn abort_policy_stops_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), INPUT);
        let output = dir.path().join("out.csv");
        let service = ScriptedExtractor::default().fail_on("Where is my order?").into_service();

        let err = BatchPipeline::new(service, RowErrorPolicy::Abort)
            .run(&input, &output)
            .unwrap_err();

        assert!(matches!(err, Error::Extraction { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn schema_error_happens_before_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "chat_id,text\n1,hello\n");
        let output = dir.path().join("out.csv");
        let service = ScriptedExtractor::default().fail_on("hello").into_service();

        let err = BatchPipeline::new(service, RowErrorPolicy::Abort)
            .run(&input, &output)
            .unwrap_err();

        match err {
            Error::Schema { missing } => assert_eq!(missing, vec!["role", "message"]),
            other => panic!("expected schema error, got {other:?}"),
        }
        assert!(!output.exists());
    }

    #[test]
    fn missing_output_directory_fails_before_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), INPUT);
        let output = dir.path().join("outputs").join("cleaned_keywords.csv");

        let err = BatchPipeline::new(service(), RowErrorPolicy::default())
            .run(&input, &output)
            .unwrap_err();

        assert!(matches!(err, Error::Io { .. }));
        assert!(!dir.path().join("outputs").exists());
    }

    #[test]
    fn prepare_validates_without_a_model() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), INPUT);
        let output = dir.path().join("out.csv");

        let batch = BatchPipeline::prepare(&input, &output).unwrap();
        assert_eq!(batch.working_set.len(), 2);
        assert_eq!(batch.output(), output.as_path());
        assert!(!output.exists());

        let bad = dir.path().join("bad.csv");
        std::fs::write(&bad, "chat_id,text\n1,hello\n").unwrap();
        assert!(matches!(
            BatchPipeline::prepare(&bad, &output),
            Err(Error::Schema { .. })
        ));
        assert!(matches!(
            BatchPipeline::prepare(&dir.path().join("nope.csv"), &output),
            Err(Error::Io { .. })
        ));
        assert!(matches!(
            BatchPipeline::prepare(&input, &dir.path().join("outputs").join("k.csv")),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn execute_writes_the_prepared_batch() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), INPUT);
        let output = dir.path().join("out.csv");

        let batch = BatchPipeline::prepare(&input, &output).unwrap();
        let summary = BatchPipeline::new(service(), RowErrorPolicy::default())
            .execute(&batch)
            .unwrap();

        assert_eq!(summary.total, 2);
        assert!(output.exists());
    }

    #[test]
    fn missing_input_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BatchPipeline::new(service(), RowErrorPolicy::default())
            .run(&dir.path().join("nope.csv"), &dir.path().join("out.csv"))
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn progress_reports_every_row_and_failures() {
        let table = dataset::read_table(INPUT.as_bytes()).unwrap();
        let ws = WorkingSet::build(&table).unwrap();
        let service = ScriptedExtractor::default().fail_on("I want a refund").into_service();

        let mut rows = Vec::new();
        let mut failures = Vec::new();
        let run = extract_all(&service, &ws, RowErrorPolicy::RecordEmpty, |p| match p {
            ExtractionProgress::Row { processed, total } => rows.push((processed, total)),
            ExtractionProgress::RowFailed { record, .. } => failures.push(record.chat_id.clone()),
        })
        .unwrap();

        assert_eq!(rows, vec![(1, 2), (2, 2)]);
        assert_eq!(failures, vec!["3"]);
        assert!(run.results[1].failed);
    }

    #[test]
    fn empty_working_set_is_a_valid_run() {
        let table = dataset::read_table("chat_id,role,message\n1,agent,hi\n".as_bytes()).unwrap();
        let ws = WorkingSet::build(&table).unwrap();
        let run = extract_all(&service(), &ws, RowErrorPolicy::default(), |_| {}).unwrap();
        assert!(run.results.is_empty());
        assert_eq!(run.summary.total, 0);
    }

    #[test]
    fn log_steps_cover_tenths_and_last_row() {
        assert!(is_log_step(10, 100));
        assert!(!is_log_step(11, 100));
        assert!(is_log_step(7, 7));
        assert!(is_log_step(1, 3));
    }

    #[test]
    fn summary_display_mentions_failures() {
        let table = dataset::read_table(INPUT.as_bytes()).unwrap();
        let ws = WorkingSet::build(&table).unwrap();
        let service = ScriptedExtractor::default().fail_on("I want a refund").into_service();
        let run = extract_all(&service, &ws, RowErrorPolicy::RecordEmpty, |_| {}).unwrap();
        let text = run.summary.to_string();
        assert!(text.starts_with("1 of 2 messages extracted"));
        assert!(text.ends_with("(1 failed)"));
    }
}
