//! # Sessão Interativa — Máquina de Estados do Dashboard
//!
//! O estado do dashboard é um objeto explícito, independente da renderização:
//!
//! ```text
//!            load(ok)              extract()
//!   Empty ───────────► Loaded ───────────────► Extracted
//!     ▲                  ▲  ▲                     │  │
//!     │ load(erro)       │  └──── load(ok) ───────┘  │ extract() (re-run)
//!     └──────────────────┴─────── load(erro) ────────┘
//! ```
//!
//! - `load` com schema inválido volta para `Empty` e devolve o erro.
//! - Um novo `load` invalida resultados anteriores e incrementa a geração.
//! - `search` / `top_keywords` só valem em `Extracted`.
//!
//! ## Extração em Duas Fases
//!
//! O dashboard não pode segurar o lock da sessão durante a extração (o SSE
//! e o `/status` continuariam precisando dele). Por isso:
//!
//! 1. [`Session::begin_extraction()`] devolve um [`ExtractionTicket`] com um
//!    snapshot do WorkingSet e a geração atual;
//! 2. a extração roda fora do lock, em `spawn_blocking`;
//! 3. [`Session::finish_extraction()`] só aceita o ticket se a sessão não foi
//!    recarregada nesse meio tempo ([`Error::StaleExtraction`] caso contrário).

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::analytics::{self, KeywordCount, KeywordFrequencyTable};
use crate::config::{RowErrorPolicy, TOP_KEYWORDS_LIMIT};
use crate::core::{KeywordResult, WorkingSet};
use crate::dataset;
use crate::error::{Error, Result};
use crate::nlu::KeywordService;
use crate::pipeline::{self, ExtractionProgress, ExtractionRun, RunSummary};

/// Estado visível da sessão.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Empty,
    Loaded,
    Extracted,
}

enum Stage {
    Empty,
    Loaded {
        source: String,
        working_set: Arc<WorkingSet>,
    },
    Extracted {
        source: String,
        working_set: Arc<WorkingSet>,
        results: Vec<KeywordResult>,
        frequencies: KeywordFrequencyTable,
        summary: RunSummary,
    },
}

/// Autorização para gravar o resultado de uma extração na sessão.
#[derive(Clone, Debug)]
pub struct ExtractionTicket {
    pub working_set: Arc<WorkingSet>,
    generation: u64,
}

/// Resultado do commit de uma extração.
#[derive(Debug)]
pub struct Committed {
    pub summary: RunSummary,
    /// Falha ao gravar o CSV; os resultados em memória continuam válidos.
    pub write_error: Option<Error>,
}

/// Sessão do dashboard: dataset carregado, resultados e agregados.
pub struct Session {
    stage: Stage,
    generation: u64,
    output_path: PathBuf,
    policy: RowErrorPolicy,
}

impl Session {
    /// Sessão vazia que grava os resultados em `output_path`.
    pub fn new(output_path: impl Into<PathBuf>, policy: RowErrorPolicy) -> Self {
        Self {
            stage: Stage::Empty,
            generation: 0,
            output_path: output_path.into(),
            policy,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.stage {
            Stage::Empty => SessionState::Empty,
            Stage::Loaded { .. } => SessionState::Loaded,
            Stage::Extracted { .. } => SessionState::Extracted,
        }
    }

    /// Incrementada a cada `load` bem-sucedido.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn policy(&self) -> RowErrorPolicy {
        self.policy
    }

    /// Nome do arquivo carregado.
    pub fn source(&self) -> Option<&str> {
        match &self.stage {
            Stage::Empty => None,
            Stage::Loaded { source, .. } | Stage::Extracted { source, .. } => Some(source),
        }
    }

    pub fn working_set(&self) -> Option<&WorkingSet> {
        match &self.stage {
            Stage::Empty => None,
            Stage::Loaded { working_set, .. } | Stage::Extracted { working_set, .. } => {
                Some(working_set)
            }
        }
    }

    /// Lê e valida um CSV enviado, sem tocar na sessão.
    ///
    /// Roda fora do lock (e fora do runtime async) no dashboard; o
    /// resultado vai para [`install()`](Self::install).
    pub fn parse_upload(bytes: &[u8]) -> Result<WorkingSet> {
        dataset::read_table(bytes).and_then(|table| WorkingSet::build(&table))
    }

    /// Carrega um CSV enviado pelo usuário.
    ///
    /// Qualquer falha (CSV malformado, schema) leva a sessão para `Empty`.
    /// Sucesso leva a `Loaded`, descartando resultados anteriores.
    pub fn load(&mut self, source: &str, bytes: &[u8]) -> Result<&WorkingSet> {
        self.install(source, Self::parse_upload(bytes))
    }

    /// Aplica o resultado de [`parse_upload()`](Self::parse_upload) com as
    /// mesmas transições de [`load()`](Self::load).
    pub fn install(&mut self, source: &str, built: Result<WorkingSet>) -> Result<&WorkingSet> {
        let working_set = match built {
            Ok(ws) => Arc::new(ws),
            Err(e) => {
                tracing::warn!(source, error = %e, "Upload rejeitado");
                self.stage = Stage::Empty;
                return Err(e);
            }
        };

        self.generation += 1;
        tracing::info!(
            source,
            generation = self.generation,
            messages = working_set.len(),
            "Dataset carregado na sessão"
        );
        self.stage = Stage::Loaded {
            source: source.to_string(),
            working_set,
        };
        self.working_set()
            .ok_or(Error::InvalidState("dataset missing right after load"))
    }

    /// Primeira fase da extração: snapshot do WorkingSet atual.
    pub fn begin_extraction(&self) -> Result<ExtractionTicket> {
        match &self.stage {
            Stage::Empty => Err(Error::InvalidState("load a CSV before extracting keywords")),
            Stage::Loaded { working_set, .. } | Stage::Extracted { working_set, .. } => {
                Ok(ExtractionTicket {
                    working_set: Arc::clone(working_set),
                    generation: self.generation,
                })
            }
        }
    }

    /// Segunda fase: grava o CSV e publica os resultados.
    ///
    /// Rejeita tickets de uma geração anterior. Falha de escrita não descarta
    /// os resultados; ela volta em [`Committed::write_error`].
    pub fn finish_extraction(
        &mut self,
        ticket: ExtractionTicket,
        run: ExtractionRun,
    ) -> Result<Committed> {
        if ticket.generation != self.generation {
            tracing::warn!(
                ticket = ticket.generation,
                current = self.generation,
                "Extração obsoleta descartada"
            );
            return Err(Error::StaleExtraction);
        }
        let source = match &self.stage {
            Stage::Empty => return Err(Error::InvalidState("no dataset loaded")),
            Stage::Loaded { source, .. } | Stage::Extracted { source, .. } => source.clone(),
        };

        let ExtractionRun {
            results,
            mut summary,
        } = run;

        let write_error = match dataset::ensure_output_dir(&self.output_path)
            .and_then(|()| dataset::write_results(&self.output_path, &results))
        {
            Ok(()) => {
                summary.output_path = Some(self.output_path.clone());
                None
            }
            Err(e) => {
                tracing::error!(path = %self.output_path.display(), error = %e, "Falha ao gravar CSV da sessão");
                Some(e)
            }
        };

        let frequencies = KeywordFrequencyTable::from_results(&results);
        self.stage = Stage::Extracted {
            source,
            working_set: ticket.working_set,
            results,
            frequencies,
            summary: summary.clone(),
        };

        Ok(Committed {
            summary,
            write_error,
        })
    }

    /// Extração completa, segurando `&mut self` do começo ao fim.
    pub fn extract<F>(&mut self, service: &KeywordService, on_progress: F) -> Result<Committed>
    where
        F: FnMut(ExtractionProgress<'_>),
    {
        let ticket = self.begin_extraction()?;
        let run = pipeline::extract_all(service, &ticket.working_set, self.policy, on_progress)?;
        self.finish_extraction(ticket, run)
    }

    pub fn results(&self) -> Result<&[KeywordResult]> {
        match &self.stage {
            Stage::Extracted { results, .. } => Ok(results),
            _ => Err(Error::InvalidState("extract keywords first")),
        }
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        match &self.stage {
            Stage::Extracted { summary, .. } => Some(summary),
            _ => None,
        }
    }

    /// As 15 keywords mais frequentes da última extração.
    pub fn top_keywords(&self) -> Result<Vec<KeywordCount>> {
        match &self.stage {
            Stage::Extracted { frequencies, .. } => Ok(frequencies.most_common(TOP_KEYWORDS_LIMIT)),
            _ => Err(Error::InvalidState("extract keywords first")),
        }
    }

    pub fn search(&self, term: &str) -> Result<Vec<&KeywordResult>> {
        Ok(analytics::search(self.results()?, term))
    }

    /// Os bytes do CSV de resultados (mesmo conteúdo do arquivo gravado).
    pub fn results_csv(&self) -> Result<Vec<u8>> {
        dataset::results_to_csv(self.results()?)
    }
}
