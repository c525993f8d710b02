//! # Erros do Domínio
//!
//! Taxonomia de falhas do extrator de keywords. Cada variante corresponde
//! a uma categoria com política de propagação própria:
//!
//! | Variante | Quando | Política |
//! |----------|--------|----------|
//! | [`Error::Schema`] | CSV sem `chat_id`/`role`/`message` | aborta antes de qualquer extração |
//! | [`Error::Io`] | entrada ilegível, diretório de saída inexistente | fatal no batch |
//! | [`Error::Csv`] | CSV malformado ou UTF-8 inválido | igual a `Io` |
//! | [`Error::Extraction`] | embedding/extração falhou para um texto | recuperável por linha |
//! | [`Error::Config`] | configuração de extração inválida | fatal |
//! | [`Error::InvalidState`] | operação da sessão fora do estado válido | exibida ao usuário |
//! | [`Error::StaleExtraction`] | sessão recarregada durante a extração | resultado descartado |
//!
//! Os binários convertem para `anyhow::Error` no topo da pilha.

use std::path::PathBuf;

use thiserror::Error;

/// Erro do domínio de extração de keywords.
#[derive(Debug, Error)]
pub enum Error {
    /// Colunas obrigatórias ausentes no cabeçalho do CSV.
    #[error("CSV must have 'chat_id', 'role', and 'message' columns (missing: {})", .missing.join(", "))]
    Schema {
        /// Nomes das colunas que faltaram, na ordem canônica.
        missing: Vec<String>,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Falha do modelo (tokenização, forward pass) para um texto específico.
    #[error("keyword extraction failed: {message}")]
    Extraction { message: String },

    #[error("invalid extraction config: {0}")]
    Config(String),

    #[error("invalid session state: {0}")]
    InvalidState(&'static str),

    #[error("session was reloaded while extraction was running; results discarded")]
    StaleExtraction,
}

impl Error {
    /// Constrói um [`Error::Io`] anexando o caminho envolvido.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Converte um erro `anyhow` do modelo em [`Error::Extraction`],
    /// preservando a cadeia de causas na mensagem.
    pub fn extraction(err: anyhow::Error) -> Self {
        Error::Extraction {
            message: format!("{err:#}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
