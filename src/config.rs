//! # Configuração
//!
//! Dois níveis de configuração:
//!
//! - [`ExtractionConfig`] — parâmetros fixos da extração no estilo KeyBERT
//!   (n-grams 1–2, stopwords em inglês, max-sum sobre 10 candidatos, top 5).
//!   Não é exposta ao usuário; o `Default` é a configuração de produção.
//! - [`AppConfig`] — caminhos, modelo e endereço do servidor. Os valores
//!   padrão são fixos; variáveis de ambiente permitem sobrescrevê-los:
//!
//! | Variável | Padrão |
//! |----------|--------|
//! | `KEYWORDS_INPUT` | `data/chat_logs.csv` |
//! | `KEYWORDS_OUTPUT` | `outputs/cleaned_keywords.csv` |
//! | `KEYWORDS_MODEL` | `sentence-transformers/all-MiniLM-L6-v2` |
//! | `KEYWORDS_FAIL_FAST` | `0` (registra vazio e continua) |
//! | `PORT` | `3000` |

use std::path::PathBuf;

use serde::Serialize;

use crate::error::{Error, Result};

/// Caminho padrão do CSV de entrada (relativo à raiz do projeto).
pub const DEFAULT_INPUT_PATH: &str = "data/chat_logs.csv";

/// Caminho padrão do CSV de saída.
pub const DEFAULT_OUTPUT_PATH: &str = "outputs/cleaned_keywords.csv";

/// Modelo de sentence embeddings no HuggingFace Hub.
pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Colunas obrigatórias do CSV de entrada, na ordem canônica das mensagens de erro.
pub const REQUIRED_COLUMNS: [&str; 3] = ["chat_id", "role", "message"];

/// Cabeçalho do CSV de saída.
pub const OUTPUT_HEADERS: [&str; 3] = ["chat_id", "message", "keywords_str"];

/// Separador das keywords na coluna `keywords_str`.
pub const KEYWORD_SEPARATOR: &str = ", ";

/// Quantas keywords entram no gráfico de frequência.
pub const TOP_KEYWORDS_LIMIT: usize = 15;

const DEFAULT_PORT: u16 = 3000;

/// Idioma da lista de stopwords removida antes da geração de candidatos.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StopWordLanguage {
    English,
}

/// Parâmetros da extração de keyphrases.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExtractionConfig {
    /// Tamanho mínimo e máximo (inclusive) das frases candidatas, em tokens.
    pub ngram_range: (usize, usize),
    /// Lista de stopwords removida antes de montar os n-grams.
    pub stop_words: Option<StopWordLanguage>,
    /// Seleção com diversidade (max-sum) em vez de relevância pura.
    pub use_maxsum: bool,
    /// Tamanho do pool de candidatos considerado pelo max-sum.
    pub nr_candidates: usize,
    /// Quantidade final de keyphrases.
    pub top_n: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ngram_range: (1, 2),
            stop_words: Some(StopWordLanguage::English),
            use_maxsum: true,
            nr_candidates: 10,
            top_n: 5,
        }
    }
}

impl ExtractionConfig {
    /// Valida combinações que o extrator não consegue atender.
    pub fn validate(&self) -> Result<()> {
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(Error::Config(format!(
                "ngram_range must satisfy 1 <= min <= max, got ({min_n}, {max_n})"
            )));
        }
        if self.top_n == 0 {
            return Err(Error::Config("top_n must be at least 1".into()));
        }
        if self.use_maxsum && self.nr_candidates < self.top_n {
            return Err(Error::Config(format!(
                "nr_candidates ({}) must be >= top_n ({}) for max-sum selection",
                self.nr_candidates, self.top_n
            )));
        }
        Ok(())
    }
}

/// O que fazer quando a extração de uma linha falha.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum RowErrorPolicy {
    /// Loga, grava lista vazia para a linha e segue; a falha entra no `RunSummary`.
    #[default]
    RecordEmpty,
    /// Interrompe o lote inteiro na primeira falha.
    Abort,
}

/// Configuração de processo compartilhada pelos dois binários.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub model_id: String,
    pub bind_addr: String,
    pub row_error_policy: RowErrorPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            model_id: DEFAULT_MODEL_ID.to_string(),
            bind_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            row_error_policy: RowErrorPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Lê sobrescritas do ambiente do processo.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Monta a configuração a partir de uma função de lookup, separada de
    /// `from_env` para ser testável sem mexer no ambiente global.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("KEYWORDS_INPUT").filter(|v| !v.is_empty()) {
            config.input_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("KEYWORDS_OUTPUT").filter(|v| !v.is_empty()) {
            config.output_path = PathBuf::from(path);
        }
        if let Some(model) = lookup("KEYWORDS_MODEL").filter(|v| !v.is_empty()) {
            config.model_id = model;
        }
        if let Some(port) = lookup("PORT") {
            match port.parse::<u16>() {
                Ok(p) => config.bind_addr = format!("0.0.0.0:{p}"),
                Err(_) => tracing::warn!(value = %port, "PORT inválida, usando {}", DEFAULT_PORT),
            }
        }
        if let Some(flag) = lookup("KEYWORDS_FAIL_FAST") {
            match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => config.row_error_policy = RowErrorPolicy::Abort,
                "" | "0" | "false" | "no" => {}
                other => tracing::warn!(value = %other, "KEYWORDS_FAIL_FAST inválido, ignorando"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_extraction_config_matches_production_settings() {
        let cfg = ExtractionConfig::default();
        assert_eq!(cfg.ngram_range, (1, 2));
        assert_eq!(cfg.stop_words, Some(StopWordLanguage::English));
        assert!(cfg.use_maxsum);
        assert_eq!(cfg.nr_candidates, 10);
        assert_eq!(cfg.top_n, 5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn maxsum_pool_smaller_than_top_n_is_rejected() {
        let cfg = ExtractionConfig {
            nr_candidates: 3,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn inverted_ngram_range_is_rejected() {
        let cfg = ExtractionConfig {
            ngram_range: (2, 1),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn env_overrides_are_applied() {
        let env: HashMap<&str, &str> = [
            ("KEYWORDS_INPUT", "in.csv"),
            ("KEYWORDS_OUTPUT", "out/res.csv"),
            ("PORT", "8080"),
            ("KEYWORDS_FAIL_FAST", "true"),
        ]
        .into_iter()
        .collect();
        let cfg = AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.input_path, PathBuf::from("in.csv"));
        assert_eq!(cfg.output_path, PathBuf::from("out/res.csv"));
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.row_error_policy, RowErrorPolicy::Abort);
        assert_eq!(cfg.model_id, DEFAULT_MODEL_ID);
    }

    #[test]
    fn invalid_env_values_fall_back_to_defaults() {
        let cfg = AppConfig::from_lookup(|k| match k {
            "PORT" => Some("not-a-port".into()),
            "KEYWORDS_FAIL_FAST" => Some("maybe".into()),
            _ => None,
        });
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
        assert_eq!(cfg.row_error_policy, RowErrorPolicy::RecordEmpty);
        assert_eq!(cfg.input_path, PathBuf::from(DEFAULT_INPUT_PATH));
    }
}
