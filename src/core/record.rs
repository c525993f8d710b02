//! # Registros Tipados
//!
//! [`ChatRecord`] é uma mensagem de cliente já validada; [`KeywordResult`]
//! é o que a extração produz para ela.

use serde::Serialize;

use crate::config::KEYWORD_SEPARATOR;

/// Mensagem de chat elegível para extração.
///
/// Só existe dentro de um [`WorkingSet`](super::WorkingSet): o `role` é
/// sempre `"customer"` (case-insensitive) e o `index` é a posição densa,
/// começando em zero, após filtro e deduplicação.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatRecord {
    pub index: usize,
    /// Identificador da conversa; pode repetir entre linhas.
    pub chat_id: String,
    pub role: String,
    pub message: String,
}

/// Keywords extraídas de uma mensagem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KeywordResult {
    pub chat_id: String,
    pub message: String,
    /// Até 5 frases, da mais relevante para a menos relevante.
    pub keywords: Vec<String>,
    /// `true` quando a extração falhou e a linha foi registrada vazia.
    pub failed: bool,
}

impl KeywordResult {
    pub fn new(record: &ChatRecord, keywords: Vec<String>) -> Self {
        Self {
            chat_id: record.chat_id.clone(),
            message: record.message.clone(),
            keywords,
            failed: false,
        }
    }

    /// Resultado vazio para uma linha cuja extração falhou.
    pub fn failed(record: &ChatRecord) -> Self {
        Self {
            failed: true,
            ..Self::new(record, Vec::new())
        }
    }

    /// Keywords unidas por `", "`: a coluna `keywords_str` do CSV.
    pub fn keywords_str(&self) -> String {
        self.keywords.join(KEYWORD_SEPARATOR)
    }

    /// Match exato, sem diferenciar maiúsculas, contra cada keyword.
    /// `needle_lower` já deve estar em minúsculas.
    pub fn has_keyword(&self, needle_lower: &str) -> bool {
        self.keywords.iter().any(|k| k.to_lowercase() == needle_lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ChatRecord {
        ChatRecord {
            index: 0,
            chat_id: "7".into(),
            role: "Customer".into(),
            message: "refund please".into(),
        }
    }

    #[test]
    fn keywords_str_joins_with_comma_space() {
        let r = KeywordResult::new(&record(), vec!["refund policy".into(), "late delivery".into()]);
        assert_eq!(r.keywords_str(), "refund policy, late delivery");
        assert!(!r.failed);
    }

    #[test]
    fn failed_result_is_empty() {
        let r = KeywordResult::failed(&record());
        assert!(r.failed);
        assert!(r.keywords.is_empty());
        assert_eq!(r.keywords_str(), "");
        assert_eq!(r.chat_id, "7");
    }

    #[test]
    fn has_keyword_is_exact_and_case_insensitive() {
        let r = KeywordResult::new(&record(), vec!["Refund Policy".into()]);
        assert!(r.has_keyword("refund policy"));
        assert!(!r.has_keyword("refund"));
    }
}
