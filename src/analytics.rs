//! # Agregação e Busca sobre Resultados
//!
//! Funções puras sobre `&[KeywordResult]`, sem estado próprio:
//!
//! - [`KeywordFrequencyTable`] — contagem de cada frase em todos os resultados
//!   de uma execução, com desempate pela ordem de primeira aparição.
//! - [`search()`] — match exato, sem diferenciar maiúsculas, contra as
//!   keywords individuais (nunca contra o texto da mensagem).
//!
//! ```text
//! [["refund", "policy"], ["refund", "delivery"]]
//!   → refund: 2, policy: 1, delivery: 1
//! ```

use std::collections::HashMap;

use serde::Serialize;

use crate::core::KeywordResult;

/// Uma linha do gráfico / da rota `/keywords/top`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: usize,
}

/// Frequência de cada keyphrase (case-sensitive) numa execução.
///
/// Reconstruída do zero a cada extração; lembra a ordem de inserção para
/// que empates saiam na ordem em que as frases apareceram.
#[derive(Clone, Debug, Default)]
pub struct KeywordFrequencyTable {
    /// Frases na ordem de primeira aparição.
    order: Vec<String>,
    counts: HashMap<String, usize>,
}

impl KeywordFrequencyTable {
    pub fn from_results(results: &[KeywordResult]) -> Self {
        let mut table = Self::default();
        for keyword in results.iter().flat_map(|r| &r.keywords) {
            match table.counts.get_mut(keyword) {
                Some(count) => *count += 1,
                None => {
                    table.order.push(keyword.clone());
                    table.counts.insert(keyword.clone(), 1);
                }
            }
        }
        table
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Número de frases distintas.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn count(&self, keyword: &str) -> usize {
        self.counts.get(keyword).copied().unwrap_or(0)
    }

    /// As `n` frases mais frequentes, em contagem decrescente.
    /// Empates preservam a ordem de primeira aparição (sort estável).
    pub fn most_common(&self, n: usize) -> Vec<KeywordCount> {
        let mut entries: Vec<KeywordCount> = self
            .order
            .iter()
            .map(|keyword| KeywordCount {
                keyword: keyword.clone(),
                count: self.counts[keyword],
            })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        entries.truncate(n);
        entries
    }
}

/// Resultados cujo conjunto de keywords contém `term` (case-insensitive, exato).
///
/// O termo é aparado; vazio → sem busca, lista vazia.
pub fn search<'a>(results: &'a [KeywordResult], term: &str) -> Vec<&'a KeywordResult> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    results.iter().filter(|r| r.has_keyword(&needle)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChatRecord;

    fn results(sets: &[&[&str]]) -> Vec<KeywordResult> {
        sets.iter()
            .enumerate()
            .map(|(i, kws)| {
                let record = ChatRecord {
                    index: i,
                    chat_id: i.to_string(),
                    role: "customer".into(),
                    message: format!("message {i}"),
                };
                KeywordResult::new(&record, kws.iter().map(|k| k.to_string()).collect())
            })
            .collect()
    }

    #[test]
    fn counts_across_results_with_first_seen_tie_order() {
        let rs = results(&[&["refund", "policy"], &["refund", "delivery"]]);
        let table = KeywordFrequencyTable::from_results(&rs);
        let top = table.most_common(15);
        let pairs: Vec<(&str, usize)> = top.iter().map(|k| (k.keyword.as_str(), k.count)).collect();
        assert_eq!(pairs, vec![("refund", 2), ("policy", 1), ("delivery", 1)]);
    }

    #[test]
    fn most_common_truncates() {
        let rs = results(&[&["a", "b", "c"], &["c"]]);
        let top = KeywordFrequencyTable::from_results(&rs).most_common(2);
        assert_eq!(top[0].keyword, "c");
        assert_eq!(top[1].keyword, "a");
        assert_eq!(top.len(), 2);
    }

    #[test]
    fn counting_is_case_sensitive() {
        let rs = results(&[&["Refund"], &["refund"]]);
        let table = KeywordFrequencyTable::from_results(&rs);
        assert_eq!(table.len(), 2);
        assert_eq!(table.count("refund"), 1);
    }

    #[test]
    fn empty_results_give_empty_table() {
        let rs = results(&[&[], &[]]);
        assert!(KeywordFrequencyTable::from_results(&rs).is_empty());
    }

    #[test]
    fn search_is_exact_and_case_insensitive() {
        let rs = results(&[&["refund policy", "late delivery"], &["refund"]]);
        let hits = search(&rs, "  Refund Policy ");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chat_id, "0");

        let hits = search(&rs, "refund");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chat_id, "1");
    }

    #[test]
    fn search_never_matches_message_text() {
        let rs = results(&[&["refund"]]);
        assert!(search(&rs, "message 0").is_empty());
    }

    #[test]
    fn blank_term_is_no_search() {
        let rs = results(&[&["refund"]]);
        assert!(search(&rs, "   ").is_empty());
    }
}
