//! # KeyBERT — Keyphrases por Similaridade de Embeddings
//!
//! Implementação do [`KeyphraseExtractor`] no estilo KeyBERT: as frases
//! candidatas que ficam mais próximas do embedding do documento inteiro são
//! as que melhor o representam.
//!
//! ## Algoritmo
//!
//! ```text
//! texto
//!   ├── 1. Candidatos (CandidateVectorizer)   → n-grams sem stopwords
//!   ├── 2. Embedding do documento              → doc ∈ R^384
//!   ├── 3. Embeddings dos candidatos (batch)   → cand_i ∈ R^384
//!   ├── 4. Relevância = cos(doc, cand_i)
//!   ├── 5. Seleção:
//!   │     ├── max-sum: pool com os nr_candidates mais relevantes,
//!   │     │   escolhe a combinação de top_n com MENOR soma de
//!   │     │   similaridades par-a-par (menos redundante);
//!   │     │   menos de top_n candidatos → nenhuma keyphrase
//!   │     └── sem max-sum, ou um só candidato: os top_n mais relevantes
//!   └── 6. Ordena por relevância decrescente
//! ```
//!
//! ## Exemplo: por que Max-Sum?
//!
//! Para "late delivery, the package delivery was late again", os dois
//! candidatos mais relevantes podem ser "late delivery" e "delivery late"
//! (quase o mesmo significado). O max-sum troca um deles por algo como
//! "package", perdendo um pouco de relevância individual em troca de
//! cobertura.
//!
//! Com C(10, 5) = 252 combinações, a busca exaustiva é trivial.

use std::sync::Arc;

use super::candidates::CandidateVectorizer;
use super::{Embed, Keyphrase, KeyphraseExtractor};
use crate::config::ExtractionConfig;
use crate::error::{Error, Result};

/// Extrator de keyphrases baseado em embeddings.
pub struct KeyBert {
    embedder: Arc<dyn Embed>,
    vectorizer: CandidateVectorizer,
}

impl KeyBert {
    pub fn new(embedder: Arc<dyn Embed>) -> Self {
        Self {
            embedder,
            vectorizer: CandidateVectorizer::new(),
        }
    }
}

impl KeyphraseExtractor for KeyBert {
    fn extract_keyphrases(&self, text: &str, config: &ExtractionConfig) -> Result<Vec<Keyphrase>> {
        config.validate()?;

        let candidates = self
            .vectorizer
            .candidates(text, config.ngram_range, config.stop_words);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let doc_embedding = self.embedder.embed(text).map_err(Error::extraction)?;
        let candidate_embeddings = self
            .embedder
            .embed_batch(&candidates)
            .map_err(Error::extraction)?;
        if candidate_embeddings.len() != candidates.len() {
            return Err(Error::Extraction {
                message: format!(
                    "embedder returned {} vectors for {} candidates",
                    candidate_embeddings.len(),
                    candidates.len()
                ),
            });
        }

        let relevance: Vec<f32> = candidate_embeddings
            .iter()
            .map(|e| cosine_similarity(&doc_embedding, e))
            .collect();

        // Um único candidato não tem par para comparar: vai direto ao ranking.
        // Com 2..top_n candidatos o max-sum não acha combinação e devolve vazio.
        let chosen = if config.use_maxsum && candidates.len() > 1 {
            max_sum_selection(&relevance, &candidate_embeddings, config.top_n, config.nr_candidates)
        } else {
            top_by_relevance(&relevance, config.top_n)
        };

        let mut keyphrases: Vec<Keyphrase> = chosen
            .into_iter()
            .map(|i| Keyphrase {
                phrase: candidates[i].clone(),
                score: round4(relevance[i]),
            })
            .collect();
        // sort_by é estável: empates mantêm a ordem da seleção.
        keyphrases.sort_by(|a, b| b.score.total_cmp(&a.score));

        tracing::debug!(candidates = candidates.len(), selected = keyphrases.len(), "Keyphrases extraídas");
        Ok(keyphrases)
    }
}

/// Similaridade cosseno entre dois vetores.
///
/// Retorna `0.0` para vetores de tamanhos diferentes, vazios ou de norma zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

/// Índices ordenados por relevância crescente (estável).
fn ascending_by_relevance(relevance: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..relevance.len()).collect();
    order.sort_by(|&a, &b| relevance[a].total_cmp(&relevance[b]));
    order
}

/// Os `top_n` índices mais relevantes, do mais para o menos relevante.
fn top_by_relevance(relevance: &[f32], top_n: usize) -> Vec<usize> {
    let order = ascending_by_relevance(relevance);
    order.into_iter().rev().take(top_n).collect()
}

/// Seleção max-sum: dentre os `nr_candidates` mais relevantes, a combinação
/// de `top_n` itens com a menor soma de similaridades par-a-par.
///
/// Pool menor que `top_n` → vetor vazio. Em caso de empate
/// na soma, vence a primeira combinação em ordem lexicográfica do pool
/// (pool ordenado por relevância crescente).
fn max_sum_selection(
    relevance: &[f32],
    embeddings: &[Vec<f32>],
    top_n: usize,
    nr_candidates: usize,
) -> Vec<usize> {
    let order = ascending_by_relevance(relevance);
    let pool = &order[order.len().saturating_sub(nr_candidates)..];
    let k = pool.len();
    if top_n == 0 || top_n > k {
        return Vec::new();
    }

    let pairwise: Vec<Vec<f32>> = pool
        .iter()
        .map(|&i| {
            pool.iter()
                .map(|&j| cosine_similarity(&embeddings[i], &embeddings[j]))
                .collect()
        })
        .collect();

    let mut combo: Vec<usize> = (0..top_n).collect();
    let mut best: Option<(f32, Vec<usize>)> = None;
    loop {
        let mut sum = 0.0f32;
        for &i in &combo {
            for &j in &combo {
                if i != j {
                    sum += pairwise[i][j];
                }
            }
        }
        if best.as_ref().map_or(true, |(min, _)| sum < *min) {
            best = Some((sum, combo.clone()));
        }
        if !next_combination(&mut combo, k) {
            break;
        }
    }

    best.map(|(_, c)| c.into_iter().map(|p| pool[p]).collect())
        .unwrap_or_default()
}

/// Avança `combo` para a próxima combinação lexicográfica de `0..n`.
/// Retorna `false` quando não há próxima.
fn next_combination(combo: &mut [usize], n: usize) -> bool {
    let k = combo.len();
    let mut i = k;
    while i > 0 {
        i -= 1;
        if combo[i] < n - k + i {
            combo[i] += 1;
            for j in i + 1..k {
                combo[j] = combo[j - 1] + 1;
            }
            return true;
        }
    }
    false
}

fn round4(x: f32) -> f32 {
    (x * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embedder de teste: vetores fixos por frase; o documento (qualquer
    /// texto desconhecido) vira `[1, 0, 0]`.
    struct TableEmbedder {
        table: HashMap<&'static str, Vec<f32>>,
        calls: AtomicUsize,
    }

    impl TableEmbedder {
        fn new(entries: &[(&'static str, [f32; 3])]) -> Self {
            Self {
                table: entries.iter().map(|(k, v)| (*k, v.to_vec())).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Embed for TableEmbedder {
        fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .table
                .get(text)
                .cloned()
                .unwrap_or_else(|| vec![1.0, 0.0, 0.0]))
        }

        fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            texts.iter().map(|t| self.embed(t)).collect()
        }
    }

    struct BrokenEmbedder;

    impl Embed for BrokenEmbedder {
        fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            anyhow::bail!("model exploded")
        }

        fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            anyhow::bail!("model exploded")
        }
    }

    fn unigram_config(use_maxsum: bool, top_n: usize, nr_candidates: usize) -> ExtractionConfig {
        ExtractionConfig {
            ngram_range: (1, 1),
            use_maxsum,
            top_n,
            nr_candidates,
            ..Default::default()
        }
    }

    /// alpha e beta são quase idênticos e muito relevantes; gamma é
    /// diferente e moderadamente relevante; delta é irrelevante.
    fn redundant_table() -> TableEmbedder {
        TableEmbedder::new(&[
            ("alpha", [0.9, 0.1, 0.0]),
            ("beta", [0.89, 0.11, 0.0]),
            ("gamma", [0.7, 0.0, 0.7]),
            ("delta", [0.0, 1.0, 0.0]),
        ])
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn combinations_are_enumerated_in_lexicographic_order() {
        let mut combo = vec![0, 1];
        let mut seen = vec![combo.clone()];
        while next_combination(&mut combo, 4) {
            seen.push(combo.clone());
        }
        assert_eq!(
            seen,
            vec![vec![0, 1], vec![0, 2], vec![0, 3], vec![1, 2], vec![1, 3], vec![2, 3]]
        );
    }

    #[test]
    fn plain_relevance_keeps_the_redundant_pair() {
        let kb = KeyBert::new(Arc::new(redundant_table()));
        let out = kb
            .extract_keyphrases("alpha beta gamma delta", &unigram_config(false, 2, 3))
            .unwrap();
        let phrases: Vec<&str> = out.iter().map(|k| k.phrase.as_str()).collect();
        assert_eq!(phrases, vec!["alpha", "beta"]);
    }

    #[test]
    fn maxsum_trades_redundancy_for_diversity() {
        let kb = KeyBert::new(Arc::new(redundant_table()));
        let out = kb
            .extract_keyphrases("alpha beta gamma delta", &unigram_config(true, 2, 3))
            .unwrap();
        let phrases: Vec<&str> = out.iter().map(|k| k.phrase.as_str()).collect();
        assert_eq!(phrases.len(), 2);
        assert!(phrases.contains(&"gamma"), "expected diverse pick in {phrases:?}");
        assert!(!(phrases.contains(&"alpha") && phrases.contains(&"beta")));
        // delta está fora do pool dos 3 mais relevantes.
        assert!(!phrases.contains(&"delta"));
    }

    #[test]
    fn output_is_sorted_by_non_increasing_score_and_capped() {
        let kb = KeyBert::new(Arc::new(redundant_table()));
        let out = kb
            .extract_keyphrases("alpha beta gamma delta", &ExtractionConfig::default())
            .unwrap();
        assert!(out.len() <= 5);
        assert!(out.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn maxsum_with_fewer_candidates_than_top_n_yields_nothing() {
        let embedder = Arc::new(redundant_table());
        let kb = KeyBert::new(embedder.clone());
        let out = kb
            .extract_keyphrases("gamma alpha", &unigram_config(true, 5, 10))
            .unwrap();
        assert!(out.is_empty());

        // "I want a refund" → [refund, want, want refund]: três candidatos.
        let out = kb
            .extract_keyphrases("I want a refund", &ExtractionConfig::default())
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn single_candidate_is_ranked_even_with_maxsum() {
        let kb = KeyBert::new(Arc::new(redundant_table()));
        let out = kb
            .extract_keyphrases("Where is my order?", &ExtractionConfig::default())
            .unwrap();
        let phrases: Vec<&str> = out.iter().map(|k| k.phrase.as_str()).collect();
        assert_eq!(phrases, vec!["order"]);
        assert_eq!(out[0].score, 1.0);
    }

    #[test]
    fn plain_relevance_returns_all_when_fewer_than_top_n() {
        let kb = KeyBert::new(Arc::new(redundant_table()));
        let out = kb
            .extract_keyphrases("gamma alpha", &unigram_config(false, 5, 10))
            .unwrap();
        let phrases: Vec<&str> = out.iter().map(|k| k.phrase.as_str()).collect();
        assert_eq!(phrases, vec!["alpha", "gamma"]);
    }

    #[test]
    fn empty_text_returns_empty_without_embedding() {
        let embedder = Arc::new(redundant_table());
        let kb = KeyBert::new(embedder.clone());
        let out = kb.extract_keyphrases("", &ExtractionConfig::default()).unwrap();
        assert!(out.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn embedder_failure_surfaces_as_extraction_error() {
        let kb = KeyBert::new(Arc::new(BrokenEmbedder));
        let err = kb
            .extract_keyphrases("refund policy", &ExtractionConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
    }

    #[test]
    fn invalid_config_is_rejected_before_embedding() {
        let kb = KeyBert::new(Arc::new(BrokenEmbedder));
        let err = kb
            .extract_keyphrases("refund policy", &unigram_config(true, 5, 2))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn scores_are_rounded_to_four_decimals() {
        assert_eq!(round4(0.123_456), 0.1235);
    }
}
