//! # Pipeline NLU — Extração de Keywords
//!
//! Este módulo reúne tudo o que transforma uma mensagem em keywords:
//!
//! ```text
//! KeywordService::extract(texto)
//!   └── KeyphraseExtractor (KeyBert)
//!         ├── CandidateVectorizer → n-grams 1-2 sem stopwords
//!         └── Embed (Embedder MiniLM) → embeddings do texto e dos candidatos
//! ```
//!
//! ## Pontos de Injeção
//!
//! Dois traits separam o domínio do modelo:
//!
//! | Trait | Implementação real | Uso em testes |
//! |-------|--------------------|---------------|
//! | [`Embed`] | [`embedder::Embedder`] | vetores fixos por frase |
//! | [`KeyphraseExtractor`] | [`keybert::KeyBert`] | listas fixas / falhas simuladas |
//!
//! O modelo é construído uma vez por processo e injetado via `Arc`, nunca
//! acessado como estado global.
//!
//! ## Sub-módulos
//!
//! | Módulo | Responsabilidade |
//! |--------|-----------------|
//! | [`embedder`] | Embeddings 384-dim via candle |
//! | [`candidates`] | Tokenização e n-grams candidatos |
//! | [`keybert`] | Relevância cosseno + seleção max-sum |

/// Sub-módulo do embedder MiniLM via candle.
pub mod embedder;

/// Sub-módulo do gerador de frases candidatas.
pub mod candidates;

/// Sub-módulo do extrator de keyphrases estilo KeyBERT.
pub mod keybert;

use std::sync::Arc;

use serde::Serialize;

use crate::config::ExtractionConfig;
use crate::error::Result;

use embedder::Embedder;
use keybert::KeyBert;

/// Capacidade de transformar texto em vetor denso.
///
/// Implementações devem ser determinísticas para um mesmo modelo e seguras
/// para compartilhamento entre threads (somente leitura após a criação).
pub trait Embed: Send + Sync {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    /// Embeddings de vários textos; o resultado tem o mesmo tamanho e ordem da entrada.
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Uma keyphrase com sua relevância (similaridade cosseno com o documento).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Keyphrase {
    pub phrase: String,
    pub score: f32,
}

/// Capacidade de extrair keyphrases ranqueadas de um texto.
pub trait KeyphraseExtractor: Send + Sync {
    /// Keyphrases em ordem de relevância não-crescente.
    fn extract_keyphrases(&self, text: &str, config: &ExtractionConfig) -> Result<Vec<Keyphrase>>;
}

/// Serviço de extração com configuração fixa; é a API que o resto do sistema usa.
///
/// Imutável após criação: pode ser compartilhado via `Arc` entre o pipeline
/// batch, a sessão interativa e as threads de `spawn_blocking`.
pub struct KeywordService {
    extractor: Arc<dyn KeyphraseExtractor>,
    config: ExtractionConfig,
}

impl KeywordService {
    /// Cria o serviço com a configuração padrão de produção.
    pub fn new(extractor: Arc<dyn KeyphraseExtractor>) -> Self {
        Self::with_config(extractor, ExtractionConfig::default())
    }

    pub fn with_config(extractor: Arc<dyn KeyphraseExtractor>, config: ExtractionConfig) -> Self {
        Self { extractor, config }
    }

    /// Carrega o modelo de embeddings e monta o serviço completo.
    ///
    /// Bloqueante e caro (download + mmap dos pesos).
    pub fn load(model_id: &str) -> anyhow::Result<Self> {
        let embedder: Arc<dyn Embed> = Arc::new(Embedder::load(model_id)?);
        Ok(Self::new(Arc::new(KeyBert::new(embedder))))
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Até `top_n` keywords (5 por padrão), da mais para a menos relevante.
    ///
    /// Texto vazio → lista vazia. Falhas do modelo são propagadas como
    /// [`Error::Extraction`](crate::error::Error::Extraction); cabe ao
    /// chamador decidir se pula a linha.
    pub fn extract(&self, text: &str) -> Result<Vec<String>> {
        let mut keyphrases = self.extractor.extract_keyphrases(text, &self.config)?;
        keyphrases.sort_by(|a, b| b.score.total_cmp(&a.score));
        keyphrases.truncate(self.config.top_n);
        Ok(keyphrases.into_iter().map(|k| k.phrase).collect())
    }
}
