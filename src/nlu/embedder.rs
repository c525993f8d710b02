//! # Embedder MiniLM — Gerador de Representações Vetoriais
//!
//! O [`Embedder`] encapsula o modelo **all-MiniLM-L6-v2**
//! (`sentence-transformers/all-MiniLM-L6-v2`), um BERT compacto de 6 camadas
//! treinado para similaridade de sentenças em inglês. É o mesmo modelo que
//! o KeyBERT usa por padrão.
//!
//! ## Pipeline de Embedding
//!
//! ```text
//! Texto → Tokenizer → Token IDs → BERT Forward Pass → Mean Pooling → L2 Normalize
//!                                                          ↓
//!                                                    Vec<f32> (384-dim)
//! ```
//!
//! ## Carregamento do Modelo
//!
//! Baixado do HuggingFace Hub na primeira execução (~90 MB) e cacheado em
//! `~/.cache/huggingface/`. Estratégia de fallback:
//!
//! | Componente | Preferido | Fallback |
//! |-----------|-----------|----------|
//! | Tokenizer | `tokenizer.json` | `vocab.txt` (WordPiece) |
//! | Pesos | `model.safetensors` | `pytorch_model.bin` |
//! | Device | CPU | — |
//!
//! O modelo é caro de construir e barato de reutilizar: cada processo cria
//! um único `Embedder` e o compartilha via `Arc<dyn Embed>`.

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert;
use hf_hub::api::sync::Api;
use tokenizers::{Tokenizer, TruncationParams};

use super::Embed;

/// Comprimento máximo de sequência usado pelo sentence-transformers para este modelo.
const MAX_SEQ_LEN: usize = 256;

/// Embedder de sentenças: modelo BERT, tokenizer e device (CPU).
pub struct Embedder {
    model: bert::BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl Embedder {
    /// Carrega o modelo `repo_id` do HuggingFace Hub.
    ///
    /// Operação pesada (download, leitura de pesos, alocação): no dashboard é
    /// chamada em `spawn_blocking`, no CLI antes do início do lote.
    ///
    /// # Erros
    ///
    /// Retorna erro se o Hub estiver inacessível, os arquivos estiverem
    /// corrompidos ou a config não for de um modelo BERT.
    pub fn load(repo_id: &str) -> Result<Self> {
        let device = Device::Cpu;
        tracing::info!(model = repo_id, "Loading sentence embedding model from HuggingFace Hub...");

        let api = Api::new().context("Failed to create HF Hub API")?;
        let repo = api.model(repo_id.to_string());

        // ─── Tokenizer ────────────────────────────────────────────
        let config_path = repo
            .get("config.json")
            .context("Failed to download config.json")?;
        let mut tokenizer = match repo.get("tokenizer.json") {
            Ok(tokenizer_path) => {
                tracing::info!("Loading tokenizer from tokenizer.json...");
                Tokenizer::from_file(&tokenizer_path).map_err(|e| anyhow::anyhow!("{}", e))?
            }
            Err(_) => {
                tracing::info!("tokenizer.json not available, building WordPiece from vocab.txt...");
                let vocab_path = repo
                    .get("vocab.txt")
                    .context("Failed to download vocab.txt")?;
                Self::build_bert_tokenizer(
                    vocab_path
                        .to_str()
                        .context("Invalid vocab.txt path encoding")?,
                )?
            }
        };
        // Sem padding por texto; o batch faz padding manual com attention mask.
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        // ─── Config do modelo ─────────────────────────────────────
        let config_str = std::fs::read_to_string(&config_path)?;
        let config: bert::Config =
            serde_json::from_str(&config_str).context("Failed to parse model config")?;

        // ─── Pesos do modelo ──────────────────────────────────────
        let vb = match repo.get("model.safetensors") {
            Ok(safetensors_path) => {
                tracing::info!("Loading from model.safetensors...");
                // SAFETY: o arquivo vem do cache do Hub e não é modificado
                // enquanto o mmap estiver ativo.
                unsafe {
                    VarBuilder::from_mmaped_safetensors(&[safetensors_path], DType::F32, &device)
                        .context("Failed to load safetensors weights")?
                }
            }
            Err(_) => {
                tracing::info!("Falling back to pytorch_model.bin...");
                let weights_path = repo
                    .get("pytorch_model.bin")
                    .context("Failed to download pytorch_model.bin")?;
                VarBuilder::from_pth(&weights_path, DType::F32, &device)
                    .context("Failed to load pytorch weights")?
            }
        };

        let model = bert::BertModel::load(vb, &config).context("Failed to load BERT model")?;

        tracing::info!(model = repo_id, device = ?device, "Embedding model loaded");
        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    /// Tokenizer WordPiece a partir de `vocab.txt`, para repositórios sem
    /// `tokenizer.json`. MiniLM é uncased, então `lowercase = true`.
    fn build_bert_tokenizer(vocab_path: &str) -> Result<Tokenizer> {
        use tokenizers::models::wordpiece::WordPiece;
        use tokenizers::normalizers::BertNormalizer;
        use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
        use tokenizers::processors::bert::BertProcessing;

        let wordpiece = WordPiece::from_file(vocab_path)
            .unk_token("[UNK]".to_string())
            .build()
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        let mut tokenizer = Tokenizer::new(wordpiece);
        tokenizer.with_normalizer(Some(BertNormalizer::new(true, true, None, true)));
        tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));
        tokenizer.with_post_processor(Some(BertProcessing::new(
            ("[SEP]".to_string(), 102),
            ("[CLS]".to_string(), 101),
        )));

        Ok(tokenizer)
    }

    /// Mean pooling ponderado pela attention mask seguido de normalização L2.
    ///
    /// `output`: `[batch, seq_len, hidden]`, `attention_mask`: `[batch, seq_len]`.
    fn pool_and_normalize(output: Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let mask_expanded = attention_mask
            .unsqueeze(2)?
            .to_dtype(DType::F32)?
            .broadcast_as(output.shape())?;

        let masked = (output * mask_expanded.clone())?;
        let summed = masked.sum(1)?;
        let mask_sum = mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;
        let pooled = (summed / mask_sum)?;

        let norm = pooled.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::MAX)?;
        Ok(pooled.broadcast_div(&norm)?)
    }
}

impl Embed for Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenizer error: {}", e))?;

        let ids = encoding.get_ids();
        let attention_mask_vec: Vec<u32> = encoding.get_attention_mask().to_vec();
        let token_type_ids_vec: Vec<u32> = vec![0u32; ids.len()];

        let input_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(&token_type_ids_vec[..], &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(&attention_mask_vec[..], &self.device)?.unsqueeze(0)?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let normalized = Self::pool_and_normalize(output, &attention_mask)?;

        Ok(normalized.squeeze(0)?.to_vec1()?)
    }

    /// Um único forward pass para todos os textos, com padding até o maior.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.len() == 1 {
            return Ok(vec![self.embed(&texts[0])?]);
        }

        let encodings: Vec<_> = texts
            .iter()
            .map(|t| {
                self.tokenizer
                    .encode(t.as_str(), true)
                    .map_err(|e| anyhow::anyhow!("Tokenizer error: {}", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);
        let batch_size = encodings.len();
        let mut all_ids = vec![0u32; batch_size * max_len];
        let all_type_ids = vec![0u32; batch_size * max_len];
        let mut all_mask = vec![0u32; batch_size * max_len];

        for (i, enc) in encodings.iter().enumerate() {
            let offset = i * max_len;
            for (j, (&id, &mask)) in enc
                .get_ids()
                .iter()
                .zip(enc.get_attention_mask())
                .enumerate()
            {
                all_ids[offset + j] = id;
                all_mask[offset + j] = mask;
            }
        }

        let input_ids = Tensor::from_vec(all_ids, (batch_size, max_len), &self.device)?;
        let token_type_ids = Tensor::from_vec(all_type_ids, (batch_size, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(all_mask, (batch_size, max_len), &self.device)?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let normalized = Self::pool_and_normalize(output, &attention_mask)?;

        let mut results = Vec::with_capacity(batch_size);
        for i in 0..batch_size {
            results.push(normalized.get(i)?.to_vec1()?);
        }
        Ok(results)
    }
}
