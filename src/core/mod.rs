//! # Módulo Core — Tipos Fundamentais do Domínio
//!
//! Tudo no extrator gira em torno destes tipos:
//!
//! - [`RawTable`] — o CSV cru, antes de qualquer validação
//! - [`WorkingSet`] — mensagens de cliente únicas, prontas para extração
//! - [`ChatRecord`] — uma mensagem validada
//! - [`KeywordResult`] — as keywords extraídas de uma mensagem
//!
//! ## Fluxo dos Dados
//!
//! ```text
//! CSV ──► RawTable ──WorkingSet::build()──► WorkingSet ──extração──► Vec<KeywordResult>
//!          (dinâmico)     (validação)        (tipado)
//! ```

/// Sub-módulo com [`RawTable`] — tabela crua lida do CSV.
pub mod table;

/// Sub-módulo com [`ChatRecord`] e [`KeywordResult`].
pub mod record;

/// Sub-módulo com [`WorkingSet`] — filtro, dedup e reindexação.
pub mod working_set;

pub use record::{ChatRecord, KeywordResult};
pub use table::RawTable;
pub use working_set::{BuildStats, WorkingSet};
