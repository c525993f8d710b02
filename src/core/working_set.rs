//! # WorkingSet — Mensagens de Cliente Prontas para Extração
//!
//! [`WorkingSet::build()`] é a fronteira de validação: recebe a [`RawTable`]
//! crua e devolve registros tipados, ou [`Error::Schema`] sem processar nada.
//!
//! ## Pipeline de Pré-processamento
//!
//! ```text
//! RawTable
//!   ├── 1. Schema: exige chat_id, role, message (ordem livre, extras ignorados)
//!   ├── 2. Filtro: role.to_lowercase() == "customer"
//!   ├── 3. Nulos: linhas sem message são excluídas
//!   ├── 4. Dedup: message idêntica a uma anterior é descartada (primeira vence)
//!   └── 5. Índices densos 0..n
//! ```
//!
//! ## Política para `message` nula
//!
//! Células vazias ou ausentes em `message` são **excluídas** antes da
//! deduplicação, pois não há texto para extrair. Elas aparecem em
//! [`BuildStats::missing_message`] para que a contagem seja auditável.

use std::collections::HashSet;

use serde::Serialize;

use super::record::ChatRecord;
use super::table::RawTable;
use crate::config::REQUIRED_COLUMNS;
use crate::error::{Error, Result};

/// Role aceita pelo filtro (comparação em minúsculas).
const CUSTOMER_ROLE: &str = "customer";

/// Contadores do pré-processamento, para logs e para a UI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Linhas de dados na tabela de entrada.
    pub input_rows: usize,
    /// Linhas cujo role é "customer".
    pub customer_rows: usize,
    /// Linhas de cliente descartadas por não terem mensagem.
    pub missing_message: usize,
    /// Linhas de cliente descartadas por repetirem uma mensagem anterior.
    pub duplicates_removed: usize,
}

/// Sequência ordenada de mensagens de cliente únicas.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WorkingSet {
    records: Vec<ChatRecord>,
    stats: BuildStats,
}

impl WorkingSet {
    /// Valida o schema e aplica filtro, dedup e reindexação.
    ///
    /// # Erros
    ///
    /// [`Error::Schema`] se faltar alguma coluna obrigatória. Uma tabela que
    /// fica vazia após o filtro **não** é erro.
    pub fn build(table: &RawTable) -> Result<Self> {
        let [chat_id_col, role_col, message_col] =
            REQUIRED_COLUMNS.map(|name| table.column_index(name));
        let (Some(chat_id_col), Some(role_col), Some(message_col)) =
            (chat_id_col, role_col, message_col)
        else {
            let missing = REQUIRED_COLUMNS
                .iter()
                .filter(|name| table.column_index(name).is_none())
                .map(|name| name.to_string())
                .collect();
            return Err(Error::Schema { missing });
        };

        let mut stats = BuildStats {
            input_rows: table.len(),
            ..Default::default()
        };
        let mut seen: HashSet<&str> = HashSet::new();
        let mut records = Vec::new();

        for row in 0..table.len() {
            let Some(role) = table.cell(row, role_col) else {
                continue;
            };
            if role.to_lowercase() != CUSTOMER_ROLE {
                continue;
            }
            stats.customer_rows += 1;

            let Some(message) = table.cell(row, message_col) else {
                stats.missing_message += 1;
                continue;
            };
            if !seen.insert(message) {
                stats.duplicates_removed += 1;
                continue;
            }

            records.push(ChatRecord {
                index: records.len(),
                chat_id: table.cell(row, chat_id_col).unwrap_or_default().to_string(),
                role: role.to_string(),
                message: message.to_string(),
            });
        }

        tracing::debug!(
            input_rows = stats.input_rows,
            customer_rows = stats.customer_rows,
            duplicates = stats.duplicates_removed,
            missing_message = stats.missing_message,
            kept = records.len(),
            "WorkingSet construído"
        );

        Ok(Self { records, stats })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ChatRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChatRecord> {
        self.records.iter()
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }
}

impl<'a> IntoIterator for &'a WorkingSet {
    type Item = &'a ChatRecord;
    type IntoIter = std::slice::Iter<'a, ChatRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
