//! # RawTable — O CSV Antes da Validação
//!
//! Único valor de formato dinâmico do sistema: nomes de colunas e células
//! como strings, exatamente como vieram do arquivo. Só é consumido por
//! [`WorkingSet::build()`](super::WorkingSet::build), que valida o schema e
//! converte as linhas em [`ChatRecord`](super::ChatRecord) tipados.

/// BOM UTF-8 que alguns editores (Excel) colocam no início do arquivo.
const UTF8_BOM: char = '\u{feff}';

/// Tabela crua lida de um CSV com cabeçalho.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Cria a tabela, removendo um BOM remanescente do primeiro cabeçalho.
    pub fn new(mut headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        if let Some(first) = headers.first_mut() {
            if let Some(stripped) = first.strip_prefix(UTF8_BOM) {
                *first = stripped.to_string();
            }
        }
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Número de linhas de dados (sem o cabeçalho).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Posição da primeira coluna com o nome exato `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Célula `(row, col)`. Campos ausentes (linha curta) e vazios são `None`,
    /// o equivalente a um valor nulo na tabela.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn bom_is_stripped_from_first_header() {
        let table = RawTable::new(strings(&["\u{feff}chat_id", "role"]), vec![]);
        assert_eq!(table.column_index("chat_id"), Some(0));
    }

    #[test]
    fn short_rows_and_empty_fields_read_as_null() {
        let table = RawTable::new(
            strings(&["a", "b", "c"]),
            vec![strings(&["1", ""]), strings(&["2", "x", "y"])],
        );
        assert_eq!(table.cell(0, 0), Some("1"));
        assert_eq!(table.cell(0, 1), None);
        assert_eq!(table.cell(0, 2), None);
        assert_eq!(table.cell(1, 2), Some("y"));
        assert_eq!(table.cell(5, 0), None);
    }
}
