//! # Dataset — Leitura e Escrita de CSV
//!
//! Fronteira de I/O do sistema, usada tanto pelo pipeline batch quanto
//! pelo dashboard:
//!
//! - [`read_table()`] / [`read_table_from_path()`] — CSV com cabeçalho → [`RawTable`]
//! - [`write_results()`] / [`results_to_csv()`] — `Vec<KeywordResult>` → CSV
//!
//! ## Formato de Saída
//!
//! ```text
//! chat_id,message,keywords_str
//! 1,Where is my order?,"order, track order"
//! ```
//!
//! UTF-8, cabeçalho sempre presente, uma linha por resultado na ordem do
//! WorkingSet, quebras de linha `\n`, aspas apenas quando necessário. Como
//! batch e dashboard usam o mesmo writer, a mesma entrada gera bytes
//! idênticos nos dois caminhos.
//!
//! O diretório de saída **não** é criado aqui: se não existir, a escrita falha
//! com [`Error::Io`].

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::config::OUTPUT_HEADERS;
use crate::core::{KeywordResult, RawTable};
use crate::error::{Error, Result};

/// Lê um CSV com cabeçalho de qualquer `Read` (arquivo ou upload em memória).
///
/// Linhas com número de campos diferente do cabeçalho são aceitas; campos
/// faltantes viram nulos em [`RawTable::cell()`].
pub fn read_table<R: Read>(reader: R) -> Result<RawTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable::new(headers, rows))
}

/// Lê o CSV em `path`. Arquivo inexistente ou ilegível → [`Error::Io`].
pub fn read_table_from_path(path: &Path) -> Result<RawTable> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let table = read_table(file)?;
    tracing::info!(path = %path.display(), rows = table.len(), "CSV carregado");
    Ok(table)
}

/// Serializa os resultados como CSV em qualquer `Write`.
pub fn write_results_to<W: Write>(writer: W, results: &[KeywordResult]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv_writer.write_record(OUTPUT_HEADERS)?;
    for result in results {
        let keywords = result.keywords_str();
        csv_writer.write_record([
            result.chat_id.as_str(),
            result.message.as_str(),
            keywords.as_str(),
        ])?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Resultados como bytes CSV (usado pelo download do dashboard).
pub fn results_to_csv(results: &[KeywordResult]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_results_to(&mut buf, results)?;
    Ok(buf)
}

/// Grava os resultados em `path`, sobrescrevendo o arquivo.
///
/// # Erros
///
/// [`Error::Io`] se o diretório não existir ou o arquivo não puder ser criado.
pub fn write_results(path: &Path, results: &[KeywordResult]) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    write_results_to(file, results)?;
    tracing::info!(path = %path.display(), rows = results.len(), "Resultados salvos");
    Ok(())
}

/// Garante que o arquivo de saída poderá ser criado: o diretório pai precisa existir.
///
/// Chamado antes da extração para falhar cedo, sem gastar o lote inteiro.
pub fn ensure_output_dir(path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return Ok(()),
    };
    if parent.is_dir() {
        Ok(())
    } else {
        Err(Error::io(
            parent,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "output directory does not exist",
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChatRecord;

    fn result(chat_id: &str, message: &str, keywords: &[&str]) -> KeywordResult {
        let record = ChatRecord {
            index: 0,
            chat_id: chat_id.into(),
            role: "customer".into(),
            message: message.into(),
        };
        KeywordResult::new(&record, keywords.iter().map(|k| k.to_string()).collect())
    }

    #[test]
    fn reads_headers_and_rows() {
        let data = "chat_id,role,message\n1,customer,\"Hello, is anyone there?\"\n2,agent,Yes\n";
        let table = read_table(data.as_bytes()).unwrap();
        assert_eq!(table.headers(), &["chat_id", "role", "message"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 2), Some("Hello, is anyone there?"));
    }

    #[test]
    fn tolerates_ragged_rows() {
        let data = "chat_id,role,message\n1,customer\n";
        let table = read_table(data.as_bytes()).unwrap();
        assert_eq!(table.cell(0, 1), Some("customer"));
        assert_eq!(table.cell(0, 2), None);
    }

    #[test]
    fn invalid_utf8_is_a_csv_error() {
        let data: &[u8] = b"chat_id,role,message\n1,customer,\xff\xfe\n";
        assert!(matches!(read_table(data), Err(Error::Csv(_))));
    }

    #[test]
    fn writes_expected_header_and_joined_keywords() {
        let results = vec![
            result("1", "Where is my order?", &["order", "track order"]),
            result("3", "I want a refund", &[]),
        ];
        let bytes = results_to_csv(&results).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "chat_id,message,keywords_str\n\
             1,Where is my order?,\"order, track order\"\n\
             3,I want a refund,\n"
        );
    }

    #[test]
    fn missing_input_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_table_from_path(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn output_dir_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ensure_output_dir(&dir.path().join("out.csv")).is_ok());
        assert!(ensure_output_dir(Path::new("out.csv")).is_ok());
        let missing = dir.path().join("missing").join("out.csv");
        assert!(matches!(ensure_output_dir(&missing), Err(Error::Io { .. })));
        assert!(matches!(write_results(&missing, &[]), Err(Error::Io { .. })));
    }

    #[test]
    fn written_file_round_trips_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cleaned_keywords.csv");
        write_results(&path, &[result("5", "multi\nline \"quoted\"", &["quoted"])]).unwrap();
        let table = read_table_from_path(&path).unwrap();
        assert_eq!(table.headers(), &["chat_id", "message", "keywords_str"]);
        assert_eq!(table.cell(0, 1), Some("multi\nline \"quoted\""));
        assert_eq!(table.cell(0, 2), Some("quoted"));
    }
}
