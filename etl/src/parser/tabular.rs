//! Delimited file reader with encoding and delimiter auto-detection.
//!
//! Bytes that are valid UTF-8 are used as is. Anything else is decoded with a
//! single-byte encoding guessed by `chardet`, falling back to Windows-1252, so
//! decoding never fails on odd bytes.

use std::path::Path;

use serde_json::Value;

use super::{ParsedSource, SourceInfo};
use crate::error::{SourceError, SourceResult};
use crate::models::Table;
use crate::transform::operations::parse_number;

/// Cell texts read as null, as dataframe readers do by default.
const NULL_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Detect the encoding of raw bytes.
///
/// Returns `utf-8` for valid UTF-8, otherwise a single-byte encoding label.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let charset = chardet::detect(bytes).0;

    // Only single-byte guesses are trusted for non-UTF-8 input
    match charset.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "iso-8859-15" => "iso-8859-15".to_string(),
        "iso-8859-2" => "iso-8859-2".to_string(),
        "windows-1250" => "windows-1250".to_string(),
        _ => "windows-1252".to_string(),
    }
}

/// Decode bytes with the given encoding label. Unknown labels decode as
/// Windows-1252. A byte order mark is removed.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let encoding = encoding_rs::Encoding::for_label(encoding.as_bytes())
        .unwrap_or(encoding_rs::WINDOWS_1252);
    let (decoded, _, _) = encoding.decode(bytes);
    decoded.into_owned()
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// True for cell texts read as null.
pub fn is_null_marker(raw: &str) -> bool {
    NULL_MARKERS.contains(&raw.trim())
}

/// Type one column from its raw texts, the way dataframe readers do: null
/// markers become null, and the column is numeric only when every other cell
/// parses as a number. Otherwise all non-null cells stay text.
pub fn infer_column(raw: &[&str]) -> Vec<Value> {
    let numbers: Option<Vec<Value>> = raw
        .iter()
        .map(|cell| {
            if is_null_marker(cell) {
                Some(Value::Null)
            } else {
                parse_number(cell)
            }
        })
        .collect();

    numbers.unwrap_or_else(|| {
        raw.iter()
            .map(|cell| {
                if is_null_marker(cell) {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                }
            })
            .collect()
    })
}

/// Read a delimited file from disk.
pub fn read_tabular<P: AsRef<Path>>(path: P, delimiter: Option<char>) -> SourceResult<ParsedSource> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut parsed = parse_tabular_bytes(&bytes, delimiter)?;
    parsed.info.path = Some(path.to_path_buf());
    Ok(parsed)
}

/// Parse delimited bytes, auto-detecting whatever is not given.
pub fn parse_tabular_bytes(bytes: &[u8], delimiter: Option<char>) -> SourceResult<ParsedSource> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);

    if content.trim().is_empty() {
        return Err(SourceError::Empty);
    }

    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));
    let table = parse_table(&content, delimiter)?;

    let info = SourceInfo {
        path: None,
        encoding,
        delimiter: Some(delimiter),
        headers: table.columns().to_vec(),
        row_count: table.len(),
    };

    Ok(ParsedSource { table, info })
}

fn parse_table(content: &str, delimiter: char) -> SourceResult<Table> {
    let delimiter = u8::try_from(delimiter).map_err(|_| SourceError::Csv {
        line: 1,
        message: format!("delimiter '{}' is not a single byte", delimiter),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(SourceError::NoHeaders);
    }

    let width = headers.len();
    let records = reader
        .records()
        .collect::<Result<Vec<csv::StringRecord>, csv::Error>>()?;

    let typed_columns: Vec<Vec<Value>> = (0..width)
        .map(|col| {
            let raw: Vec<&str> = records.iter().map(|r| r.get(col).unwrap_or("")).collect();
            infer_column(&raw)
        })
        .collect();

    let rows = (0..records.len())
        .map(|row| typed_columns.iter().map(|column| column[row].clone()).collect())
        .collect();

    Ok(Table::from_rows(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    const STEAM_CHARTS: &str = "gamename,year,month,avg,gain,peak,avg_peak_perc\n\
        Counter-Strike: Global Offensive,2021,February,741013.24,-2196.42,1123485,65.9567%\n\
        Counter-Strike: Global Offensive,2012,July,,,,\n\
        \"Warhammer 40,000: Dawn of War\",2020,May,1234.5,,2890,42.7162%\n";

    #[test]
    fn test_parse_steam_charts() {
        let parsed = parse_tabular_bytes(STEAM_CHARTS.as_bytes(), None).unwrap();
        let table = parsed.table;

        assert_eq!(parsed.info.delimiter, Some(','));
        assert_eq!(parsed.info.encoding, "utf-8");
        assert_eq!(table.columns()[0], "gamename");
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0, "year"), Some(&json!(2021)));
        assert_eq!(table.get(0, "avg"), Some(&json!(741013.24)));
        assert_eq!(table.get(0, "gain"), Some(&json!(-2196.42)));
        assert_eq!(table.get(0, "avg_peak_perc"), Some(&json!("65.9567%")));
        assert_eq!(table.get(1, "gain"), Some(&Value::Null));
    }

    #[test]
    fn test_quoted_delimiter_inside_field() {
        let parsed = parse_tabular_bytes(STEAM_CHARTS.as_bytes(), None).unwrap();
        assert_eq!(
            parsed.table.get(2, "gamename"),
            Some(&json!("Warhammer 40,000: Dawn of War"))
        );
        assert_eq!(parsed.table.get(2, "peak"), Some(&json!(2890)));
    }

    #[test]
    fn test_short_rows_padded_with_null() {
        let parsed = parse_tabular_bytes(b"a,b,c\n1,2\n", None).unwrap();
        assert_eq!(parsed.table.rows()[0], vec![json!(1), json!(2), Value::Null]);
    }

    #[test]
    fn test_extra_columns_ignored() {
        let parsed = parse_tabular_bytes(b"a,b\n1,2,3,4\n", None).unwrap();
        assert_eq!(parsed.table.rows()[0], vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse_tabular_bytes(b"", None), Err(SourceError::Empty)));
        assert!(matches!(parse_tabular_bytes(b"  \n\n", None), Err(SourceError::Empty)));
    }

    #[test]
    fn test_null_markers() {
        assert!(is_null_marker("NaN"));
        assert!(is_null_marker(" "));
        assert!(is_null_marker("N/A"));
        assert!(!is_null_marker("0"));
        assert!(!is_null_marker("Portal 2"));
    }

    #[test]
    fn test_infer_numeric_column() {
        assert_eq!(
            infer_column(&["12", "", "-3.5"]),
            vec![json!(12), Value::Null, json!(-3.5)]
        );
    }

    #[test]
    fn test_infer_mixed_column_stays_text() {
        assert_eq!(
            infer_column(&["2048", "Portal 2", "NaN"]),
            vec![json!("2048"), json!("Portal 2"), Value::Null]
        );
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_explicit_delimiter_wins() {
        let parsed = parse_tabular_bytes(b"a;b\n1,5;2\n", Some(';')).unwrap();
        assert_eq!(parsed.table.get(0, "a"), Some(&json!("1,5")));
    }

    #[test]
    fn test_non_utf8_falls_back_to_single_byte() {
        // "Pokémon" with é as 0xE9 (Latin-1 / Windows-1252)
        let mut bytes = b"gamename,year\nPok".to_vec();
        bytes.extend_from_slice(&[0xE9]);
        bytes.extend_from_slice(b"mon,2020\n");

        let parsed = parse_tabular_bytes(&bytes, None).unwrap();
        assert_ne!(parsed.info.encoding, "utf-8");
        assert_eq!(parsed.table.get(0, "gamename"), Some(&json!("Pokémon")));
    }

    #[test]
    fn test_utf8_bom_removed() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"gamename,year\nDota 2,2019\n");
        let parsed = parse_tabular_bytes(&bytes, None).unwrap();
        assert_eq!(parsed.table.columns()[0], "gamename");
    }

    #[test]
    fn test_read_tabular_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(STEAM_CHARTS.as_bytes()).unwrap();

        let parsed = read_tabular(file.path(), None).unwrap();
        assert_eq!(parsed.info.path.as_deref(), Some(file.path()));
        assert_eq!(parsed.info.row_count, 3);
    }

    #[test]
    fn test_read_tabular_missing_file() {
        let err = read_tabular("/definitely/not/here.csv", None).unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here.csv"));
    }
}
