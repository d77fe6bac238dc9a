//! PSI-MI TAB (MITAB 2.5 / 2.7) reading and writing of calimocho rows.

use crate::formats::calimocho::{keys, Field, Row};
use crate::utils::error::{DxError, Result};
use std::io::{Read, Write};

const RESERVED: &[char] = &['|', '(', ')', ':', '\t', '"'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MitabVersion {
    V25,
    #[default]
    V27,
}

impl MitabVersion {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            MitabVersion::V25 => &keys::MITAB27[..15],
            MitabVersion::V27 => &keys::MITAB27[..],
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "2.5" | "25" | "mitab25" => Some(MitabVersion::V25),
            "2.7" | "27" | "mitab27" => Some(MitabVersion::V27),
            _ => None,
        }
    }
}

fn quote_if_needed(value: &str) -> String {
    if value.contains(RESERVED) {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

pub fn format_field(field: &Field) -> String {
    let mut out = String::new();
    match &field.db {
        Some(db) => {
            out.push_str(&quote_if_needed(db));
            out.push(':');
            out.push_str(&quote_if_needed(&field.value));
        }
        // Free text such as "Smith et al. (2010)" is written as is.
        None => out.push_str(&field.value.replace(['\t', '|'], " ")),
    }
    if let Some(text) = &field.text {
        out.push('(');
        out.push_str(&quote_if_needed(text));
        out.push(')');
    }
    out
}

pub fn format_column(fields: &[Field]) -> String {
    if fields.is_empty() {
        return "-".to_string();
    }
    fields.iter().map(format_field).collect::<Vec<_>>().join("|")
}

/// Byte offsets of `target` outside double quotes. `\"` inside quotes does not close them.
fn unquoted_positions(input: &str, target: char) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if in_quotes && c == '\\' && !escaped {
            escaped = true;
            continue;
        }
        if c == '"' && !escaped {
            in_quotes = !in_quotes;
        } else if c == target && !in_quotes {
            positions.push(i);
        }
        escaped = false;
    }
    positions
}

fn find_unquoted(input: &str, target: char) -> Option<usize> {
    unquoted_positions(input, target).first().copied()
}

fn split_unquoted(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for i in unquoted_positions(input, sep) {
        parts.push(&input[start..i]);
        start = i + sep.len_utf8();
    }
    parts.push(&input[start..]);
    parts
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value[1..value.len() - 1].replace("\\\"", "\"")
    } else {
        value.to_string()
    }
}

pub fn parse_field(raw: &str) -> Result<Field> {
    let raw = raw.trim();
    let Some(colon) = find_unquoted(raw, ':') else {
        return Ok(Field::raw(raw));
    };
    let db = unquote(&raw[..colon]);
    let rest = &raw[colon + 1..];
    let (value, text) = match find_unquoted(rest, '(') {
        Some(open) => {
            let inner = rest[open + 1..].trim_end();
            let inner = inner.strip_suffix(')').ok_or_else(|| DxError::ConversionError {
                message: format!("unbalanced parenthesis in MITAB field '{}'", raw),
            })?;
            (unquote(&rest[..open]), Some(unquote(inner)))
        }
        None => (unquote(rest), None),
    };
    Ok(Field { db: Some(db), value, text })
}

pub fn parse_column(raw: &str) -> Result<Vec<Field>> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "-" {
        return Ok(Vec::new());
    }
    split_unquoted(raw, '|')
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .map(parse_field)
        .collect()
}

pub struct MitabWriter {
    version: MitabVersion,
    header: bool,
}

impl MitabWriter {
    pub fn new(version: MitabVersion, header: bool) -> Self {
        Self { version, header }
    }

    pub fn header_line(&self) -> String {
        let mut columns: Vec<String> = self.version.columns().iter().map(|c| c.to_string()).collect();
        if let Some(first) = columns.first_mut() {
            first.insert(0, '#');
        }
        columns.join("\t")
    }

    pub fn write<W: Write>(&self, out: W, rows: &[Row]) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .has_headers(false)
            .from_writer(out);

        if self.header {
            let header: Vec<String> = self.header_line().split('\t').map(str::to_string).collect();
            writer.write_record(&header)?;
        }
        for row in rows {
            let record: Vec<String> = self
                .version
                .columns()
                .iter()
                .map(|key| format_column(row.get(key)))
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_string(&self, rows: &[Row]) -> Result<String> {
        let mut buffer = Vec::new();
        self.write(&mut buffer, rows)?;
        String::from_utf8(buffer).map_err(|e| DxError::ConversionError {
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Default)]
pub struct MitabReader;

impl MitabReader {
    pub fn new() -> Self {
        Self
    }

    /// Reads rows, detecting 2.5 or 2.7 from the column count. Lines starting with `#` are skipped.
    pub fn read<R: Read>(&self, input: R) -> Result<Vec<Row>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quoting(false)
            .comment(Some(b'#'))
            .flexible(true)
            .from_reader(input);

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let version = match record.len() {
                n if n >= 42 => MitabVersion::V27,
                n if n >= 15 => MitabVersion::V25,
                n => {
                    return Err(DxError::ConversionError {
                        message: format!("line {} has {} columns, expected 15 or 42", line + 1, n),
                    })
                }
            };
            let mut row = Row::new();
            for (key, raw) in version.columns().iter().zip(record.iter()) {
                row.set(key, parse_column(raw)?);
            }
            rows.push(row);
        }
        tracing::debug!("Read {} MITAB rows", rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_quotes_reserved_values() {
        let field = Field::new("psi-mi", "MI:0018", Some("two hybrid"));
        assert_eq!(format_field(&field), "psi-mi:\"MI:0018\"(two hybrid)");
        assert_eq!(format_field(&Field::new("uniprotkb", "P12345", None)), "uniprotkb:P12345");
        assert_eq!(format_field(&Field::raw("Smith et al. (2010)")), "Smith et al. (2010)");
        assert_eq!(format_column(&[]), "-");
    }

    #[test]
    fn test_parse_field_variants() {
        assert_eq!(
            parse_field("psi-mi:\"MI:0018\"(two hybrid)").unwrap(),
            Field::new("psi-mi", "MI:0018", Some("two hybrid"))
        );
        assert_eq!(
            parse_field("taxid:9606(human)").unwrap(),
            Field::new("taxid", "9606", Some("human"))
        );
        assert_eq!(parse_field("Smith et al. (2010)").unwrap(), Field::raw("Smith et al. (2010)"));
        assert!(parse_field("psi-mi:x(unclosed").is_err());
    }

    #[test]
    fn test_parse_column_splits_outside_quotes() {
        let fields = parse_column("pubmed:123|imex:IM-1|psi-mi:\"a|b\"").unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[2].value, "a|b");
        assert!(parse_column("-").unwrap().is_empty());
    }

    #[test]
    fn test_write_then_read_rows() {
        let mut row = Row::new();
        row.push(keys::ID_A, Field::new("uniprotkb", "P12345", None));
        row.push(keys::ID_B, Field::new("uniprotkb", "Q99999", None));
        row.push(keys::DETMETHOD, Field::new("psi-mi", "MI:0018", Some("two hybrid")));
        row.push(keys::PUBAUTH, Field::raw("Smith et al. (2010)"));
        row.push(keys::INTERACTION_ID, Field::new("intact", "EBI-1", None));

        for version in [MitabVersion::V25, MitabVersion::V27] {
            let text = MitabWriter::new(version, true).to_string(&[row.clone()]).unwrap();
            let lines: Vec<&str> = text.lines().collect();
            assert_eq!(lines.len(), 2);
            assert!(lines[0].starts_with("#idA\tidB"));
            assert_eq!(lines[1].split('\t').count(), version.columns().len());

            let parsed = MitabReader::new().read(text.as_bytes()).unwrap();
            assert_eq!(parsed, vec![row.clone()]);
        }
    }

    #[test]
    fn test_short_lines_are_rejected() {
        let err = MitabReader::new().read("a\tb\tc\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DxError::ConversionError { .. }));
    }
}
