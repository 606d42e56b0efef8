//! Deterministic CSV encoding.
//!
//! # Invariants
//! - Output is one header row plus one row per record, joined by `\n`,
//!   with no trailing newline.
//! - A value containing the delimiter, a quote or a line break is wrapped
//!   in quotes with internal quotes doubled; any other value is emitted as is.
//! - Only `;` and `,` are accepted as delimiters.

use crate::model::intervention::{Field, Intervention};
use log::info;
use std::borrow::Cow;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub const DEFAULT_EXPORT_FILE_NAME: &str = "interventions.csv";
pub const DEFAULT_DELIMITER: char = ';';
const SUPPORTED_DELIMITERS: [char; 2] = [';', ','];
const QUOTE: char = '"';

#[derive(Debug)]
pub enum CsvError {
    UnsupportedDelimiter(char),
    Io(std::io::Error),
}

impl Display for CsvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedDelimiter(delimiter) => {
                write!(f, "unsupported CSV delimiter `{delimiter}`; expected `;` or `,`")
            }
            Self::Io(err) => write!(f, "failed to write CSV file: {err}"),
        }
    }
}

impl Error for CsvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::UnsupportedDelimiter(_) => None,
        }
    }
}

impl From<std::io::Error> for CsvError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Column order and delimiter for one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    delimiter: char,
    fields: Vec<Field>,
}

impl CsvOptions {
    pub fn new(delimiter: char, fields: Vec<Field>) -> Result<Self, CsvError> {
        if !SUPPORTED_DELIMITERS.contains(&delimiter) {
            return Err(CsvError::UnsupportedDelimiter(delimiter));
        }
        Ok(Self { delimiter, fields })
    }

    pub fn with_delimiter(self, delimiter: char) -> Result<Self, CsvError> {
        Self::new(delimiter, self.fields)
    }

    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = fields;
        self
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            fields: Field::ALL.to_vec(),
        }
    }
}

/// Quotes `value` only when it would otherwise break the row.
pub fn escape_field(value: &str, delimiter: char) -> Cow<'_, str> {
    let needs_quotes = value
        .chars()
        .any(|c| c == delimiter || c == QUOTE || c == '\n' || c == '\r');
    if !needs_quotes {
        return Cow::Borrowed(value);
    }
    Cow::Owned(format!("\"{}\"", value.replace(QUOTE, "\"\"")))
}

/// Encodes `records` in iteration order.
pub fn export<'a, I>(records: I, options: &CsvOptions) -> String
where
    I: IntoIterator<Item = &'a Intervention>,
{
    let delimiter = options.delimiter.to_string();
    let header = options
        .fields
        .iter()
        .map(|field| escape_field(field.label(), options.delimiter))
        .collect::<Vec<_>>()
        .join(delimiter.as_str());

    let mut rows = vec![header];
    rows.extend(records.into_iter().map(|record| {
        options
            .fields
            .iter()
            .map(|field| escape_field(record.value(*field), options.delimiter))
            .collect::<Vec<_>>()
            .join(delimiter.as_str())
    }));
    rows.join("\n")
}

/// Writes the export to `path` as UTF-8.
pub fn write_csv_file<'a, I>(
    path: impl AsRef<Path>,
    records: I,
    options: &CsvOptions,
) -> Result<usize, CsvError>
where
    I: IntoIterator<Item = &'a Intervention>,
{
    let records = records.into_iter().collect::<Vec<_>>();
    let content = export(records.iter().copied(), options);
    std::fs::write(path.as_ref(), content.as_bytes())?;
    let row_count = records.len();
    info!(
        "event=csv_export module=export status=ok rows={row_count} bytes={}",
        content.len()
    );
    Ok(row_count)
}

#[cfg(test)]
mod tests {
    use super::{escape_field, export, CsvError, CsvOptions};
    use crate::model::intervention::{Field, Intervention, InterventionDraft};

    #[test]
    fn escape_leaves_plain_values_untouched() {
        assert_eq!(escape_field("PC200", ';'), "PC200");
        assert_eq!(escape_field("a,b", ';'), "a,b");
    }

    #[test]
    fn escape_quotes_delimiter_quote_and_newline() {
        assert_eq!(escape_field("a;b", ';'), "\"a;b\"");
        assert_eq!(escape_field("say \"hi\"", ';'), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("line1\nline2", ','), "\"line1\nline2\"");
    }

    #[test]
    fn empty_collection_exports_header_only() {
        let output = export(&Vec::<Intervention>::new(), &CsvOptions::default());
        assert_eq!(
            output,
            "Date;Marque;Modèle;N° Série;Horamètre;Panne;Résolution;Commentaire"
        );
    }

    #[test]
    fn rows_follow_field_order() {
        let record = Intervention::from_draft(
            "1",
            InterventionDraft::new()
                .with_field(Field::Brand, "Komatsu")
                .with_field(Field::Model, "PC200")
                .with_field(Field::Fault, "oil leak"),
        );
        let options = CsvOptions::new(',', vec![Field::Fault, Field::Brand]).unwrap();
        assert_eq!(export([&record], &options), "Panne,Marque\noil leak,Komatsu");
    }

    #[test]
    fn rejects_unsupported_delimiter() {
        assert!(matches!(
            CsvOptions::new('|', Field::ALL.to_vec()),
            Err(CsvError::UnsupportedDelimiter('|'))
        ));
    }
}
