//! CSV conversion of query results and writing `.csv` files.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::db::QueryResult;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to encode CSV")]
    Csv(#[from] csv::Error),
    #[error("failed to flush CSV output")]
    Flush(#[source] std::io::Error),
    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("no column named `{0}` to map")]
    UnknownField(String),
    #[error("invalid export file name {0:?}")]
    InvalidFilename(String),
    #[error("failed to write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How one source column appears in the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub original_name: String,
    pub output_name: String,
    pub included: bool,
}

impl FieldMapping {
    /// Include `name` under its own name.
    pub fn identity(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            output_name: name.clone(),
            original_name: name,
            included: true,
        }
    }
}

/// Identity mappings for every column, in order.
pub fn mappings_for<I, S>(columns: I) -> Vec<FieldMapping>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    columns.into_iter().map(FieldMapping::identity).collect()
}

/// Adjustments layered over a set of mappings: renames, exclusions and an
/// optional allow-list.
#[derive(Debug, Clone, Default)]
pub struct MappingOverrides {
    pub rename: Vec<(String, String)>,
    pub exclude: Vec<String>,
    pub only: Vec<String>,
}

impl MappingOverrides {
    pub fn apply(&self, mappings: &mut [FieldMapping]) -> Result<(), ExportError> {
        let names = self
            .rename
            .iter()
            .map(|(from, _)| from)
            .chain(&self.exclude)
            .chain(&self.only);
        for name in names {
            if !mappings.iter().any(|m| &m.original_name == name) {
                return Err(ExportError::UnknownField(name.clone()));
            }
        }

        for mapping in mappings.iter_mut() {
            if let Some((_, to)) = self.rename.iter().find(|(from, _)| *from == mapping.original_name) {
                mapping.output_name = to.clone();
            }
            if !self.only.is_empty() {
                mapping.included = self.only.contains(&mapping.original_name);
            }
            if self.exclude.contains(&mapping.original_name) {
                mapping.included = false;
            }
        }
        Ok(())
    }
}

/// Render `result` as CSV text using `mappings` to pick and name columns.
///
/// Returns an empty string when there are no rows or no included fields.
/// Otherwise the first line holds the output names and each following line
/// one row; lines end with `\n` except the last. Fields containing a comma,
/// quote, CR or LF are quoted with inner quotes doubled. NULL values and
/// columns missing from the result are written as empty fields.
pub fn convert_to_csv(
    result: &QueryResult,
    mappings: &[FieldMapping],
) -> Result<String, ExportError> {
    let included: Vec<&FieldMapping> = mappings.iter().filter(|m| m.included).collect();
    if result.is_empty() || included.is_empty() {
        return Ok(String::new());
    }

    let sources: Vec<Option<usize>> = included
        .iter()
        .map(|m| result.column_index(&m.original_name))
        .collect();

    let header: Vec<String> = included.iter().map(|m| m.output_name.clone()).collect();
    let records = result.rows.iter().map(|row| {
        sources
            .iter()
            .map(|source| {
                source
                    .and_then(|idx| row.get(idx))
                    .map(ToString::to_string)
                    .unwrap_or_default()
            })
            .collect::<Vec<String>>()
    });

    let mut builder = WriterBuilder::new();
    builder
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'));

    let mut out = Vec::new();
    let mut wtr = builder.from_writer(&mut out);
    for record in std::iter::once(header).chain(records) {
        match record.as_slice() {
            // The writer quotes a lone empty field; it must stay an empty line.
            [only] if only.is_empty() => {
                wtr.flush().map_err(ExportError::Flush)?;
                drop(wtr);
                out.push(b'\n');
                wtr = builder.from_writer(&mut out);
            }
            _ => wtr.write_record(&record)?,
        }
    }
    wtr.flush().map_err(ExportError::Flush)?;
    drop(wtr);

    let mut text = String::from_utf8(out)?;
    if text.ends_with('\n') {
        text.pop();
    }

    debug!(rows = result.len(), fields = included.len(), bytes = text.len(), "converted to CSV");
    Ok(text)
}

/// Write `content` to `<dir>/<filename>.csv` and return the path written.
pub fn write_csv_file(content: &str, dir: &Path, filename: &str) -> Result<PathBuf, ExportError> {
    if filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\'])
    {
        return Err(ExportError::InvalidFilename(filename.to_string()));
    }

    let path = dir.join(format!("{filename}.csv"));
    let write_err = |source| ExportError::Write {
        path: path.clone(),
        source,
    };
    fs::create_dir_all(dir).map_err(write_err)?;
    fs::write(&path, content).map_err(write_err)?;

    info!(path = %path.display(), bytes = content.len(), "CSV written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Value;

    fn people() -> QueryResult {
        QueryResult {
            columns: vec!["id".into(), "name".into(), "note".into()],
            rows: vec![
                vec![Value::Integer(1), Value::Text("Ada".into()), Value::Null],
                vec![
                    Value::Integer(2),
                    Value::Text("Hopper, Grace".into()),
                    Value::Text("said \"hi\"".into()),
                ],
                vec![
                    Value::Integer(3),
                    Value::Text("Line\nBreak".into()),
                    Value::Text("cr\rhere".into()),
                ],
            ],
        }
    }

    #[test]
    fn converts_with_identity_mappings() {
        let result = people();
        let csv = convert_to_csv(&result, &mappings_for(result.columns.clone())).unwrap();
        assert_eq!(
            csv,
            "id,name,note\n\
             1,Ada,\n\
             2,\"Hopper, Grace\",\"said \"\"hi\"\"\"\n\
             3,\"Line\nBreak\",\"cr\rhere\""
        );
    }

    #[test]
    fn renames_reorders_and_excludes() {
        let mappings = vec![
            FieldMapping {
                original_name: "name".into(),
                output_name: "Full name".into(),
                included: true,
            },
            FieldMapping {
                original_name: "note".into(),
                output_name: "note".into(),
                included: false,
            },
            FieldMapping::identity("id"),
        ];
        let csv = convert_to_csv(&people(), &mappings).unwrap();
        let lines: Vec<&str> = csv.split('\n').collect();
        assert_eq!(lines[0], "Full name,id");
        assert_eq!(lines[1], "Ada,1");
        assert_eq!(lines[2], "\"Hopper, Grace\",2");
    }

    #[test]
    fn header_names_are_escaped() {
        let mappings = vec![FieldMapping {
            original_name: "id".into(),
            output_name: "id, \"primary\"".into(),
            included: true,
        }];
        let csv = convert_to_csv(&people(), &mappings).unwrap();
        assert!(csv.starts_with("\"id, \"\"primary\"\"\"\n1\n"));
    }

    #[test]
    fn missing_columns_become_empty_fields() {
        let mappings = vec![FieldMapping::identity("id"), FieldMapping::identity("ghost")];
        let csv = convert_to_csv(&people(), &mappings).unwrap();
        assert!(csv.starts_with("id,ghost\n1,\n2,\n"));
    }

    #[test]
    fn empty_inputs_produce_empty_output() {
        let result = people();
        let all = mappings_for(result.columns.clone());

        assert_eq!(convert_to_csv(&QueryResult::default(), &all).unwrap(), "");
        assert_eq!(convert_to_csv(&result, &[]).unwrap(), "");

        let none: Vec<_> = all
            .into_iter()
            .map(|m| FieldMapping {
                included: false,
                ..m
            })
            .collect();
        assert_eq!(convert_to_csv(&result, &none).unwrap(), "");
    }

    #[test]
    fn single_empty_field_is_an_empty_line() {
        let result = QueryResult {
            columns: vec!["note".into()],
            rows: vec![
                vec![Value::Null],
                vec![Value::Text("x".into())],
                vec![Value::Text(String::new())],
                vec![Value::Text("a,b".into())],
            ],
        };
        let csv = convert_to_csv(&result, &mappings_for(["note"])).unwrap();
        assert_eq!(csv, "note\n\nx\n\n\"a,b\"");

        let unnamed = vec![FieldMapping {
            original_name: "note".into(),
            output_name: String::new(),
            included: true,
        }];
        let csv = convert_to_csv(&result, &unnamed).unwrap();
        assert_eq!(csv, "\n\nx\n\n\"a,b\"");
    }

    #[test]
    fn numbers_and_blobs_are_stringified() {
        let result = QueryResult {
            columns: vec!["n".into(), "r".into(), "b".into()],
            rows: vec![vec![
                Value::Integer(-7),
                Value::Real(0.25),
                Value::Blob(vec![0, 16]),
            ]],
        };
        let csv = convert_to_csv(&result, &mappings_for(["n", "r", "b"])).unwrap();
        assert_eq!(csv, "n,r,b\n-7,0.25,\"0,16\"");
    }

    #[test]
    fn overrides_rename_and_filter() {
        let mut mappings = mappings_for(["id", "name", "note"]);
        let overrides = MappingOverrides {
            rename: vec![("name".into(), "Who".into())],
            exclude: vec!["id".into()],
            only: vec!["id".into(), "name".into()],
        };
        overrides.apply(&mut mappings).unwrap();

        let included: Vec<_> = mappings
            .iter()
            .filter(|m| m.included)
            .map(|m| m.output_name.as_str())
            .collect();
        assert_eq!(included, vec!["Who"]);

        let csv = convert_to_csv(&people(), &mappings).unwrap();
        assert_eq!(csv, "Who\nAda\n\"Hopper, Grace\"\n\"Line\nBreak\"");
    }

    #[test]
    fn overrides_reject_unknown_columns() {
        let mut mappings = mappings_for(["id"]);
        let overrides = MappingOverrides {
            exclude: vec!["nope".into()],
            ..Default::default()
        };
        assert!(matches!(
            overrides.apply(&mut mappings),
            Err(ExportError::UnknownField(name)) if name == "nope"
        ));
    }

    #[test]
    fn writes_named_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("exports");
        let path = write_csv_file("a,b\n1,2", &out, "report").unwrap();
        assert_eq!(path, out.join("report.csv"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "a,b\n1,2");
    }

    #[test]
    fn rejects_unsafe_file_names() {
        let dir = tempfile::tempdir().unwrap();
        for bad in ["", "..", "../escape", "a\\b"] {
            assert!(matches!(
                write_csv_file("x", dir.path(), bad),
                Err(ExportError::InvalidFilename(_))
            ));
        }
    }
}
