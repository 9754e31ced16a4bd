use crate::core::error::AppError;
use crate::core::table::Table;
use crate::core::types::ErrorCategory;
use serde::{Deserialize, Deserializer};

/// Render names the way error messages list sets: `{'a', 'b'}`.
pub(crate) fn set_repr<S: AsRef<str>>(names: &[S]) -> String {
    let quoted: Vec<String> = names
        .iter()
        .map(|name| format!("'{}'", name.as_ref()))
        .collect();
    format!("{{{}}}", quoted.join(", "))
}

/// Strict: every column must exist. Non-strict: unknown columns are dropped.
pub(crate) fn columns_in(
    table: &Table,
    columns: &[String],
    strict: bool,
) -> Result<Vec<String>, AppError> {
    let missing: Vec<&String> = columns.iter().filter(|c| !table.has_column(c)).collect();
    if strict && !missing.is_empty() {
        return Err(AppError::new(
            ErrorCategory::MissingColumn,
            format!(
                "Column(s) {} are missing from the input table.",
                set_repr(&missing)
            ),
        )
        .with_code("RG-MEM-001"));
    }
    Ok(columns
        .iter()
        .filter(|c| table.has_column(c))
        .cloned()
        .collect())
}

/// Resolve the output column of a single-column transform. Defaults to the
/// input column; a strict rule refuses to overwrite an existing column.
pub(crate) fn column_out(
    table: &Table,
    input_column: &str,
    output_column: Option<&str>,
    strict: bool,
) -> Result<String, AppError> {
    match output_column {
        Some(output) => {
            if strict && table.has_column(output) {
                return Err(AppError::new(
                    ErrorCategory::ColumnAlreadyExists,
                    format!("Column(s) already exist: {}", set_repr(&[output])),
                )
                .with_code("RG-MEM-002"));
            }
            Ok(output.to_string())
        }
        None => Ok(input_column.to_string()),
    }
}

/// Accept either a single column name or a list of them.
pub(crate) fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(column) => vec![column],
        OneOrMany::Many(columns) => columns,
    })
}
