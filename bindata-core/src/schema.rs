//! Schema definition for delimited label/range tables

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name given to the label column when the input has no header
pub const LABEL_SENTINEL: &str = "label";

/// Name given to the range column when the input has no header
pub const RANGE_SENTINEL: &str = "position";

/// Cell values read as missing rather than as text
pub const MISSING_MARKERS: &[&str] = &[
    "NA", "N/A", "n/a", "#N/A", "<NA>", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None",
];

/// Whether `value` is blank or a missing-value marker
pub fn is_missing(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || MISSING_MARKERS.contains(&value)
}

/// Inferred type of a column's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 64-bit signed integer
    Int64,

    /// 64-bit floating point
    Float64,

    /// Boolean flags (`true`, `no`, ...)
    Boolean,

    /// Anything else
    String,
}

impl DataType {
    /// Check if this type is a numeric type
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Int64 | DataType::Float64)
    }

    /// Infer the data type for a column of string values.
    ///
    /// Blank and missing values (`NA`, `NaN`, ...) are ignored; a column with
    /// nothing else is a string column.
    pub fn infer(values: &[&str]) -> DataType {
        let non_empty: Vec<&str> = values
            .iter()
            .map(|s| s.trim())
            .filter(|s| !is_missing(s))
            .collect();

        if non_empty.is_empty() {
            return DataType::String;
        }

        if non_empty.iter().all(|s| s.parse::<i64>().is_ok()) {
            return DataType::Int64;
        }

        if non_empty.iter().all(|s| s.parse::<f64>().is_ok()) {
            return DataType::Float64;
        }

        let all_bool = non_empty.iter().all(|s| {
            matches!(
                s.to_lowercase().as_str(),
                "true" | "false" | "yes" | "no"
            )
        });
        if all_bool {
            return DataType::Boolean;
        }

        DataType::String
    }

    /// Infer one data type per column from string records.
    ///
    /// Records shorter than `column_count` contribute nothing to the missing columns.
    pub fn infer_columns(records: &[Vec<String>], column_count: usize) -> Vec<DataType> {
        (0..column_count)
            .map(|col| {
                let values: Vec<&str> = records
                    .iter()
                    .filter_map(|r| r.get(col).map(String::as_str))
                    .collect();
                DataType::infer(&values)
            })
            .collect()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Int64 => "int64",
            DataType::Float64 => "float64",
            DataType::Boolean => "bool",
            DataType::String => "string",
        };
        f.write_str(name)
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    data_type: DataType,
}

impl Field {
    /// Create a new field
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    /// Column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inferred type
    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

/// Layout of the delimited input: delimiter, columns, and which columns hold
/// the label and the range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    delimiter: u8,
    has_header: bool,
    fields: Vec<Field>,
    label_index: usize,
    range_index: usize,
}

impl Schema {
    /// Create a schema, checking that the label and range indices are distinct
    /// and within bounds.
    pub fn new(
        delimiter: u8,
        has_header: bool,
        fields: Vec<Field>,
        label_index: usize,
        range_index: usize,
    ) -> Result<Self> {
        if label_index == range_index {
            return Err(Error::Schema(format!(
                "label and range columns must differ, both are {label_index}"
            )));
        }

        let width = fields.len();
        if label_index >= width || range_index >= width {
            return Err(Error::Schema(format!(
                "label column {label_index} or range column {range_index} out of bounds for {width} columns"
            )));
        }

        Ok(Self {
            delimiter,
            has_header,
            fields,
            label_index,
            range_index,
        })
    }

    /// Create a schema with synthetic names for headerless input.
    ///
    /// Columns are named `val-0`, `val-1`, ...; the label and range positions
    /// are renamed to [`LABEL_SENTINEL`] and [`RANGE_SENTINEL`].
    pub fn synthetic(
        delimiter: u8,
        types: &[DataType],
        label_index: usize,
        range_index: usize,
    ) -> Result<Self> {
        let fields = types
            .iter()
            .enumerate()
            .map(|(i, &data_type)| {
                let name = if i == label_index {
                    LABEL_SENTINEL.to_string()
                } else if i == range_index {
                    RANGE_SENTINEL.to_string()
                } else {
                    format!("val-{i}")
                };
                Field::new(name, data_type)
            })
            .collect();

        Self::new(delimiter, false, fields, label_index, range_index)
    }

    /// Create a schema from explicit column names and per-column types
    pub fn named(
        delimiter: u8,
        has_header: bool,
        names: &[String],
        types: &[DataType],
        label_index: usize,
        range_index: usize,
    ) -> Result<Self> {
        if names.len() != types.len() {
            return Err(Error::Schema(format!(
                "header has {} columns but data has {} columns",
                names.len(),
                types.len()
            )));
        }

        let fields = names
            .iter()
            .zip(types)
            .map(|(name, &data_type)| Field::new(name.clone(), data_type))
            .collect();

        Self::new(delimiter, has_header, fields, label_index, range_index)
    }

    /// Field delimiter byte
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Whether the first line of the source is a header row
    pub fn has_header(&self) -> bool {
        self.has_header
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no columns
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// All fields in column order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field at `index`
    pub fn field(&self, index: usize) -> &Field {
        &self.fields[index]
    }

    /// Column names in order
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(Field::name).collect()
    }

    /// Index of the label column
    pub fn label_index(&self) -> usize {
        self.label_index
    }

    /// Index of the range column
    pub fn range_index(&self) -> usize {
        self.range_index
    }

    /// Name of the label column
    pub fn label_name(&self) -> &str {
        self.fields[self.label_index].name()
    }

    /// Name of the range column
    pub fn range_name(&self) -> &str {
        self.fields[self.range_index].name()
    }

    /// Indices of the numeric columns that get aggregated, i.e. every numeric
    /// column other than the label and range columns.
    pub fn value_columns(&self) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(i, f)| {
                *i != self.label_index && *i != self.range_index && f.data_type().is_numeric()
            })
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(&["1", "2", "-3"], DataType::Int64; "integers")]
    #[test_case(&["1", "2.5", ""], DataType::Float64; "floats with blank")]
    #[test_case(&["true", "No"], DataType::Boolean; "booleans")]
    #[test_case(&["chr1", "2"], DataType::String; "mixed")]
    #[test_case(&["", " "], DataType::String; "all blank")]
    #[test_case(&["5", "NA", "7"], DataType::Int64; "missing marker ignored")]
    #[test_case(&["5.5", "nan", "null", "N/A"], DataType::Float64; "several markers")]
    #[test_case(&["NA", "NaN"], DataType::String; "only markers")]
    fn test_infer(values: &[&str], expected: DataType) {
        assert_eq!(DataType::infer(values), expected);
    }

    #[test]
    fn test_synthetic_names() {
        let types = [DataType::Int64, DataType::String, DataType::Float64, DataType::Int64];
        let schema = Schema::synthetic(b'\t', &types, 1, 0).unwrap();

        assert_eq!(schema.names(), vec!["position", "label", "val-2", "val-3"]);
        assert!(!schema.has_header());
        assert_eq!(schema.label_name(), "label");
        assert_eq!(schema.range_name(), "position");
        assert_eq!(schema.value_columns(), vec![2, 3]);
    }

    #[test]
    fn test_rejects_bad_indices() {
        let types = [DataType::String, DataType::Int64];
        assert!(matches!(
            Schema::synthetic(b',', &types, 1, 1),
            Err(Error::Schema(_))
        ));
        assert!(matches!(
            Schema::synthetic(b',', &types, 0, 2),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn test_value_columns_skip_strings() {
        let names: Vec<String> = ["chr", "pos", "name", "depth"].iter().map(|s| s.to_string()).collect();
        let types = [DataType::String, DataType::Int64, DataType::String, DataType::Float64];
        let schema = Schema::named(b',', true, &names, &types, 0, 1).unwrap();

        assert_eq!(schema.value_columns(), vec![3]);
    }
}
