//! Schema catalog types.
//!
//! Each side of a comparison is described by a [`ComparisonSchema`]: an ordered set of
//! [`ColumnDefinition`]s (name, display alias, declared [`DataType`], nullability) plus the
//! side's own primary-key column names.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use polars::prelude::DataType as PlDataType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{CompareError, CompareResult};

/// Which dataset of a comparison a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// Declared logical type of a column.
///
/// Equality is structural. Every variant has a canonical text form (see [`fmt::Display`] and
/// [`FromStr`]), which is also how types are written in JSON configs:
///
/// ```rust
/// use rust_data_compare::types::DataType;
///
/// let dt: DataType = "List(Struct(id: Int64, tag: String))".parse().unwrap();
/// assert_eq!(dt.to_string(), "List(Struct(id: Int64, tag: String))");
/// assert_eq!("Utf8".parse::<DataType>().unwrap(), DataType::String);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    Boolean,
    Date,
    /// Timestamp; the time unit and zone are not part of the declared type.
    Datetime,
    Time,
    /// Elapsed time; the time unit is not part of the declared type.
    Duration,
    Categorical,
    List(Box<DataType>),
    Struct(Vec<StructField>),
    /// The backend's placeholder for columns with no known type (e.g. all-null or empty).
    Null,
}

/// A named member of [`DataType::Struct`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructField {
    pub name: String,
    pub datatype: DataType,
}

impl StructField {
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        Self {
            name: name.into(),
            datatype,
        }
    }
}

/// Returned when a type name is not in the lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown data type '{0}'")]
pub struct UnknownDataType(pub String);

impl DataType {
    /// All variants that carry no parameters, in declaration order.
    pub fn scalars() -> [DataType; 18] {
        [
            Self::Int8,
            Self::Int16,
            Self::Int32,
            Self::Int64,
            Self::UInt8,
            Self::UInt16,
            Self::UInt32,
            Self::UInt64,
            Self::Float32,
            Self::Float64,
            Self::String,
            Self::Boolean,
            Self::Date,
            Self::Datetime,
            Self::Time,
            Self::Duration,
            Self::Categorical,
            Self::Null,
        ]
    }

    /// Name of the variant (`"List"` / `"Struct"` for the nested types).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int8 => "Int8",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::UInt8 => "UInt8",
            Self::UInt16 => "UInt16",
            Self::UInt32 => "UInt32",
            Self::UInt64 => "UInt64",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::String => "String",
            Self::Boolean => "Boolean",
            Self::Date => "Date",
            Self::Datetime => "Datetime",
            Self::Time => "Time",
            Self::Duration => "Duration",
            Self::Categorical => "Categorical",
            Self::List(_) => "List",
            Self::Struct(_) => "Struct",
            Self::Null => "Null",
        }
    }

    /// Look up a parameterless type by name. Accepts the legacy aliases `Utf8` and `Bool`.
    pub fn scalar_from_name(name: &str) -> Option<Self> {
        let dt = match name {
            "Int8" => Self::Int8,
            "Int16" => Self::Int16,
            "Int32" => Self::Int32,
            "Int64" => Self::Int64,
            "UInt8" => Self::UInt8,
            "UInt16" => Self::UInt16,
            "UInt32" => Self::UInt32,
            "UInt64" => Self::UInt64,
            "Float32" => Self::Float32,
            "Float64" => Self::Float64,
            "String" | "Utf8" => Self::String,
            "Boolean" | "Bool" => Self::Boolean,
            "Date" => Self::Date,
            "Datetime" => Self::Datetime,
            "Time" => Self::Time,
            "Duration" => Self::Duration,
            "Categorical" => Self::Categorical,
            "Null" => Self::Null,
            _ => return None,
        };
        Some(dt)
    }

    /// Map a Polars dtype onto the declared-type union.
    ///
    /// Returns `None` for backend types with no counterpart (decimals, binary, objects, ...).
    pub fn from_polars(dtype: &PlDataType) -> Option<Self> {
        let dt = match dtype {
            PlDataType::Int8 => Self::Int8,
            PlDataType::Int16 => Self::Int16,
            PlDataType::Int32 => Self::Int32,
            PlDataType::Int64 => Self::Int64,
            PlDataType::UInt8 => Self::UInt8,
            PlDataType::UInt16 => Self::UInt16,
            PlDataType::UInt32 => Self::UInt32,
            PlDataType::UInt64 => Self::UInt64,
            PlDataType::Float32 => Self::Float32,
            PlDataType::Float64 => Self::Float64,
            PlDataType::String => Self::String,
            PlDataType::Boolean => Self::Boolean,
            PlDataType::Date => Self::Date,
            PlDataType::Datetime(..) => Self::Datetime,
            PlDataType::Time => Self::Time,
            PlDataType::Duration(..) => Self::Duration,
            PlDataType::Categorical(..) => Self::Categorical,
            PlDataType::List(inner) => Self::List(Box::new(Self::from_polars(inner)?)),
            PlDataType::Struct(fields) => {
                let mut out = Vec::with_capacity(fields.len());
                for field in fields {
                    out.push(StructField::new(
                        field.name().as_str(),
                        Self::from_polars(field.dtype())?,
                    ));
                }
                Self::Struct(out)
            }
            PlDataType::Null => Self::Null,
            _ => return None,
        };
        Some(dt)
    }

    /// Signed/unsigned integers and floats.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::UInt8
                | Self::UInt16
                | Self::UInt32
                | Self::UInt64
                | Self::Float32
                | Self::Float64
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(inner) => write!(f, "List({inner})"),
            Self::Struct(fields) => {
                write!(f, "Struct(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.datatype)?;
                }
                write!(f, ")")
            }
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for DataType {
    type Err = UnknownDataType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(dt) = Self::scalar_from_name(s) {
            return Ok(dt);
        }
        if let Some(inner) = strip_wrapper(s, "List") {
            return Ok(Self::List(Box::new(inner.parse()?)));
        }
        if let Some(body) = strip_wrapper(s, "Struct") {
            let mut fields = Vec::new();
            for member in split_top_level(body) {
                let (name, dtype) = member
                    .split_once(':')
                    .ok_or_else(|| UnknownDataType(s.to_string()))?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(UnknownDataType(s.to_string()));
                }
                fields.push(StructField::new(name, dtype.parse()?));
            }
            return Ok(Self::Struct(fields));
        }
        Err(UnknownDataType(s.to_string()))
    }
}

impl TryFrom<String> for DataType {
    type Error = UnknownDataType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.to_string()
    }
}

fn strip_wrapper<'a>(s: &'a str, wrapper: &str) -> Option<&'a str> {
    s.strip_prefix(wrapper)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

// Split on commas that are not nested inside parentheses.
fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if !body[start..].trim().is_empty() {
        parts.push(&body[start..]);
    }
    parts
}

/// A single expected column of one side's dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    name: String,
    alias: String,
    datatype: DataType,
    nullable: bool,
}

impl ColumnDefinition {
    /// Create a column definition. `alias` is only used for display.
    pub fn new(
        name: impl Into<String>,
        alias: impl Into<String>,
        datatype: DataType,
        nullable: bool,
    ) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
            datatype,
            nullable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn datatype(&self) -> &DataType {
        &self.datatype
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }
}

/// Expected shape of one side's dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SchemaRepr", into = "SchemaRepr")]
pub struct ComparisonSchema {
    columns: IndexMap<String, ColumnDefinition>,
    pk_columns: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct SchemaRepr {
    columns: Vec<ColumnDefinition>,
    #[serde(default)]
    pk_columns: Vec<String>,
}

impl ComparisonSchema {
    /// Build a schema from column definitions (declaration order is kept).
    ///
    /// Fails with [`CompareError::Configuration`] if two definitions share a name. Whether every
    /// `pk_columns` entry is declared is reported by [`crate::validation::validate_schema`].
    pub fn new(columns: Vec<ColumnDefinition>, pk_columns: Vec<String>) -> CompareResult<Self> {
        let mut map = IndexMap::with_capacity(columns.len());
        let mut errors = Vec::new();
        for column in columns {
            let name = column.name.clone();
            if map.insert(name.clone(), column).is_some() {
                errors.push(format!("column '{name}' is defined more than once"));
            }
        }
        if !errors.is_empty() {
            return Err(CompareError::configuration(errors));
        }
        Ok(Self {
            columns: map,
            pk_columns,
        })
    }

    /// Column definitions in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.values()
    }

    /// Declared column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn pk_columns(&self) -> &[String] {
        &self.pk_columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Definitions of the primary-key columns that are declared in this schema.
    pub fn primary_key_definitions(&self) -> Vec<&ColumnDefinition> {
        self.pk_columns
            .iter()
            .filter_map(|name| self.columns.get(name))
            .collect()
    }

    /// Names of declared columns that are not part of the primary key.
    pub fn compare_columns(&self) -> Vec<&str> {
        self.columns
            .keys()
            .filter(|name| !self.pk_columns.contains(name))
            .map(String::as_str)
            .collect()
    }
}

impl TryFrom<SchemaRepr> for ComparisonSchema {
    type Error = CompareError;

    fn try_from(value: SchemaRepr) -> Result<Self, Self::Error> {
        Self::new(value.columns, value.pk_columns)
    }
}

impl From<ComparisonSchema> for SchemaRepr {
    fn from(value: ComparisonSchema) -> Self {
        Self {
            columns: value.columns.into_values().collect(),
            pk_columns: value.pk_columns,
        }
    }
}
