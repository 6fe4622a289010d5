//! Decoded records and the batches they are grouped into.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// One CSV row: header name → cell value, in header order.
pub type Row = IndexMap<String, String>;

/// A single decoded unit of input data.
///
/// CSV input produces [`Record::Row`]; JSON input produces [`Record::Value`].
/// Serializes as the bare row object or JSON value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Row(Row),
    Value(Value),
}

impl Record {
    pub fn as_row(&self) -> Option<&Row> {
        match self {
            Self::Row(row) => Some(row),
            Self::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Row(_) => None,
            Self::Value(value) => Some(value),
        }
    }

    /// Look up a named field. For JSON values only string members of a
    /// top-level object are returned.
    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            Self::Row(row) => row.get(name).map(String::as_str),
            Self::Value(value) => value.get(name).and_then(Value::as_str),
        }
    }

    /// Convert into a JSON value (rows become objects of strings).
    pub fn to_json(&self) -> Value {
        match self {
            Self::Row(row) => Value::Object(
                row.iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
            Self::Value(value) => value.clone(),
        }
    }
}

impl From<Row> for Record {
    fn from(row: Row) -> Self {
        Self::Row(row)
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// An ordered group of records handed to one processor invocation.
///
/// `index` is the 0-based position of the batch within its run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Batch {
    index: u64,
    records: Vec<Record>,
}

impl Batch {
    pub fn new(index: u64, records: Vec<Record>) -> Self {
        Self { index, records }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl IntoIterator for Batch {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
