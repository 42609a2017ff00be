use ddb_proto::Value;

/// A single bound parameter or returned cell. Distinct from `ddb_proto::Value`
/// because rows also carry `id` and index columns, which are not part of the
/// document value domain.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Id(i64),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Null,
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<&Value> for SqlValue {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => SqlValue::Null,
            Value::Str(s) => SqlValue::Str(s.clone()),
            Value::Int(i) => SqlValue::Int(*i),
            Value::Float(f) => SqlValue::Float(*f),
            Value::Bytes(b) => SqlValue::Bytes(b.clone()),
            // Sentinels never reach the per-field table's value column; the
            // Structure Layer stores them as a fixed marker instead.
            Value::EmptyMap | Value::EmptyList => SqlValue::Null,
        }
    }
}

/// A row returned by `Engine::execute`, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(pub Vec<SqlValue>);

impl Row {
    pub fn new(cells: Vec<SqlValue>) -> Self {
        Row(cells)
    }

    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        self.0.get(index)
    }

    pub fn get_i64(&self, index: usize) -> Option<i64> {
        match self.0.get(index) {
            Some(SqlValue::Id(v)) | Some(SqlValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_str(&self, index: usize) -> Option<&str> {
        match self.0.get(index) {
            Some(SqlValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
