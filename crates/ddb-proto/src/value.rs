/// Scalar type tag, plus the two container sentinels.
///
/// Each tag maps to a distinct physical column type and a distinct per-field
/// table: two objects can store different types at the same path, so a
/// `(name_str_no_type, type)` pair — not just `name_str_no_type` — identifies
/// a concrete per-field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Null,
    Str,
    Int,
    Float,
    Bytes,
    EmptyMap,
    EmptyList,
}

impl TypeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Null => "null",
            TypeTag::Str => "str",
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Bytes => "bytes",
            TypeTag::EmptyMap => "empty_map",
            TypeTag::EmptyList => "empty_list",
        }
    }

    pub fn parse(s: &str) -> Option<TypeTag> {
        Some(match s {
            "null" => TypeTag::Null,
            "str" => TypeTag::Str,
            "int" => TypeTag::Int,
            "float" => TypeTag::Float,
            "bytes" => TypeTag::Bytes,
            "empty_map" => TypeTag::EmptyMap,
            "empty_list" => TypeTag::EmptyList,
            _ => return None,
        })
    }

    /// True for the two container sentinels (as opposed to a scalar type).
    pub fn is_container_sentinel(self) -> bool {
        matches!(self, TypeTag::EmptyMap | TypeTag::EmptyList)
    }
}

/// A stored value: the closed tagged variant the whole system is built
/// around. Physical per-field tables are partitioned by the variant's tag,
/// so every table is monomorphic even though a path may hold any type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    /// Sentinel marking an empty map at this path, so empty containers
    /// survive a flatten/build round-trip.
    EmptyMap,
    /// Sentinel marking an empty list at this path.
    EmptyList,
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Null => TypeTag::Null,
            Value::Str(_) => TypeTag::Str,
            Value::Int(_) => TypeTag::Int,
            Value::Float(_) => TypeTag::Float,
            Value::Bytes(_) => TypeTag::Bytes,
            Value::EmptyMap => TypeTag::EmptyMap,
            Value::EmptyList => TypeTag::EmptyList,
        }
    }

    pub fn is_container_sentinel(&self) -> bool {
        self.type_tag().is_container_sentinel()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}
