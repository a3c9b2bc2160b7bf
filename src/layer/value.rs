use std::fmt;

/// Integer written when no input piece supplies a value.
pub const MISSING_INT: i64 = -9999;

/// Double written when no input piece supplies a value (or an average has no area).
pub const MISSING_DOUBLE: f64 = -9999.0;

/// String written when no input piece supplies a value.
pub const MISSING_STR: &str = "NONE";

/// Declared type of an attribute column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    Double,
    String,
    Invalid, // Logical, date, memo, ... carried through as raw text
}

impl FieldType {
    pub fn to_str(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Double => "double",
            FieldType::String => "string",
            FieldType::Invalid => "invalid",
        }
    }

    /// Whether values of this type can be summed or averaged.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Double)
    }

    /// The sentinel value used for this type when a reduction has no winner.
    pub fn missing(&self) -> AttrValue {
        match self {
            FieldType::Integer => AttrValue::Integer(MISSING_INT),
            FieldType::Double => AttrValue::Double(MISSING_DOUBLE),
            FieldType::String => AttrValue::String(MISSING_STR.to_string()),
            FieldType::Invalid => AttrValue::Invalid(String::new()),
        }
    }
}

/// A single typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Integer(i64),
    Double(f64),
    String(String),
    Invalid(String),
}

impl AttrValue {
    pub fn ty(&self) -> FieldType {
        match self {
            AttrValue::Integer(_) => FieldType::Integer,
            AttrValue::Double(_) => FieldType::Double,
            AttrValue::String(_) => FieldType::String,
            AttrValue::Invalid(_) => FieldType::Invalid,
        }
    }

    /// Numeric view of the value, if it has one.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Integer(v) => Some(*v as f64),
            AttrValue::Double(v) => Some(*v),
            AttrValue::String(_) | AttrValue::Invalid(_) => None,
        }
    }

    /// Canonical string form used to key area-percent categories:
    /// integers in decimal, doubles at full (round-trip) precision, strings verbatim.
    pub fn canonical(&self) -> String {
        match self {
            AttrValue::Integer(v) => v.to_string(),
            AttrValue::Double(v) => v.to_string(),
            AttrValue::String(s) | AttrValue::Invalid(s) => s.clone(),
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            AttrValue::Integer(v) => *v == MISSING_INT,
            AttrValue::Double(v) => *v == MISSING_DOUBLE,
            AttrValue::String(s) => s == MISSING_STR,
            AttrValue::Invalid(_) => false,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}
