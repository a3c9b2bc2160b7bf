use ahash::AHashMap;

use super::FieldType;

/// Name and declared type of one attribute column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: FieldType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self { name: name.into(), ty }
    }
}

/// Ordered attribute columns shared by every polygon of a layer.
#[derive(Debug, Clone, Default)]
pub struct AttributeSchema {
    fields: Vec<FieldDef>,
    index: AHashMap<String, usize>, // Map between field names and column positions.
}

impl AttributeSchema {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        let index = fields.iter().enumerate()
            .map(|(i, field)| (field.name.clone(), i))
            .collect();
        Self { fields, index }
    }

    #[inline] pub fn len(&self) -> usize { self.fields.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    #[inline] pub fn fields(&self) -> &[FieldDef] { &self.fields }

    #[inline] pub fn field(&self, i: usize) -> &FieldDef { &self.fields[i] }

    /// Position of the column called `name`, if present.
    #[inline] pub fn position(&self, name: &str) -> Option<usize> { self.index.get(name).copied() }

    /// Append a derived column, returning its position.
    pub(crate) fn push(&mut self, field: FieldDef) -> usize {
        let i = self.fields.len();
        self.index.insert(field.name.clone(), i);
        self.fields.push(field);
        i
    }
}

impl PartialEq for AttributeSchema {
    fn eq(&self, other: &Self) -> bool { self.fields == other.fields }
}
