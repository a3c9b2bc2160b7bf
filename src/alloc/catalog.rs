use ahash::AHashMap;

use crate::layer::{AttrValue, FieldType, PolygonLayer};

use super::AllocationError;

/// Opt-in naming rule for surf-zone classification layers. The category
/// `open` is emitted as `OPEN` and holds the complement `1 - open - surf`;
/// the category `surf` is emitted as `SURF`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfZoneRule {
    pub open: String, // Category value renamed to OPEN
    pub surf: String, // Category value renamed to SURF
}

impl SurfZoneRule {
    pub const OPEN_FIELD: &'static str = "OPEN";
    pub const SURF_FIELD: &'static str = "SURF";
}

impl Default for SurfZoneRule {
    fn default() -> Self {
        Self { open: "2".to_string(), surf: "3".to_string() }
    }
}

/// Distinct values of one categorical weight attribute, indexed in order
/// of first occurrence across the weight layer.
#[derive(Debug, Clone)]
pub struct TypeCatalog {
    attribute: String,
    types: Vec<String>,             // Canonical category values
    fields: Vec<String>,            // Output field name per category
    index: AHashMap<String, usize>, // Map between category value and index
    open: Option<usize>,
    surf: Option<usize>,
}

impl TypeCatalog {
    /// Scan attribute `attr` of every polygon in `layer`.
    pub fn build(layer: &PolygonLayer, attr: usize) -> Result<Self, AllocationError> {
        let field = layer.schema().field(attr);
        if layer.is_empty() {
            return Err(AllocationError::schema(format!(
                "cannot enumerate categories of {}: weight layer {} has no polygons", field.name, layer.name()
            )));
        }
        if field.ty == FieldType::Invalid {
            return Err(AllocationError::schema(format!(
                "cannot enumerate categories of {}: declared type {} is not integer, double or string",
                field.name, field.ty.to_str()
            )));
        }

        let mut types = Vec::new();
        let mut index = AHashMap::new();
        for record in layer.records() {
            let value = record[attr].canonical();
            if !index.contains_key(&value) {
                index.insert(value.clone(), types.len());
                types.push(value);
            }
        }

        let fields = types.iter()
            .map(|t| format!("{}_{}", field.name, t))
            .collect();

        Ok(Self { attribute: field.name.clone(), types, fields, index, open: None, surf: None })
    }

    /// Apply the surf-zone naming rule to the categories it names.
    pub fn with_surf_zone(mut self, rule: &SurfZoneRule) -> Self {
        self.open = self.index_of(&rule.open);
        self.surf = self.index_of(&rule.surf);
        if let Some(i) = self.open { self.fields[i] = SurfZoneRule::OPEN_FIELD.to_string(); }
        if let Some(i) = self.surf { self.fields[i] = SurfZoneRule::SURF_FIELD.to_string(); }
        self
    }

    #[inline] pub fn attribute(&self) -> &str { &self.attribute }

    #[inline] pub fn type_count(&self) -> usize { self.types.len() }

    /// Canonical category value at `i`.
    #[inline] pub fn type_name(&self, i: usize) -> &str { &self.types[i] }

    /// Output field name for category `i`.
    #[inline] pub fn field_name(&self, i: usize) -> &str { &self.fields[i] }

    #[inline] pub fn field_names(&self) -> &[String] { &self.fields }

    #[inline] pub fn index_of(&self, value: &str) -> Option<usize> { self.index.get(value).copied() }

    /// Category index of an attribute value.
    #[inline] pub fn category_of(&self, value: &AttrValue) -> Option<usize> { self.index_of(&value.canonical()) }

    /// Whether the surf-zone rule renamed any category.
    #[inline] pub fn has_surf_zone(&self) -> bool { self.open.is_some() || self.surf.is_some() }

    /// Turn raw per-category area fractions into output values, replacing the
    /// OPEN category with its complement when the surf-zone rule is active.
    pub(crate) fn resolve(&self, fractions: &mut [f64]) {
        if let Some(open) = self.open {
            let surf = self.surf.map_or(0.0, |s| fractions[s]);
            fractions[open] = 1.0 - fractions[open] - surf;
        }
    }
}
