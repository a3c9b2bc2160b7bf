use std::fmt;

use crate::{alloc::AllocationError, geom::Geometries};

use super::{AttrValue, AttributeSchema};

/// Index of a polygon within one layer. Non-owning: only meaningful while
/// the layer it points into is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PolygonId(pub u32);

impl PolygonId {
    #[inline] pub fn index(self) -> usize { self.0 as usize }
}

/// Layers are capped at `u32::MAX` polygons when built, so in-range indices never truncate.
impl From<usize> for PolygonId {
    fn from(i: usize) -> Self {
        debug_assert!(u32::try_from(i).is_ok(), "polygon index {i} does not fit a PolygonId");
        PolygonId(i as u32)
    }
}

impl fmt::Display for PolygonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// An ordered polygon layer: geometries plus one attribute record per polygon,
/// all records sharing the layer's schema.
#[derive(Debug, Clone)]
pub struct PolygonLayer {
    name: String,
    schema: AttributeSchema,
    records: Vec<Vec<AttrValue>>,
    geoms: Geometries,
}

impl PolygonLayer {
    /// Build a layer, checking that every record matches the schema and
    /// that there is exactly one record per geometry.
    pub fn new(
        name: impl Into<String>,
        schema: AttributeSchema,
        records: Vec<Vec<AttrValue>>,
        geoms: Geometries,
    ) -> Result<Self, AllocationError> {
        let name = name.into();
        if u32::try_from(records.len()).is_err() {
            return Err(AllocationError::schema(format!(
                "layer {name} has {} polygons, more than can be indexed", records.len()
            )));
        }
        if records.len() != geoms.len() {
            return Err(AllocationError::schema(format!(
                "layer {name} has {} attribute records but {} polygons", records.len(), geoms.len()
            )));
        }
        for (i, record) in records.iter().enumerate() {
            if record.len() != schema.len() {
                return Err(AllocationError::schema(format!(
                    "layer {name}: polygon {i} has {} attribute values, schema declares {}",
                    record.len(), schema.len()
                )));
            }
            if let Some((field, value)) = schema.fields().iter().zip(record)
                .find(|(field, value)| field.ty != value.ty())
            {
                return Err(AllocationError::schema(format!(
                    "layer {name}: polygon {i} attribute {} is {} but declared {}",
                    field.name, value.ty().to_str(), field.ty.to_str()
                )));
            }
        }
        Ok(Self { name, schema, records, geoms })
    }

    #[inline] pub fn name(&self) -> &str { &self.name }

    #[inline] pub fn len(&self) -> usize { self.records.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.records.is_empty() }

    #[inline] pub fn schema(&self) -> &AttributeSchema { &self.schema }

    #[inline] pub fn geoms(&self) -> &Geometries { &self.geoms }

    #[inline] pub fn records(&self) -> &[Vec<AttrValue>] { &self.records }

    #[inline] pub fn record(&self, id: PolygonId) -> &[AttrValue] { &self.records[id.index()] }

    #[inline] pub fn value(&self, id: PolygonId, attr: usize) -> &AttrValue { &self.records[id.index()][attr] }

    #[inline] pub fn area(&self, id: PolygonId) -> f64 { self.geoms.area(id.index()) }

    #[inline] pub fn contains(&self, id: PolygonId) -> bool { id.index() < self.len() }

    /// Iterate over all polygon ids in layer order.
    pub fn ids(&self) -> impl Iterator<Item = PolygonId> + use<> {
        (0..self.records.len()).map(PolygonId::from)
    }
}
