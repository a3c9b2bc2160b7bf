use ahash::AHashSet;
use smallvec::SmallVec;

use crate::layer::{
    AttrValue, AttributeSchema, FieldDef, FieldType, IntersectionLayer, PolygonId, PolygonLayer, MISSING_DOUBLE,
};

use super::{
    reduce::{self, PieceGroup},
    AllocationError, AllocationMode, AllocationModeTable, AllocationWarning, SurfZoneRule, TypeCatalog, WeightBasis,
};

/// Caller-selectable knobs of an allocation run.
#[derive(Debug, Clone, Default)]
pub struct AllocationOptions {
    pub basis: WeightBasis,                // Weighting used by Sum
    pub grid_shape: Option<(usize, usize)>, // (rows, cols) when the data layer is a regular grid
    pub surf_zone: Option<SurfZoneRule>,   // Naming rule for surf-zone area percents
    pub verbose: u8,
}

/// Pieces grouped by the output polygon they were cut from.
#[derive(Debug, Clone)]
pub struct PieceIndex {
    groups: Vec<SmallVec<[u32; 4]>>,
}

impl PieceIndex {
    /// Group every piece under its data polygon, keeping input order within a group.
    pub fn build(pieces: &IntersectionLayer, outputs: usize) -> Result<Self, AllocationError> {
        let mut groups = vec![SmallVec::new(); outputs];
        for (i, piece) in pieces.pieces().iter().enumerate() {
            let slot = u32::try_from(i).map_err(|_| AllocationError::schema(format!(
                "intersection piece {i} is past the last indexable piece"
            )))?;
            let Some(group) = groups.get_mut(piece.data.index()) else {
                return Err(AllocationError::schema(format!(
                    "intersection piece {i} references data polygon {} but there are {outputs} output polygons", piece.data
                )));
            };
            group.push(slot);
        }
        Ok(Self { groups })
    }

    #[inline] pub fn len(&self) -> usize { self.groups.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.groups.is_empty() }

    /// Piece indices feeding output polygon `id`.
    #[inline] pub fn members(&self, id: PolygonId) -> &[u32] { &self.groups[id.index()] }
}

/// How one weight attribute is reduced, resolved before the main pass.
#[derive(Debug)]
struct Reduction {
    attr: usize,
    mode: AllocationMode,
    ty: FieldType,
    catalog: Option<TypeCatalog>,
}

/// Output of a run: the data layer's attributes followed by one derived
/// field per reduced value, for every output polygon in layer order.
#[derive(Debug, Clone)]
pub struct AllocationResult {
    schema: AttributeSchema,
    records: Vec<Vec<AttrValue>>,
    pass_through: usize,
    warnings: Vec<AllocationWarning>,
}

impl AllocationResult {
    #[inline] pub fn len(&self) -> usize { self.records.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.records.is_empty() }

    #[inline] pub fn schema(&self) -> &AttributeSchema { &self.schema }

    #[inline] pub fn records(&self) -> &[Vec<AttrValue>] { &self.records }

    #[inline] pub fn record(&self, id: PolygonId) -> &[AttrValue] { &self.records[id.index()] }

    /// Number of leading fields copied from the data layer.
    #[inline] pub fn pass_through_len(&self) -> usize { self.pass_through }

    /// Fields computed by the run.
    #[inline] pub fn derived_fields(&self) -> &[FieldDef] { &self.schema.fields()[self.pass_through..] }

    #[inline] pub fn warnings(&self) -> &[AllocationWarning] { &self.warnings }

    /// Value of field `name` for output polygon `id`.
    pub fn value(&self, id: PolygonId, name: &str) -> Option<&AttrValue> {
        self.schema.position(name).map(|i| &self.records[id.index()][i])
    }

    /// Values of field `name` for every output polygon.
    pub fn column(&self, name: &str) -> Option<Vec<&AttrValue>> {
        let i = self.schema.position(name)?;
        Some(self.records.iter().map(|r| &r[i]).collect())
    }
}

/// Apportions weight-layer attributes onto the polygons of a data layer.
pub struct AllocationEngine<'a> {
    weights: &'a PolygonLayer,
    data: &'a PolygonLayer,
    pieces: &'a IntersectionLayer,
    modes: &'a AllocationModeTable,
    options: AllocationOptions,
}

impl<'a> AllocationEngine<'a> {
    pub fn new(
        weights: &'a PolygonLayer,
        data: &'a PolygonLayer,
        pieces: &'a IntersectionLayer,
        modes: &'a AllocationModeTable,
        options: AllocationOptions,
    ) -> Self {
        Self { weights, data, pieces, modes, options }
    }

    /// Run the allocation to completion. Every configuration problem is
    /// reported before any polygon is reduced.
    pub fn run(&self) -> Result<AllocationResult, AllocationError> {
        let verbose = self.options.verbose;
        let n = self.data.len();

        if let Some((rows, cols)) = self.options.grid_shape {
            if n != rows * cols {
                return Err(AllocationError::ShapeMismatch { count: n, rows, cols });
            }
        }

        self.pieces.check_parents(self.weights, self.data)?;
        let reductions = self.resolve()?;
        let schema = self.output_schema(&reductions)?;
        if verbose > 0 {
            eprintln!("[allocate] {} output polygons, {} pieces, {} reduced attributes",
                n, self.pieces.len(), reductions.len());
        }

        if verbose > 1 { eprintln!("[allocate] building piece index"); }
        let index = PieceIndex::build(self.pieces, n)?;

        let mut result = AllocationResult {
            schema,
            records: self.data.records().to_vec(),
            pass_through: self.data.schema().len(),
            warnings: Vec::new(),
        };

        let overlap = reductions.iter().any(|r| r.mode == AllocationMode::DiscreteOverlap)
            .then(|| self.overlap_winners(&index));
        let centroid = reductions.iter().any(|r| r.mode == AllocationMode::DiscreteCentroid)
            .then(|| self.centroid_winners(&index));

        for reduction in &reductions {
            let name = &self.weights.schema().field(reduction.attr).name;
            if verbose > 1 { eprintln!("[allocate] {name}: {}", reduction.mode); }

            for id in self.data.ids() {
                let group = PieceGroup::new(self.pieces.pieces(), index.members(id));
                match reduction.mode {
                    AllocationMode::Sum => {
                        let total = reduce::sum(group, self.weights, reduction.attr, self.options.basis);
                        result.records[id.index()].push(AttrValue::Double(total));
                    }
                    AllocationMode::Average => {
                        let value = match reduce::average(group, self.weights, reduction.attr) {
                            Some(mean) => mean,
                            None => {
                                result.warnings.push(AllocationWarning::DivideByZero {
                                    attribute: name.clone(),
                                    polygon: id.index(),
                                });
                                MISSING_DOUBLE
                            }
                        };
                        result.records[id.index()].push(AttrValue::Double(value));
                    }
                    AllocationMode::DiscreteOverlap | AllocationMode::DiscreteCentroid => {
                        let winners = if reduction.mode == AllocationMode::DiscreteOverlap { &overlap } else { &centroid };
                        let value = winners.as_ref()
                            .and_then(|w| w[id.index()])
                            .map_or_else(|| reduction.ty.missing(), |w| self.weights.value(w, reduction.attr).clone());
                        result.records[id.index()].push(value);
                    }
                    AllocationMode::AreaPercent => {
                        let Some(catalog) = reduction.catalog.as_ref() else { continue };
                        let output_area = self.data.area(id);
                        let record = &mut result.records[id.index()];
                        match reduce::area_percent(group, self.weights, reduction.attr, catalog, output_area) {
                            Some(fractions) => record.extend(fractions.into_iter().map(AttrValue::Double)),
                            None => {
                                record.extend((0..catalog.type_count()).map(|_| FieldType::Double.missing()));
                                result.warnings.push(AllocationWarning::DivideByZero {
                                    attribute: name.clone(),
                                    polygon: id.index(),
                                });
                            }
                        }
                    }
                }
            }
        }

        if verbose > 0 && !result.warnings.is_empty() {
            eprintln!("[allocate] {} warnings", result.warnings.len());
        }
        Ok(result)
    }

    /// Resolve the mode of every weight attribute and check it against the
    /// attribute's declared type.
    fn resolve(&self) -> Result<Vec<Reduction>, AllocationError> {
        let schema = self.weights.schema();
        let mut reductions = Vec::with_capacity(schema.len());

        for (attr, field) in schema.fields().iter().enumerate() {
            let mode = self.modes.lookup(&field.name).ok_or_else(|| AllocationError::config(format!(
                "attribute {} of weight layer {} has no allocation mode", field.name, self.weights.name()
            )))?;

            let catalog = match mode {
                AllocationMode::Sum | AllocationMode::Average if !field.ty.is_numeric() => {
                    return Err(AllocationError::config(format!(
                        "mode {mode} requires a numeric attribute but {} is {}", field.name, field.ty.to_str()
                    )));
                }
                AllocationMode::DiscreteOverlap | AllocationMode::DiscreteCentroid if field.ty == FieldType::Invalid => {
                    return Err(AllocationError::config(format!(
                        "mode {mode} cannot carry attribute {} of unsupported type {}", field.name, field.ty.to_str()
                    )));
                }
                AllocationMode::AreaPercent => {
                    let catalog = TypeCatalog::build(self.weights, attr)?;
                    let catalog = match &self.options.surf_zone {
                        Some(rule) => catalog.with_surf_zone(rule),
                        None => catalog,
                    };
                    if self.options.verbose > 0 {
                        eprintln!("[allocate] {}: {} categories", field.name, catalog.type_count());
                    }
                    Some(catalog)
                }
                _ => None,
            };

            reductions.push(Reduction { attr, mode, ty: field.ty, catalog });
        }

        Ok(reductions)
    }

    /// Data-layer fields followed by the derived fields, in reduction order.
    fn output_schema(&self, reductions: &[Reduction]) -> Result<AttributeSchema, AllocationError> {
        let mut schema = self.data.schema().clone();
        let mut derived = AHashSet::new();

        let mut add = |schema: &mut AttributeSchema, name: &str, ty: FieldType| -> Result<(), AllocationError> {
            if schema.position(name).is_some() {
                let clash = if derived.contains(name) { "another derived field" } else { "a field of the data layer" };
                return Err(AllocationError::config(format!(
                    "derived field {name} has the same name as {clash}"
                )));
            }
            derived.insert(name.to_string());
            schema.push(FieldDef::new(name, ty));
            Ok(())
        };

        for reduction in reductions {
            let name = &self.weights.schema().field(reduction.attr).name;
            match (reduction.mode, &reduction.catalog) {
                (AllocationMode::Sum | AllocationMode::Average, _) => add(&mut schema, name, FieldType::Double)?,
                (AllocationMode::DiscreteOverlap | AllocationMode::DiscreteCentroid, _) => add(&mut schema, name, reduction.ty)?,
                (AllocationMode::AreaPercent, Some(catalog)) => {
                    for field in catalog.field_names() {
                        add(&mut schema, field, FieldType::Double)?;
                    }
                }
                (AllocationMode::AreaPercent, None) => {}
            }
        }

        Ok(schema)
    }

    /// Largest-overlap weight polygon of every output polygon.
    fn overlap_winners(&self, index: &PieceIndex) -> Vec<Option<PolygonId>> {
        self.data.ids()
            .map(|id| reduce::discrete_overlap(PieceGroup::new(self.pieces.pieces(), index.members(id))))
            .collect()
    }

    /// Weight polygon covering the centroid of every output polygon.
    fn centroid_winners(&self, index: &PieceIndex) -> Vec<Option<PolygonId>> {
        self.data.ids()
            .map(|id| {
                let group = PieceGroup::new(self.pieces.pieces(), index.members(id));
                reduce::discrete_centroid(group, self.weights, self.data.geoms().centroid(id.index()))
            })
            .collect()
    }
}
