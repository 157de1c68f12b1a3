use geo::MultiPolygon;

/// Case count for one zone after aggregation. Zones are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRecord {
    pub zone: String,
    pub count: u64,
}

#[derive(Debug, Clone)]
pub struct GeoFeature {
    pub name: String,
    // Equal to `name`, used as the map locus key
    pub id: String,
    pub geometry: MultiPolygon<f64>,
}

/// Outcome of joining feature names against the case zones.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    pub matched: Vec<GeoFeature>,
    pub found: Vec<String>,
    pub missing: Vec<String>,
}
