use crate::error::{PipelineError, Result};
use crate::types::{CaseRecord, GeoFeature, MatchResult};
use geo::MultiPolygon;
use geojson::{Feature, FeatureCollection, GeoJson, Value};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

pub fn load_features(path: &Path, name_property: &str) -> Result<Vec<GeoFeature>> {
    info!("Loading GeoJSON from {:?}...", path);
    let file = File::open(path)
        .map_err(|e| PipelineError::io(format!("cannot open GeoJSON file {:?}", path), e))?;
    // Loads the whole document into memory
    let geojson = GeoJson::from_reader(BufReader::new(file))
        .map_err(|e| PipelineError::malformed(format!("failed to parse GeoJSON: {}", e)))?;
    features_from_geojson(geojson, name_property)
}

pub fn features_from_geojson(geojson: GeoJson, name_property: &str) -> Result<Vec<GeoFeature>> {
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(PipelineError::malformed("GeoJSON must be a FeatureCollection")),
    };

    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(i, feature)| to_geo_feature(i, feature, name_property))
        .collect()
}

fn to_geo_feature(index: usize, feature: Feature, name_property: &str) -> Result<GeoFeature> {
    let name = feature
        .properties
        .as_ref()
        .and_then(|props| props.get(name_property))
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            PipelineError::malformed(format!(
                "feature #{} has no string property '{}'",
                index, name_property
            ))
        })?
        .to_string();

    let value = feature
        .geometry
        .map(|g| g.value)
        .ok_or_else(|| PipelineError::malformed(format!("feature '{}' has no geometry", name)))?;

    let geometry = match value {
        Value::Polygon(_) | Value::MultiPolygon(_) => {
            let geom: geo::Geometry<f64> = value.try_into().map_err(|e| {
                PipelineError::malformed(format!("feature '{}': bad geometry: {:?}", name, e))
            })?;
            match geom {
                geo::Geometry::MultiPolygon(mp) => mp,
                geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                other => {
                    return Err(PipelineError::malformed(format!(
                        "feature '{}': unexpected geometry {:?}",
                        name, other
                    )))
                }
            }
        }
        _ => {
            return Err(PipelineError::malformed(format!(
                "feature '{}' is not a Polygon or MultiPolygon",
                name
            )))
        }
    };

    Ok(GeoFeature {
        id: name.clone(),
        name,
        geometry,
    })
}

/// Exact, case-sensitive join of feature names against record zones.
///
/// Matched features keep their input order. `found` and `missing` together
/// hold every input feature name exactly once.
pub fn match_geometries(records: &[CaseRecord], features: Vec<GeoFeature>) -> MatchResult {
    let zones: HashSet<&str> = records.iter().map(|r| r.zone.as_str()).collect();
    let mut result = MatchResult::default();

    for feature in features {
        if zones.contains(feature.name.as_str()) {
            result.found.push(feature.name.clone());
            result.matched.push(GeoFeature {
                id: feature.name.clone(),
                ..feature
            });
        } else {
            result.missing.push(feature.name);
        }
    }

    info!("Countries found    : {}", result.found.len());
    info!("Countries not found: {}", result.missing.len());
    if !result.missing.is_empty() {
        debug!("Unmatched features: {:?}", result.missing);
    }

    result
}

/// Matched features as a collection whose feature ids are the zone names.
pub fn to_feature_collection(matched: &[GeoFeature]) -> FeatureCollection {
    let features = matched
        .iter()
        .map(|f| Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(Value::from(&f.geometry))),
            id: Some(geojson::feature::Id::String(f.id.clone())),
            properties: None,
            foreign_members: None,
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
