use crate::colors::ColorRamp;
use crate::config::{Center, Margin, RenderConfig};
use crate::error::{PipelineError, Result};
use crate::geometry::to_feature_collection;
use crate::scale::ColorScale;
use crate::types::{CaseRecord, GeoFeature};
use geo::MultiPolygon;
use geojson::FeatureCollection;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// A drawn zone: matched geometry plus its case data.
#[derive(Debug, Clone)]
pub struct Region {
    pub zone: String,
    pub count: u64,
    pub color_value: f64,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColorBar {
    pub title: Title,
    pub tickvals: Vec<u32>,
    pub ticktext: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Title {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub opacity: f64,
}

/// Plotly `choroplethmapbox` trace.
#[derive(Debug, Clone, Serialize)]
pub struct ChoroplethTrace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geojson: FeatureCollection,
    pub featureidkey: &'static str,
    pub locations: Vec<String>,
    pub z: Vec<f64>,
    pub zmin: f64,
    pub zmax: f64,
    pub colorscale: Vec<(f64, String)>,
    pub colorbar: ColorBar,
    pub marker: Marker,
    pub hovertext: Vec<String>,
    pub customdata: Vec<u64>,
    pub hovertemplate: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Mapbox {
    pub style: String,
    pub center: MapCenter,
    pub zoom: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MapCenter {
    pub lat: f64,
    pub lon: f64,
}

impl From<Center> for MapCenter {
    fn from(c: Center) -> Self {
        Self { lat: c.lat, lon: c.lon }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LayoutMargin {
    pub r: u32,
    pub t: u32,
    pub l: u32,
    pub b: u32,
}

impl From<Margin> for LayoutMargin {
    fn from(m: Margin) -> Self {
        Self { r: m.r, t: m.t, l: m.l, b: m.b }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MapLayout {
    pub mapbox: Mapbox,
    pub margin: LayoutMargin,
}

#[derive(Serialize)]
struct Figure<'a> {
    data: [&'a ChoroplethTrace; 1],
    layout: &'a MapLayout,
}

/// Renderable choropleth description. Drawing it is left to a viewer.
#[derive(Debug, Clone)]
pub struct ChoroplethMap {
    pub trace: ChoroplethTrace,
    pub layout: MapLayout,
    pub scale: ColorScale,
    pub regions: Vec<Region>,
    pub ramp: ColorRamp,
    pub opacity: f64,
}

pub fn render(
    records: &[CaseRecord],
    matched: &[GeoFeature],
    config: &RenderConfig,
) -> Result<ChoroplethMap> {
    let ramp = ColorRamp::by_name(&config.colorscale).ok_or_else(|| {
        PipelineError::malformed(format!("unknown colour scale '{}'", config.colorscale))
    })?;
    let scale = ColorScale::from_records(records)?;

    let by_zone: HashMap<&str, (u64, f64)> = records
        .iter()
        .zip(&scale.values)
        .map(|(r, v)| (r.zone.as_str(), (r.count, *v)))
        .collect();

    // Records without geometry are simply not drawn
    let regions: Vec<Region> = matched
        .iter()
        .filter_map(|f| {
            by_zone.get(f.id.as_str()).map(|&(count, color_value)| Region {
                zone: f.id.clone(),
                count,
                color_value,
                geometry: f.geometry.clone(),
            })
        })
        .collect();

    info!(
        "Rendering {} of {} zones, colour axis 0..{:.3} over {} decades",
        regions.len(),
        records.len(),
        scale.max_value,
        scale.max_log
    );

    let trace = ChoroplethTrace {
        kind: "choroplethmapbox",
        geojson: to_feature_collection(matched),
        featureidkey: "id",
        locations: regions.iter().map(|r| r.zone.clone()).collect(),
        z: regions.iter().map(|r| r.color_value).collect(),
        zmin: 0.0,
        zmax: scale.max_value,
        colorscale: ramp.plotly_stops(),
        colorbar: ColorBar {
            title: Title {
                text: config.colorbar_title.clone(),
            },
            tickvals: scale.tick_values.clone(),
            ticktext: scale.tick_labels.iter().map(u64::to_string).collect(),
        },
        marker: Marker {
            opacity: config.opacity,
        },
        hovertext: regions.iter().map(|r| r.zone.clone()).collect(),
        customdata: regions.iter().map(|r| r.count).collect(),
        hovertemplate: "<b>%{hovertext}</b><br>count=%{customdata}<extra></extra>",
    };

    let layout = MapLayout {
        mapbox: Mapbox {
            style: config.map_style.clone(),
            center: config.center.into(),
            zoom: config.zoom,
        },
        margin: config.margin.into(),
    };

    Ok(ChoroplethMap {
        trace,
        layout,
        scale,
        regions,
        ramp,
        opacity: config.opacity,
    })
}

impl ChoroplethMap {
    /// Plotly figure (`{"data": [...], "layout": {...}}`).
    pub fn to_figure_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&Figure {
            data: [&self.trace],
            layout: &self.layout,
        })
    }

    /// Standalone viewer page plotting the embedded figure with plotly.js.
    pub fn to_html(&self, title: &str) -> serde_json::Result<String> {
        // Keep the payload from closing the script element
        let figure = self.to_figure_json()?.replace("</", "<\\/");
        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{PLOTLY_JS}"></script>
<style>html, body, #map {{ margin: 0; width: 100%; height: 100%; }}</style>
</head>
<body>
<div id="map"></div>
<script>
const figure = {figure};
Plotly.newPlot("map", figure.data, figure.layout, {{ responsive: true }});
</script>
</body>
</html>
"#,
            title = html_escape(title),
        ))
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn feature(name: &str) -> GeoFeature {
        GeoFeature {
            name: name.to_string(),
            id: name.to_string(),
            geometry: MultiPolygon::new(vec![polygon![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 1.0, y: 1.0),
            ]]),
        }
    }

    fn record(zone: &str, count: u64) -> CaseRecord {
        CaseRecord {
            zone: zone.to_string(),
            count,
        }
    }

    #[test]
    fn trace_follows_matched_features() {
        let records = vec![record("A", 100), record("B", 5), record("Nowhere", 10_000)];
        let matched = vec![feature("B"), feature("A")];

        let map = render(&records, &matched, &RenderConfig::default()).unwrap();

        assert_eq!(map.trace.locations, ["B", "A"]);
        assert_eq!(map.trace.customdata, [5, 100]);
        assert_eq!(map.trace.z[1], 2.0);
        // Axis spans every record, drawn or not
        assert_eq!(map.scale.max_log, 5);
        assert_eq!(map.trace.zmax, 4.0);
        assert_eq!(map.trace.colorbar.ticktext, ["1", "10", "100", "1000", "10000"]);
        assert!(map.regions.iter().all(|r| r.zone != "Nowhere"));
    }

    #[test]
    fn figure_json_has_plotly_shape() {
        let records = vec![record("A", 100), record("B", 5)];
        let map = render(&records, &[feature("A")], &RenderConfig::default()).unwrap();

        let fig: serde_json::Value = serde_json::from_str(&map.to_figure_json().unwrap()).unwrap();
        let trace = &fig["data"][0];
        assert_eq!(trace["type"], "choroplethmapbox");
        assert_eq!(trace["featureidkey"], "id");
        assert_eq!(trace["geojson"]["features"][0]["id"], "A");
        assert_eq!(trace["marker"]["opacity"], 0.6);
        assert_eq!(trace["colorbar"]["tickvals"], serde_json::json!([0, 1, 2]));
        assert_eq!(trace["colorbar"]["title"]["text"], "Confirmed people");
        assert_eq!(trace["colorscale"][0][1], "#ffffcc");
        assert_eq!(fig["layout"]["mapbox"]["center"]["lat"], 19.0);
        assert_eq!(fig["layout"]["mapbox"]["style"], "open-street-map");
        assert_eq!(fig["layout"]["margin"]["t"], 0);
    }

    #[test]
    fn zero_count_fails_before_drawing() {
        let records = vec![record("A", 0)];
        let err = render(&records, &[feature("A")], &RenderConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::DomainError { .. }));
    }

    #[test]
    fn empty_records_fail() {
        let err = render(&[], &[], &RenderConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyResult(_)));
    }

    #[test]
    fn html_embeds_figure_safely() {
        let mut f = feature("A");
        f.id = "</script>".to_string();
        let records = vec![record("</script>", 3)];
        let map = render(&records, &[f], &RenderConfig::default()).unwrap();

        let html = map.to_html("Cases & <deaths>").unwrap();
        assert!(html.contains("Plotly.newPlot"));
        assert!(html.contains("<title>Cases &amp; &lt;deaths&gt;</title>"));
        assert_eq!(html.matches("</script>").count(), 2);
    }
}
