use crate::config::AppConfig;
use crate::data;
use crate::error::{PipelineError, Result};
use crate::fetcher::{load_source, Fetch};
use crate::geometry;
use crate::raster;
use crate::render::{render, ChoroplethMap};
use crate::types::{CaseRecord, MatchResult};
use std::fs;
use std::path::Path;
use tracing::info;

pub struct PipelineOutput {
    pub records: Vec<CaseRecord>,
    pub matches: MatchResult,
    pub map: ChoroplethMap,
}

/// Loader, Matcher and Renderer, in that order. Nothing is shared between
/// calls except the on-disk cache.
pub async fn run(config: &AppConfig, fetcher: &dyn Fetch) -> Result<PipelineOutput> {
    let raw = load_source(&config.input.cache_path, fetcher).await?;
    let records = data::load_cases(&raw, config.input.delimiter, &config.filter)?;
    data::ensure_non_empty(&records, &config.filter)?;
    data::ensure_positive(&records)?;

    let features = geometry::load_features(&config.input.geo_path, &config.input.name_property)?;
    let matches = geometry::match_geometries(&records, features);

    let map = render(&records, &matches.matched, &config.render)?;

    Ok(PipelineOutput {
        records,
        matches,
        map,
    })
}

/// Writes the figure JSON, the HTML viewer and, when configured, a PNG.
pub fn write_outputs(map: &ChoroplethMap, config: &AppConfig) -> Result<()> {
    let output = &config.output;
    let figure = map
        .to_figure_json()
        .map_err(|e| PipelineError::malformed(format!("cannot serialize figure: {}", e)))?;
    write_file(&output.figure_json, figure.as_bytes())?;

    let title = format!(
        "{} cases on {}",
        config.filter.category, config.filter.date
    );
    let html = map
        .to_html(&title)
        .map_err(|e| PipelineError::malformed(format!("cannot serialize figure: {}", e)))?;
    write_file(&output.html, html.as_bytes())?;
    info!("Map written to {:?}", output.html);

    if let Some(png) = &output.png {
        if output.png_width == 0 || output.png_height == 0 {
            return Err(PipelineError::malformed(format!(
                "PNG dimensions must be positive, got {}x{}",
                output.png_width, output.png_height
            )));
        }
        let img = raster::rasterize(map, output.png_width, output.png_height);
        create_parent(png)?;
        img.save(png)
            .map_err(|e| PipelineError::malformed(format!("cannot write PNG {:?}: {}", png, e)))?;
        info!("Raster written to {:?}", png);
    }

    Ok(())
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| PipelineError::io(format!("cannot create {:?}", parent), e))?;
    }
    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    create_parent(path)?;
    fs::write(path, contents).map_err(|e| PipelineError::io(format!("cannot write {:?}", path), e))
}
