use crate::colors::{blend, hex_to_rgba};
use crate::render::{ChoroplethMap, Region};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::Point;
use image::{ImageBuffer, Rgba, RgbaImage};
use rayon::prelude::*;
use rstar::{RTree, RTreeObject, AABB};

const BACKGROUND: &str = "#e8ecef";

/// Bounding box entry pointing back into `ChoroplethMap::regions`.
pub struct RegionIndex {
    pub index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for RegionIndex {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub fn build_index(regions: &[Region]) -> RTree<RegionIndex> {
    let items = regions
        .iter()
        .enumerate()
        .filter_map(|(index, region)| {
            // Empty geometries have no bounding box
            let rect = region.geometry.bounding_rect()?;
            Some(RegionIndex {
                index,
                aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
            })
        })
        .collect();
    RTree::bulk_load(items)
}

/// First region containing the lon/lat point.
pub fn locate<'a>(
    tree: &RTree<RegionIndex>,
    regions: &'a [Region],
    lon: f64,
    lat: f64,
) -> Option<&'a Region> {
    let point = Point::new(lon, lat);
    tree.locate_in_envelope_intersecting(&AABB::from_point([lon, lat]))
        .filter_map(|candidate| regions.get(candidate.index))
        .find(|region| region.geometry.contains(&point))
}

/// Equirectangular raster of the map, lon -180..180 by lat 90..-90.
/// A zero dimension yields an empty image.
pub fn rasterize(map: &ChoroplethMap, width: u32, height: u32) -> RgbaImage {
    if width == 0 || height == 0 {
        return ImageBuffer::new(width, height);
    }
    let tree = build_index(&map.regions);
    let background = hex_to_rgba(BACKGROUND);
    let colors: Vec<Rgba<u8>> = map
        .regions
        .iter()
        .map(|r| {
            let fill = map.ramp.sample(map.scale.normalize(r.color_value));
            blend(fill, background, map.opacity)
        })
        .collect();

    let mut img: RgbaImage = ImageBuffer::from_pixel(width, height, background);
    let row_len = width as usize * 4;

    img.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let lat = 90.0 - (y as f64 + 0.5) * 180.0 / height as f64;
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let lon = -180.0 + (x as f64 + 0.5) * 360.0 / width as f64;
                let hit = tree
                    .locate_in_envelope_intersecting(&AABB::from_point([lon, lat]))
                    .find(|c| map.regions[c.index].geometry.contains(&Point::new(lon, lat)));
                if let Some(candidate) = hit {
                    px.copy_from_slice(&colors[candidate.index].0);
                }
            }
        });

    img
}
