use anyhow::{Context, Result, anyhow};
use geo::MultiPolygon;
use geojson::GeoJson;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Loads supplementary marine/water polygons from a local vector file.
///
/// These are drawn purely for visual context; no attributes are kept.
pub fn load_marine(path: &Path) -> Result<Vec<MultiPolygon<f64>>> {
    println!("Loading marine geometry from {:?}...", path);

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| anyhow!("Marine geometry file has no extension: {:?}", path))?;

    let polygons = match extension.as_str() {
        "shp" => load_shapefile(path)?,
        "json" | "geojson" => load_geojson(path)?,
        _ => return Err(anyhow!("Unsupported marine geometry format: {}", extension)),
    };

    println!("Loaded {} marine polygons", polygons.len());
    Ok(polygons)
}

fn load_shapefile(path: &Path) -> Result<Vec<MultiPolygon<f64>>> {
    let mut reader = shapefile::Reader::from_path(path)
        .with_context(|| format!("Failed to open marine shapefile: {:?}", path))?;

    let mut polygons = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, _record) = result?;
        match shape {
            shapefile::Shape::Polygon(polygon) => {
                let geometry: MultiPolygon<f64> = polygon
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?;
                polygons.push(geometry);
            }
            shapefile::Shape::PolygonM(polygon) => {
                let geometry: MultiPolygon<f64> = polygon
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?;
                polygons.push(geometry);
            }
            shapefile::Shape::PolygonZ(polygon) => {
                let geometry: MultiPolygon<f64> = polygon
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?;
                polygons.push(geometry);
            }
            _ => {} // skip non-polygon shapes
        }
    }

    Ok(polygons)
}

fn load_geojson(path: &Path) -> Result<Vec<MultiPolygon<f64>>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open marine geometry: {:?}", path))?;
    let reader = BufReader::new(file);
    let geojson = GeoJson::from_reader(reader).context("Failed to parse marine GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("Marine geometry must be a FeatureCollection")),
    };

    let mut polygons = Vec::new();

    for feature in collection.features {
        let Some(geometry) = feature.geometry else { continue };
        let converted: geo::Geometry<f64> = geometry
            .value
            .try_into()
            .map_err(|e| anyhow!("Failed to convert marine geometry: {:?}", e))?;
        match converted {
            geo::Geometry::Polygon(p) => polygons.push(MultiPolygon::new(vec![p])),
            geo::Geometry::MultiPolygon(mp) => polygons.push(mp),
            _ => {}
        }
    }

    Ok(polygons)
}
