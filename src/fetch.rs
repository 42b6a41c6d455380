use crate::config::{ArcgisSource, QueryFormat};
use crate::types::Region;
use anyhow::{Context, Result, anyhow, bail};
use geo::algorithm::contains::Contains;
use geo::algorithm::winding_order::{Winding, WindingOrder};
use geo::{LineString, MultiPolygon, Point, Polygon};
use geojson::GeoJson;
use reqwest::Client;
use serde::Deserialize;

const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Fetches every feature from an ArcGIS FeatureServer query endpoint.
///
/// Pages through the layer with `resultOffset` until a short page comes
/// back. The output spatial reference is always requested as EPSG:4326 so
/// downstream geometry is comparable without reprojection.
pub async fn fetch_regions(client: &Client, source: &ArcgisSource) -> Result<Vec<Region>> {
    let page_size = source.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    let mut regions = Vec::new();
    let mut offset = 0;

    loop {
        let body = fetch_page(client, source, offset, page_size).await?;
        let page = parse_features(&body, source)?;
        let fetched = page.len();
        tracing::debug!(url = %source.url, offset, fetched, "fetched page");
        regions.extend(page);
        if fetched < page_size as usize {
            break;
        }
        offset += page_size;
    }

    println!("Fetched {} features from {}", regions.len(), source.url);
    Ok(regions)
}

async fn fetch_page(
    client: &Client,
    source: &ArcgisSource,
    offset: u32,
    count: u32,
) -> Result<String> {
    let response = client
        .get(&source.url)
        .query(&query_params(source, offset, count))
        .send()
        .await
        .with_context(|| format!("Request to {} failed", source.url))?;

    let response = response
        .error_for_status()
        .with_context(|| format!("Query against {} was rejected", source.url))?;

    let body = response
        .text()
        .await
        .with_context(|| format!("Failed to read response body from {}", source.url))?;

    // ArcGIS reports many failures as HTTP 200 with an error object
    check_service_error(&body, &source.url)?;
    Ok(body)
}

fn query_params(source: &ArcgisSource, offset: u32, count: u32) -> Vec<(&'static str, String)> {
    let where_clause = source
        .where_clause
        .clone()
        .unwrap_or_else(|| "1=1".to_string());
    let out_fields = if source.out_fields.is_empty() {
        "*".to_string()
    } else {
        source.out_fields.join(",")
    };

    vec![
        ("where", where_clause),
        ("outFields", out_fields),
        ("outSR", "4326".to_string()),
        ("f", source.format.as_query_value().to_string()),
        ("returnGeometry", "true".to_string()),
        ("resultOffset", offset.to_string()),
        ("resultRecordCount", count.to_string()),
    ]
}

#[derive(Deserialize)]
struct ServiceErrorBody {
    error: ServiceError,
}

#[derive(Deserialize)]
struct ServiceError {
    code: i64,
    message: String,
}

fn check_service_error(body: &str, url: &str) -> Result<()> {
    if let Ok(payload) = serde_json::from_str::<ServiceErrorBody>(body) {
        bail!(
            "Query against {} failed: {} (code {})",
            url,
            payload.error.message,
            payload.error.code
        );
    }
    Ok(())
}

fn parse_features(body: &str, source: &ArcgisSource) -> Result<Vec<Region>> {
    match source.format {
        QueryFormat::Geojson => parse_geojson(body, source),
        QueryFormat::Json => parse_esri_json(body, source),
    }
}

fn parse_geojson(body: &str, source: &ArcgisSource) -> Result<Vec<Region>> {
    let geojson: GeoJson = body
        .parse()
        .with_context(|| format!("Malformed GeoJSON from {}", source.url))?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => bail!("Response from {} is not a FeatureCollection", source.url),
    };

    let mut regions = Vec::new();

    for feature in collection.features {
        let Some(properties) = feature.properties else { continue };
        // Skip features without a usable name rather than failing the run
        let Some(name) = attr_string(&properties, &source.name_field) else { continue };
        let code = source
            .code_field
            .as_deref()
            .and_then(|field| attr_string(&properties, field));

        let Some(geometry) = feature.geometry else { continue };
        let converted: geo::Geometry<f64> = geometry
            .value
            .try_into()
            .map_err(|e| anyhow!("Failed to convert geometry from {}: {:?}", source.url, e))?;

        let geometry = match converted {
            geo::Geometry::MultiPolygon(mp) => mp,
            geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
            _ => continue, // points and lines are not boundaries
        };

        regions.push(Region { code, name, geometry });
    }

    Ok(regions)
}

#[derive(Deserialize)]
struct EsriFeatureSet {
    #[serde(default)]
    features: Vec<EsriFeature>,
}

#[derive(Deserialize)]
struct EsriFeature {
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
    geometry: Option<EsriGeometry>,
}

#[derive(Deserialize)]
struct EsriGeometry {
    #[serde(default)]
    rings: Vec<Vec<[f64; 2]>>,
}

fn parse_esri_json(body: &str, source: &ArcgisSource) -> Result<Vec<Region>> {
    let feature_set: EsriFeatureSet = serde_json::from_str(body)
        .with_context(|| format!("Malformed Esri JSON from {}", source.url))?;

    let mut regions = Vec::new();

    for feature in feature_set.features {
        let Some(name) = attr_string(&feature.attributes, &source.name_field) else { continue };
        let code = source
            .code_field
            .as_deref()
            .and_then(|field| attr_string(&feature.attributes, field));

        let Some(geometry) = feature.geometry else { continue };
        let geometry = rings_to_multipolygon(geometry.rings);
        if geometry.0.is_empty() {
            continue;
        }

        regions.push(Region { code, name, geometry });
    }

    Ok(regions)
}

/// Esri ring orientation: clockwise rings are exteriors, counter-clockwise
/// rings are holes belonging to the exterior that contains them.
fn rings_to_multipolygon(rings: Vec<Vec<[f64; 2]>>) -> MultiPolygon<f64> {
    let mut exteriors: Vec<Polygon<f64>> = Vec::new();
    let mut holes: Vec<LineString<f64>> = Vec::new();

    for ring in rings {
        if ring.len() < 4 {
            continue; // not a closed ring
        }
        let line = LineString::from(ring.into_iter().map(|[x, y]| (x, y)).collect::<Vec<_>>());
        match line.winding_order() {
            Some(WindingOrder::Clockwise) => exteriors.push(Polygon::new(line, vec![])),
            _ => holes.push(line),
        }
    }

    for hole in holes {
        let probe = hole.0.first().copied().map(Point::from);
        let containing = probe.and_then(|pt| exteriors.iter().position(|p| p.contains(&pt)));
        match containing {
            Some(i) => exteriors[i].interiors_push(hole),
            // A hole with no surrounding exterior is almost certainly a
            // mis-wound exterior; keep it as its own polygon
            None => exteriors.push(Polygon::new(hole, vec![])),
        }
    }

    MultiPolygon::new(exteriors)
}

fn attr_string(
    properties: &serde_json::Map<String, serde_json::Value>,
    field: &str,
) -> Option<String> {
    match properties.get(field) {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}
