use geo::{Point, MultiPolygon};

/// One administrative boundary (a county or a state) as fetched from a
/// feature service.
#[derive(Debug, Clone)]
pub struct Region {
    pub code: Option<String>,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// Label anchor derived from a [`Region`]; attributes carry over unchanged.
#[derive(Debug, Clone)]
pub struct RegionPoint {
    pub code: Option<String>,
    pub name: String,
    pub point: Point<f64>,
}

/// A placed label: wrapped text at an anchor already shifted by its offset.
#[derive(Debug, Clone, PartialEq)]
pub struct MapLabel {
    pub text: String,
    pub position: Point<f64>,
}
