use crate::config::LabelConfig;
use crate::types::{MapLabel, Region, RegionPoint};
use anyhow::{Result, anyhow};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::centroid::Centroid;
use geo::{Coord, Point, Rect};
use std::collections::HashMap;

/// One label anchor per boundary, at the area-weighted centroid (not the
/// bounding-box center, which lands outside non-convex shapes). Attributes
/// carry over unchanged.
pub fn derive_centroids(regions: &[Region]) -> Result<Vec<RegionPoint>> {
    regions
        .iter()
        .map(|region| {
            let point = region.geometry.centroid().ok_or_else(|| {
                anyhow!("Boundary '{}' has no area to take a centroid of", region.name)
            })?;
            Ok(RegionPoint {
                code: region.code.clone(),
                name: region.name.clone(),
                point,
            })
        })
        .collect()
}

/// Splits a display name onto two lines at the first space so labels fit
/// inside small polygons. Names without a space pass through unchanged.
pub fn wrap_name(name: &str) -> String {
    name.replacen(' ', "\n", 1)
}

/// Order-preserving filter down to the named regions.
pub fn filter_by_name(mut regions: Vec<Region>, names: &[String]) -> Vec<Region> {
    regions.retain(|region| names.iter().any(|n| n == &region.name));
    regions
}

/// Manual nudge for labels whose centroid placement is poor. Names absent
/// from the table get (0, 0).
pub fn label_offset(offsets: &HashMap<String, [f64; 2]>, name: &str) -> (f64, f64) {
    match offsets.get(name) {
        Some([dx, dy]) => (*dx, *dy),
        None => (0.0, 0.0),
    }
}

/// Wraps each name and shifts each anchor by its configured offset.
pub fn place_labels(points: &[RegionPoint], config: &LabelConfig) -> Vec<MapLabel> {
    points
        .iter()
        .map(|point| {
            let (dx, dy) = label_offset(&config.offsets, &point.name);
            MapLabel {
                text: wrap_name(&point.name),
                position: Point::new(point.point.x() + dx, point.point.y() + dy),
            }
        })
        .collect()
}

/// Minimal axis-aligned box around every boundary in the collection.
pub fn extent(regions: &[Region]) -> Option<Rect<f64>> {
    let mut combined: Option<Rect<f64>> = None;

    for region in regions {
        let Some(rect) = region.geometry.bounding_rect() else { continue };
        combined = Some(match combined {
            Some(acc) => Rect::new(
                Coord {
                    x: acc.min().x.min(rect.min().x),
                    y: acc.min().y.min(rect.min().y),
                },
                Coord {
                    x: acc.max().x.max(rect.max().x),
                    y: acc.max().y.max(rect.max().y),
                },
            ),
            None => rect,
        });
    }

    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, MultiPolygon, Polygon};

    fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![
                (x, y),
                (x + size, y),
                (x + size, y + size),
                (x, y + size),
                (x, y),
            ]),
            vec![],
        )])
    }

    fn region(name: &str, x: f64, y: f64) -> Region {
        Region {
            code: None,
            name: name.to_string(),
            geometry: square(x, y, 1.0),
        }
    }

    #[test]
    fn wrapping_replaces_only_the_first_space() {
        assert_eq!(wrap_name("San Juan"), "San\nJuan");
        assert_eq!(wrap_name("Walla Walla County"), "Walla\nWalla County");
        assert_eq!(wrap_name("Kitsap"), "Kitsap");
        assert_eq!(wrap_name(""), "");
    }

    #[test]
    fn centroids_are_one_per_boundary_with_attributes_copied() {
        let regions = vec![
            Region {
                code: Some("001".to_string()),
                name: "Adams".to_string(),
                geometry: square(0.0, 0.0, 2.0),
            },
            Region {
                code: None,
                name: "Asotin".to_string(),
                geometry: square(10.0, 10.0, 2.0),
            },
        ];
        let points = derive_centroids(&regions).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].code.as_deref(), Some("001"));
        assert_eq!(points[0].name, "Adams");
        assert!((points[0].point.x() - 1.0).abs() < 1e-9);
        assert!((points[0].point.y() - 1.0).abs() < 1e-9);
        assert_eq!(points[1].name, "Asotin");
    }

    #[test]
    fn centroid_stays_inside_a_notched_boundary() {
        // L-shape whose bounding-box center (2, 2) falls outside the shape;
        // the area-weighted centroid is pulled into the arms
        let l_shape = MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (4.0, 0.0),
                (4.0, 1.0),
                (1.0, 1.0),
                (1.0, 4.0),
                (0.0, 4.0),
                (0.0, 0.0),
            ]),
            vec![],
        )]);
        let regions = vec![Region {
            code: None,
            name: "Hook".to_string(),
            geometry: l_shape,
        }];
        let points = derive_centroids(&regions).unwrap();
        assert!(points[0].point.x() < 2.0);
        assert!(points[0].point.y() < 2.0);
    }

    #[test]
    fn filtering_is_order_preserving_and_idempotent() {
        let states = vec![
            region("California", 0.0, 0.0),
            region("Oregon", 1.0, 0.0),
            region("Idaho", 2.0, 0.0),
            region("Nevada", 3.0, 0.0),
        ];
        let keep = vec!["Idaho".to_string(), "Oregon".to_string()];

        let filtered = filter_by_name(states, &keep);
        let names: Vec<&str> = filtered.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Oregon", "Idaho"]);

        let again = filter_by_name(filtered.clone(), &keep);
        let again_names: Vec<&str> = again.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(again_names, names);
    }

    #[test]
    fn offsets_default_to_zero() {
        let mut offsets = HashMap::new();
        offsets.insert("San Juan".to_string(), [-0.15, 0.10]);
        offsets.insert("Island".to_string(), [0.08, -0.12]);
        offsets.insert("Kitsap".to_string(), [-0.06, -0.05]);

        assert_eq!(label_offset(&offsets, "San Juan"), (-0.15, 0.10));
        assert_eq!(label_offset(&offsets, "Island"), (0.08, -0.12));
        assert_eq!(label_offset(&offsets, "Kitsap"), (-0.06, -0.05));
        assert_eq!(label_offset(&offsets, "King"), (0.0, 0.0));
    }

    #[test]
    fn placed_labels_wrap_and_shift() {
        let points = vec![RegionPoint {
            code: None,
            name: "San Juan".to_string(),
            point: Point::new(1.0, 2.0),
        }];
        let mut offsets = HashMap::new();
        offsets.insert("San Juan".to_string(), [0.5, -0.5]);
        let config = LabelConfig {
            font_family: "sans-serif".to_string(),
            font_size: 11.0,
            color: "#222222".to_string(),
            offsets,
        };

        let labels = place_labels(&points, &config);
        assert_eq!(labels[0].text, "San\nJuan");
        assert!((labels[0].position.x() - 1.5).abs() < 1e-9);
        assert!((labels[0].position.y() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn extent_is_reorder_invariant() {
        let mut regions = vec![
            region("A", 0.0, 0.0),
            region("B", 5.0, -3.0),
            region("C", -2.0, 7.0),
        ];
        let forward = extent(&regions).unwrap();
        regions.reverse();
        let reversed = extent(&regions).unwrap();

        assert_eq!(forward, reversed);
        assert_eq!(forward.min(), Coord { x: -2.0, y: -3.0 });
        assert_eq!(forward.max(), Coord { x: 6.0, y: 8.0 });
    }

    #[test]
    fn extent_of_nothing_is_none() {
        assert_eq!(extent(&[]), None);
    }

    #[test]
    fn a_full_county_set_yields_one_label_anchor_each() {
        let counties: Vec<Region> = (0..39)
            .map(|i| {
                region(
                    &format!("County {}", i),
                    f64::from(i % 8) * 2.0,
                    f64::from(i / 8) * 2.0,
                )
            })
            .collect();
        let points = derive_centroids(&counties).unwrap();
        assert_eq!(points.len(), 39);

        let states = vec![
            region("Washington", 0.0, 0.0),
            region("Oregon", 0.0, -10.0),
            region("Idaho", 10.0, 0.0),
            region("Montana", 20.0, 0.0),
            region("California", 0.0, -20.0),
        ];
        let keep = vec!["Idaho".to_string(), "Oregon".to_string()];
        let neighbors = filter_by_name(states, &keep);
        assert_eq!(neighbors.len(), 2);
        assert!(neighbors.iter().all(|r| keep.contains(&r.name)));
    }
}
