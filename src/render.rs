use crate::config::{LabelConfig, OutputConfig, StyleConfig};
use crate::types::{MapLabel, Region};
use anyhow::{Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon, Rect};
use std::fmt::Write as _;
use std::fs;

/// One draw operation. The map is an ordered list of these; later layers
/// draw over earlier ones.
#[derive(Debug, Clone)]
pub enum Layer {
    Fill {
        geometries: Vec<MultiPolygon<f64>>,
        color: String,
    },
    Outline {
        geometries: Vec<MultiPolygon<f64>>,
        color: String,
        width: f64,
    },
    Labels {
        labels: Vec<MapLabel>,
        font_family: String,
        font_size: f64,
        color: String,
    },
}

/// Builds the draw plan. Order is load-bearing: the county outline is
/// redrawn after every fill so shared borders aren't lost under adjacent
/// fills, and labels go on top of everything.
pub fn build_layers(
    style: &StyleConfig,
    label_config: &LabelConfig,
    counties: &[Region],
    neighbors: &[Region],
    marine: &[MultiPolygon<f64>],
    labels: Vec<MapLabel>,
) -> Vec<Layer> {
    let county_geometries: Vec<MultiPolygon<f64>> =
        counties.iter().map(|r| r.geometry.clone()).collect();
    let neighbor_geometries: Vec<MultiPolygon<f64>> =
        neighbors.iter().map(|r| r.geometry.clone()).collect();

    vec![
        Layer::Fill {
            geometries: neighbor_geometries,
            color: style.state_fill.clone(),
        },
        Layer::Fill {
            geometries: county_geometries.clone(),
            color: style.county_fill.clone(),
        },
        Layer::Fill {
            geometries: marine.to_vec(),
            color: style.marine_fill.clone(),
        },
        Layer::Outline {
            geometries: county_geometries,
            color: style.county_outline.clone(),
            width: style.outline_width,
        },
        Layer::Labels {
            labels,
            font_family: label_config.font_family.clone(),
            font_size: label_config.font_size,
            color: label_config.color.clone(),
        },
    ]
}

/// Linear fit of an EPSG:4326 extent into the pixel frame: aspect-preserving,
/// centered, with a margin on all sides. Y is flipped (north up).
pub struct Viewport {
    min: Coord<f64>,
    scale: f64,
    x_pad: f64,
    y_pad: f64,
    height: f64,
}

impl Viewport {
    pub fn fit(extent: Rect<f64>, width: f64, height: f64, margin: f64) -> Self {
        let dx = extent.width().max(f64::EPSILON);
        let dy = extent.height().max(f64::EPSILON);
        let scale = ((width - 2.0 * margin) / dx).min((height - 2.0 * margin) / dy);
        Viewport {
            min: extent.min(),
            scale,
            x_pad: (width - dx * scale) / 2.0,
            y_pad: (height - dy * scale) / 2.0,
            height,
        }
    }

    pub fn project(&self, coord: Coord<f64>) -> (f64, f64) {
        let x = self.x_pad + (coord.x - self.min.x) * self.scale;
        let y = self.height - (self.y_pad + (coord.y - self.min.y) * self.scale);
        (x, y)
    }
}

pub fn write_map(output: &OutputConfig, layers: &[Layer], extent: Rect<f64>) -> Result<()> {
    let svg = render_svg(output, layers, extent);

    if let Some(parent) = output.path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {:?}", parent))?;
        }
    }
    fs::write(&output.path, svg)
        .with_context(|| format!("Failed to write map to {:?}", output.path))?;

    println!("Wrote map to {:?}", output.path);
    Ok(())
}

pub fn render_svg(output: &OutputConfig, layers: &[Layer], extent: Rect<f64>) -> String {
    let width = f64::from(output.width);
    let height = f64::from(output.height);
    let viewport = Viewport::fit(extent, width, height, output.margin);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        output.width, output.height, output.width, output.height
    );

    for layer in layers {
        match layer {
            Layer::Fill { geometries, color } => {
                for geometry in geometries {
                    for polygon in &geometry.0 {
                        let _ = writeln!(
                            svg,
                            r#"  <path d="{}" fill="{}" fill-rule="evenodd" stroke="none"/>"#,
                            path_data(polygon, &viewport),
                            color
                        );
                    }
                }
            }
            Layer::Outline { geometries, color, width } => {
                for geometry in geometries {
                    for polygon in &geometry.0 {
                        let _ = writeln!(
                            svg,
                            r#"  <path d="{}" fill="none" stroke="{}" stroke-width="{}" stroke-linejoin="round"/>"#,
                            path_data(polygon, &viewport),
                            color,
                            width
                        );
                    }
                }
            }
            Layer::Labels { labels, font_family, font_size, color } => {
                for label in labels {
                    svg.push_str(&text_element(label, &viewport, font_family, *font_size, color));
                }
            }
        }
    }

    svg.push_str("</svg>\n");
    svg
}

fn path_data(polygon: &Polygon<f64>, viewport: &Viewport) -> String {
    let mut d = String::new();
    ring_path(&mut d, polygon.exterior(), viewport);
    for interior in polygon.interiors() {
        ring_path(&mut d, interior, viewport);
    }
    d.trim_end().to_string()
}

fn ring_path(d: &mut String, ring: &LineString<f64>, viewport: &Viewport) {
    for (i, coord) in ring.coords().enumerate() {
        let (x, y) = viewport.project(*coord);
        let command = if i == 0 { 'M' } else { 'L' };
        let _ = write!(d, "{}{:.2} {:.2} ", command, x, y);
    }
    d.push_str("Z ");
}

fn text_element(
    label: &MapLabel,
    viewport: &Viewport,
    font_family: &str,
    font_size: f64,
    color: &str,
) -> String {
    let (x, y) = viewport.project(label.position.0);
    let lines: Vec<&str> = label.text.split('\n').collect();
    let line_height = font_size * 1.1;
    // center the whole block vertically on the anchor
    let first_y = y - (lines.len() as f64 - 1.0) * line_height / 2.0;

    let mut element = format!(
        r#"  <text x="{:.2}" y="{:.2}" text-anchor="middle" font-family="{}" font-size="{}" fill="{}">{}"#,
        x,
        first_y,
        xml_escape(font_family),
        font_size,
        color,
        xml_escape(lines[0])
    );
    for line in &lines[1..] {
        let _ = write!(
            element,
            r#"<tspan x="{:.2}" dy="{:.2}">{}</tspan>"#,
            x,
            line_height,
            xml_escape(line)
        );
    }
    element.push_str("</text>\n");
    element
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
