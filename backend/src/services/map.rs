//! Schematic live map: home, school and the bus on a fixed 2D canvas.
//!
//! Not a real map projection. Home and school sit at fixed spots and the bus
//! is placed by a linear scaling of its offset from the reference point.

use std::fmt::Write as _;

use crate::models::location::GeoPoint;

pub const DEFAULT_WIDTH: f64 = 800.0;
pub const DEFAULT_HEIGHT: f64 = 450.0;

const GRID_STEP: f64 = 20.0;
const HOME_COLOR: &str = "#4f46e5";
const SCHOOL_COLOR: &str = "#10b981";
const BUS_COLOR: &str = "#f59e0b";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Stroke<'a> {
    pub color: &'a str,
    pub width: f64,
    /// (dash, gap) lengths for a dashed line.
    pub dash: Option<(f64, f64)>,
}

/// Drawing surface the map is rendered onto.
pub trait Canvas {
    fn size(&self) -> (f64, f64);
    fn clear(&mut self);
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str);
    fn polyline(&mut self, points: &[Point], stroke: Stroke<'_>);
    fn fill_circle(&mut self, center: Point, radius: f64, color: &str);
    fn text(&mut self, at: Point, text: &str, color: &str);
}

/// Canvas-space positions of the three landmarks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapScene {
    pub home: Point,
    pub school: Point,
    pub vehicle: Option<Point>,
}

impl MapScene {
    pub fn new(width: f64, height: f64, origin: GeoPoint, vehicle: Option<GeoPoint>) -> Self {
        Self {
            home: Point { x: width * 0.3, y: height * 0.7 },
            school: Point { x: width * 0.7, y: height * 0.3 },
            vehicle: vehicle.map(|v| project(width, height, origin, v)),
        }
    }
}

/// Scale a GPS offset from `origin` onto the canvas.
pub fn project(width: f64, height: f64, origin: GeoPoint, position: GeoPoint) -> Point {
    Point {
        x: width * (0.3 + (position.longitude - origin.longitude) * 0.01),
        y: height * (0.3 + (position.latitude - origin.latitude) * 0.01),
    }
}

/// Draw the scene. Without a canvas this does nothing.
pub fn render(canvas: Option<&mut dyn Canvas>, scene: &MapScene) {
    let Some(canvas) = canvas else {
        return;
    };
    let (w, h) = canvas.size();

    canvas.clear();
    canvas.fill_rect(0.0, 0.0, w, h, "#f0f0f0");

    let grid = Stroke { color: "#ddd", width: 1.0, dash: None };
    let mut y = 0.0;
    while y < h {
        canvas.polyline(&[Point { x: 0.0, y }, Point { x: w, y }], grid);
        y += GRID_STEP;
    }
    let mut x = 0.0;
    while x < w {
        canvas.polyline(&[Point { x, y: 0.0 }, Point { x, y: h }], grid);
        x += GRID_STEP;
    }

    let main_road = Stroke { color: "#999", width: 8.0, dash: None };
    canvas.polyline(&[pt(w * 0.1, h * 0.5), pt(w * 0.9, h * 0.5)], main_road);
    canvas.polyline(&[pt(w * 0.5, h * 0.1), pt(w * 0.5, h * 0.9)], main_road);

    let side_road = Stroke { color: "#aaa", width: 4.0, dash: None };
    canvas.polyline(&[pt(w * 0.2, h * 0.2), pt(w * 0.8, h * 0.8)], side_road);
    canvas.polyline(&[pt(w * 0.2, h * 0.8), pt(w * 0.8, h * 0.2)], side_road);

    marker(canvas, scene.home, 10.0, HOME_COLOR, "Home", 20.0);
    marker(canvas, scene.school, 10.0, SCHOOL_COLOR, "School", 25.0);

    if let Some(bus) = scene.vehicle {
        marker(canvas, bus, 8.0, BUS_COLOR, "Bus", 15.0);
        canvas.polyline(
            &[scene.home, bus, scene.school],
            Stroke { color: BUS_COLOR, width: 2.0, dash: Some((5.0, 3.0)) },
        );
    }
}

fn pt(x: f64, y: f64) -> Point {
    Point { x, y }
}

fn marker(canvas: &mut dyn Canvas, at: Point, radius: f64, color: &str, label: &str, label_dx: f64) {
    canvas.fill_circle(at, radius, color);
    canvas.text(pt(at.x - label_dx, at.y - 15.0), label, "#000");
}

/// Renders into an SVG document.
pub struct SvgCanvas {
    width: f64,
    height: f64,
    body: String,
}

impl SvgCanvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height, body: String::new() }
    }

    pub fn finish(self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">{body}</svg>",
            w = self.width,
            h = self.height,
            body = self.body
        )
    }
}

impl Canvas for SvgCanvas {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.body.clear();
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str) {
        let _ = write!(
            self.body,
            "<rect x=\"{x}\" y=\"{y}\" width=\"{w}\" height=\"{h}\" fill=\"{color}\"/>"
        );
    }

    fn polyline(&mut self, points: &[Point], stroke: Stroke<'_>) {
        let coords: Vec<String> = points.iter().map(|p| format!("{:.1},{:.1}", p.x, p.y)).collect();
        let dash = stroke
            .dash
            .map(|(on, off)| format!(" stroke-dasharray=\"{on} {off}\""))
            .unwrap_or_default();
        let _ = write!(
            self.body,
            "<polyline points=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"{dash}/>",
            coords.join(" "),
            stroke.color,
            stroke.width
        );
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: &str) {
        let _ = write!(
            self.body,
            "<circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"{radius}\" fill=\"{color}\"/>",
            center.x, center.y
        );
    }

    fn text(&mut self, at: Point, text: &str, color: &str) {
        let _ = write!(
            self.body,
            "<text x=\"{:.1}\" y=\"{:.1}\" font-family=\"Arial\" font-size=\"14\" fill=\"{color}\">{text}</text>",
            at.x, at.y
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: GeoPoint = GeoPoint { latitude: 40.7128, longitude: -74.006 };

    #[test]
    fn test_projection_of_origin() {
        let p = project(800.0, 450.0, ORIGIN, ORIGIN);
        assert!((p.x - 240.0).abs() < 1e-9);
        assert!((p.y - 135.0).abs() < 1e-9);
    }

    #[test]
    fn test_projection_moves_with_offset() {
        let moved = GeoPoint { latitude: ORIGIN.latitude + 1.0, longitude: ORIGIN.longitude + 1.0 };
        let p = project(800.0, 450.0, ORIGIN, moved);
        assert!((p.x - 800.0 * 0.31).abs() < 1e-6);
        assert!((p.y - 450.0 * 0.31).abs() < 1e-6);
    }

    #[test]
    fn test_scene_landmarks_are_fixed() {
        let scene = MapScene::new(800.0, 450.0, ORIGIN, None);
        assert!((scene.home.x - 240.0).abs() < 1e-9 && (scene.home.y - 315.0).abs() < 1e-9);
        assert!((scene.school.x - 560.0).abs() < 1e-9 && (scene.school.y - 135.0).abs() < 1e-9);
        assert!(scene.vehicle.is_none());
    }

    #[test]
    fn test_render_without_canvas_is_noop() {
        let scene = MapScene::new(800.0, 450.0, ORIGIN, Some(ORIGIN));
        render(None, &scene);
    }

    #[test]
    fn test_svg_draws_bus_and_dashed_route_only_with_vehicle() {
        let mut without = SvgCanvas::new(DEFAULT_WIDTH, DEFAULT_HEIGHT);
        render(Some(&mut without), &MapScene::new(DEFAULT_WIDTH, DEFAULT_HEIGHT, ORIGIN, None));
        let svg = without.finish();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(">Home<"));
        assert!(svg.contains(">School<"));
        assert!(!svg.contains(">Bus<"));
        assert!(!svg.contains("stroke-dasharray"));

        let mut with = SvgCanvas::new(DEFAULT_WIDTH, DEFAULT_HEIGHT);
        render(
            Some(&mut with),
            &MapScene::new(DEFAULT_WIDTH, DEFAULT_HEIGHT, ORIGIN, Some(ORIGIN)),
        );
        let svg = with.finish();
        assert!(svg.contains(">Bus<"));
        assert!(svg.contains("stroke-dasharray=\"5 3\""));
        assert!(svg.contains(BUS_COLOR));
    }
}
