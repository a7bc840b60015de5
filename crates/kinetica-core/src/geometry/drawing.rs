use super::{Point, Vector3D};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawingKind {
    Solid,
    Point,
    Vector,
    Frame,
}

/// Rendering hints for an external viewer. Nothing in the engine reads them.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing3D {
    kind: DrawingKind,
    file: Option<PathBuf>,
    color: [f64; 4],
    point: Point,
    vector: Option<Vector3D>,
    scale: f64,
}

impl Drawing3D {
    pub const DEFAULT_COLOR: [f64; 4] = [0.5, 0.5, 0.5, 1.0];

    pub fn new(kind: DrawingKind, point: Point) -> Self {
        Self {
            kind,
            file: None,
            color: Self::DEFAULT_COLOR,
            point,
            vector: None,
            scale: 1.0,
        }
    }

    /// A mesh file drawn at `point`.
    pub fn solid(file: impl Into<PathBuf>, point: Point) -> Self {
        Self::new(DrawingKind::Solid, point).with_file(file)
    }

    /// An arrow for `vector`, anchored at `point`.
    pub fn arrow(vector: Vector3D, point: Point) -> Self {
        let mut drawing = Self::new(DrawingKind::Vector, point);
        drawing.vector = Some(vector);
        drawing
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_color(mut self, color: [f64; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn kind(&self) -> DrawingKind {
        self.kind
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn color(&self) -> [f64; 4] {
        self.color
    }

    pub fn point(&self) -> &Point {
        &self.point
    }

    pub fn vector(&self) -> Option<&Vector3D> {
        self.vector.as_ref()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_file(&mut self, file: impl Into<PathBuf>) {
        self.file = Some(file.into());
    }

    pub fn set_color(&mut self, color: [f64; 4]) {
        self.color = color;
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    pub(crate) fn set_vector(&mut self, vector: Vector3D) {
        self.vector = Some(vector);
    }
}
