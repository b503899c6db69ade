use serde::{Deserialize, Serialize};

/// Every non-geometric per-point field read from the source file.
///
/// Filtering never looks at these values, it only carries them along with
/// the coordinates so that surviving points are written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointAttributes {
    pub intensity: u16,
    pub return_number: u8,
    pub number_of_returns: u8,
    pub scan_direction_left_to_right: bool,
    pub is_edge_of_flight_line: bool,
    pub classification: u8,
    pub is_synthetic: bool,
    pub is_key_point: bool,
    pub is_withheld: bool,
    pub is_overlap: bool,
    pub scanner_channel: u8,
    pub scan_angle: f32,
    pub user_data: u8,
    pub point_source_id: u16,
    pub gps_time: Option<f64>,
    pub nir: Option<u16>,
    pub extra_bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub color: Option<Color>,
    pub attributes: PointAttributes,
}

impl Point {
    /// A bare point without colour and with default attributes.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            color: None,
            attributes: PointAttributes::default(),
        }
    }

    pub fn planar(&self) -> [f64; 2] {
        [self.x, self.y]
    }
}

/// An ordered list of points.
///
/// Order carries no meaning, but every subsetting operation keeps the
/// relative order of the points it retains.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub points: Vec<Point>,
}

impl PointCloud {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, f64, &Point)> {
        self.points
            .iter()
            .map(|point| (point.x, point.y, point.z, point))
    }

    pub fn elevations(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|point| point.z)
    }

    /// Keeps the points whose mask entry is `true`.
    ///
    /// # Panics
    /// If `mask` and the cloud differ in length.
    pub fn select(self, mask: &[bool]) -> PointCloud {
        assert_eq!(
            mask.len(),
            self.points.len(),
            "selection mask must cover every point"
        );
        let points = self
            .points
            .into_iter()
            .zip(mask)
            .filter_map(|(point, &keep)| keep.then_some(point))
            .collect();
        PointCloud { points }
    }

    /// Keeps the points at `indices`, which must be strictly increasing.
    pub fn take_indices(self, indices: &[usize]) -> PointCloud {
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        let mut wanted = indices.iter().peekable();
        let points = self
            .points
            .into_iter()
            .enumerate()
            .filter_map(|(i, point)| {
                if wanted.peek() == Some(&&i) {
                    wanted.next();
                    Some(point)
                } else {
                    None
                }
            })
            .collect();
        PointCloud { points }
    }

    /// Planar extent of the cloud, `None` when it is empty.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = self.points.first()?;
        let mut bbox = BoundingBox {
            xmin: first.x,
            xmax: first.x,
            ymin: first.y,
            ymax: first.y,
        };
        for point in &self.points[1..] {
            bbox.xmin = bbox.xmin.min(point.x);
            bbox.xmax = bbox.xmax.max(point.x);
            bbox.ymin = bbox.ymin.min(point.y);
            bbox.ymax = bbox.ymax.max(point.y);
        }
        Some(bbox)
    }
}

impl From<Vec<Point>> for PointCloud {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}

// Planar extent only, elevation is handled by the filters themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// True when the box has zero width or zero height.
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }
}
