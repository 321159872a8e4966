use geo::{Coord, Rect};
use rstar::AABB;
use serde::{Deserialize, Serialize};

/// `[west, south, east, north]` in degrees. Boxes crossing the antimeridian
/// are not modeled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        BoundingBox {
            west,
            south,
            east,
            north,
        }
    }

    /// Hull of `coords`, `None` when there are none.
    pub fn from_coords<C, I>(coords: I) -> Option<Self>
    where
        C: Into<Coord<f64>>,
        I: IntoIterator<Item = C>,
    {
        let mut bbox = BoundingBox::default();
        for coord in coords {
            bbox.extend(coord);
        }

        if bbox.is_empty() { None } else { Some(bbox) }
    }

    pub fn extend<C>(&mut self, coord: C)
    where
        C: Into<Coord<f64>>,
    {
        let coord = coord.into();
        self.west = self.west.min(coord.x);
        self.south = self.south.min(coord.y);
        self.east = self.east.max(coord.x);
        self.north = self.north.max(coord.y);
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
        }
    }

    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.west <= other.west
            && self.south <= other.south
            && self.east >= other.east
            && self.north >= other.north
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// True for the default, inverted box that has not seen a coordinate yet.
    pub fn is_empty(&self) -> bool {
        self.west > self.east || self.south > self.north
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.to_array().to_vec()
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.west,
                y: self.south,
            },
            Coord {
                x: self.east,
                y: self.north,
            },
        )
    }

    pub fn to_aabb(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.west, self.south], [self.east, self.north])
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        BoundingBox {
            west: f64::MAX,
            south: f64::MAX,
            east: f64::MIN,
            north: f64::MIN,
        }
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(value: [f64; 4]) -> Self {
        BoundingBox::new(value[0], value[1], value[2], value[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(value: BoundingBox) -> Self {
        value.to_array()
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(value: Rect<f64>) -> Self {
        BoundingBox::new(value.min().x, value.min().y, value.max().x, value.max().y)
    }
}
