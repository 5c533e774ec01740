//! Coordinate reference system transforms
//!
//! Network coordinates are projected (UTM by default, EPSG:25831). Remote
//! locations are published as geographic WGS84 (EPSG:4326) GeoJSON, with
//! coordinates in `(lon, lat)` order. ETRS89 and WGS84 are treated as the same
//! datum, which matches the default ballpark transform used for GeoJSON.

pub mod utm;

use crate::domain::{Coordinate, HydroError, Result};
use utm::{Ellipsoid, TransverseMercator};

/// A supported coordinate reference system
#[derive(Debug, Clone)]
pub enum Crs {
    /// Longitude/latitude in degrees
    Geographic { epsg: u32 },
    /// UTM zone
    Utm {
        epsg: u32,
        projection: TransverseMercator,
    },
    /// Spherical web mercator (EPSG:3857)
    WebMercator,
}

impl Crs {
    /// Resolves an EPSG code
    ///
    /// Supported: 4326, 4258, 3857, 25801-25860 (ETRS89 / UTM north),
    /// 32601-32660 and 32701-32760 (WGS84 / UTM north and south).
    pub fn from_epsg(code: u32) -> Result<Self> {
        match code {
            4326 | 4258 => Ok(Crs::Geographic { epsg: code }),
            3857 => Ok(Crs::WebMercator),
            25801..=25860 => Ok(Crs::Utm {
                epsg: code,
                projection: TransverseMercator::utm((code - 25800) as u8, true, Ellipsoid::GRS80),
            }),
            32601..=32660 => Ok(Crs::Utm {
                epsg: code,
                projection: TransverseMercator::utm((code - 32600) as u8, true, Ellipsoid::WGS84),
            }),
            32701..=32760 => Ok(Crs::Utm {
                epsg: code,
                projection: TransverseMercator::utm((code - 32700) as u8, false, Ellipsoid::WGS84),
            }),
            _ => Err(HydroError::Geo(format!("Unsupported CRS: EPSG:{code}"))),
        }
    }

    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Geographic { epsg } | Crs::Utm { epsg, .. } => *epsg,
            Crs::WebMercator => 3857,
        }
    }

    fn to_geographic(&self, x: f64, y: f64) -> Coordinate {
        match self {
            Crs::Geographic { .. } => (x, y),
            Crs::Utm { projection, .. } => projection.inverse(x, y),
            Crs::WebMercator => utm::web_mercator_inverse(x, y),
        }
    }

    fn from_geographic(&self, lon: f64, lat: f64) -> Coordinate {
        match self {
            Crs::Geographic { .. } => (lon, lat),
            Crs::Utm { projection, .. } => projection.forward(lon, lat),
            Crs::WebMercator => utm::web_mercator_forward(lon, lat),
        }
    }
}

/// Transform between two coordinate reference systems, `always_xy` ordering
#[derive(Debug, Clone)]
pub struct CoordinateTransform {
    from: Crs,
    to: Crs,
}

impl CoordinateTransform {
    /// Builds a transform between two EPSG codes
    ///
    /// # Errors
    ///
    /// Returns [`HydroError::Geo`] if either code is unsupported.
    pub fn new(from_epsg: u32, to_epsg: u32) -> Result<Self> {
        Ok(Self {
            from: Crs::from_epsg(from_epsg)?,
            to: Crs::from_epsg(to_epsg)?,
        })
    }

    pub fn source(&self) -> &Crs {
        &self.from
    }

    pub fn target(&self) -> &Crs {
        &self.to
    }

    /// Transforms one coordinate
    ///
    /// # Errors
    ///
    /// Returns [`HydroError::Geo`] for non-finite input or output.
    pub fn transform(&self, x: f64, y: f64) -> Result<Coordinate> {
        if !x.is_finite() || !y.is_finite() {
            return Err(HydroError::Geo(format!("Non-finite coordinate ({x}, {y})")));
        }
        if self.from.epsg() == self.to.epsg() {
            return Ok((x, y));
        }

        let (lon, lat) = self.from.to_geographic(x, y);
        let (tx, ty) = self.to.from_geographic(lon, lat);
        if !tx.is_finite() || !ty.is_finite() {
            return Err(HydroError::Geo(format!(
                "Coordinate ({x}, {y}) cannot be transformed from EPSG:{} to EPSG:{}",
                self.from.epsg(),
                self.to.epsg()
            )));
        }
        Ok((tx, ty))
    }

    /// Transforms a sequence of coordinates, failing on the first bad one
    pub fn transform_path(&self, path: &[Coordinate]) -> Result<Vec<Coordinate>> {
        path.iter().map(|&(x, y)| self.transform(x, y)).collect()
    }
}
