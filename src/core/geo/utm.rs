//! Transverse Mercator projection (Krüger series)
//!
//! Third-order series in the third flattening `n`, accurate to well below a
//! millimetre inside a UTM zone.

use std::f64::consts::PI;

/// Reference ellipsoid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis (m)
    pub a: f64,
    /// Flattening
    pub f: f64,
}

impl Ellipsoid {
    pub const WGS84: Self = Self {
        a: 6_378_137.0,
        f: 1.0 / 298.257_223_563,
    };

    /// Used by ETRS89
    pub const GRS80: Self = Self {
        a: 6_378_137.0,
        f: 1.0 / 298.257_222_101,
    };
}

const UTM_SCALE: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_SOUTH_FALSE_NORTHING: f64 = 10_000_000.0;

/// Precomputed transverse Mercator parameters for one UTM zone
#[derive(Debug, Clone)]
pub struct TransverseMercator {
    k0: f64,
    false_easting: f64,
    false_northing: f64,
    lon0: f64,
    n: f64,
    a_rect: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
}

impl TransverseMercator {
    /// Parameters for UTM `zone` (1..=60) on the given ellipsoid
    pub fn utm(zone: u8, north: bool, ellipsoid: Ellipsoid) -> Self {
        let n = ellipsoid.f / (2.0 - ellipsoid.f);
        let n2 = n * n;
        let n3 = n2 * n;
        let a_rect = ellipsoid.a / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0);

        Self {
            k0: UTM_SCALE,
            false_easting: UTM_FALSE_EASTING,
            false_northing: if north { 0.0 } else { UTM_SOUTH_FALSE_NORTHING },
            lon0: (f64::from(zone) * 6.0 - 183.0).to_radians(),
            n,
            a_rect,
            alpha: [
                n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
                13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
                61.0 * n3 / 240.0,
            ],
            beta: [
                n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
                n2 / 48.0 + n3 / 15.0,
                17.0 * n3 / 480.0,
            ],
            delta: [
                2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
                7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
                56.0 * n3 / 15.0,
            ],
        }
    }

    /// Geographic degrees `(lon, lat)` to projected metres `(easting, northing)`
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let phi = lat.to_radians();
        let dlon = lon.to_radians() - self.lon0;
        let c = 2.0 * self.n.sqrt() / (1.0 + self.n);

        let t = (phi.sin().atanh() - c * (c * phi.sin()).atanh()).sinh();
        let xi_p = t.atan2(dlon.cos());
        let eta_p = (dlon.sin() / (1.0 + t * t).sqrt()).atanh();

        let mut xi = xi_p;
        let mut eta = eta_p;
        for (j, a) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi += a * (k * xi_p).sin() * (k * eta_p).cosh();
            eta += a * (k * xi_p).cos() * (k * eta_p).sinh();
        }

        let easting = self.false_easting + self.k0 * self.a_rect * eta;
        let northing = self.false_northing + self.k0 * self.a_rect * xi;
        (easting, northing)
    }

    /// Projected metres `(easting, northing)` to geographic degrees `(lon, lat)`
    pub fn inverse(&self, easting: f64, northing: f64) -> (f64, f64) {
        let xi = (northing - self.false_northing) / (self.k0 * self.a_rect);
        let eta = (easting - self.false_easting) / (self.k0 * self.a_rect);

        let mut xi_p = xi;
        let mut eta_p = eta;
        for (j, b) in self.beta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi_p -= b * (k * xi).sin() * (k * eta).cosh();
            eta_p -= b * (k * xi).cos() * (k * eta).sinh();
        }

        let chi = (xi_p.sin() / eta_p.cosh()).asin();
        let mut phi = chi;
        for (j, d) in self.delta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            phi += d * (k * chi).sin();
        }

        let lon = self.lon0 + eta_p.sinh().atan2(xi_p.cos());
        (normalize_lon(lon.to_degrees()), phi.to_degrees())
    }
}

fn normalize_lon(lon: f64) -> f64 {
    let mut l = lon;
    while l > 180.0 {
        l -= 360.0;
    }
    while l < -180.0 {
        l += 360.0;
    }
    l
}

/// Spherical web mercator radius (EPSG:3857)
pub const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

pub fn web_mercator_inverse(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / WEB_MERCATOR_RADIUS).to_degrees();
    let lat = (PI / 2.0 - 2.0 * (-y / WEB_MERCATOR_RADIUS).exp().atan()).to_degrees();
    (lon, lat)
}

pub fn web_mercator_forward(lon: f64, lat: f64) -> (f64, f64) {
    let x = WEB_MERCATOR_RADIUS * lon.to_radians();
    let y = WEB_MERCATOR_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_central_meridian_on_equator() {
        let tm = TransverseMercator::utm(31, true, Ellipsoid::GRS80);
        let (e, n) = tm.forward(3.0, 0.0);
        assert!((e - 500_000.0).abs() < 1e-6);
        assert!(n.abs() < 1e-6);

        let (lon, lat) = tm.inverse(500_000.0, 0.0);
        assert!((lon - 3.0).abs() < 1e-9);
        assert!(lat.abs() < 1e-9);
    }

    #[test]
    fn test_round_trip_barcelona() {
        let tm = TransverseMercator::utm(31, true, Ellipsoid::GRS80);
        let (e, n) = tm.forward(2.1734, 41.3851);
        assert!((400_000.0..450_000.0).contains(&e), "easting {e}");
        assert!((4_570_000.0..4_590_000.0).contains(&n), "northing {n}");

        let (lon, lat) = tm.inverse(e, n);
        assert!((lon - 2.1734).abs() < 1e-8);
        assert!((lat - 41.3851).abs() < 1e-8);
    }

    #[test]
    fn test_southern_hemisphere_round_trip() {
        let tm = TransverseMercator::utm(23, false, Ellipsoid::WGS84);
        let (e, n) = tm.forward(-43.2, -22.9);
        assert!(n > 7_000_000.0 && n < 10_000_000.0);
        let (lon, lat) = tm.inverse(e, n);
        assert!((lon + 43.2).abs() < 1e-8);
        assert!((lat + 22.9).abs() < 1e-8);
    }

    #[test]
    fn test_web_mercator_round_trip() {
        let (x, y) = web_mercator_forward(2.17, 41.38);
        let (lon, lat) = web_mercator_inverse(x, y);
        assert!((lon - 2.17).abs() < 1e-9);
        assert!((lat - 41.38).abs() < 1e-9);
    }
}
