//! Horizontal dilution of precision for a 2D fix

use nalgebra::Matrix2;
use serde::{Deserialize, Serialize};

use crate::core::Point2D;

/// Quality band for a dilution-of-precision value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GdopQuality {
    /// DOP < 2
    Excellent,
    /// DOP < 5
    Good,
    /// DOP < 10
    Moderate,
    /// DOP < 20
    Fair,
    Poor,
}

impl GdopQuality {
    pub fn from_gdop(gdop: f64) -> Self {
        if gdop < 2.0 {
            GdopQuality::Excellent
        } else if gdop < 5.0 {
            GdopQuality::Good
        } else if gdop < 10.0 {
            GdopQuality::Moderate
        } else if gdop < 20.0 {
            GdopQuality::Fair
        } else {
            GdopQuality::Poor
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            GdopQuality::Excellent => "Excellent geometry",
            GdopQuality::Good => "Good geometry",
            GdopQuality::Moderate => "Moderate geometry",
            GdopQuality::Fair => "Fair geometry, use with caution",
            GdopQuality::Poor => "Poor geometry, significant accuracy degradation",
        }
    }
}

/// HDOP of `anchors` as seen from `receiver`.
///
/// Built from unit line-of-sight vectors; `None` when the geometry matrix is
/// singular (all anchors on one bearing line, or fewer than two usable anchors).
pub fn horizontal_dop(anchors: &[Point2D], receiver: &Point2D) -> Option<f64> {
    let mut h_square = Matrix2::zeros();

    for anchor in anchors {
        let diff = anchor.to_vector() - receiver.to_vector();
        let distance = diff.norm();
        if distance > 1e-10 {
            let unit = diff / distance;
            h_square += unit * unit.transpose();
        }
    }

    if h_square.determinant().abs() < 1e-10 {
        return None;
    }

    let covariance = h_square.try_inverse()?;
    let hdop = covariance.trace().sqrt();
    hdop.is_finite().then_some(hdop)
}
