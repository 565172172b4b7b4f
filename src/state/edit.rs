/// Editable job parameters
///
/// These are the values a user can change through the detail panel.
/// Each one is validated locally before any job is sent; an invalid edit
/// never touches the pending-job counter.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Largest payload a QR symbol holds in byte mode at low error correction
pub const QR_CAPACITY_BYTES: usize = 2953;

/// Default search link used to turn coordinates into QR text
pub const DEFAULT_MAP_LINK_BASE: &str = "https://www.google.com/maps/search/?api=1&query=";

/// Canny hysteresis thresholds
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Weak-edge threshold, must stay below `high`
    pub low: f32,
    /// Strong-edge threshold, bounded by the configured scale
    pub high: f32,
}

impl Thresholds {
    pub fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    /// Accept iff `0 < low < high <= max`
    pub fn validate(&self, max: f32) -> Result<(), ValidationError> {
        let ok = self.low.is_finite()
            && self.high.is_finite()
            && self.low > 0.0
            && self.low < self.high
            && self.high <= max;

        if ok {
            Ok(())
        } else {
            Err(ValidationError::Thresholds {
                low: self.low,
                high: self.high,
                max,
            })
        }
    }
}

impl Default for Thresholds {
    /// Byte-scale defaults, tuned for 8-bit luma input
    fn default() -> Self {
        Self { low: 50.0, high: 100.0 }
    }
}

/// A GPS position in signed decimal degrees
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError::Latitude(self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError::Longitude(self.longitude));
        }
        Ok(())
    }
}

/// Coordinates plus the text that ends up inside the QR symbol
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Location {
    pub coordinates: Coordinates,
    pub link: String,
}

impl Location {
    /// Build a location whose link is the map query for `coordinates`
    pub fn with_map_link(coordinates: Coordinates, base: &str) -> Self {
        Self {
            link: map_link(base, coordinates),
            coordinates,
        }
    }
}

/// Map search link for a coordinate pair
pub fn map_link(base: &str, coordinates: Coordinates) -> String {
    format!("{}{},{}", base, coordinates.latitude, coordinates.longitude)
}

/// Check text destined for a QR symbol
pub fn validate_qr_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyText);
    }
    if text.len() > QR_CAPACITY_BYTES {
        return Err(ValidationError::TextTooLong(text.len()));
    }
    Ok(())
}

/// A user-initiated change to one record's artifacts
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Re-run edge detection with new thresholds
    Thresholds(Thresholds),
    /// Render a QR code for arbitrary text
    QrText(String),
    /// Render a QR code for a position; `link` defaults to the map query
    Location {
        coordinates: Coordinates,
        link: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_threshold_bounds_on_normalized_scale() {
        assert!(Thresholds::new(0.2, 0.7).validate(1.0).is_ok());
        assert!(Thresholds::new(0.5, 0.5).validate(1.0).is_err());
        assert!(Thresholds::new(0.0, 0.5).validate(1.0).is_err());
        assert!(Thresholds::new(0.6, 0.5).validate(1.0).is_err());
        assert!(Thresholds::new(0.2, 1.0).validate(1.0).is_ok());
        assert!(Thresholds::new(0.2, 1.1).validate(1.0).is_err());
    }

    #[test]
    fn test_threshold_bounds_on_byte_scale() {
        assert!(Thresholds::default().validate(255.0).is_ok());
        assert!(Thresholds::new(10.0, 255.0).validate(255.0).is_ok());
        assert!(Thresholds::new(10.0, 256.0).validate(255.0).is_err());
        assert!(Thresholds::new(f32::NAN, 20.0).validate(255.0).is_err());
    }

    #[test]
    fn test_latitude_bounds() {
        assert!(Coordinates::new(45.0, 0.0).validate().is_ok());
        assert_matches!(Coordinates::new(91.0, 0.0).validate(), Err(ValidationError::Latitude(_)));
        assert_matches!(Coordinates::new(-91.0, 0.0).validate(), Err(ValidationError::Latitude(_)));
        assert_matches!(Coordinates::new(0.0, 181.0).validate(), Err(ValidationError::Longitude(_)));
    }

    #[test]
    fn test_map_link() {
        let location = Location::with_map_link(Coordinates::new(51.5, -0.09), DEFAULT_MAP_LINK_BASE);
        assert_eq!(
            location.link,
            "https://www.google.com/maps/search/?api=1&query=51.5,-0.09"
        );
    }

    #[test]
    fn test_qr_text_validation() {
        assert!(validate_qr_text("https://www.wikipedia.org/").is_ok());
        assert_eq!(validate_qr_text("   "), Err(ValidationError::EmptyText));
        let long = "x".repeat(QR_CAPACITY_BYTES + 1);
        assert_matches!(validate_qr_text(&long), Err(ValidationError::TextTooLong(_)));
    }
}
