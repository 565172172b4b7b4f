/// Embedded metadata extraction
///
/// Only the raw numeric values are read (no translation into human units).
/// An absent tag is a normal outcome; an unreadable EXIF block is an error
/// the import path degrades to defaults.

use exif::{In, Reader, Tag, Value};
use std::io::Cursor;

use crate::error::MetadataError;

/// Tags the import pipeline cares about
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImageMetadata {
    /// EXIF orientation, 1..=8
    pub orientation: Option<u16>,
    /// Signed decimal degrees, north positive
    pub latitude: Option<f64>,
    /// Signed decimal degrees, east positive
    pub longitude: Option<f64>,
}

/// Anything that can read metadata out of raw image bytes
pub trait MetadataExtractor: Send + Sync + 'static {
    fn extract(&self, bytes: &[u8]) -> Result<ImageMetadata, MetadataError>;
}

/// EXIF reader for JPEG, TIFF, PNG, WebP and HEIF containers
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifExtractor;

impl MetadataExtractor for ExifExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ImageMetadata, MetadataError> {
        let exif = Reader::new().read_from_container(&mut Cursor::new(bytes))?;

        let orientation = exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .filter(|value| (1..=8).contains(value))
            .map(|value| value as u16);

        let coordinate = |value_tag: Tag, ref_tag: Tag, negative: u8| {
            let degrees = exif
                .get_field(value_tag, In::PRIMARY)
                .and_then(|field| dms_to_degrees(&field.value))?;
            let reference = exif
                .get_field(ref_tag, In::PRIMARY)
                .and_then(|field| hemisphere(&field.value));
            Some(signed(degrees, reference, negative))
        };

        Ok(ImageMetadata {
            orientation,
            latitude: coordinate(Tag::GPSLatitude, Tag::GPSLatitudeRef, b'S'),
            longitude: coordinate(Tag::GPSLongitude, Tag::GPSLongitudeRef, b'W'),
        })
    }
}

/// Degrees/minutes/seconds rationals to decimal degrees
fn dms_to_degrees(value: &Value) -> Option<f64> {
    let Value::Rational(parts) = value else {
        return None;
    };
    let mut parts = parts.iter().map(|r| r.to_f64());
    let degrees = parts.next()?;
    let minutes = parts.next().unwrap_or(0.0);
    let seconds = parts.next().unwrap_or(0.0);
    let total = degrees + minutes / 60.0 + seconds / 3600.0;
    total.is_finite().then_some(total)
}

/// First byte of an ASCII reference tag ("N", "S", "E", "W")
fn hemisphere(value: &Value) -> Option<u8> {
    match value {
        Value::Ascii(strings) => strings.first().and_then(|s| s.first()).copied(),
        _ => None,
    }
}

fn signed(degrees: f64, reference: Option<u8>, negative: u8) -> f64 {
    match reference {
        Some(r) if r.eq_ignore_ascii_case(&negative) => -degrees,
        _ => degrees,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exif::experimental::Writer;
    use exif::{Field, Rational};

    fn dms(d: u32, m: u32, s: u32) -> Value {
        Value::Rational(vec![
            Rational::from((d, 1)),
            Rational::from((m, 1)),
            Rational::from((s, 1)),
        ])
    }

    #[test]
    fn test_dms_conversion() {
        let degrees = dms_to_degrees(&dms(51, 30, 0)).unwrap();
        assert!((degrees - 51.5).abs() < 1e-9);

        let degrees = dms_to_degrees(&dms(0, 5, 24)).unwrap();
        assert!((degrees - 0.09).abs() < 1e-9);
    }

    #[test]
    fn test_hemisphere_sign() {
        let south = Value::Ascii(vec![b"S".to_vec()]);
        assert_eq!(signed(12.0, hemisphere(&south), b'S'), -12.0);

        let west = Value::Ascii(vec![b"W".to_vec()]);
        assert_eq!(signed(0.09, hemisphere(&west), b'W'), -0.09);

        assert_eq!(signed(45.0, None, b'S'), 45.0);
    }

    #[test]
    fn test_dms_rejects_wrong_type() {
        assert_eq!(dms_to_degrees(&Value::Ascii(vec![b"51".to_vec()])), None);
        assert_eq!(dms_to_degrees(&Value::Rational(vec![])), None);
    }

    /// Minimal TIFF carrying only the given fields
    fn tiff_with(fields: &[Field]) -> Vec<u8> {
        let mut writer = Writer::new();
        for field in fields {
            writer.push_field(field);
        }
        let mut tiff = Cursor::new(Vec::new());
        writer.write(&mut tiff, false).unwrap();
        tiff.into_inner()
    }

    fn field(tag: Tag, value: Value) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value,
        }
    }

    #[test]
    fn test_extract_orientation_and_gps() {
        let tiff = tiff_with(&[
            field(Tag::Orientation, Value::Short(vec![6])),
            field(Tag::GPSLatitudeRef, Value::Ascii(vec![b"N".to_vec()])),
            field(Tag::GPSLatitude, dms(51, 30, 0)),
            field(Tag::GPSLongitudeRef, Value::Ascii(vec![b"W".to_vec()])),
            field(Tag::GPSLongitude, dms(0, 5, 24)),
        ]);

        let metadata = ExifExtractor.extract(&tiff).unwrap();
        assert_eq!(metadata.orientation, Some(6));
        assert!((metadata.latitude.unwrap() - 51.5).abs() < 1e-9);
        assert!((metadata.longitude.unwrap() + 0.09).abs() < 1e-9);
    }

    #[test]
    fn test_extract_without_gps_or_valid_orientation() {
        let tiff = tiff_with(&[field(Tag::Orientation, Value::Short(vec![9]))]);
        assert_eq!(ExifExtractor.extract(&tiff).unwrap(), ImageMetadata::default());
    }

    #[test]
    fn test_extract_without_exif_is_an_error() {
        let mut png = Vec::new();
        image::DynamicImage::new_luma8(4, 4)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        assert!(ExifExtractor.extract(&png).is_err());
        assert!(ExifExtractor.extract(b"garbage").is_err());
    }
}
