/// Import and metadata pipeline
///
/// This module handles:
/// - Reading selected files and scanning folders (loader.rs)
/// - Extracting orientation and GPS tags (metadata.rs)
/// - Turning extracted metadata into the first jobs for a record

pub mod loader;
pub mod metadata;

use crate::config::Settings;
use crate::jobs::{JobDescriptor, JobRequest};
use crate::state::{Coordinates, ImageRecord, Location};
use metadata::ImageMetadata;

/// Jobs to send once a record's metadata is known.
///
/// Always one edge job (current thresholds, or the configured defaults).
/// A location QR job only when both coordinates were extracted and are in
/// range. Nothing at all while the record has no source.
pub fn initial_jobs(
    record: &ImageRecord,
    metadata: &ImageMetadata,
    settings: &Settings,
) -> Vec<JobDescriptor> {
    let Some(source) = &record.raw_source else {
        return Vec::new();
    };

    let mut jobs = vec![JobDescriptor::new(
        record.index,
        JobRequest::Edge {
            source: source.clone(),
            thresholds: record.thresholds().unwrap_or(settings.default_thresholds),
            orientation: metadata.orientation.unwrap_or(record.orientation),
        },
    )];

    if let (Some(latitude), Some(longitude)) = (metadata.latitude, metadata.longitude) {
        let coordinates = Coordinates::new(latitude, longitude);
        match coordinates.validate() {
            Ok(()) => jobs.push(JobDescriptor::new(
                record.index,
                JobRequest::QrLocation {
                    location: Location::with_map_link(coordinates, &settings.map_link_base),
                },
            )),
            Err(err) => {
                tracing::warn!(index = record.index, error = %err, "ignoring out-of-range GPS tags")
            }
        }
    }

    jobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_uri::DataUri;
    use crate::jobs::JobKind;
    use crate::state::{EdgeResult, JobOutput, RecordPatch, Thresholds};
    use assert_matches::assert_matches;

    fn loaded(index: usize) -> ImageRecord {
        let mut record = ImageRecord::placeholder(index, "leaf.jpg");
        record.merge(RecordPatch::Source(DataUri::encode("image/jpeg", &[1])));
        record
    }

    #[test]
    fn test_no_gps_means_edge_only() {
        let metadata = ImageMetadata {
            orientation: Some(6),
            ..Default::default()
        };
        let jobs = initial_jobs(&loaded(0), &metadata, &Settings::default());

        assert_eq!(jobs.len(), 1);
        assert_matches!(&jobs[0].request, JobRequest::Edge { thresholds, orientation: 6, .. } => {
            assert_eq!(*thresholds, Settings::default().default_thresholds);
        });
    }

    #[test]
    fn test_gps_adds_location_job() {
        let metadata = ImageMetadata {
            orientation: None,
            latitude: Some(51.5),
            longitude: Some(-0.09),
        };
        let jobs = initial_jobs(&loaded(2), &metadata, &Settings::default());

        let kinds: Vec<_> = jobs.iter().map(|job| (job.target_index, job.kind())).collect();
        assert_eq!(kinds, vec![(2, JobKind::Edge), (2, JobKind::QrLocation)]);
        assert_matches!(&jobs[1].request, JobRequest::QrLocation { location } => {
            assert_eq!(location.link, "https://www.google.com/maps/search/?api=1&query=51.5,-0.09");
        });
    }

    #[test]
    fn test_half_a_coordinate_is_ignored() {
        let metadata = ImageMetadata {
            latitude: Some(51.5),
            ..Default::default()
        };
        assert_eq!(initial_jobs(&loaded(0), &metadata, &Settings::default()).len(), 1);
    }

    #[test]
    fn test_failed_extraction_uses_defaults() {
        let jobs = initial_jobs(&loaded(0), &ImageMetadata::default(), &Settings::default());
        assert_matches!(&jobs[..], [JobDescriptor { request: JobRequest::Edge { orientation: 1, .. }, .. }]);
    }

    #[test]
    fn test_existing_thresholds_are_kept() {
        let mut record = loaded(0);
        record.merge(RecordPatch::Output(JobOutput::Edge(EdgeResult {
            rendering: DataUri::png(&[0]),
            thresholds: Thresholds::new(5.0, 9.0),
        })));
        let jobs = initial_jobs(&record, &ImageMetadata::default(), &Settings::default());
        assert_matches!(&jobs[0].request, JobRequest::Edge { thresholds, .. } if *thresholds == Thresholds::new(5.0, 9.0));
    }

    #[test]
    fn test_unloaded_record_gets_nothing() {
        let record = ImageRecord::placeholder(0, "leaf.jpg");
        assert!(initial_jobs(&record, &ImageMetadata::default(), &Settings::default()).is_empty());
    }
}
