//! Connected-component clustering.

use super::{ClusterSettings, DisjointSet};
use crate::detection::{DetectionId, DetectionStatus, GeotaggedDetection};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Aggregate over one connected component of nearby detections.
///
/// `pending_count + cleaned_count == member_count` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Position in the cluster set, ordered by smallest member id.
    pub cluster_id: usize,
    /// Mean latitude of the members.
    pub center_latitude: f64,
    /// Mean longitude of the members.
    pub center_longitude: f64,
    /// Clustering threshold in meters (not a measured radius).
    pub radius_meters: f64,
    /// Number of members.
    pub member_count: usize,
    /// Members still pending.
    pub pending_count: usize,
    /// Members already cleaned.
    pub cleaned_count: usize,
    /// Member ids, ascending.
    pub members: Vec<DetectionId>,
}

/// Partitions resolved detections into proximity clusters.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialClusterer {
    settings: ClusterSettings,
}

struct Point {
    id: DetectionId,
    coords: (f64, f64),
    status: DetectionStatus,
}

impl SpatialClusterer {
    /// Create a clusterer with validated settings.
    pub fn new(settings: ClusterSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// The settings in use.
    pub const fn settings(&self) -> &ClusterSettings {
        &self.settings
    }

    /// Compute the full cluster set for one recording.
    ///
    /// Unresolved detections are skipped. Every resolved detection ends up
    /// in exactly one cluster, including clusters of one. The output is the
    /// same for any ordering of `detections`.
    pub fn cluster(&self, detections: &[GeotaggedDetection]) -> Vec<Cluster> {
        let mut points: Vec<Point> = detections
            .iter()
            .filter_map(|d| {
                d.coordinates().map(|coords| Point {
                    id: d.id(),
                    coords,
                    status: d.status,
                })
            })
            .collect();
        points.sort_by_key(|p| p.id);

        let mut sets = DisjointSet::new(points.len());

        // Sweep in latitude order; pairs further apart in latitude than the
        // cutoff can never be nearby.
        let mut by_lat: Vec<usize> = (0..points.len()).collect();
        by_lat.sort_by(|&a, &b| {
            points[a].coords.0.total_cmp(&points[b].coords.0).then(a.cmp(&b))
        });

        let cutoff = self.settings.lat_cutoff();
        let mut pairs_checked = 0_usize;
        for (pos, &i) in by_lat.iter().enumerate() {
            for &j in &by_lat[pos + 1..] {
                if points[j].coords.0 - points[i].coords.0 > cutoff {
                    break;
                }
                pairs_checked += 1;
                if self.settings.is_nearby(points[i].coords, points[j].coords) {
                    sets.union(i, j);
                }
            }
        }

        let radius_meters = self.settings.nominal_radius_meters();
        let clusters: Vec<Cluster> = sets
            .groups()
            .into_iter()
            .enumerate()
            .map(|(cluster_id, group)| {
                let members: Vec<&Point> = group.iter().map(|&i| &points[i]).collect();
                build_cluster(cluster_id, &members, radius_meters)
            })
            .collect();

        debug!(
            "Clustered {} detections into {} clusters ({} pairs checked)",
            points.len(),
            clusters.len(),
            pairs_checked
        );

        clusters
    }
}

#[allow(clippy::cast_precision_loss)]
fn build_cluster(cluster_id: usize, members: &[&Point], radius_meters: f64) -> Cluster {
    let count = members.len();
    let (lat_sum, lng_sum) = members
        .iter()
        .fold((0.0, 0.0), |(lat, lng), p| (lat + p.coords.0, lng + p.coords.1));
    let cleaned_count = members
        .iter()
        .filter(|p| p.status == DetectionStatus::Cleaned)
        .count();

    Cluster {
        cluster_id,
        center_latitude: lat_sum / count as f64,
        center_longitude: lng_sum / count as f64,
        radius_meters,
        member_count: count,
        pending_count: count - cleaned_count,
        cleaned_count,
        members: members.iter().map(|p| p.id).collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::detection::{DetectionEvent, ResolvedLocation};

    fn detection(frame: u64, lat: f64, lng: f64) -> GeotaggedDetection {
        GeotaggedDetection {
            event: DetectionEvent::new(frame, 0, 0.9),
            elapsed_ms: 0.0,
            location: Some(ResolvedLocation {
                latitude: lat,
                longitude: lng,
                sample_frame: frame,
                sample_time_ms: 0,
                offset_ms: 0.0,
                accuracy: None,
            }),
            status: DetectionStatus::Pending,
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(SpatialClusterer::default().cluster(&[]).is_empty());
    }

    #[test]
    fn test_isolated_detection_forms_cluster() {
        let clusters = SpatialClusterer::default().cluster(&[detection(0, 60.0, 24.0)]);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].member_count, 1);
        assert_eq!(clusters[0].pending_count, 1);
    }

    #[test]
    fn test_chain_is_one_component() {
        // Each hop is within threshold, the ends are not.
        let detections = vec![
            detection(0, 60.0, 24.0),
            detection(1, 60.0004, 24.0),
            detection(2, 60.0008, 24.0),
        ];
        let clusters = SpatialClusterer::default().cluster(&detections);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].member_count, 3);
        assert!((clusters[0].center_latitude - 60.0004).abs() < 1e-9);
    }

    #[test]
    fn test_unresolved_skipped() {
        let mut unresolved = detection(5, 0.0, 0.0);
        unresolved.location = None;
        let clusters =
            SpatialClusterer::default().cluster(&[unresolved, detection(6, 10.0, 10.0)]);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec![DetectionId::new(6, 0)]);
    }

    #[test]
    fn test_status_counts() {
        let mut cleaned = detection(1, 60.0, 24.0);
        cleaned.set_status(DetectionStatus::Cleaned);
        let clusters =
            SpatialClusterer::default().cluster(&[detection(0, 60.0, 24.0001), cleaned]);
        assert_eq!(clusters[0].pending_count, 1);
        assert_eq!(clusters[0].cleaned_count, 1);
        assert_eq!(clusters[0].member_count, 2);
    }

    #[test]
    fn test_far_points_do_not_merge_through_sweep() {
        // Same latitude band, far apart in longitude.
        let detections = vec![detection(0, 60.0, 24.0), detection(1, 60.0001, 25.0)];
        let clusters = SpatialClusterer::default().cluster(&detections);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members, vec![DetectionId::new(0, 0)]);
    }
}
