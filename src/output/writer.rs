//! Output writer trait definition.

use crate::cluster::Cluster;
use crate::detection::GeotaggedDetection;
use crate::error::Result;
use crate::pipeline::RecordingSummary;

/// Trait for writing one recording's results.
///
/// Callers write the header, then every cluster, then every detection, then
/// finalize. Writers that need both clusters and detections rely on that
/// order.
pub trait OutputWriter {
    /// Write the file header (if applicable).
    fn write_header(&mut self) -> Result<()>;

    /// Write a single cluster.
    fn write_cluster(&mut self, cluster: &Cluster) -> Result<()>;

    /// Write a single detection.
    fn write_detection(&mut self, detection: &GeotaggedDetection) -> Result<()>;

    /// Finalize the output (flush, close, etc.).
    fn finalize(&mut self, summary: &RecordingSummary) -> Result<()>;
}
