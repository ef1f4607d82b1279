//! Spatial clustering of geotagged detections for map display.
//!
//! Clusters are connected components of the "nearby" relation, so every
//! resolved detection lands in exactly one cluster (isolated detections form
//! clusters of one) and the result does not depend on input order.

mod clusterer;
mod disjoint_set;
mod proximity;

pub use clusterer::{Cluster, SpatialClusterer};
pub use disjoint_set::DisjointSet;
pub use proximity::{ClusterSettings, ProximityMetric, haversine_meters};
