//! Output format writers.

mod csv;
mod geojson;
mod json;
pub mod progress;
mod writer;

pub use csv::CsvWriter;
pub use geojson::GeoJsonWriter;
pub use json::JsonReportWriter;
pub use writer::OutputWriter;
