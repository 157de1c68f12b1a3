pub mod colors;
pub mod config;
pub mod data;
pub mod error;
pub mod fetcher;
pub mod geometry;
pub mod pipeline;
pub mod raster;
pub mod render;
pub mod scale;
pub mod server;
pub mod types;

pub use error::PipelineError;
