pub mod aggregation;
pub mod data_sources;
pub mod results;
pub mod tasks;
pub mod ws;
