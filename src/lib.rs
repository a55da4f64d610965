pub mod association;
pub mod calendar;
pub mod chart;
pub mod config;
pub mod dataset;
pub mod fetch;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod store;
pub mod streak;
