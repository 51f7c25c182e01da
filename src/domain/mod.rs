pub mod dataset;
pub mod error;

// Tabular data engine types
pub mod table;
