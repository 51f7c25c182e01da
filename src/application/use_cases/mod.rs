pub mod aggregation_engine;
pub mod dataset_service;
pub mod export_serializer;
pub mod query_engine;
pub mod row_selection;
