pub mod dynamodb_repository;
pub mod image_store;
pub mod memory_store;
