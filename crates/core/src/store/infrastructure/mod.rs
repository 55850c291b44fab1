pub mod file_count_store;
pub mod memory_count_store;
