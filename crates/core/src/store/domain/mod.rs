pub mod count_store;
