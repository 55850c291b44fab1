pub mod count_writer;
pub mod domain;
pub mod infrastructure;
