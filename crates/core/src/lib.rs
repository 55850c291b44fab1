pub mod annotation;
pub mod config;
pub mod detection;
pub mod pipeline;
pub mod shared;
pub mod speech;
pub mod store;
pub mod video;
