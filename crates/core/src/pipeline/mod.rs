pub mod detection_loop;
pub mod narration_loop;
pub mod pipeline_logger;
pub mod stop_signal;
pub mod supervisor;
