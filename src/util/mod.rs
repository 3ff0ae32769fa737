//! Utility modules

pub mod paths;
pub mod scrub;

pub use paths::{config_path, data_dir, database_path, init_data_dir, log_file_path, logs_dir};
pub use scrub::{mask_aadhaar, Scrubber};
