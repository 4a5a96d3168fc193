mod local;
mod paths;

pub use local::LocalStore;
pub use paths::{ensure_state_dir, local_store_path, log_file_path};
