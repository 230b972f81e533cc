// Cross-platform process helpers

pub mod process;

pub use process::{is_process_alive, kill_process, kill_process_tree, silent_command};
