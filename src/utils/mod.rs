pub mod constants;
pub mod json_path;
pub mod path_utils;

pub use constants::*;
pub use json_path::{FieldRef, PathFault, locate_fields};
pub use path_utils::{is_url, normalize_filename, resolve_ref, safe_file_name, unique_destination};
