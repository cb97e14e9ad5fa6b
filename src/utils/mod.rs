pub mod constants;
pub mod url_utils;

pub use constants::*;
pub use url_utils::{extract_host, is_safe_scheme, normalize_host, normalize_internal_url, same_host};
