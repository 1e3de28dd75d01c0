//! Small helpers shared by the command handlers.
//!
//! - **URL validation** for `addfeed`
//! - **Text** flattening and width-aware truncation for terminal listings

mod text;
mod url_validator;

pub use text::{to_display_line, truncate_to_width};
pub use url_validator::{validate_feed_url, UrlValidationError};
