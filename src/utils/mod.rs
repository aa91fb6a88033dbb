pub mod error;
pub mod keywords;
pub mod logging;
pub mod text;

pub use error::*;
pub use text::truncate_chars;
