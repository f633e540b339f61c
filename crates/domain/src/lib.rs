pub mod error;
pub mod json_extract;
pub mod logging;
pub mod retry;
pub mod users;

pub use error::{Error, Result};
