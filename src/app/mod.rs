pub mod context;
pub mod error;

pub use context::{AppContext, Dashboard};
pub use error::{PodcacheError, Result};
