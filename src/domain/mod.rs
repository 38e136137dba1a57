pub mod episode;
pub mod meta;
pub mod source;

pub use episode::{Enclosure, Episode, Origin};
pub use meta::{MetaKey, Settings, SyncRecord};
pub use source::{Source, DEFAULT_SOURCE_TYPE};
