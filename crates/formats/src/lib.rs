pub mod archive;
pub mod detail;
pub mod era_config;
pub mod feature_collection;

pub use archive::*;
pub use detail::*;
pub use era_config::*;
pub use feature_collection::*;
