pub mod fetch;
pub mod loader;
pub mod request;
pub mod store;

pub use fetch::*;
pub use loader::*;
pub use request::*;
pub use store::*;
