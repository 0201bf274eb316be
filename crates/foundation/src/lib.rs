pub mod arena;
pub mod bounds;
pub mod color;
pub mod handles;

// Foundation crate: small, well-tested primitives only.
pub use arena::*;
pub use bounds::*;
pub use color::*;
pub use handles::*;
