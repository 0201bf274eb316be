pub mod audio;
pub mod entity;
pub mod interaction;
pub mod registry;
pub mod selection;
pub mod session;
pub mod visibility;

pub use audio::*;
pub use entity::*;
pub use interaction::*;
pub use registry::*;
pub use selection::*;
pub use session::*;
pub use visibility::*;
