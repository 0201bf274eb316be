pub mod layer;
pub mod plan;
pub mod raster;
pub mod symbology;
pub mod vector;

pub use layer::*;
pub use plan::*;
pub use raster::*;
pub use symbology::*;
pub use vector::*;
