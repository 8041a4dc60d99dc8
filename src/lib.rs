pub mod utils;

pub mod error;
pub use error::Error;

pub mod map;
pub use map::basic::BasicMap;
pub use map::map::{BasicSet, Map, Set};
pub use map::space::Space;

pub mod tab;
pub use tab::tableau::Tab;

pub mod coalesce;
pub use coalesce::Options;
