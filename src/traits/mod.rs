pub mod features;
pub mod model;
pub mod registry;
