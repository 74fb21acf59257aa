pub mod creator;
pub mod manifest;
pub mod params;
pub mod registry;
