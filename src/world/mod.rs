pub mod definition_cache;
pub mod item_types;
pub mod limits;
