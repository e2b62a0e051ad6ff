pub mod cursor;
pub mod evolving;
pub mod inventory;
pub mod item;
pub mod placement;
pub mod slots;
