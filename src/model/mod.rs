pub mod index;
pub mod record;
pub mod selection;
