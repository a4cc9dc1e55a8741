pub mod budget;
pub mod category;
pub mod common;
pub mod transaction;

pub use common::{Displayable, EntryType, NamedEntity};
