//! Model to entity mappers
//!
//! - `From<Model> for Entity` where every stored value is representable
//! - `TryFrom<Model>` where a stored column may hold an unknown value

mod member;
mod records;

pub use member::snapshot_from_rows;
