pub mod etl;
pub mod field_mapper;
pub mod item_link;
pub mod lua_table;

pub use crate::domain::ports::{Pipeline, Sink, Storage};
pub use crate::utils::error::Result;
