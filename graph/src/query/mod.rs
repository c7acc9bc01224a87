pub mod config;

pub use config::{GraphQuery, QueryEvent, QuerySettings};
