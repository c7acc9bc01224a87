pub mod process;
pub mod reader;

pub use process::{ChildStream, CommandRunner, LineStream, SystemRunner};
pub use reader::LogReader;
