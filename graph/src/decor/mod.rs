pub mod refs;

pub use refs::{normalize_decoration, parse_decorations};
