pub mod sink;
pub mod source;

pub use crate::traits::sink::ReadingSink;
pub use crate::traits::source::ReadingSource;
