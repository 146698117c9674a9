pub mod alignment;
pub mod pattern_index;

pub use alignment::{align, Alignment};
pub use pattern_index::PatternIndex;
