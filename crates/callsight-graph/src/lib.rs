pub mod geometry;
pub mod layout;
pub mod merge;
pub mod model;

pub use geometry::{Size, estimate};
pub use layout::layout;
pub use merge::{H_GAP, MergeOutcome, V_GAP, merge_expansion};
pub use model::GraphModel;
