//! Canonical comment model and the normalization pipeline that turns
//! heterogeneous raw source payloads into it.

mod normalize;
mod types;

pub use normalize::{normalize, NormalizeOptions};
pub use types::{CanonicalComment, NormalizeError, RawComments, WireComment};
