//! Mock implementations of the external collaborator traits, for unit and
//! end-to-end tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use barrage_core::testing::{MockSource, MockStore};
//!
//! let source = MockSource::new("qq").with_search_hits(vec![/* titles */]);
//! let store = MockStore::new();
//! // Use in AggregationContext...
//! ```

mod mock_source;
mod mock_store;

pub use mock_source::MockSource;
pub use mock_store::MockStore;
