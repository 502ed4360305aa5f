//! Incremental list loading for the ScrollFeed client.
//!
//! The [`PageController`] owns the page cursor and the append-only item list, the
//! [`Sentinel`] turns "last item became visible" into a next-page request, and
//! [`FeedSession`] wires both to identity and analytics.

pub mod config;
pub mod controller;
pub mod sentinel;
pub mod session;
pub mod source;

pub use config::FeedConfig;
pub use controller::{PageController, PaginationState};
pub use sentinel::{OnVisible, PollingViewport, Sentinel, Viewport, Watch};
pub use session::FeedSession;
pub use source::{FetchError, HttpItemSource, ItemSource};
