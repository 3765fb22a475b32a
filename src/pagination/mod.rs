//! Pagination engine.
//!
//! [`compute_range`] and [`dot_window`] decide what a page indicator shows;
//! [`PaginationController`] owns the page and page size and routes
//! navigation requests through a single clamping path.

pub mod controller;
pub mod item_count;
pub mod range;

pub use controller::*;
pub use item_count::*;
pub use range::*;
