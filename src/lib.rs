#![doc(html_root_url = "https://docs.rs/incremental-list/0.0.1")]
#![warn(clippy::pedantic)]

//! Batch-loading and DOM-recycling for long scrollable lists, driven by an
//! [***IntersectionObserver***](https://developer.mozilla.org/en-US/docs/Web/API/Intersection_Observer_API) sentinel.

pub mod controller;
pub mod error;
pub mod eviction;
pub mod options;
pub mod surface;

pub use self::{controller::IncrementalListController, error::Error, options::ControllerOptions};

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}
