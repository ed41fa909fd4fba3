/// Tuning knobs for an [`IncrementalListController`](`crate::IncrementalListController`).
///
/// All values are fixed once the controller is constructed.
#[derive(Clone, Debug, PartialEq)]
pub struct ControllerOptions {
	/// Remaining scroll distance, in pixels, at which the next batch load triggers.
	///
	/// Default: `200.0`.
	pub threshold: f64,
	/// Distance, in pixels, an item must lie outside the viewport (in either direction) before it
	/// becomes eligible for eviction.
	///
	/// Default: `1000.0`.
	pub recycle_threshold: f64,
	/// Number of items requested from the host per batch load.
	///
	/// Default: `20`.
	pub batch_size: usize,
	/// Whether scroll events schedule eviction passes. Eviction after a successful load runs
	/// regardless.
	///
	/// Default: `true`.
	pub enable_scroll_recycling: bool,
	/// Hard ceiling on retained items. Once exceeded, the oldest items are evicted regardless of
	/// their visibility until the retained count is back within bounds (see
	/// [`eviction::plan_eviction`](`crate::eviction::plan_eviction`)).
	///
	/// Default: `1000`.
	pub max_items: usize,
	/// Advisory spacing, in milliseconds, between scroll-driven eviction passes. Passes are
	/// additionally coalesced to at most one per animation frame; this is a cadence hint, not a
	/// hard guarantee.
	///
	/// Default: `300.0`.
	pub recycling_interval: f64,
}

impl Default for ControllerOptions {
	fn default() -> Self {
		Self {
			threshold: 200.0,
			recycle_threshold: 1000.0,
			batch_size: 20,
			enable_scroll_recycling: true,
			max_items: 1000,
			recycling_interval: 300.0,
		}
	}
}
