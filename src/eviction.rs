use crate::surface::{ItemRect, ListSurface};

/// Outcome of planning one eviction pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvictionPlan {
	/// Indices into the retained item sequence, ascending and deduplicated.
	pub evict: Vec<usize>,
	/// Summed measured heights of all planned items.
	pub removed_height: f64,
	/// The portion of `removed_height` that lies above the viewport's top edge. This is the
	/// amount the scroll offset must shrink by to keep the visible content in place.
	pub removed_above: f64,
}

impl EvictionPlan {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.evict.is_empty()
	}
}

fn is_evictable(rect: ItemRect, viewport_height: f64, recycle_threshold: f64) -> bool {
	rect.bottom < -recycle_threshold || rect.top > viewport_height + recycle_threshold
}

/// Plans one eviction pass over measured item geometry.
///
/// Items more than `recycle_threshold` pixels outside the viewport, in either direction, are
/// planned for removal. Independently of geometry, if more than `max_items` are retained, the
/// oldest items are planned unconditionally: at least `max_items / 2` of them, and as many more as
/// it takes to bring the survivor count back within `max_items`.
#[must_use]
pub fn plan_eviction(rects: &[ItemRect], viewport_height: f64, recycle_threshold: f64, max_items: usize) -> EvictionPlan {
	let backstop = if rects.len() > max_items {
		(max_items / 2).max(rects.len() - max_items)
	} else {
		0
	};

	let mut plan = EvictionPlan::default();
	for (index, &rect) in rects.iter().enumerate() {
		if index < backstop || is_evictable(rect, viewport_height, recycle_threshold) {
			plan.evict.push(index);
			plan.removed_height += rect.height;
			if rect.bottom <= 0.0 {
				plan.removed_above += rect.height;
			} else if rect.top < 0.0 {
				// Straddles the top edge; only the hidden part shifts the anchor.
				plan.removed_above += -rect.top;
			}
		}
	}
	plan
}

/// Measures every retained item through `surface` and plans the pass.
#[must_use]
pub fn plan_for_surface<S: ListSurface + ?Sized>(surface: &S, recycle_threshold: f64, max_items: usize) -> EvictionPlan {
	let viewport_height = surface.viewport_height();
	let rects = (0..surface.item_count()).map(|index| surface.measure(index)).collect::<Vec<_>>();
	plan_eviction(&rects, viewport_height, recycle_threshold, max_items)
}

/// New scroll offset after applying a plan, compensating for content removed above the viewport
/// and clamped to the container's new scroll range.
#[must_use]
pub fn compensated_scroll_top(last_scroll_top: f64, removed_above: f64, viewport_height: f64, new_scroll_height: f64) -> f64 {
	let max_scroll = (new_scroll_height - viewport_height).max(0.0);
	(last_scroll_top - removed_above).clamp(0.0, max_scroll)
}

#[cfg(test)]
mod tests {
	use super::{compensated_scroll_top, plan_eviction, plan_for_surface, EvictionPlan};
	use crate::surface::{ItemRect, ListSurface};

	/// Fixed-height items stacked in a scroll container, without a layout engine.
	struct FakeSurface {
		heights: Vec<f64>,
		scroll_top: f64,
		viewport_height: f64,
	}

	impl FakeSurface {
		fn offset_of(&self, index: usize) -> f64 {
			self.heights[..index].iter().sum()
		}

		fn apply(&mut self, plan: &EvictionPlan) {
			for &index in plan.evict.iter().rev() {
				self.heights.remove(index);
			}
		}

		/// Index and viewport-relative top of the item at the top of the viewport.
		fn first_visible(&self) -> (usize, f64) {
			let mut offset = 0.0;
			for (index, &height) in self.heights.iter().enumerate() {
				if offset + height > self.scroll_top {
					return (index, offset - self.scroll_top);
				}
				offset += height;
			}
			(self.heights.len(), offset - self.scroll_top)
		}
	}

	impl ListSurface for FakeSurface {
		fn viewport_height(&self) -> f64 {
			self.viewport_height
		}

		fn set_scroll_top(&mut self, offset: f64) {
			self.scroll_top = offset;
		}

		fn scroll_height(&self) -> f64 {
			self.heights.iter().sum()
		}

		fn item_count(&self) -> usize {
			self.heights.len()
		}

		fn measure(&self, index: usize) -> ItemRect {
			let top = self.offset_of(index) - self.scroll_top;
			ItemRect {
				top,
				bottom: top + self.heights[index],
				height: self.heights[index],
			}
		}
	}

	#[test]
	fn keeps_items_within_the_threshold() {
		let rects = [
			ItemRect { top: -150.0, bottom: -100.0, height: 50.0 },
			ItemRect { top: -50.0, bottom: 0.0, height: 50.0 },
			ItemRect { top: 0.0, bottom: 300.0, height: 300.0 },
			ItemRect { top: 300.0, bottom: 400.0, height: 100.0 },
		];
		// A bottom edge exactly at -threshold or a top edge exactly at viewport + threshold stays.
		let plan = plan_eviction(&rects, 300.0, 100.0, 1000);
		assert!(plan.is_empty());
	}

	#[test]
	fn evicts_far_outside_the_viewport_in_both_directions() {
		let rects = [
			ItemRect { top: -200.0, bottom: -100.1, height: 99.9 },
			ItemRect { top: 0.0, bottom: 300.0, height: 300.0 },
			ItemRect { top: 400.1, bottom: 500.0, height: 99.9 },
		];
		let plan = plan_eviction(&rects, 300.0, 100.0, 1000);
		assert_eq!(plan.evict, [0, 2]);
		assert_eq!(plan.removed_above, 99.9);
	}

	#[test]
	fn backstop_bounds_the_retained_count() {
		let surface = FakeSurface {
			heights: vec![30.0; 1200],
			scroll_top: 0.0,
			viewport_height: 300.0,
		};
		// An effectively infinite threshold isolates the backstop from the geometric rule.
		let plan = plan_for_surface(&surface, f64::MAX, 500);
		assert_eq!(plan.evict, (0..700).collect::<Vec<_>>());
		assert!(surface.item_count() - plan.evict.len() <= 500);
	}

	#[test]
	fn backstop_evicts_at_least_half_the_cap() {
		let surface = FakeSurface {
			heights: vec![30.0; 1020],
			scroll_top: 30.0 * 1020.0 - 300.0,
			viewport_height: 300.0,
		};
		let plan = plan_for_surface(&surface, f64::MAX, 1000);
		assert_eq!(plan.evict.len(), 500);
		assert_eq!(plan.evict[0], 0);
	}

	#[test]
	fn backstop_counts_straddlers_toward_the_anchor() {
		let rects = [
			ItemRect { top: -20.0, bottom: 30.0, height: 50.0 },
			ItemRect { top: 30.0, bottom: 80.0, height: 50.0 },
			ItemRect { top: 80.0, bottom: 130.0, height: 50.0 },
		];
		let plan = plan_eviction(&rects, 300.0, f64::MAX, 2);
		assert_eq!(plan.evict, [0]);
		assert_eq!(plan.removed_above, 20.0);
	}

	#[test]
	fn compensation_clamps_to_the_new_scroll_range() {
		assert_eq!(compensated_scroll_top(1000.0, 300.0, 300.0, 10_000.0), 700.0);
		assert_eq!(compensated_scroll_top(100.0, 300.0, 300.0, 10_000.0), 0.0);
		assert_eq!(compensated_scroll_top(5000.0, 0.0, 300.0, 1000.0), 700.0);
		assert_eq!(compensated_scroll_top(5000.0, 0.0, 300.0, 200.0), 0.0);
	}

	#[test]
	fn eviction_preserves_the_scroll_anchor() {
		let mut surface = FakeSurface {
			heights: vec![50.0; 200],
			scroll_top: 5000.0,
			viewport_height: 300.0,
		};
		let (anchor_index, anchor_top) = surface.first_visible();
		assert_eq!((anchor_index, anchor_top), (100, 0.0));

		let plan = plan_for_surface(&surface, 1000.0, usize::MAX);
		// Everything more than 1000px above is planned: indices 0..=78.
		assert_eq!(plan.evict[0], 0);
		assert!(plan.evict.contains(&78));
		assert!(!plan.evict.contains(&79));
		let evicted_above = plan.evict.iter().filter(|&&index| index < anchor_index).count();

		surface.apply(&plan);
		let compensated = compensated_scroll_top(surface.scroll_top, plan.removed_above, surface.viewport_height(), surface.scroll_height());
		surface.set_scroll_top(compensated);

		let (new_index, new_top) = surface.first_visible();
		assert_eq!(new_index, anchor_index - evicted_above);
		assert!((new_top - anchor_top).abs() < 1e-9);
	}
}
