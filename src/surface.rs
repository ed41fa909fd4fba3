use web_sys::{Element, HtmlElement};

/// One item's bounding box, in pixels, relative to the top edge of the container's viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemRect {
	pub top: f64,
	pub bottom: f64,
	pub height: f64,
}

/// Geometry and scrolling capabilities of a managed list.
///
/// The eviction algorithm is written against this interface rather than against
/// [***getBoundingClientRect***](https://developer.mozilla.org/en-US/docs/Web/API/Element/getBoundingClientRect)
/// directly, so it can run against simulated geometry in tests that have no layout engine.
pub trait ListSurface {
	/// Height of the visible area, in pixels.
	fn viewport_height(&self) -> f64;
	fn set_scroll_top(&mut self, offset: f64);
	/// Total content height, in pixels.
	fn scroll_height(&self) -> f64;
	/// Number of retained items.
	fn item_count(&self) -> usize;
	/// Measures the item at `index` in the retained sequence.
	fn measure(&self, index: usize) -> ItemRect;
}

/// [`ListSurface`] over a real scroll container and its retained item nodes.
///
/// The container's own client rectangle is captured once at construction; item measurements are
/// reported relative to it.
#[derive(Debug)]
pub struct DomSurface<'a> {
	container: &'a Element,
	items: &'a [HtmlElement],
	container_top: f64,
	viewport_height: f64,
}

impl<'a> DomSurface<'a> {
	#[must_use]
	pub fn new(container: &'a Element, items: &'a [HtmlElement]) -> Self {
		Self {
			container_top: container.get_bounding_client_rect().top(),
			viewport_height: f64::from(container.client_height()),
			container,
			items,
		}
	}
}

impl ListSurface for DomSurface<'_> {
	fn viewport_height(&self) -> f64 {
		self.viewport_height
	}

	#[allow(clippy::cast_possible_truncation)]
	fn set_scroll_top(&mut self, offset: f64) {
		self.container.set_scroll_top(offset as i32);
	}

	fn scroll_height(&self) -> f64 {
		f64::from(self.container.scroll_height())
	}

	fn item_count(&self) -> usize {
		self.items.len()
	}

	fn measure(&self, index: usize) -> ItemRect {
		let rect = self.items[index].get_bounding_client_rect();
		ItemRect {
			top: rect.top() - self.container_top,
			bottom: rect.bottom() - self.container_top,
			height: rect.height(),
		}
	}
}
