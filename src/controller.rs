use crate::{
	error::Error,
	eviction::{compensated_scroll_top, plan_for_surface},
	options::ControllerOptions,
	surface::{DomSurface, ListSurface},
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
	future::Future,
	pin::Pin,
};
use js_sys::Array;
use std::rc::Rc;
use tracing::{error, info, instrument, trace, trace_span, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue, UnwrapThrowExt};
use wasm_bindgen_futures::spawn_local;
use web_sys::{AddEventListenerOptions, Document, Element, HtmlElement, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit, Window};

/// Future returned by a host's load callback. It resolves once the new batch has been rendered
/// into the container, ahead of the sentinel.
pub type LoadFuture = Pin<Box<dyn Future<Output = Result<(), JsValue>>>>;

type LoadCallback = Box<dyn FnMut(usize) -> LoadFuture>;

/// CSS class of the sentinel node appended as the container's last child.
pub const SENTINEL_CLASS: &str = "incremental-list-sentinel";
/// CSS class of the loading indicator shown while a batch load is in flight.
pub const INDICATOR_CLASS: &str = "incremental-list-loading";

/// Retained-item snapshots are refreshed at most this often outside of explicit list mutations.
const SNAPSHOT_INTERVAL_MS: f64 = 1_000.0;

/// Attached to a scrollable container element, this `struct` grows the list by asking the host for
/// item batches as the user approaches the bottom, and shrinks it again by evicting items far
/// outside the viewport so the DOM stays small.
///
/// Construction appends an invisible sentinel node as the container's last child. An
/// [***IntersectionObserver***](https://developer.mozilla.org/en-US/docs/Web/API/Intersection_Observer_API)
/// watching the sentinel triggers batch loads, and a passive
/// [***scroll***](https://developer.mozilla.org/en-US/docs/Web/API/Element/scroll_event)
/// listener drives frame-aligned recycling. Evicting items compensates the container's scroll
/// offset, so the content the user is looking at does not move.
///
/// # Teardown
///
/// [`destroy`](`IncrementalListController::destroy`) (also run on drop) detaches both listeners
/// and removes the controller's own nodes, but does not cancel a batch load already in flight: its
/// completion handler still runs, and its DOM effects land on the (by then possibly torn-down)
/// container. Hosts that destroy mid-load must tolerate that trailing mutation.
pub struct IncrementalListController {
	inner: Rc<Inner>,
}

impl IncrementalListController {
	/// Attaches a controller to `container`.
	///
	/// `load_more` is invoked with [`batch_size`](`ControllerOptions::batch_size`) whenever the
	/// sentinel comes within [`threshold`](`ControllerOptions::threshold`) pixels of the visible
	/// area and no other load is in flight. The host fetches that many items and renders them into
	/// the container, ahead of the sentinel, before resolving. A rejected load is logged and
	/// swallowed; the next visibility change retries naturally.
	///
	/// # Errors
	///
	/// [`Error::InvalidArgument`] if `container` is not mountable (it must belong to an HTML
	/// document attached to a window, and accept children), or if
	/// [`batch_size`](`ControllerOptions::batch_size`) or
	/// [`max_items`](`ControllerOptions::max_items`) is zero.
	pub fn new<L, F>(container: Element, load_more: L, options: ControllerOptions) -> Result<Self, Error>
	where
		L: 'static + FnMut(usize) -> F,
		F: 'static + Future<Output = Result<(), JsValue>>,
	{
		if options.batch_size == 0 {
			return Err(Error::InvalidArgument("`batch_size` must be nonzero"));
		}
		if options.max_items == 0 {
			return Err(Error::InvalidArgument("`max_items` must be nonzero"));
		}

		let document = container.owner_document().ok_or(Error::InvalidArgument("`container` has no owner document"))?;
		let window = document.default_view().ok_or(Error::InvalidArgument("`container`'s document is not attached to a window"))?;

		let sentinel = create_div(&document, SENTINEL_CLASS)?;
		if let Err(error) = sentinel.set_attribute("aria-hidden", "true") {
			warn!("Failed to hide the sentinel from assistive technology: {:?}", error);
		}
		set_style(&sentinel, "height", "1px");

		let indicator = create_div(&document, INDICATOR_CLASS)?;
		indicator.set_text_content(Some("Loading…"));
		set_style(&indicator, "display", "none");

		container
			.append_child(sentinel.as_ref())
			.and_then(|_| container.insert_before(indicator.as_ref(), Some(sentinel.as_ref())))
			.map_err(|_| Error::InvalidArgument("`container` does not accept children"))?;

		let mut load_more = load_more;
		let inner = Rc::new(Inner {
			last_scroll_top: Cell::new(f64::from(container.scroll_top())),
			container,
			window,
			sentinel,
			indicator,
			options,
			load_more: RefCell::new(Box::new(move |batch_size| -> LoadFuture { Box::pin(load_more(batch_size)) })),
			is_loading: Cell::new(false),
			destroyed: Cell::new(false),
			last_recycle_ms: Cell::new(0.0),
			raf_handle: Cell::new(None),
			items: RefCell::new(Vec::new()),
			snapshot_ms: Cell::new(f64::NEG_INFINITY),
			observer: RefCell::new(None),
			observer_callback: RefCell::new(None),
			scroll_callback: RefCell::new(None),
			raf_callback: RefCell::new(None),
		});

		inner.refresh_items(true);

		let observer_callback = {
			let inner = Rc::clone(&inner);
			Closure::wrap(Box::new(move |entries: Array, _: IntersectionObserver| {
				let visible = entries.iter().any(|entry| entry.unchecked_into::<IntersectionObserverEntry>().is_intersecting());
				if visible {
					Inner::maybe_begin_load(&inner);
				} else {
					trace!("Sentinel left the extended viewport.");
				}
			}) as Box<dyn FnMut(Array, IntersectionObserver)>)
		};

		let mut init = IntersectionObserverInit::new();
		init.root(Some(&inner.container));
		init.root_margin(&format!("0px 0px {}px 0px", inner.options.threshold));
		let observer = IntersectionObserver::new_with_options(observer_callback.as_ref().unchecked_ref(), &init)
			.expect_throw("incremental-list: Failed to create an `IntersectionObserver`.");
		observer.observe(inner.sentinel.as_ref());

		let scroll_callback = {
			let inner = Rc::clone(&inner);
			Closure::wrap(Box::new(move |_: web_sys::Event| inner.on_scroll()) as Box<dyn FnMut(web_sys::Event)>)
		};
		let mut listener_options = AddEventListenerOptions::new();
		listener_options.passive(true);
		inner
			.container
			.add_event_listener_with_callback_and_add_event_listener_options("scroll", scroll_callback.as_ref().unchecked_ref(), &listener_options)
			.expect_throw("incremental-list: Failed to attach the scroll listener.");

		let raf_callback = {
			let inner = Rc::clone(&inner);
			Closure::wrap(Box::new(move |_: f64| {
				inner.raf_handle.set(None);
				if inner.destroyed.get() {
					return;
				}
				if inner.now_ms() - inner.last_recycle_ms.get() < inner.options.recycling_interval {
					trace!("Within the advisory recycling interval; skipping this frame.");
					return;
				}
				inner.recycle_pass();
			}) as Box<dyn FnMut(f64)>)
		};

		*inner.observer.borrow_mut() = Some(observer);
		*inner.observer_callback.borrow_mut() = Some(observer_callback);
		*inner.scroll_callback.borrow_mut() = Some(scroll_callback);
		*inner.raf_callback.borrow_mut() = Some(raf_callback);

		info!("Attached to container; sentinel observation active.");
		Ok(Self { inner })
	}

	/// Whether a batch load is currently in flight.
	#[must_use]
	pub fn is_loading(&self) -> bool {
		self.inner.is_loading.get()
	}

	/// Number of retained items, as of the latest snapshot.
	#[must_use]
	pub fn item_count(&self) -> usize {
		self.inner.items.borrow().len()
	}

	#[must_use]
	pub fn options(&self) -> &ControllerOptions {
		&self.inner.options
	}

	/// Runs an eviction pass immediately, bypassing the scroll debounce and the advisory interval.
	pub fn recycle_now(&self) {
		if self.inner.destroyed.get() {
			trace!("Ignoring manual recycling after destruction.");
			return;
		}
		self.inner.refresh_items(true);
		self.inner.recycle_pass();
	}

	/// Detaches both listeners and removes the sentinel and loading indicator from the container.
	///
	/// Idempotent, and also run when the controller is dropped. See the type-level note on loads
	/// still in flight.
	pub fn destroy(&mut self) {
		self.inner.destroy();
	}
}

impl Debug for IncrementalListController {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("IncrementalListController")
			.field("options", &self.inner.options)
			.field("is_loading", &self.inner.is_loading.get())
			.field("destroyed", &self.inner.destroyed.get())
			.field("retained", &self.inner.items.borrow().len())
			.finish_non_exhaustive()
	}
}

impl Drop for IncrementalListController {
	fn drop(&mut self) {
		self.inner.destroy();
	}
}

#[allow(clippy::type_complexity)]
struct Inner {
	container: Element,
	window: Window,
	sentinel: HtmlElement,
	indicator: HtmlElement,
	options: ControllerOptions,
	load_more: RefCell<LoadCallback>,
	is_loading: Cell<bool>,
	destroyed: Cell<bool>,
	last_scroll_top: Cell<f64>,
	last_recycle_ms: Cell<f64>,
	raf_handle: Cell<Option<i32>>,
	items: RefCell<Vec<HtmlElement>>,
	snapshot_ms: Cell<f64>,
	observer: RefCell<Option<IntersectionObserver>>,
	observer_callback: RefCell<Option<Closure<dyn FnMut(Array, IntersectionObserver)>>>,
	scroll_callback: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>>,
	raf_callback: RefCell<Option<Closure<dyn FnMut(f64)>>>,
}

impl Inner {
	fn now_ms(&self) -> f64 {
		self.window.performance().expect_throw("incremental-list: No `Performance` on the window.").now()
	}

	/// Re-snapshots the container's item children (everything except the sentinel and indicator),
	/// at most once per [`SNAPSHOT_INTERVAL_MS`] unless `force`d by a list mutation.
	fn refresh_items(&self, force: bool) {
		let now = self.now_ms();
		if !force && now - self.snapshot_ms.get() < SNAPSHOT_INTERVAL_MS {
			return;
		}
		self.snapshot_ms.set(now);

		let children = self.container.children();
		let mut items = Vec::with_capacity(children.length() as usize);
		for i in 0..children.length() {
			let child = children.item(i).unwrap_throw();
			if child.is_same_node(Some(self.sentinel.as_ref())) || child.is_same_node(Some(self.indicator.as_ref())) {
				continue;
			}
			match child.dyn_into::<HtmlElement>() {
				Ok(item) => items.push(item),
				Err(child) => warn!("The item sequence contains a non-HTML child that won't be managed: {:?}", child),
			}
		}
		trace!("Snapshot refreshed: {} item(s).", items.len());
		*self.items.borrow_mut() = items;
	}

	fn maybe_begin_load(inner: &Rc<Self>) {
		if inner.destroyed.get() {
			trace!("Ignoring visibility trigger after destruction.");
			return;
		}
		if inner.is_loading.get() {
			trace!("A batch load is already in flight; ignoring visibility trigger.");
			return;
		}

		let span = trace_span!("Loading batch", batch_size = inner.options.batch_size);
		let _enter = span.enter();
		inner.is_loading.set(true);
		inner.show_indicator();

		let future = (*inner.load_more.borrow_mut())(inner.options.batch_size);
		let inner = Rc::clone(inner);
		spawn_local(async move {
			let result = future.await;
			inner.finish_load(result);
		});
	}

	#[instrument(skip(self))]
	fn finish_load(&self, result: Result<(), JsValue>) {
		match result {
			Ok(()) => {
				self.ensure_sentinel_last();
				self.refresh_items(true);
				self.recycle_pass();
			}
			Err(rejection) => error!("{}", Error::LoadFailure(rejection)),
		}
		self.hide_indicator();
		self.is_loading.set(false);
	}

	fn show_indicator(&self) {
		// Hosts insert ahead of the sentinel, so the indicator is moved back to the very end of
		// the item sequence each time it is shown.
		if let Err(error) = self.container.insert_before(self.indicator.as_ref(), Some(self.sentinel.as_ref())) {
			error!("Failed to position the loading indicator: {:?}", error);
		}
		set_style(&self.indicator, "display", "block");
	}

	fn hide_indicator(&self) {
		set_style(&self.indicator, "display", "none");
	}

	fn ensure_sentinel_last(&self) {
		let is_last = self
			.container
			.last_element_child()
			.map_or(false, |last| last.is_same_node(Some(self.sentinel.as_ref())));
		if !is_last {
			warn!("Sentinel is no longer the container's last child; moving it back.");
			if let Err(error) = self.container.append_child(self.sentinel.as_ref()) {
				error!("Failed to restore the sentinel: {:?}", error);
			}
		}
	}

	fn on_scroll(&self) {
		self.last_scroll_top.set(f64::from(self.container.scroll_top()));
		if self.destroyed.get() || !self.options.enable_scroll_recycling {
			return;
		}
		if self.raf_handle.get().is_some() {
			// Already coalesced into the next frame.
			return;
		}
		if let Some(raf_callback) = self.raf_callback.borrow().as_ref() {
			match self.window.request_animation_frame(raf_callback.as_ref().unchecked_ref()) {
				Ok(handle) => self.raf_handle.set(Some(handle)),
				Err(error) => error!("Failed to schedule a recycling frame: {:?}", error),
			}
		}
	}

	#[instrument(skip(self))]
	fn recycle_pass(&self) {
		self.last_recycle_ms.set(self.now_ms());
		self.refresh_items(false);

		let mut items = self.items.borrow_mut();
		if items.is_empty() {
			return;
		}
		trace!("Scanning {} retained item(s).", items.len());

		let last_scroll_top = self.last_scroll_top.get();
		let plan = {
			let surface = DomSurface::new(&self.container, &items);
			plan_for_surface(&surface, self.options.recycle_threshold, self.options.max_items)
		};
		if plan.is_empty() {
			trace!("Nothing to evict.");
			return;
		}

		for &index in plan.evict.iter().rev() {
			items.remove(index).remove();
		}

		let mut surface = DomSurface::new(&self.container, &items);
		let compensated = compensated_scroll_top(last_scroll_top, plan.removed_above, surface.viewport_height(), surface.scroll_height());
		surface.set_scroll_top(compensated);
		self.last_scroll_top.set(compensated);

		info!("Evicted {} item(s) ({}px, {}px of it above the viewport); {} retained.", plan.evict.len(), plan.removed_height, plan.removed_above, items.len());
	}

	#[instrument(skip(self))]
	fn destroy(&self) {
		if self.destroyed.replace(true) {
			trace!("Ignoring repeated destruction.");
			return;
		}

		if let Some(observer) = self.observer.borrow_mut().take() {
			observer.disconnect();
		}
		if let Some(scroll_callback) = self.scroll_callback.borrow_mut().take() {
			if let Err(error) = self.container.remove_event_listener_with_callback("scroll", scroll_callback.as_ref().unchecked_ref()) {
				error!("Failed to remove the scroll listener: {:?}", error);
			}
		}
		if let Some(handle) = self.raf_handle.take() {
			if let Err(error) = self.window.cancel_animation_frame(handle) {
				warn!("Failed to cancel the pending recycling frame: {:?}", error);
			}
		}
		self.raf_callback.borrow_mut().take();
		self.observer_callback.borrow_mut().take();

		self.sentinel.remove();
		self.indicator.remove();
		self.items.borrow_mut().clear();
		info!("Detached from container.");
	}
}

fn create_div(document: &Document, class: &str) -> Result<HtmlElement, Error> {
	let element: HtmlElement = document
		.create_element("div")
		.map_err(|_| Error::InvalidArgument("`container`'s document cannot create elements"))?
		.dyn_into()
		.map_err(|_| Error::InvalidArgument("`container`'s document is not an HTML document"))?;
	element.set_class_name(class);
	Ok(element)
}

fn set_style(element: &HtmlElement, property: &str, value: &str) {
	if let Err(error) = element.style().set_property(property, value) {
		warn!("Failed to set `{}: {}` on a controller node: {:?}", property, value, error);
	}
}
