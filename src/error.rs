use thiserror::Error;
use wasm_bindgen::JsValue;

/// Ways an [`IncrementalListController`](`crate::IncrementalListController`) can fail.
#[derive(Debug, Error)]
pub enum Error {
	/// Synchronous construction failure: the container is not mountable or the options are out of
	/// range. Fatal to the caller; nothing has been attached.
	#[error("invalid argument: {0}")]
	InvalidArgument(&'static str),
	/// The host's load callback rejected. Recovered internally: the controller logs the rejection,
	/// hides the loading indicator and returns to a ready state, so the next visibility trigger
	/// retries naturally. There is no automatic retry and no backoff.
	#[error("batch load failed: {0:?}")]
	LoadFailure(JsValue),
}
