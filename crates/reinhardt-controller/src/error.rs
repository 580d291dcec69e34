//! Error types for controllers.
//!
//! Programmer mistakes surface synchronously as [`ControllerError`]. Failures of a render
//! cycle surface asynchronously as [`RenderError`] through the render's
//! [`Deferred`](reinhardt_deferred::Deferred).

use std::error::Error as StdError;
use std::fmt;
use std::rc::Rc;

use reinhardt_dom::SelectorError;

/// Failure reported by a data source or a markup function.
#[derive(Clone)]
pub struct ComponentError {
	message: String,
	source: Option<Rc<dyn StdError + 'static>>,
}

impl ComponentError {
	/// Create an error with a message.
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			source: None,
		}
	}

	/// Create an error caused by `source`.
	pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
	where
		E: StdError + 'static,
	{
		Self {
			message: message.into(),
			source: Some(Rc::new(source)),
		}
	}

	/// The error message.
	pub fn message(&self) -> &str {
		&self.message
	}
}

impl fmt::Display for ComponentError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.message)
	}
}

impl fmt::Debug for ComponentError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut debug = f.debug_struct("ComponentError");
		debug.field("message", &self.message);
		if let Some(source) = &self.source {
			debug.field("source", &source.to_string());
		}
		debug.finish()
	}
}

impl StdError for ComponentError {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		self.source.as_deref()
	}
}

impl From<serde_json::Error> for ComponentError {
	fn from(error: serde_json::Error) -> Self {
		Self::with_source("serialization failed", error)
	}
}

/// Misuse of the controller API, reported synchronously at the call site.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum ControllerError {
	/// No element matched the selector given at construction.
	#[error("could not find element for selector `{selector}`")]
	ElementNotFound {
		/// The selector that matched nothing.
		selector: String,
	},

	/// Controllers render into elements only.
	#[error("controllers can only be attached to element nodes")]
	InvalidElement,

	/// The controller has been destroyed.
	#[error("cannot start a destroyed controller")]
	Destroyed,

	/// The component declares no data sources.
	#[error("component `{component}` declares no datasources")]
	MissingDatasources {
		/// Name of the component.
		component: String,
	},

	/// `start_from` was given a group index past the last group.
	#[error("datasource group {index} is out of range ({len} groups)")]
	GroupOutOfRange {
		/// Requested group.
		index: usize,
		/// Number of declared groups.
		len: usize,
	},

	/// An event key is not of the form `"<type> <selector>"`.
	#[error("invalid event key `{key}`, expected \"<type> <selector>\"")]
	InvalidEventKey {
		/// The offending key.
		key: String,
	},

	/// A child or event selector failed to parse.
	#[error(transparent)]
	InvalidSelector(#[from] SelectorError),
}

/// Why a render cycle did not complete.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
	/// A newer render superseded this one, or the controller was destroyed.
	#[error("render was cancelled")]
	Cancelled,

	/// A data source failed.
	#[error("datasource `{key}` in group {group} failed: {source}")]
	Resolve {
		/// Group index.
		group: usize,
		/// Data source name.
		key: String,
		/// The producer's error.
		source: ComponentError,
	},

	/// The markup function failed.
	#[error("markup generation failed: {0}")]
	Generate(ComponentError),

	/// A child controller failed to start or render.
	#[error("child `{selector}` failed: {source}")]
	Child {
		/// Selector of the child declaration.
		selector: String,
		/// The child's error.
		source: Box<RenderError>,
	},

	/// A lifecycle error raised while rendering, e.g. by a child factory.
	#[error(transparent)]
	Lifecycle(#[from] ControllerError),
}

impl RenderError {
	/// Whether the render was superseded rather than broken.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}
}
