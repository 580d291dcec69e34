//! Error types for DOM operations.

/// Errors raised by tree mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
	/// The node cannot be inserted at this position (e.g. into its own subtree).
	#[error("hierarchy request error: {0}")]
	HierarchyRequest(String),

	/// The reference node is not a child of the parent.
	#[error("node is not a child of this parent")]
	NotAChild,
}

/// Error returned when a selector string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid selector `{selector}` at position {position}")]
pub struct SelectorError {
	/// The selector source text.
	pub selector: String,
	/// Byte offset where parsing stopped.
	pub position: usize,
}
