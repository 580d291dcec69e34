//! Documents: an `<html>` root with a `<body>` to mount controllers into.

use crate::error::SelectorError;
use crate::node::Node;
use crate::parser::parse_fragment;

/// An HTML document.
#[derive(Clone, Debug)]
pub struct Document {
	root: Node,
	body: Node,
}

impl Document {
	/// An empty document: `<html><head></head><body></body></html>`.
	pub fn new() -> Self {
		Self::from_html("")
	}

	/// Build a document whose body holds the given markup.
	///
	/// When `markup` already contains an `<html>` element it is used as the root; a missing
	/// `<body>` is created.
	pub fn from_html(markup: &str) -> Self {
		let parsed = parse_fragment(markup);
		let root = parsed
			.element_children()
			.into_iter()
			.find(|node| node.tag_name() == Some("html"));

		let root = match root {
			Some(root) => root,
			None => {
				let root = Node::element("html");
				let body = Node::element("body");
				attach(&body, &parsed);
				attach(&root, &Node::element("head"));
				attach(&root, &body);
				root
			}
		};
		root.remove();

		let body = root
			.element_children()
			.into_iter()
			.find(|node| node.tag_name() == Some("body"))
			.unwrap_or_else(|| {
				let body = Node::element("body");
				attach(&root, &body);
				body
			});

		Self { root, body }
	}

	/// The `<html>` element.
	pub fn document_element(&self) -> Node {
		self.root.clone()
	}

	/// The `<body>` element.
	pub fn body(&self) -> Node {
		self.body.clone()
	}

	/// Create a detached element.
	pub fn create_element(&self, tag: &str) -> Node {
		Node::element(tag)
	}

	/// Create a detached text node.
	pub fn create_text_node(&self, data: &str) -> Node {
		Node::text(data)
	}

	/// First element in the document matching `selector`.
	pub fn query_selector(&self, selector: &str) -> Result<Option<Node>, SelectorError> {
		if self.root.matches(selector)? {
			return Ok(Some(self.root.clone()));
		}
		self.root.query_selector(selector)
	}

	/// Every element in the document matching `selector`.
	pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Node>, SelectorError> {
		let mut found = self.root.query_selector_all(selector)?;
		if self.root.matches(selector)? {
			found.insert(0, self.root.clone());
		}
		Ok(found)
	}
}

impl Default for Document {
	fn default() -> Self {
		Self::new()
	}
}

fn attach(parent: &Node, child: &Node) {
	if let Err(error) = parent.append_child(child) {
		tracing::warn!(%error, "failed to assemble document");
	}
}
