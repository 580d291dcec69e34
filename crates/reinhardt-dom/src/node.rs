//! Live DOM nodes.
//!
//! A [`Node`] is a cheap, cloneable handle; clones refer to the same live node, and identity
//! is compared with [`Node::is_same_node`]. Parents own their children, children keep a weak
//! back-link to their parent.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::DomError;
use crate::event::ListenerEntry;
use crate::html;

/// The kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
	/// An element with a tag name and attributes.
	Element,
	/// Character data.
	Text,
	/// A comment.
	Comment,
	/// A parentless container for a list of nodes.
	Fragment,
}

pub(crate) struct NodeInner {
	node_type: NodeType,
	/// Lowercase tag name, empty for non-elements
	tag: String,
	attributes: RefCell<Vec<(String, String)>>,
	data: RefCell<String>,
	parent: RefCell<Weak<NodeInner>>,
	children: RefCell<Vec<Node>>,
	pub(crate) listeners: RefCell<Vec<ListenerEntry>>,
}

/// Handle to a live DOM node.
#[derive(Clone)]
pub struct Node {
	pub(crate) inner: Rc<NodeInner>,
}

impl Node {
	fn with_type(node_type: NodeType, tag: String, data: String) -> Self {
		Self {
			inner: Rc::new(NodeInner {
				node_type,
				tag,
				attributes: RefCell::new(Vec::new()),
				data: RefCell::new(data),
				parent: RefCell::new(Weak::new()),
				children: RefCell::new(Vec::new()),
				listeners: RefCell::new(Vec::new()),
			}),
		}
	}

	/// Create a detached element. The tag name is lowercased.
	pub fn element(tag: &str) -> Self {
		Self::with_type(NodeType::Element, tag.to_ascii_lowercase(), String::new())
	}

	/// Create a detached text node.
	pub fn text(data: impl Into<String>) -> Self {
		Self::with_type(NodeType::Text, String::new(), data.into())
	}

	/// Create a detached comment node.
	pub fn comment(data: impl Into<String>) -> Self {
		Self::with_type(NodeType::Comment, String::new(), data.into())
	}

	/// Create an empty fragment.
	pub fn fragment() -> Self {
		Self::with_type(NodeType::Fragment, String::new(), String::new())
	}

	pub(crate) fn from_inner(inner: Rc<NodeInner>) -> Self {
		Self { inner }
	}

	/// The node's kind.
	pub fn node_type(&self) -> NodeType {
		self.inner.node_type
	}

	/// Whether this node is an element.
	pub fn is_element(&self) -> bool {
		self.inner.node_type == NodeType::Element
	}

	/// The lowercase tag name for elements.
	pub fn tag_name(&self) -> Option<&str> {
		self.is_element().then_some(self.inner.tag.as_str())
	}

	/// Identity comparison: both handles refer to the same live node.
	pub fn is_same_node(&self, other: &Node) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	/// Structural comparison of type, tag, attributes, data and children.
	pub fn is_equal_node(&self, other: &Node) -> bool {
		if self.node_type() != other.node_type()
			|| self.inner.tag != other.inner.tag
			|| *self.inner.attributes.borrow() != *other.inner.attributes.borrow()
			|| *self.inner.data.borrow() != *other.inner.data.borrow()
		{
			return false;
		}
		let ours = self.children();
		let theirs = other.children();
		ours.len() == theirs.len() && ours.iter().zip(&theirs).all(|(a, b)| a.is_equal_node(b))
	}

	// ---------------------------------------------------------------------
	// Attributes
	// ---------------------------------------------------------------------

	/// Value of the named attribute.
	pub fn attribute(&self, name: &str) -> Option<String> {
		self.inner
			.attributes
			.borrow()
			.iter()
			.find(|(key, _)| key == name)
			.map(|(_, value)| value.clone())
	}

	/// Whether the named attribute is present.
	pub fn has_attribute(&self, name: &str) -> bool {
		self.inner
			.attributes
			.borrow()
			.iter()
			.any(|(key, _)| key == name)
	}

	/// All attributes in insertion order.
	pub fn attributes(&self) -> Vec<(String, String)> {
		self.inner.attributes.borrow().clone()
	}

	/// Set an attribute, keeping its position when it already exists.
	///
	/// Ignored for non-elements.
	pub fn set_attribute(&self, name: &str, value: &str) {
		if !self.is_element() {
			return;
		}
		let name = name.to_ascii_lowercase();
		let mut attributes = self.inner.attributes.borrow_mut();
		match attributes.iter_mut().find(|(key, _)| *key == name) {
			Some((_, existing)) => *existing = value.to_string(),
			None => attributes.push((name, value.to_string())),
		}
	}

	/// Remove an attribute. Returns whether it was present.
	pub fn remove_attribute(&self, name: &str) -> bool {
		let mut attributes = self.inner.attributes.borrow_mut();
		let before = attributes.len();
		attributes.retain(|(key, _)| key != name);
		attributes.len() != before
	}

	/// The `id` attribute.
	pub fn id(&self) -> Option<String> {
		self.attribute("id")
	}

	/// Whitespace-separated entries of the `class` attribute.
	pub fn class_list(&self) -> Vec<String> {
		self.attribute("class")
			.map(|classes| classes.split_whitespace().map(str::to_string).collect())
			.unwrap_or_default()
	}

	/// Whether the `class` attribute contains `class_name`.
	pub fn has_class(&self, class_name: &str) -> bool {
		self.inner
			.attributes
			.borrow()
			.iter()
			.find(|(key, _)| key == "class")
			.is_some_and(|(_, value)| value.split_whitespace().any(|c| c == class_name))
	}

	// ---------------------------------------------------------------------
	// Character data
	// ---------------------------------------------------------------------

	/// Character data of a text or comment node.
	pub fn data(&self) -> String {
		self.inner.data.borrow().clone()
	}

	/// Replace the character data of a text or comment node.
	pub fn set_data(&self, data: &str) {
		if matches!(self.node_type(), NodeType::Text | NodeType::Comment) {
			*self.inner.data.borrow_mut() = data.to_string();
		}
	}

	/// Concatenated text of this node and its descendants.
	pub fn text_content(&self) -> String {
		match self.node_type() {
			NodeType::Text => self.data(),
			NodeType::Comment => String::new(),
			NodeType::Element | NodeType::Fragment => {
				self.children().iter().map(Node::text_content).collect()
			}
		}
	}

	// ---------------------------------------------------------------------
	// Tree structure
	// ---------------------------------------------------------------------

	/// The parent node, if attached.
	pub fn parent(&self) -> Option<Node> {
		self.inner.parent.borrow().upgrade().map(Node::from_inner)
	}

	/// The parent node when it is an element.
	pub fn parent_element(&self) -> Option<Node> {
		self.parent().filter(Node::is_element)
	}

	/// Snapshot of the child list.
	pub fn children(&self) -> Vec<Node> {
		self.inner.children.borrow().clone()
	}

	/// Child elements only.
	pub fn element_children(&self) -> Vec<Node> {
		self.inner
			.children
			.borrow()
			.iter()
			.filter(|child| child.is_element())
			.cloned()
			.collect()
	}

	/// Number of children.
	pub fn child_count(&self) -> usize {
		self.inner.children.borrow().len()
	}

	/// Child at `index`.
	pub fn child_at(&self, index: usize) -> Option<Node> {
		self.inner.children.borrow().get(index).cloned()
	}

	/// First child element.
	pub fn first_element_child(&self) -> Option<Node> {
		self.inner
			.children
			.borrow()
			.iter()
			.find(|child| child.is_element())
			.cloned()
	}

	/// Position of this node in its parent's child list.
	pub fn index_in_parent(&self) -> Option<usize> {
		let parent = self.parent()?;
		parent.position_of(self)
	}

	fn position_of(&self, child: &Node) -> Option<usize> {
		self.inner
			.children
			.borrow()
			.iter()
			.position(|candidate| candidate.is_same_node(child))
	}

	/// Whether `other` is this node or one of its descendants.
	pub fn contains(&self, other: &Node) -> bool {
		let mut current = Some(other.clone());
		while let Some(node) = current {
			if node.is_same_node(self) {
				return true;
			}
			current = node.parent();
		}
		false
	}

	/// Descendants in document order, excluding this node.
	pub fn descendants(&self) -> Vec<Node> {
		let mut out = Vec::new();
		self.collect_descendants(&mut out);
		out
	}

	fn collect_descendants(&self, out: &mut Vec<Node>) {
		for child in self.inner.children.borrow().iter() {
			out.push(child.clone());
			child.collect_descendants(out);
		}
	}

	/// Append `child`, detaching it from its current parent first.
	///
	/// Appending a fragment moves the fragment's children instead.
	pub fn append_child(&self, child: &Node) -> Result<(), DomError> {
		self.insert_before(child, None)
	}

	/// Insert `child` before `reference`, or at the end when `reference` is `None`.
	pub fn insert_before(&self, child: &Node, reference: Option<&Node>) -> Result<(), DomError> {
		if matches!(self.node_type(), NodeType::Text | NodeType::Comment) {
			return Err(DomError::HierarchyRequest(
				"character data nodes cannot have children".to_string(),
			));
		}
		if child.contains(self) {
			return Err(DomError::HierarchyRequest(
				"a node cannot be inserted into its own subtree".to_string(),
			));
		}
		if let Some(reference) = reference {
			if reference.is_same_node(child) {
				return Ok(());
			}
			if self.position_of(reference).is_none() {
				return Err(DomError::NotAChild);
			}
		}

		if child.node_type() == NodeType::Fragment {
			for grandchild in child.children() {
				self.insert_before(&grandchild, reference)?;
			}
			return Ok(());
		}

		child.remove();
		let index = match reference {
			Some(reference) => self.position_of(reference).ok_or(DomError::NotAChild)?,
			None => self.child_count(),
		};
		self.inner.children.borrow_mut().insert(index, child.clone());
		*child.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
		Ok(())
	}

	/// Remove `child` from this node. Returns whether it was a child.
	pub fn remove_child(&self, child: &Node) -> bool {
		let Some(index) = self.position_of(child) else {
			return false;
		};
		self.inner.children.borrow_mut().remove(index);
		*child.inner.parent.borrow_mut() = Weak::new();
		true
	}

	/// Replace `old` with `new`.
	pub fn replace_child(&self, new: &Node, old: &Node) -> Result<(), DomError> {
		if new.is_same_node(old) {
			return Ok(());
		}
		if self.position_of(old).is_none() {
			return Err(DomError::NotAChild);
		}
		self.insert_before(new, Some(old))?;
		self.remove_child(old);
		Ok(())
	}

	/// Detach this node from its parent, if any.
	pub fn remove(&self) {
		if let Some(parent) = self.parent() {
			parent.remove_child(self);
		}
	}

	/// Remove every child.
	pub fn clear_children(&self) {
		for child in self.inner.children.borrow_mut().drain(..) {
			*child.inner.parent.borrow_mut() = Weak::new();
		}
	}

	/// Copy of this node without children or listeners.
	pub fn shallow_clone(&self) -> Node {
		let copy = Self::with_type(self.node_type(), self.inner.tag.clone(), self.data());
		*copy.inner.attributes.borrow_mut() = self.attributes();
		copy
	}

	/// Copy of this node and its subtree, without listeners.
	pub fn deep_clone(&self) -> Node {
		let copy = self.shallow_clone();
		for child in self.inner.children.borrow().iter() {
			let child_copy = child.deep_clone();
			*child_copy.inner.parent.borrow_mut() = Rc::downgrade(&copy.inner);
			copy.inner.children.borrow_mut().push(child_copy);
		}
		copy
	}

	// ---------------------------------------------------------------------
	// Markup
	// ---------------------------------------------------------------------

	/// Serialized markup of this node.
	pub fn outer_html(&self) -> String {
		let mut out = String::new();
		html::write_node(self, &mut out);
		out
	}

	/// Serialized markup of the children.
	pub fn inner_html(&self) -> String {
		let mut out = String::new();
		html::write_children(self, &mut out);
		out
	}

	/// Replace the children with nodes parsed from `markup`.
	pub fn set_inner_html(&self, markup: &str) {
		if matches!(self.node_type(), NodeType::Text | NodeType::Comment) {
			return;
		}
		self.clear_children();
		let parsed = crate::parser::parse_fragment(markup);
		for child in parsed.children() {
			parsed.remove_child(&child);
			*child.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
			self.inner.children.borrow_mut().push(child);
		}
	}
}

impl fmt::Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.node_type() {
			NodeType::Element => f
				.debug_struct("Element")
				.field("tag", &self.inner.tag)
				.field("attributes", &*self.inner.attributes.borrow())
				.field("children", &self.child_count())
				.finish(),
			NodeType::Text => f.debug_tuple("Text").field(&*self.inner.data.borrow()).finish(),
			NodeType::Comment => f
				.debug_tuple("Comment")
				.field(&*self.inner.data.borrow())
				.finish(),
			NodeType::Fragment => f
				.debug_struct("Fragment")
				.field("children", &self.child_count())
				.finish(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_append_moves_node_between_parents() {
		let first = Node::element("div");
		let second = Node::element("div");
		let child = Node::element("span");

		first.append_child(&child).unwrap();
		second.append_child(&child).unwrap();

		assert_eq!(first.child_count(), 0);
		assert!(child.parent().unwrap().is_same_node(&second));
	}

	#[rstest]
	fn test_insert_before_reorders_existing_child() {
		let parent = Node::element("ul");
		let a = Node::element("li");
		let b = Node::element("li");
		parent.append_child(&a).unwrap();
		parent.append_child(&b).unwrap();

		parent.insert_before(&b, Some(&a)).unwrap();

		assert!(parent.child_at(0).unwrap().is_same_node(&b));
		assert!(parent.child_at(1).unwrap().is_same_node(&a));
		assert_eq!(a.index_in_parent(), Some(1));
	}

	#[rstest]
	fn test_cannot_insert_ancestor_into_descendant() {
		let outer = Node::element("div");
		let inner = Node::element("div");
		outer.append_child(&inner).unwrap();

		let result = inner.append_child(&outer);

		assert!(matches!(result, Err(DomError::HierarchyRequest(_))));
	}

	#[rstest]
	fn test_fragment_children_are_moved() {
		let fragment = Node::fragment();
		fragment.append_child(&Node::text("a")).unwrap();
		fragment.append_child(&Node::text("b")).unwrap();
		let target = Node::element("p");

		target.append_child(&fragment).unwrap();

		assert_eq!(fragment.child_count(), 0);
		assert_eq!(target.text_content(), "ab");
	}

	#[rstest]
	fn test_set_attribute_keeps_order() {
		let node = Node::element("a");
		node.set_attribute("href", "/");
		node.set_attribute("class", "x");
		node.set_attribute("HREF", "/home");

		assert_eq!(
			node.attributes(),
			vec![
				("href".to_string(), "/home".to_string()),
				("class".to_string(), "x".to_string())
			]
		);
		assert!(node.remove_attribute("class"));
		assert!(!node.remove_attribute("class"));
	}

	#[rstest]
	fn test_deep_clone_is_structurally_equal_but_distinct() {
		let node = Node::element("div");
		node.set_inner_html("<p class=\"a\">hi <b>there</b></p>");

		let copy = node.deep_clone();

		assert!(copy.is_equal_node(&node));
		assert!(!copy.is_same_node(&node));
		assert!(copy.first_element_child().unwrap().parent().unwrap().is_same_node(&copy));
	}
}
