//! Delegated event handling.
//!
//! A controller attaches one listener per event type to its own element. When an event
//! arrives, every rule of that type whose selector matches the target (or, by default, the
//! nearest matching ancestor inside the controller element) runs in declaration order.
//! Events whose target lies inside a child controller's root are left to the child.

use std::fmt;

use reinhardt_dom::{Event, Node, Selector};

use crate::component::{EventDeclaration, EventHandler};
use crate::error::ControllerError;

/// An event delivered to a delegated handler.
pub struct DelegatedEvent<'a> {
	event: &'a Event,
	delegate: Node,
}

impl<'a> DelegatedEvent<'a> {
	pub(crate) fn new(event: &'a Event, delegate: Node) -> Self {
		Self { event, delegate }
	}

	/// The underlying DOM event.
	pub fn event(&self) -> &Event {
		self.event
	}

	/// The element that matched the rule's selector.
	pub fn delegate(&self) -> &Node {
		&self.delegate
	}

	/// The node the event was dispatched on.
	pub fn target(&self) -> Option<Node> {
		self.event.target()
	}

	/// The event type.
	pub fn event_type(&self) -> &str {
		self.event.event_type()
	}

	/// Cancel the event's default action.
	pub fn prevent_default(&self) {
		self.event.prevent_default();
	}
}

impl fmt::Debug for DelegatedEvent<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DelegatedEvent")
			.field("event", self.event)
			.field("delegate", &self.delegate)
			.finish()
	}
}

/// A parsed event declaration.
#[derive(Clone)]
pub(crate) struct DelegationRule {
	event_type: String,
	selector: Selector,
	handler: EventHandler,
}

impl DelegationRule {
	pub(crate) fn parse(declaration: &EventDeclaration) -> Result<Self, ControllerError> {
		let key = declaration.key().trim();
		let invalid = || ControllerError::InvalidEventKey {
			key: declaration.key().to_string(),
		};

		let (event_type, selector) = key.split_once(char::is_whitespace).ok_or_else(invalid)?;
		let selector = selector.trim();
		if event_type.is_empty() || selector.is_empty() {
			return Err(invalid());
		}

		Ok(Self {
			event_type: event_type.to_string(),
			selector: Selector::parse(selector)?,
			handler: declaration.handler().clone(),
		})
	}

	pub(crate) fn event_type(&self) -> &str {
		&self.event_type
	}

	pub(crate) fn handler(&self) -> &EventHandler {
		&self.handler
	}
}

impl fmt::Debug for DelegationRule {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DelegationRule")
			.field("event_type", &self.event_type)
			.field("selector", &self.selector)
			.finish_non_exhaustive()
	}
}

/// Event types in order of first declaration.
pub(crate) fn event_types(rules: &[DelegationRule]) -> Vec<String> {
	let mut types: Vec<String> = Vec::new();
	for rule in rules {
		if !types.iter().any(|existing| *existing == rule.event_type) {
			types.push(rule.event_type.clone());
		}
	}
	types
}

/// Rules that apply to `event`, each with the element it matched.
///
/// `boundary` is the controller element. Targets inside any of `excluded` (child roots,
/// inclusive) match nothing.
pub(crate) fn matching_rules(
	rules: &[DelegationRule],
	event: &Event,
	boundary: &Node,
	excluded: &[Node],
	closest: bool,
) -> Vec<(DelegationRule, Node)> {
	let Some(target) = event.target() else {
		return Vec::new();
	};
	if excluded.iter().any(|root| root.contains(&target)) {
		return Vec::new();
	}

	rules
		.iter()
		.filter(|rule| rule.event_type == event.event_type())
		.filter_map(|rule| {
			let delegate = if closest {
				rule.selector.closest_within(&target, boundary)
			} else {
				Some(target.clone()).filter(|node| boundary.contains(node) && rule.selector.matches(node))
			};
			delegate.map(|node| (rule.clone(), node))
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn rule(key: &str) -> Result<DelegationRule, ControllerError> {
		DelegationRule::parse(&EventDeclaration::new(key, |_, _| {}))
	}

	#[rstest]
	#[case("click .remove", "click")]
	#[case("  input   input[type=text] ", "input")]
	#[case("submit form > .inner", "submit")]
	fn test_valid_keys(#[case] key: &str, #[case] event_type: &str) {
		assert_eq!(rule(key).unwrap().event_type(), event_type);
	}

	#[rstest]
	#[case("click")]
	#[case("")]
	#[case("   ")]
	fn test_invalid_keys(#[case] key: &str) {
		assert!(matches!(rule(key), Err(ControllerError::InvalidEventKey { .. })));
	}

	#[rstest]
	fn test_invalid_selector() {
		assert!(matches!(rule("click ..x"), Err(ControllerError::InvalidSelector(_))));
	}

	#[rstest]
	fn test_event_types_deduplicated_in_order() {
		let rules = vec![
			rule("click .a").unwrap(),
			rule("input .b").unwrap(),
			rule("click .c").unwrap(),
		];

		assert_eq!(event_types(&rules), vec!["click", "input"]);
	}

	fn dispatched(target: &Node, event_type: &str) -> Event {
		let event = Event::new(event_type);
		target.dispatch_event(&event);
		event
	}

	#[rstest]
	#[case(true, 1)]
	#[case(false, 0)]
	fn test_closest_matching(#[case] closest: bool, #[case] expected: usize) {
		let root = Node::element("div");
		root.set_inner_html("<ul><li class=\"item\"><span>label</span></li></ul>");
		let span = root.query_selector("span").unwrap().unwrap();
		let rules = vec![rule("click .item").unwrap()];

		let event = dispatched(&span, "click");
		let matched = matching_rules(&rules, &event, &root, &[], closest);

		assert_eq!(matched.len(), expected);
		if closest {
			assert!(matched[0].1.has_class("item"));
		}
	}

	#[rstest]
	fn test_child_subtree_is_excluded() {
		let root = Node::element("div");
		root.set_inner_html("<button class=\"a\"></button><section><button class=\"a\"></button></section>");
		let child_root = root.query_selector("section").unwrap().unwrap();
		let inner = child_root.first_element_child().unwrap();
		let outer = root.first_element_child().unwrap();
		let rules = vec![rule("click .a").unwrap()];

		let inner_event = dispatched(&inner, "click");
		let outer_event = dispatched(&outer, "click");

		assert!(matching_rules(&rules, &inner_event, &root, &[child_root.clone()], true).is_empty());
		assert_eq!(matching_rules(&rules, &outer_event, &root, &[child_root], true).len(), 1);
	}
}
