//! Reconciler property tests
//!
//! Property-based tests over generated markup, plus identity checks for listeners and
//! protected nodes.

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;
use reinhardt_dom::{Event, Node, ReconcileStats, reconcile};
use rstest::*;

fn container(markup: &str) -> Node {
	let node = Node::element("section");
	node.set_inner_html(markup);
	node
}

fn markup() -> impl Strategy<Value = String> {
	let leaf = prop_oneof![
		"[a-z ]{1,8}",
		Just("<br>".to_string()),
		Just("<!--note-->".to_string()),
	];
	leaf.prop_recursive(4, 48, 4, |inner| {
		(
			prop::sample::select(vec!["div", "p", "span", "ul", "li"]),
			prop::option::of("[a-z]{1,5}"),
			prop::option::of("[a-z]{1,5}"),
			prop::collection::vec(inner, 0..4),
		)
			.prop_map(|(tag, id, class, children)| {
				let id = id.map(|id| format!(" id=\"{id}\"")).unwrap_or_default();
				let class = class
					.map(|class| format!(" class=\"{class}\""))
					.unwrap_or_default();
				format!("<{tag}{id}{class}>{}</{tag}>", children.concat())
			})
	})
}

fn fragment() -> impl Strategy<Value = String> {
	prop::collection::vec(markup(), 0..4).prop_map(|parts| parts.concat())
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
	/// Test: reconciling identical markup is a no-op
	///
	/// Category: Property
	/// Verifies that two consecutive renders with the same markup mutate nothing.
	#[test]
	fn prop_identical_markup_is_noop(source in fragment()) {
		let live = container(&source);
		let before = live.inner_html();

		let stats = reconcile(&container(&source), &live, &[]);

		prop_assert_eq!(stats, ReconcileStats::default());
		prop_assert_eq!(live.inner_html(), before);
	}

	/// Test: reconciling converges on the generated markup
	///
	/// Category: Property
	/// Verifies that any live tree ends up serializing exactly like the generated tree, and
	/// that a second pass with the same markup is a no-op.
	#[test]
	fn prop_reconcile_converges(before in fragment(), after in fragment()) {
		let live = container(&before);
		let generated = container(&after);

		reconcile(&generated, &live, &[]);
		prop_assert_eq!(live.inner_html(), generated.inner_html());
		prop_assert!(live.is_equal_node(&generated));

		let second = reconcile(&container(&after), &live, &[]);
		prop_assert!(second.is_noop());
	}
}

// ============================================================================
// Identity Tests
// ============================================================================

/// Test: listeners survive a patch
///
/// Category: Identity
/// Verifies that patching a node in place keeps listeners attached to it.
#[rstest]
fn test_listeners_survive_patch() {
	let live = container("<button class=\"save\">Save</button>");
	let button = live.first_element_child().unwrap();
	let clicks = Rc::new(Cell::new(0));
	let counter = clicks.clone();
	let _handle = button.add_event_listener("click", move |_| counter.set(counter.get() + 1));

	reconcile(&container("<button class=\"save primary\">Saving</button>"), &live, &[]);
	live.first_element_child()
		.unwrap()
		.dispatch_event(&Event::new("click"));

	assert_eq!(clicks.get(), 1);
	assert_eq!(live.inner_html(), "<button class=\"save primary\">Saving</button>");
}

/// Test: nested protected node keeps identity
///
/// Category: Identity
/// Verifies that a protected node deep in the tree is preserved while its siblings change.
#[rstest]
fn test_nested_protected_node_keeps_identity() {
	let live = container("<main><ul><li>1</li></ul><aside id=\"summary\">3 TODOs</aside></main>");
	let summary = live.query_selector("#summary").unwrap().unwrap();

	let stats = reconcile(
		&container("<main><ul><li>1</li><li>2</li></ul><aside id=\"summary\"></aside></main>"),
		&live,
		std::slice::from_ref(&summary),
	);

	assert_eq!(stats.inserted, 1);
	assert!(live.query_selector("#summary").unwrap().unwrap().is_same_node(&summary));
	assert_eq!(summary.text_content(), "3 TODOs");
}

/// Test: protected nodes pair by signature
///
/// Category: Identity
/// Verifies that two protected siblings each rejoin their own generated counterpart even
/// when the generated order swaps them.
#[rstest]
fn test_protected_siblings_swap() {
	let live = container("<div id=\"a\">A</div><div id=\"b\">B</div>");
	let a = live.query_selector("#a").unwrap().unwrap();
	let b = live.query_selector("#b").unwrap().unwrap();

	let stats = reconcile(
		&container("<div id=\"b\"></div><div id=\"a\"></div>"),
		&live,
		&[a.clone(), b.clone()],
	);

	assert!(live.child_at(0).unwrap().is_same_node(&b));
	assert!(live.child_at(1).unwrap().is_same_node(&a));
	assert_eq!(stats.moved, 1);
	assert_eq!(live.inner_html(), "<div id=\"b\">B</div><div id=\"a\">A</div>");
}
