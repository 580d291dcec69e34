//! Integration tests for child controllers
//!
//! These tests verify:
//! 1. Children mount at the first match of their selector and render inside the parent
//! 2. A child whose selector stops matching is destroyed and removed
//! 3. Re-rendering the parent keeps a surviving child and its DOM intact
//! 4. Child failures reach the parent's render result, and a child that never rendered
//!    is restarted by the next parent render

use std::cell::Cell;
use std::rc::Rc;

use reinhardt_controller::{
	ChildDeclaration, Component, ComponentError, Controller, ControllerContext, DatasourceGroup,
	Datasources, MemoryStore, Phase, RenderError, Snapshot,
};
use reinhardt_deferred::runtime::run_until_idle;
use reinhardt_dom::Node;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

/// Renders its `label` store key inside a span.
#[derive(Clone)]
struct Badge {
	store: MemoryStore,
	starts: Rc<Cell<usize>>,
}

impl Component for Badge {
	fn datasources(&self) -> Option<Datasources> {
		let store = self.store.clone();
		let starts = Rc::clone(&self.starts);
		Some(
			DatasourceGroup::new()
				.with("label", move |_| {
					starts.set(starts.get() + 1);
					Ok(store.model_value("label").into_value().into())
				})
				.into(),
		)
	}

	fn generate_html(&self, snapshot: &Snapshot) -> Result<String, ComponentError> {
		match snapshot.get("label") {
			Some(Value::String(label)) => Ok(format!("<span>{label}</span>")),
			_ => Err(ComponentError::new("badge needs a label")),
		}
	}
}

/// Shows a `.child` slot while the `show` store key is true.
struct Panel {
	store: MemoryStore,
	badge: Badge,
}

impl Component for Panel {
	fn datasources(&self) -> Option<Datasources> {
		let store = self.store.clone();
		let title = self.store.clone();
		Some(
			DatasourceGroup::new()
				.with("show", move |_| Ok(store.model_value("show").into()))
				.with("title", move |_| Ok(title.model_value("title").into()))
				.into(),
		)
	}

	fn generate_html(&self, snapshot: &Snapshot) -> Result<String, ComponentError> {
		let title = snapshot.get("title").and_then(Value::as_str).unwrap_or_default();
		let slot = match snapshot.get("show") {
			Some(Value::Bool(true)) => "<div class=\"child\"></div>",
			_ => "",
		};
		Ok(format!("<h1>{title}</h1>{slot}<footer></footer>"))
	}

	fn children(&self) -> Vec<ChildDeclaration> {
		vec![ChildDeclaration::component(".child", self.badge.clone())]
	}
}

struct Fixture {
	store: MemoryStore,
	controller: Controller,
	element: Node,
	badge_starts: Rc<Cell<usize>>,
}

#[fixture]
fn panel() -> Fixture {
	let store = MemoryStore::with_values([
		("show", json!(true)),
		("title", json!("Inbox")),
		("label", json!("3 new")),
	]);
	let badge = Badge {
		store: store.clone(),
		starts: Rc::new(Cell::new(0)),
	};
	let badge_starts = Rc::clone(&badge.starts);
	let element = Node::element("article");
	let controller = Controller::new(
		Panel {
			store: store.clone(),
			badge,
		},
		element.clone(),
		ControllerContext::new(store.clone()),
	)
	.unwrap();

	Fixture {
		store,
		controller,
		element,
		badge_starts,
	}
}

#[rstest]
fn test_child_renders_inside_parent(panel: Fixture) {
	let rendered = panel.controller.start().unwrap();
	run_until_idle();

	assert!(matches!(rendered.peek(), Some(Ok(()))));
	assert_eq!(
		panel.element.inner_html(),
		"<h1>Inbox</h1><div class=\"child\"><span>3 new</span></div><footer></footer>"
	);
	let child = panel.controller.child(".child").unwrap();
	assert!(child.element().has_class("child"));
	assert_eq!(panel.controller.child_count(), 1);
}

#[rstest]
fn test_missing_match_destroys_child(panel: Fixture) {
	panel.controller.start().unwrap();
	run_until_idle();
	let first = panel.controller.child(".child").unwrap();

	panel.store.set("show", json!(false));
	run_until_idle();

	assert!(first.is_destroyed());
	assert!(panel.controller.child(".child").is_none());
	assert_eq!(panel.element.inner_html(), "<h1>Inbox</h1><footer></footer>");

	panel.store.set("show", json!(true));
	run_until_idle();

	let second = panel.controller.child(".child").unwrap();
	assert!(!second.is_same(&first));
	assert!(!second.is_destroyed());
	assert_eq!(panel.badge_starts.get(), 2);
}

#[rstest]
fn test_parent_rerender_keeps_child(panel: Fixture) {
	panel.controller.start().unwrap();
	run_until_idle();
	let child = panel.controller.child(".child").unwrap();
	let root = child.element();
	let span = root.first_element_child().unwrap();

	panel.store.set("title", json!("Archive"));
	run_until_idle();

	let kept = panel.controller.child(".child").unwrap();
	assert!(kept.is_same(&child));
	assert!(kept.element().is_same_node(&root));
	assert!(root.first_element_child().unwrap().is_same_node(&span));
	assert_eq!(panel.badge_starts.get(), 1);
	assert_eq!(
		panel.element.inner_html(),
		"<h1>Archive</h1><div class=\"child\"><span>3 new</span></div><footer></footer>"
	);
}

#[rstest]
fn test_destroy_cascades_to_children(panel: Fixture) {
	panel.controller.start().unwrap();
	run_until_idle();
	let child = panel.controller.child(".child").unwrap();

	panel.controller.destroy();

	assert!(child.is_destroyed());
	assert_eq!(panel.controller.child_count(), 0);
}

#[rstest]
fn test_child_failure_fails_parent(panel: Fixture) {
	panel.store.remove("label");

	let rendered = panel.controller.start().unwrap();
	run_until_idle();

	match rendered.peek() {
		Some(Err(RenderError::Child { selector, source })) => {
			assert_eq!(selector, ".child");
			assert!(matches!(*source, RenderError::Generate(_)));
		}
		other => panic!("unexpected result: {other:?}"),
	}
}

#[rstest]
fn test_failed_child_restarts_on_next_parent_render(panel: Fixture) {
	panel.store.remove("label");
	panel.controller.start().unwrap();
	run_until_idle();
	let child = panel.controller.child(".child").unwrap();
	assert_eq!(child.phase(), Phase::Constructed);

	panel.store.set("label", json!("2 new"));
	panel.store.set("title", json!("Archive"));
	run_until_idle();

	let kept = panel.controller.child(".child").unwrap();
	assert!(kept.is_same(&child));
	assert_eq!(kept.phase(), Phase::Mounted);
	assert_eq!(
		panel.element.inner_html(),
		"<h1>Archive</h1><div class=\"child\"><span>2 new</span></div><footer></footer>"
	);
	assert_eq!(panel.badge_starts.get(), 2);
}
