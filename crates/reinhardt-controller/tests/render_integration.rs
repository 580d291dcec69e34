//! Integration tests for the render cycle
//!
//! These tests verify:
//! 1. Data source groups resolve in order and feed the markup function
//! 2. Failures surface through the render result without touching the DOM
//! 3. A newer render cancels the one in flight
//! 4. Reactive values re-render their group and keep one subscription per key
//! 5. A superseding render never skips groups the superseded one still had to resolve

use std::cell::Cell;
use std::rc::Rc;

use reinhardt_controller::{
	Component, ComponentError, Controller, ControllerContext, ControllerError, DatasourceGroup,
	Datasources, MemoryStore, Outcome, Phase, RenderError, Snapshot,
};
use reinhardt_deferred::Deferred;
use reinhardt_deferred::runtime::run_until_idle;
use reinhardt_dom::Node;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

type Markup = Rc<dyn Fn(&Snapshot) -> Result<String, ComponentError>>;

/// A component built from closures, counting markup calls.
#[derive(Clone)]
struct Scripted {
	datasources: Option<Datasources>,
	markup: Markup,
	renders: Rc<Cell<usize>>,
}

impl Scripted {
	fn new<F>(datasources: impl Into<Datasources>, markup: F) -> Self
	where
		F: Fn(&Snapshot) -> Result<String, ComponentError> + 'static,
	{
		Self {
			datasources: Some(datasources.into()),
			markup: Rc::new(markup),
			renders: Rc::new(Cell::new(0)),
		}
	}
}

impl Component for Scripted {
	fn datasources(&self) -> Option<Datasources> {
		self.datasources.clone()
	}

	fn generate_html(&self, snapshot: &Snapshot) -> Result<String, ComponentError> {
		self.renders.set(self.renders.get() + 1);
		(self.markup)(snapshot)
	}
}

fn text(snapshot: &Snapshot, name: &str) -> String {
	match snapshot.get(name) {
		Some(Value::String(value)) => value.clone(),
		Some(value) => value.to_string(),
		None => String::new(),
	}
}

#[fixture]
fn store() -> MemoryStore {
	MemoryStore::new()
}

fn mount(component: Scripted, store: &MemoryStore) -> (Controller, Node) {
	let parent = Node::element("main");
	let element = Node::element("section");
	parent.append_child(&element).unwrap();
	let controller =
		Controller::new(component, element.clone(), ControllerContext::new(store.clone())).unwrap();
	(controller, element)
}

#[rstest]
fn test_renders_plain_value(store: MemoryStore) {
	let component = Scripted::new(
		DatasourceGroup::new().with("count", |_| Ok(json!(3).into())),
		|snapshot| Ok(format!("<div>{}</div>", text(snapshot, "count"))),
	);
	let (controller, element) = mount(component, &store);

	let rendered = controller.start().unwrap();
	assert_eq!(controller.phase(), Phase::Resolving);
	run_until_idle();

	assert!(matches!(rendered.peek(), Some(Ok(()))));
	assert_eq!(element.inner_html(), "<div>3</div>");
	assert_eq!(controller.phase(), Phase::Mounted);
	assert_eq!(controller.snapshot().unwrap().get("count"), Some(&json!(3)));
	assert!(element.parent().is_some());
}

#[rstest]
fn test_later_groups_see_earlier_values(store: MemoryStore) {
	let datasources = Datasources::new(vec![
		DatasourceGroup::new().with("a", |_| Ok(json!(2).into())),
		DatasourceGroup::new().with("b", |snapshot| {
			let a = snapshot.get("a").and_then(Value::as_i64).unwrap_or_default();
			Ok(json!(a * 10).into())
		}),
	]);
	let component = Scripted::new(datasources, |snapshot| {
		Ok(format!("<p>{}-{}</p>", text(snapshot, "a"), text(snapshot, "b")))
	});
	let (controller, element) = mount(component, &store);

	controller.start().unwrap();
	run_until_idle();

	assert_eq!(element.inner_html(), "<p>2-20</p>");
}

#[rstest]
fn test_pending_value_renders_when_settled(store: MemoryStore) {
	let later: Deferred<Value, ComponentError> = Deferred::new();
	let source = later.clone();
	let component = Scripted::new(
		DatasourceGroup::new().with("greeting", move |_| Ok(Outcome::later(source.clone()))),
		|snapshot| Ok(format!("<h1>{}</h1>", text(snapshot, "greeting"))),
	);
	let (controller, element) = mount(component, &store);

	let rendered = controller.start().unwrap();
	run_until_idle();
	assert!(rendered.peek().is_none());
	assert_eq!(element.inner_html(), "");

	later.fulfill(json!("hello")).unwrap();
	run_until_idle();

	assert!(matches!(rendered.peek(), Some(Ok(()))));
	assert_eq!(element.inner_html(), "<h1>hello</h1>");
}

#[rstest]
fn test_producer_failure_leaves_dom_untouched(store: MemoryStore) {
	let component = Scripted::new(
		DatasourceGroup::new().with("broken", |_| Err(ComponentError::new("boom"))),
		|_| Ok("<p>never</p>".to_string()),
	);
	let renders = Rc::clone(&component.renders);
	let (controller, element) = mount(component, &store);

	let rendered = controller.start().unwrap();
	run_until_idle();

	match rendered.peek() {
		Some(Err(RenderError::Resolve { group, key, source })) => {
			assert_eq!(group, 0);
			assert_eq!(key, "broken");
			assert_eq!(source.message(), "boom");
		}
		other => panic!("unexpected result: {other:?}"),
	}
	assert_eq!(renders.get(), 0);
	assert_eq!(element.inner_html(), "");
	assert!(controller.snapshot().is_none());
	assert_eq!(controller.phase(), Phase::Constructed);
}

#[rstest]
fn test_markup_failure_keeps_previous_render(store: MemoryStore) {
	store.set("fail", json!(false));
	let source = store.clone();
	let component = Scripted::new(
		DatasourceGroup::new().with("fail", move |_| Ok(source.model_value("fail").into_value().into())),
		|snapshot| match snapshot.get("fail") {
			Some(Value::Bool(true)) => Err(ComponentError::new("cannot render")),
			_ => Ok("<p>ok</p>".to_string()),
		},
	);
	let (controller, element) = mount(component, &store);
	controller.start().unwrap();
	run_until_idle();

	store.set("fail", json!(true));
	let rendered = controller.start().unwrap();
	run_until_idle();

	assert!(matches!(rendered.peek(), Some(Err(RenderError::Generate(_)))));
	assert_eq!(element.inner_html(), "<p>ok</p>");
	assert_eq!(controller.snapshot().unwrap().get("fail"), Some(&json!(false)));
	assert_eq!(controller.phase(), Phase::Mounted);
}

#[rstest]
fn test_second_start_cancels_first(store: MemoryStore) {
	let component = Scripted::new(
		DatasourceGroup::new().with("count", |_| Ok(json!(1).into())),
		|snapshot| Ok(format!("<div>{}</div>", text(snapshot, "count"))),
	);
	let renders = Rc::clone(&component.renders);
	let (controller, element) = mount(component, &store);

	let first = controller.start().unwrap();
	let second = controller.start().unwrap();

	assert!(matches!(first.peek(), Some(Err(RenderError::Cancelled))));
	run_until_idle();
	assert!(matches!(second.peek(), Some(Ok(()))));
	assert_eq!(renders.get(), 1);
	assert_eq!(element.inner_html(), "<div>1</div>");
}

#[rstest]
fn test_late_result_of_superseded_render_is_discarded(store: MemoryStore) {
	let calls = Rc::new(Cell::new(0));
	let slow: Deferred<Value, ComponentError> = Deferred::new();
	let slow_source = slow.clone();
	let counter = Rc::clone(&calls);
	let component = Scripted::new(
		DatasourceGroup::new().with("value", move |_| {
			counter.set(counter.get() + 1);
			if counter.get() == 1 {
				Ok(Outcome::later(slow_source.clone()))
			} else {
				Ok(json!("fresh").into())
			}
		}),
		|snapshot| Ok(format!("<span>{}</span>", text(snapshot, "value"))),
	);
	let (controller, element) = mount(component, &store);

	let first = controller.start().unwrap();
	run_until_idle();
	let second = controller.start().unwrap();
	run_until_idle();
	slow.fulfill(json!("stale")).unwrap();
	run_until_idle();

	assert!(matches!(first.peek(), Some(Err(RenderError::Cancelled))));
	assert!(matches!(second.peek(), Some(Ok(()))));
	assert_eq!(element.inner_html(), "<span>fresh</span>");
}

#[rstest]
fn test_start_from_reuses_earlier_groups(store: MemoryStore) {
	let base_calls = Rc::new(Cell::new(0));
	let counter = Rc::clone(&base_calls);
	store.set("label", json!("one"));
	let source = store.clone();
	let datasources = Datasources::new(vec![
		DatasourceGroup::new().with("base", move |_| {
			counter.set(counter.get() + 1);
			Ok(json!("B").into())
		}),
		DatasourceGroup::new().with("label", move |_| Ok(source.model_value("label").into_value().into())),
	]);
	let component = Scripted::new(datasources, |snapshot| {
		Ok(format!("{}:{}", text(snapshot, "base"), text(snapshot, "label")))
	});
	let (controller, element) = mount(component, &store);
	controller.start().unwrap();
	run_until_idle();

	store.set("label", json!("two"));
	controller.start_from(1).unwrap();
	run_until_idle();

	assert_eq!(base_calls.get(), 1);
	assert_eq!(element.inner_html(), "B:two");
}

/// Group 0 reads reactive `a`, group 1 reads reactive `b`. Renders `"a-b"`.
fn two_reactive_groups(store: &MemoryStore, first_group_calls: &Rc<Cell<usize>>) -> Scripted {
	let a = store.clone();
	let b = store.clone();
	let counter = Rc::clone(first_group_calls);
	let datasources = Datasources::new(vec![
		DatasourceGroup::new().with("a", move |_| {
			counter.set(counter.get() + 1);
			Ok(a.model_value("a").into())
		}),
		DatasourceGroup::new().with("b", move |_| Ok(b.model_value("b").into())),
	]);
	Scripted::new(datasources, |snapshot| {
		Ok(format!("{}-{}", text(snapshot, "a"), text(snapshot, "b")))
	})
}

#[rstest]
fn test_later_group_change_rerenders_from_its_group(store: MemoryStore) {
	store.set("a", json!(1));
	store.set("b", json!(1));
	let first_group_calls = Rc::new(Cell::new(0));
	let (controller, element) = mount(two_reactive_groups(&store, &first_group_calls), &store);
	controller.start().unwrap();
	run_until_idle();
	assert_eq!(element.inner_html(), "1-1");

	store.set("b", json!(2));
	run_until_idle();

	assert_eq!(element.inner_html(), "1-2");
	assert_eq!(first_group_calls.get(), 1);
	assert_eq!(controller.snapshot().unwrap().get("a"), Some(&json!(1)));
	assert_eq!(controller.subscription_count(0), 1);
	assert_eq!(controller.subscription_count(1), 1);
}

#[rstest]
fn test_changes_to_two_groups_in_one_tick(store: MemoryStore) {
	store.set("a", json!(1));
	store.set("b", json!(1));
	let first_group_calls = Rc::new(Cell::new(0));
	let (controller, element) = mount(two_reactive_groups(&store, &first_group_calls), &store);
	controller.start().unwrap();
	run_until_idle();

	store.set("a", json!(2));
	store.set("b", json!(2));
	run_until_idle();

	assert_eq!(element.inner_html(), "2-2");
	assert_eq!(controller.phase(), Phase::Mounted);
}

#[rstest]
fn test_later_start_keeps_earlier_start_group(store: MemoryStore) {
	let base = Rc::new(Cell::new(1));
	let source = Rc::clone(&base);
	let datasources = Datasources::new(vec![
		DatasourceGroup::new().with("base", move |_| Ok(json!(source.get()).into())),
		DatasourceGroup::new().with("tail", |_| Ok(json!("t").into())),
	]);
	let component = Scripted::new(datasources, |snapshot| {
		Ok(format!("{}:{}", text(snapshot, "base"), text(snapshot, "tail")))
	});
	let (controller, element) = mount(component, &store);
	controller.start().unwrap();
	run_until_idle();

	base.set(2);
	let full = controller.start().unwrap();
	let partial = controller.start_from(1).unwrap();
	run_until_idle();

	assert!(matches!(full.peek(), Some(Err(RenderError::Cancelled))));
	assert!(matches!(partial.peek(), Some(Ok(()))));
	assert_eq!(element.inner_html(), "2:t");
}

#[rstest]
#[case(2)]
#[case(5)]
fn test_start_from_out_of_range(store: MemoryStore, #[case] group: usize) {
	let datasources = Datasources::new(vec![DatasourceGroup::new(), DatasourceGroup::new()]);
	let (controller, _) = mount(Scripted::new(datasources, |_| Ok(String::new())), &store);

	let result = controller.start_from(group);

	assert!(matches!(
		result,
		Err(ControllerError::GroupOutOfRange { index, len: 2 }) if index == group
	));
}

#[rstest]
fn test_missing_datasources_is_misuse(store: MemoryStore) {
	let mut component = Scripted::new(DatasourceGroup::new(), |_| Ok(String::new()));
	component.datasources = None;
	let (controller, _) = mount(component, &store);

	assert!(matches!(
		controller.start(),
		Err(ControllerError::MissingDatasources { .. })
	));
}

#[rstest]
fn test_reactive_value_rerenders_group(store: MemoryStore) {
	store.set("count", json!(1));
	let source = store.clone();
	let component = Scripted::new(
		DatasourceGroup::new().with("count", move |_| Ok(source.model_value("count").into())),
		|snapshot| Ok(format!("<div>{}</div>", text(snapshot, "count"))),
	);
	let (controller, element) = mount(component, &store);
	controller.start().unwrap();
	run_until_idle();
	assert_eq!(element.inner_html(), "<div>1</div>");

	for value in [5, 6, 7] {
		store.set("count", json!(value));
		run_until_idle();
		assert_eq!(element.inner_html(), format!("<div>{value}</div>"));
	}

	assert_eq!(store.observer_count("count"), 1);
	assert_eq!(controller.subscription_count(0), 1);
}

#[rstest]
fn test_reactive_change_keeps_unchanged_nodes(store: MemoryStore) {
	store.set("title", json!("a"));
	let source = store.clone();
	let component = Scripted::new(
		DatasourceGroup::new().with("title", move |_| Ok(source.model_value("title").into())),
		|snapshot| {
			Ok(format!(
				"<header><input name=\"q\"></header><h2>{}</h2>",
				text(snapshot, "title")
			))
		},
	);
	let (controller, element) = mount(component, &store);
	controller.start().unwrap();
	run_until_idle();
	let input = element.query_selector("input").unwrap().unwrap();

	store.set("title", json!("b"));
	run_until_idle();

	let after = element.query_selector("input").unwrap().unwrap();
	assert!(input.is_same_node(&after));
	assert_eq!(element.query_selector("h2").unwrap().unwrap().text_content(), "b");
}

#[cfg(feature = "templates")]
mod templates {
	use super::*;
	use reinhardt_controller::TemplateComponent;

	#[rstest]
	fn test_todo_summary(store: MemoryStore) {
		store.set("items", json!([{"done": true}, {"done": false}, {"done": true}]));
		let items = store.clone();
		let datasources = Datasources::new(vec![
			DatasourceGroup::new().with("items", move |_| Ok(items.model_value("items").into())),
			DatasourceGroup::new().with("completedCount", |snapshot| {
				let done = snapshot
					.get("items")
					.and_then(Value::as_array)
					.map_or(0, |items| items.iter().filter(|item| item["done"] == json!(true)).count());
				Ok(json!(done).into())
			}),
		]);
		let component =
			TemplateComponent::new("<div>{{items|length}} TODOs ({{completedCount}} completed)</div>")
				.unwrap()
				.with_name("TodoSummary")
				.with_datasources(datasources);
		let element = Node::element("section");
		let controller =
			Controller::new(component, element.clone(), ControllerContext::new(store.clone())).unwrap();

		controller.start().unwrap();
		run_until_idle();
		assert_eq!(element.inner_html(), "<div>3 TODOs (2 completed)</div>");

		store.update("items", |items| {
			if let Some(items) = items.as_array_mut() {
				items.push(json!({"done": false}));
			}
		});
		run_until_idle();

		assert_eq!(element.inner_html(), "<div>4 TODOs (2 completed)</div>");
		assert_eq!(controller.name(), "TodoSummary");
	}
}
