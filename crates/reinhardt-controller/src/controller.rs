//! The controller: render cycle and lifecycle around a [`Component`].
//!
//! A render runs in stages:
//!
//! 1. The resolver turns the component's data sources into a [`Snapshot`].
//! 2. The component's markup function renders the snapshot; the snapshot is published.
//! 3. The markup is parsed into a detached copy of the element and reconciled against the
//!    live element. Mounted child roots are protected.
//! 4. Children are mounted, kept or destroyed according to the child selectors, and newly
//!    mounted children start in parallel.
//! 5. Delegated event listeners are re-attached.
//!
//! Starting a new render cancels the one in flight: its [`Deferred`] rejects with
//! [`RenderError::Cancelled`] and nothing it resolves later is published.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use reinhardt_deferred::Deferred;
use reinhardt_dom::{Document, Event, EventHandle, Node, Selector, reconcile};

use crate::component::{ChildDeclaration, Component};
use crate::context::ControllerContext;
use crate::delegation::{DelegatedEvent, DelegationRule, event_types, matching_rules};
use crate::error::{ControllerError, RenderError};
use crate::resolver::{CancellationToken, ChangeHandler, Resolver};
use crate::snapshot::Snapshot;
use crate::teardown::{Teardown, TeardownId, Teardowns};

/// Lifecycle phase of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	/// Created, never rendered.
	Constructed,
	/// Resolving data sources.
	Resolving,
	/// Generating markup, patching the element or starting children.
	Rendering,
	/// Rendered; idle.
	Mounted,
	/// Destroyed; terminal.
	Destroyed,
}

struct PendingRender {
	token: CancellationToken,
	/// First group this render resolves.
	start: usize,
	result: Deferred<(), RenderError>,
}

impl PendingRender {
	fn cancel(self) {
		self.token.cancel();
		let _ = self.result.reject(RenderError::Cancelled);
	}
}

struct MountedChild {
	selector: String,
	controller: Controller,
}

struct State {
	phase: Phase,
	snapshot: Option<Snapshot>,
	pending: Option<PendingRender>,
	children: Vec<MountedChild>,
	listeners: Vec<EventHandle>,
	teardowns: Teardowns,
}

struct ControllerInner {
	component: Rc<dyn Component>,
	name: String,
	context: ControllerContext,
	element: Node,
	children: Vec<(Selector, ChildDeclaration)>,
	rules: Vec<DelegationRule>,
	resolver: Resolver,
	state: RefCell<State>,
}

/// Handle to a controller. Clones refer to the same controller.
#[derive(Clone)]
pub struct Controller {
	inner: Rc<ControllerInner>,
}

impl Controller {
	/// Create a controller rendering `component` into `element`.
	///
	/// Fails when `element` is not an element or when an event key or child selector of the
	/// component is invalid. The controller stays inert until [`Controller::start`].
	pub fn new<C>(
		component: C,
		element: Node,
		context: ControllerContext,
	) -> Result<Self, ControllerError>
	where
		C: Component + 'static,
	{
		Self::from_component(Rc::new(component), element, context)
	}

	/// Like [`Controller::new`] with a shared component.
	pub fn from_component(
		component: Rc<dyn Component>,
		element: Node,
		context: ControllerContext,
	) -> Result<Self, ControllerError> {
		if !element.is_element() {
			return Err(ControllerError::InvalidElement);
		}

		let rules = component
			.events()
			.iter()
			.map(DelegationRule::parse)
			.collect::<Result<Vec<_>, _>>()?;
		let children = component
			.children()
			.into_iter()
			.map(|declaration| {
				let selector = Selector::parse(declaration.selector())?;
				Ok::<_, ControllerError>((selector, declaration))
			})
			.collect::<Result<Vec<_>, _>>()?;
		let name = component.name().to_string();
		let resolver = Resolver::new(Rc::clone(context.store()));

		tracing::debug!(component = %name, "controller created");
		Ok(Self {
			inner: Rc::new(ControllerInner {
				component,
				name,
				context,
				element,
				children,
				rules,
				resolver,
				state: RefCell::new(State {
					phase: Phase::Constructed,
					snapshot: None,
					pending: None,
					children: Vec::new(),
					listeners: Vec::new(),
					teardowns: Teardowns::default(),
				}),
			}),
		})
	}

	/// Create a controller for the first element of `document` matching `selector`.
	pub fn from_selector<C>(
		component: C,
		document: &Document,
		selector: &str,
		context: ControllerContext,
	) -> Result<Self, ControllerError>
	where
		C: Component + 'static,
	{
		let element = document
			.query_selector(selector)?
			.ok_or_else(|| ControllerError::ElementNotFound {
				selector: selector.to_string(),
			})?;
		Self::new(component, element, context)
	}

	// ---------------------------------------------------------------------
	// Lifecycle
	// ---------------------------------------------------------------------

	/// Render from the first data source group.
	pub fn start(&self) -> Result<Deferred<(), RenderError>, ControllerError> {
		self.start_from(0)
	}

	/// Same as [`Controller::start`].
	pub fn render(&self) -> Result<Deferred<(), RenderError>, ControllerError> {
		self.start()
	}

	/// Render, re-resolving data sources from group `group` onwards.
	///
	/// Values of earlier groups are taken from the current snapshot; before the first
	/// successful render every group is resolved. A render still in flight is superseded;
	/// when it started from an earlier group, the new render starts there instead.
	///
	/// Misuse is reported synchronously; the outcome of the render is reported through the
	/// returned value.
	pub fn start_from(&self, group: usize) -> Result<Deferred<(), RenderError>, ControllerError> {
		let inner = &self.inner;
		if self.is_destroyed() {
			return Err(ControllerError::Destroyed);
		}
		let datasources =
			inner
				.component
				.datasources()
				.ok_or_else(|| ControllerError::MissingDatasources {
					component: inner.name.clone(),
				})?;
		if group > 0 && group >= datasources.len() {
			return Err(ControllerError::GroupOutOfRange {
				index: group,
				len: datasources.len(),
			});
		}

		let token = CancellationToken::new();
		let result = Deferred::new();
		let (superseded, start, base) = {
			let mut state = inner.state.borrow_mut();
			let group = state
				.pending
				.as_ref()
				.map_or(group, |pending| pending.start.min(group));
			let (start, base) = match &state.snapshot {
				Some(snapshot) if group > 0 => (
					group,
					snapshot.retain(|name| datasources.declared_before(group, name)),
				),
				_ => (0, Snapshot::new()),
			};
			let superseded = state.pending.replace(PendingRender {
				token: token.clone(),
				start,
				result: result.clone(),
			});
			state.phase = Phase::Resolving;
			(superseded, start, base)
		};
		if let Some(previous) = superseded {
			tracing::debug!(component = %inner.name, "superseding render in flight");
			previous.cancel();
		}
		tracing::debug!(component = %inner.name, group = start, "render started");

		let weak = Rc::downgrade(&self.inner);
		let on_change: ChangeHandler = Rc::new(move |group| {
			if let Some(controller) = Controller::upgrade(&weak) {
				controller.rerender(group);
			}
		});
		let resolution = inner
			.resolver
			.resolve(&datasources, start, base, token.clone(), on_change);

		let weak = Rc::downgrade(&self.inner);
		resolution.on_settled(move |outcome| {
			let Some(controller) = Controller::upgrade(&weak) else {
				return;
			};
			if token.is_cancelled() {
				return;
			}
			match outcome {
				Ok(snapshot) => controller.commit(snapshot, token),
				Err(error) => controller.fail(&token, error),
			}
		});

		Ok(result)
	}

	/// Destroy the controller.
	///
	/// Cancels the render in flight, runs owned teardowns in registration order, removes
	/// delegated listeners and store subscriptions, destroys children and detaches the
	/// element. Calling it again does nothing.
	pub fn destroy(&self) {
		let inner = &self.inner;
		let (pending, teardowns, listeners, children) = {
			let mut state = inner.state.borrow_mut();
			if state.phase == Phase::Destroyed {
				return;
			}
			state.phase = Phase::Destroyed;
			(
				state.pending.take(),
				state.teardowns.take_all(),
				std::mem::take(&mut state.listeners),
				std::mem::take(&mut state.children),
			)
		};

		if let Some(pending) = pending {
			pending.cancel();
		}
		for teardown in teardowns {
			teardown();
		}
		drop(listeners);
		inner.resolver.clear();
		for child in children {
			child.controller.destroy();
		}
		if inner.context.settings().detach_on_destroy {
			inner.element.remove();
		}
		tracing::debug!(component = %inner.name, "controller destroyed");
	}

	/// Run `teardown` when the controller is destroyed.
	///
	/// On a destroyed controller the teardown runs immediately.
	pub fn own<F>(&self, teardown: F) -> TeardownId
	where
		F: FnOnce() + 'static,
	{
		let mut state = self.inner.state.borrow_mut();
		let id = state.teardowns.next_id();
		if state.phase == Phase::Destroyed {
			drop(state);
			teardown();
			return id;
		}
		state.teardowns.push(id, Box::new(teardown));
		id
	}

	/// Take back a teardown registered with [`Controller::own`] without running it.
	pub fn disown(&self, id: TeardownId) -> Option<Teardown> {
		self.inner.state.borrow_mut().teardowns.remove(id)
	}

	// ---------------------------------------------------------------------
	// Accessors
	// ---------------------------------------------------------------------

	/// The element this controller renders into.
	pub fn element(&self) -> Node {
		self.inner.element.clone()
	}

	/// The snapshot of the last successful render.
	pub fn snapshot(&self) -> Option<Snapshot> {
		self.inner.state.borrow().snapshot.clone()
	}

	/// Current lifecycle phase.
	pub fn phase(&self) -> Phase {
		self.inner.state.borrow().phase
	}

	/// Whether [`Controller::destroy`] has run.
	pub fn is_destroyed(&self) -> bool {
		self.phase() == Phase::Destroyed
	}

	/// The component name.
	pub fn name(&self) -> &str {
		&self.inner.name
	}

	/// The context this controller was created with.
	pub fn context(&self) -> &ControllerContext {
		&self.inner.context
	}

	/// The child mounted for `selector`.
	pub fn child(&self, selector: &str) -> Option<Controller> {
		self.inner
			.state
			.borrow()
			.children
			.iter()
			.find(|child| child.selector == selector)
			.map(|child| child.controller.clone())
	}

	/// Number of mounted children.
	pub fn child_count(&self) -> usize {
		self.inner.state.borrow().children.len()
	}

	/// Number of teardowns currently owned.
	pub fn owned_count(&self) -> usize {
		self.inner.state.borrow().teardowns.len()
	}

	/// Number of store subscriptions held for data source group `group`.
	pub fn subscription_count(&self, group: usize) -> usize {
		self.inner.resolver.subscription_count(group)
	}

	/// Whether both handles refer to the same controller.
	pub fn is_same(&self, other: &Controller) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	// ---------------------------------------------------------------------
	// Render stages
	// ---------------------------------------------------------------------

	fn upgrade(weak: &Weak<ControllerInner>) -> Option<Controller> {
		weak.upgrade().map(|inner| Controller { inner })
	}

	fn commit(&self, snapshot: Snapshot, token: CancellationToken) {
		let inner = &self.inner;
		inner.state.borrow_mut().phase = Phase::Rendering;

		let html = match inner.component.generate_html(&snapshot) {
			Ok(html) => html,
			Err(error) => return self.fail(&token, RenderError::Generate(error)),
		};
		inner.state.borrow_mut().snapshot = Some(snapshot);

		let generated = inner.element.shallow_clone();
		generated.set_inner_html(&html);
		let stats = reconcile(&generated, &inner.element, &self.child_roots());
		tracing::trace!(
			component = %inner.name,
			mutations = stats.mutations(),
			"element reconciled"
		);

		let started = self.sync_children();
		let weak = Rc::downgrade(&self.inner);
		Deferred::all(started).on_settled(move |outcome| {
			let Some(controller) = Controller::upgrade(&weak) else {
				return;
			};
			if token.is_cancelled() {
				return;
			}
			match outcome {
				Ok(_) => controller.complete(&token),
				Err(error) => controller.fail(&token, error),
			}
		});
	}

	fn child_roots(&self) -> Vec<Node> {
		self.inner
			.state
			.borrow()
			.children
			.iter()
			.map(|child| child.controller.element())
			.collect()
	}

	/// Mount, keep or destroy children. Returns the starts of newly mounted children and
	/// of kept children whose first render never completed.
	fn sync_children(&self) -> Vec<Deferred<(), RenderError>> {
		let inner = &self.inner;
		let mut started = Vec::new();

		for (selector, declaration) in &inner.children {
			let key = declaration.selector();
			let roots = self.child_roots();
			let target = selector.all_matches(&inner.element).into_iter().find(|node| {
				!roots
					.iter()
					.any(|root| !root.is_same_node(node) && root.contains(node))
			});

			let mut retry = None;
			let existing = {
				let mut state = inner.state.borrow_mut();
				let index = state.children.iter().position(|child| child.selector == key);
				match (index, &target) {
					(Some(index), Some(node))
						if state.children[index].controller.element().is_same_node(node) =>
					{
						let kept = &state.children[index].controller;
						if kept.phase() != Phase::Constructed {
							continue;
						}
						retry = Some(kept.clone());
						None
					}
					(Some(index), _) => Some(state.children.remove(index)),
					(None, _) => None,
				}
			};
			if let Some(child) = retry {
				tracing::debug!(component = %inner.name, selector = key, "restarting unrendered child");
				started.push(Self::start_child(key, &child));
				continue;
			}
			if let Some(stale) = existing {
				tracing::debug!(component = %inner.name, selector = key, "destroying child");
				stale.controller.destroy();
			}

			if let Some(node) = target {
				started.push(self.mount_child(key, declaration, node));
			}
		}

		started
	}

	fn mount_child(
		&self,
		key: &str,
		declaration: &ChildDeclaration,
		node: Node,
	) -> Deferred<(), RenderError> {
		let inner = &self.inner;
		let child_error = |source: RenderError| RenderError::Child {
			selector: key.to_string(),
			source: Box::new(source),
		};

		let child = match (declaration.factory())(node, &inner.context) {
			Ok(child) => child,
			Err(error) => return Deferred::rejected(child_error(error.into())),
		};
		tracing::debug!(component = %inner.name, selector = key, child = child.name(), "mounting child");
		inner.state.borrow_mut().children.push(MountedChild {
			selector: key.to_string(),
			controller: child.clone(),
		});

		Self::start_child(key, &child)
	}

	fn start_child(key: &str, child: &Controller) -> Deferred<(), RenderError> {
		match child.start() {
			Ok(result) => {
				let selector = key.to_string();
				result.then(
					|()| Ok(()),
					move |error| {
						// A newer render of the child owns the outcome
						if error.is_cancelled() {
							return Ok(());
						}
						Err(RenderError::Child {
							selector,
							source: Box::new(error),
						})
					},
				)
			}
			Err(error) => Deferred::rejected(RenderError::Child {
				selector: key.to_string(),
				source: Box::new(error.into()),
			}),
		}
	}

	fn complete(&self, token: &CancellationToken) {
		let Some(result) = self.finish(token) else {
			return;
		};
		self.attach_listeners();
		tracing::debug!(
			component = %self.inner.name,
			children = self.child_count(),
			"render complete"
		);
		let _ = result.fulfill(());
	}

	fn fail(&self, token: &CancellationToken, error: RenderError) {
		let Some(result) = self.finish(token) else {
			return;
		};
		tracing::debug!(component = %self.inner.name, %error, "render failed");
		let _ = result.reject(error);
	}

	/// Retire the pending render if `token` is still current.
	fn finish(&self, token: &CancellationToken) -> Option<Deferred<(), RenderError>> {
		let mut state = self.inner.state.borrow_mut();
		let current = state
			.pending
			.as_ref()
			.is_some_and(|pending| pending.token.same(token));
		if !current {
			return None;
		}
		let pending = state.pending.take()?;
		state.phase = if state.snapshot.is_some() {
			Phase::Mounted
		} else {
			Phase::Constructed
		};
		Some(pending.result)
	}

	fn rerender(&self, group: usize) {
		if self.is_destroyed() {
			return;
		}
		tracing::debug!(component = %self.inner.name, group, "store changed, re-rendering");
		match self.start_from(group) {
			Ok(result) => {
				let name = self.inner.name.clone();
				result.on_settled(move |outcome| {
					if let Err(error) = outcome {
						if !error.is_cancelled() {
							tracing::warn!(component = %name, %error, "background render failed");
						}
					}
				});
			}
			Err(error) => {
				tracing::warn!(component = %self.inner.name, %error, "background render could not start");
			}
		}
	}

	// ---------------------------------------------------------------------
	// Event delegation
	// ---------------------------------------------------------------------

	fn attach_listeners(&self) {
		let inner = &self.inner;
		let previous = std::mem::take(&mut inner.state.borrow_mut().listeners);
		drop(previous);
		if inner.rules.is_empty() {
			return;
		}

		let handles: Vec<EventHandle> = event_types(&inner.rules)
			.into_iter()
			.map(|event_type| {
				let weak = Rc::downgrade(&self.inner);
				inner.element.add_event_listener(&event_type, move |event| {
					if let Some(controller) = Controller::upgrade(&weak) {
						controller.delegate(event);
					}
				})
			})
			.collect();
		inner.state.borrow_mut().listeners = handles;
	}

	fn delegate(&self, event: &Event) {
		if self.is_destroyed() {
			return;
		}
		let inner = &self.inner;
		let settings = inner.context.settings();
		let matched = matching_rules(
			&inner.rules,
			event,
			&inner.element,
			&self.child_roots(),
			settings.delegate_to_closest,
		);
		if settings.stop_propagation {
			event.stop_propagation();
		}

		for (rule, delegate) in matched {
			if self.is_destroyed() {
				break;
			}
			tracing::trace!(
				component = %inner.name,
				event_type = rule.event_type(),
				"dispatching delegated event"
			);
			(rule.handler())(self, &DelegatedEvent::new(event, delegate));
		}
	}
}

impl fmt::Debug for Controller {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.inner.state.borrow();
		f.debug_struct("Controller")
			.field("name", &self.inner.name)
			.field("phase", &state.phase)
			.field("element", &self.inner.element)
			.field("children", &state.children.len())
			.field("teardowns", &state.teardowns)
			.finish()
	}
}
