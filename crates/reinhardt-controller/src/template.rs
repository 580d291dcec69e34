//! Components whose markup comes from a Tera template.
//!
//! The snapshot is the template context, so every data source name is a template variable.
//! Output is HTML-escaped unless a value is marked `| safe`.

use std::rc::Rc;

use tera::{Context, Tera};

use crate::component::{ChildDeclaration, Component, EventDeclaration};
use crate::controller::Controller;
use crate::datasource::Datasources;
use crate::delegation::DelegatedEvent;
use crate::error::ComponentError;
use crate::snapshot::Snapshot;

// The `.html` suffix turns on Tera's autoescaping.
const TEMPLATE_NAME: &str = "component.html";

/// A [`Component`] rendering a Tera template.
///
/// # Example
///
/// ```
/// use reinhardt_controller::{DatasourceGroup, TemplateComponent};
/// use serde_json::json;
///
/// let component = TemplateComponent::new("<div>{{ count }}</div>")
///     .unwrap()
///     .with_datasources(DatasourceGroup::new().with("count", |_| Ok(json!(3).into())));
/// ```
#[derive(Clone)]
pub struct TemplateComponent {
	name: String,
	tera: Rc<Tera>,
	datasources: Option<Datasources>,
	children: Vec<ChildDeclaration>,
	events: Vec<EventDeclaration>,
}

impl TemplateComponent {
	/// Compile `template`. Syntax errors are reported here rather than at render time.
	pub fn new(template: &str) -> Result<Self, ComponentError> {
		let mut tera = Tera::default();
		tera.add_raw_template(TEMPLATE_NAME, template)
			.map_err(|e| ComponentError::with_source("failed to compile template", e))?;

		Ok(Self {
			name: "TemplateComponent".to_string(),
			tera: Rc::new(tera),
			datasources: Some(Datasources::default()),
			children: Vec::new(),
			events: Vec::new(),
		})
	}

	/// Set the data sources exposed to the template.
	pub fn with_datasources(mut self, datasources: impl Into<Datasources>) -> Self {
		self.datasources = Some(datasources.into());
		self
	}

	/// Add a child declaration.
	pub fn with_child(mut self, child: ChildDeclaration) -> Self {
		self.children.push(child);
		self
	}

	/// Add a delegated handler for `key`.
	pub fn with_event<F>(mut self, key: impl Into<String>, handler: F) -> Self
	where
		F: Fn(&Controller, &DelegatedEvent<'_>) + 'static,
	{
		self.events.push(EventDeclaration::new(key, handler));
		self
	}

	/// Set the name used in logs and errors.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}
}

impl Component for TemplateComponent {
	fn datasources(&self) -> Option<Datasources> {
		self.datasources.clone()
	}

	fn generate_html(&self, snapshot: &Snapshot) -> Result<String, ComponentError> {
		let context = Context::from_serialize(snapshot)
			.map_err(|e| ComponentError::with_source("invalid template context", e))?;
		self.tera
			.render(TEMPLATE_NAME, &context)
			.map_err(|e| ComponentError::with_source(format!("failed to render {}", self.name), e))
	}

	fn children(&self) -> Vec<ChildDeclaration> {
		self.children.clone()
	}

	fn events(&self) -> Vec<EventDeclaration> {
		self.events.clone()
	}

	fn name(&self) -> &str {
		&self.name
	}
}
