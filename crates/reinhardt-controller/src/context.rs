//! Dependencies shared by a controller tree.

use std::fmt;
use std::rc::Rc;

use reinhardt_model::Store;

use crate::settings::ControllerSettings;

/// The store and settings a controller is constructed with. Child factories receive their
/// parent's context.
#[derive(Clone)]
pub struct ControllerContext {
	store: Rc<dyn Store>,
	settings: ControllerSettings,
}

impl ControllerContext {
	/// A context over `store` with default settings.
	pub fn new<S: Store + 'static>(store: S) -> Self {
		Self::from_rc(Rc::new(store))
	}

	/// A context over a shared store.
	pub fn from_rc(store: Rc<dyn Store>) -> Self {
		Self {
			store,
			settings: ControllerSettings::default(),
		}
	}

	/// Replace the settings.
	pub fn with_settings(mut self, settings: ControllerSettings) -> Self {
		self.settings = settings;
		self
	}

	/// The shared store.
	pub fn store(&self) -> &Rc<dyn Store> {
		&self.store
	}

	/// The settings.
	pub fn settings(&self) -> &ControllerSettings {
		&self.settings
	}
}

impl fmt::Debug for ControllerContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ControllerContext")
			.field("settings", &self.settings)
			.finish_non_exhaustive()
	}
}
