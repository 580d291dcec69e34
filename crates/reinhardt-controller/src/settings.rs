//! Controller settings.
//!
//! Settings come from defaults, an optional TOML document and `REINHARDT_CONTROLLERS_*`
//! environment variables, in increasing priority.
//!
//! ```toml
//! stop_propagation = true
//! delegate_to_closest = false
//! detach_on_destroy = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Prefix of environment variables that override settings.
pub const ENV_PREFIX: &str = "REINHARDT_CONTROLLERS_";

/// Errors raised while loading [`ControllerSettings`].
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	/// The settings file could not be read.
	#[error("failed to read settings file {}: {source}", .path.display())]
	Io {
		/// The file path.
		path: PathBuf,
		/// The underlying error.
		source: std::io::Error,
	},

	/// The TOML document is invalid.
	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	/// An environment override is not a boolean.
	#[error("environment variable {name} must be a boolean, got `{value}`")]
	InvalidEnv {
		/// Variable name.
		name: String,
		/// Offending value.
		value: String,
	},
}

/// Behaviour switches shared by a controller tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
	/// Stop delegated events from bubbling past the controller element.
	pub stop_propagation: bool,

	/// Match event selectors against the target and its ancestors up to the controller
	/// element. When off only the event target itself is matched.
	pub delegate_to_closest: bool,

	/// Remove the controller element from its parent on destroy.
	pub detach_on_destroy: bool,
}

impl Default for ControllerSettings {
	fn default() -> Self {
		Self {
			stop_propagation: true,
			delegate_to_closest: true,
			detach_on_destroy: true,
		}
	}
}

impl ControllerSettings {
	/// Parse settings from a TOML document. Missing fields keep their defaults.
	pub fn from_toml_str(source: &str) -> Result<Self, SettingsError> {
		Ok(toml::from_str(source)?)
	}

	/// Read settings from a TOML file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let path = path.as_ref();
		let source = fs::read_to_string(path).map_err(|source| SettingsError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&source)
	}

	/// Apply `REINHARDT_CONTROLLERS_*` overrides from the process environment.
	pub fn with_env_overrides(mut self) -> Result<Self, SettingsError> {
		for (name, field) in [
			("STOP_PROPAGATION", &mut self.stop_propagation),
			("DELEGATE_TO_CLOSEST", &mut self.delegate_to_closest),
			("DETACH_ON_DESTROY", &mut self.detach_on_destroy),
		] {
			let name = format!("{ENV_PREFIX}{name}");
			if let Ok(value) = std::env::var(&name) {
				*field = parse_bool(&value).ok_or_else(|| SettingsError::InvalidEnv {
					name: name.clone(),
					value: value.clone(),
				})?;
				tracing::debug!(%name, value = *field, "controller setting overridden from environment");
			}
		}
		Ok(self)
	}

	/// Defaults, then the file at `path` when given, then environment overrides.
	pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
		let settings = match path {
			Some(path) => Self::from_file(path)?,
			None => Self::default(),
		};
		settings.with_env_overrides()
	}
}

fn parse_bool(value: &str) -> Option<bool> {
	match value.trim().to_lowercase().as_str() {
		"true" | "1" | "yes" | "on" => Some(true),
		"false" | "0" | "no" | "off" => Some(false),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serial_test::serial;
	use std::io::Write;

	#[rstest]
	fn test_missing_fields_keep_defaults() {
		let settings = ControllerSettings::from_toml_str("delegate_to_closest = false").unwrap();

		assert!(!settings.delegate_to_closest);
		assert!(settings.stop_propagation);
		assert!(settings.detach_on_destroy);
	}

	#[rstest]
	fn test_invalid_toml_is_reported() {
		let result = ControllerSettings::from_toml_str("stop_propagation = \"sometimes\"");

		assert!(matches!(result, Err(SettingsError::Toml(_))));
	}

	#[rstest]
	fn test_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "detach_on_destroy = false").unwrap();

		let settings = ControllerSettings::from_file(file.path()).unwrap();

		assert!(!settings.detach_on_destroy);
	}

	#[rstest]
	fn test_missing_file_is_io_error() {
		let result = ControllerSettings::from_file("/nonexistent/controllers.toml");

		assert!(matches!(result, Err(SettingsError::Io { .. })));
	}

	#[rstest]
	#[case("on", false)]
	#[case("1", false)]
	#[case("off", true)]
	#[case("FALSE", true)]
	#[serial(controller_env)]
	fn test_env_overrides(#[case] raw: &str, #[case] inverted: bool) {
		// SAFETY: Environment access is serialized with #[serial].
		unsafe {
			std::env::set_var("REINHARDT_CONTROLLERS_STOP_PROPAGATION", raw);
		}

		let settings = ControllerSettings::default().with_env_overrides().unwrap();

		// SAFETY: Environment access is serialized with #[serial].
		unsafe {
			std::env::remove_var("REINHARDT_CONTROLLERS_STOP_PROPAGATION");
		}
		assert_eq!(settings.stop_propagation, !inverted);
	}

	#[rstest]
	#[serial(controller_env)]
	fn test_invalid_env_value() {
		// SAFETY: Environment access is serialized with #[serial].
		unsafe {
			std::env::set_var("REINHARDT_CONTROLLERS_DETACH_ON_DESTROY", "maybe");
		}

		let result = ControllerSettings::load(None);

		// SAFETY: Environment access is serialized with #[serial].
		unsafe {
			std::env::remove_var("REINHARDT_CONTROLLERS_DETACH_ON_DESTROY");
		}
		assert!(matches!(result, Err(SettingsError::InvalidEnv { .. })));
	}
}
