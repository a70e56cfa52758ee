mod loader;
pub mod settings;

pub use loader::{SettingsError, SettingsLoader};
pub use settings::Settings;
