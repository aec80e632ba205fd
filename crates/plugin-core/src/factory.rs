use std::sync::Arc;

use crate::{Plugin, PluginSpec};

/// Registers a plugin's default spec and builds its instance.
pub trait PluginFactory {
    /// Pushes the plugin's default spec unless `specs` already carries one with
    /// the same id.
    fn register_defaults(&self, specs: &mut Vec<PluginSpec>);

    #[must_use]
    fn build(&self) -> Arc<dyn Plugin>;
}
