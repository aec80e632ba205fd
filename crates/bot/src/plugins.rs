use std::sync::Arc;

use crate::BotConfig;
use plugin_core::{Plugin, PluginRegistry, factory::PluginFactory};
use plugin_reply::ReplyPluginFactory;
use tracing::warn;

pub async fn build_registry(config: &BotConfig) -> Arc<PluginRegistry> {
    let factories: Vec<Box<dyn PluginFactory>> = vec![Box::new(ReplyPluginFactory)];

    // Configured specs win; factories only fill in what is missing.
    let mut specs = config.plugins.clone();
    for factory in &factories {
        factory.register_defaults(&mut specs);
    }

    let plugins: Vec<Arc<dyn Plugin>> = factories.iter().map(|f| f.build()).collect();
    let registry = Arc::new(PluginRegistry::new());
    for spec in specs {
        let Some(plugin) = plugins.iter().find(|p| p.id() == spec.id) else {
            warn!(plugin = %spec.id, "Unknown plugin ID");
            continue;
        };
        registry.register(spec, Arc::clone(plugin)).await;
    }

    registry
}
