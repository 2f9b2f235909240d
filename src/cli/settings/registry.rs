//! Registry of setting handlers.

use std::collections::HashMap;

use super::handlers::{BaseUrlHandler, ChatPathHandler, IdleTimeoutHandler};
use super::SettingHandler;
use crate::core::config::Config;

/// Registry of all available setting handlers.
pub struct SettingRegistry {
    handlers: HashMap<&'static str, Box<dyn SettingHandler>>,
    /// Keys in display order for `varys set` output.
    display_order: Vec<&'static str>,
}

impl SettingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
            display_order: Vec::new(),
        };

        registry.register(Box::new(BaseUrlHandler));
        registry.register(Box::new(ChatPathHandler));
        registry.register(Box::new(IdleTimeoutHandler));

        registry
    }

    fn register(&mut self, handler: Box<dyn SettingHandler>) {
        let key = handler.key();
        self.display_order.push(key);
        self.handlers.insert(key, handler);
    }

    pub fn get(&self, key: &str) -> Option<&dyn SettingHandler> {
        self.handlers.get(key).map(|h| h.as_ref())
    }

    pub fn keys_display_order(&self) -> &[&'static str] {
        &self.display_order
    }

    /// Current values of every key, one per line.
    pub fn describe(&self, config: &Config) -> String {
        let mut lines = vec!["Available configuration options:".to_string()];
        lines.extend(
            self.display_order
                .iter()
                .filter_map(|key| self.get(key))
                .map(|handler| handler.format(config)),
        );
        lines.join("\n")
    }
}

impl Default for SettingRegistry {
    fn default() -> Self {
        Self::new()
    }
}
