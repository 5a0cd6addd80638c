// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lookup table of configured connectors, built once at startup.

use super::{from_settings, Connector, ConnectorError, ConnectorSettings};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    connectors: HashMap<String, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from `name → settings` configuration entries.
    pub fn from_settings<'a>(
        entries: impl IntoIterator<Item = (&'a String, &'a ConnectorSettings)>,
    ) -> Self {
        let mut registry = Self::new();
        for (name, settings) in entries {
            registry.register(from_settings(name, settings));
        }
        registry
    }

    /// Add a connector, replacing any previous one with the same name.
    pub fn register(&mut self, connector: Arc<dyn Connector>) {
        self.connectors.insert(connector.name().to_string(), connector);
    }

    /// Look up a connector that can currently accept jobs.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Connector>, ConnectorError> {
        let connector =
            self.connectors.get(name).ok_or_else(|| ConnectorError::NotFound(name.to_string()))?;
        if !connector.is_available() {
            return Err(ConnectorError::Unavailable(name.to_string()));
        }
        Ok(Arc::clone(connector))
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.connectors.keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of available connectors, sorted.
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .connectors
            .values()
            .filter(|c| c.is_available())
            .map(|c| c.name().to_string())
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
