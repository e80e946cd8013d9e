//! In-memory Variables backend for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Variable, VariableItems, VariablesApi, VariablesError};

/// In-memory [`VariablesApi`] that counts calls and can be told to fail.
#[derive(Default)]
pub struct MemoryVariables {
    variables: Mutex<HashMap<String, Variable>>,
    read_error: Mutex<Option<String>>,
    write_error: Mutex<Option<String>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail with `message`.
    pub fn fail_reads(&self, message: impl Into<String>) {
        *self.read_error.lock().expect("read error lock poisoned") = Some(message.into());
    }

    /// Make every subsequent write fail with `message`.
    pub fn fail_writes(&self, message: impl Into<String>) {
        *self.write_error.lock().expect("write error lock poisoned") = Some(message.into());
    }

    /// Stop failing reads and writes.
    pub fn clear_failures(&self) {
        *self.read_error.lock().expect("read error lock poisoned") = None;
        *self.write_error.lock().expect("write error lock poisoned") = None;
    }

    /// Number of `get_variable_items` calls so far, failed ones included.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `create` calls so far, failed ones included.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// The variable currently stored at `path`, bypassing the counters.
    pub fn variable(&self, path: &str) -> Option<Variable> {
        self.variables
            .lock()
            .expect("variables lock poisoned")
            .get(path)
            .cloned()
    }

    /// Store a variable directly, bypassing the counters.
    pub fn insert(&self, variable: Variable) {
        self.variables
            .lock()
            .expect("variables lock poisoned")
            .insert(variable.path.clone(), variable);
    }
}

#[async_trait]
impl VariablesApi for MemoryVariables {
    async fn create(&self, variable: &Variable) -> Result<(), VariablesError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let injected = self.write_error.lock().expect("write error lock poisoned").clone();
        if let Some(message) = injected {
            return Err(VariablesError::Other(message));
        }
        self.insert(variable.clone());
        Ok(())
    }

    async fn get_variable_items(&self, path: &str) -> Result<VariableItems, VariablesError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let injected = self.read_error.lock().expect("read error lock poisoned").clone();
        if let Some(message) = injected {
            return Err(VariablesError::Other(message));
        }
        self.variable(path)
            .map(|v| v.items)
            .ok_or(VariablesError::PathNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_replaces_item_set() {
        let vars = MemoryVariables::new();
        let mut first = Variable::single("p", "account", "{}");
        first.items.insert("stale".to_string(), "x".to_string());
        vars.create(&first).await.unwrap();
        vars.create(&Variable::single("p", "certificates", "[]"))
            .await
            .unwrap();

        let items = vars.get_variable_items("p").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items.get("certificates").map(String::as_str), Some("[]"));
        assert_eq!(vars.write_count(), 2);
        assert_eq!(vars.read_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_path_and_injected_errors() {
        let vars = MemoryVariables::new();
        let err = vars.get_variable_items("nope").await.unwrap_err();
        assert!(err.is_not_found());

        vars.fail_reads("oops");
        let err = vars.get_variable_items("nope").await.unwrap_err();
        assert_eq!(err.to_string(), "oops");

        vars.clear_failures();
        assert!(vars.get_variable_items("nope").await.unwrap_err().is_not_found());
        assert_eq!(vars.read_count(), 3);
    }
}
