use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;

use crate::error::{RefscoutError, Result};
use crate::schemas::{ProjectRef, ProjectRefKey, ProjectsRefs};

/// Authoritative in-memory record of every tracked ref.
///
/// Cloning is cheap and yields a handle to the same data. Locks are only held
/// for the duration of a single map operation, never across an API call.
#[derive(Debug, Clone, Default)]
pub struct Store {
    refs: Arc<RwLock<ProjectsRefs>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, ProjectsRefs>> {
        self.refs
            .read()
            .map_err(|e| RefscoutError::StoreConsistency(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, ProjectsRefs>> {
        self.refs
            .write()
            .map_err(|e| RefscoutError::StoreConsistency(format!("lock poisoned: {e}")))
    }

    fn check_key(key: &ProjectRefKey, project_ref: &ProjectRef) -> Result<()> {
        let expected = project_ref.key();
        if *key != expected {
            return Err(RefscoutError::StoreConsistency(format!(
                "key {key} does not match {} ref '{}' of {} (expected {expected})",
                project_ref.kind, project_ref.ref_, project_ref.project.name
            )));
        }
        Ok(())
    }

    pub fn get(&self, key: &ProjectRefKey) -> Result<Option<ProjectRef>> {
        Ok(self.read()?.get(key).cloned())
    }

    pub fn exists(&self, key: &ProjectRefKey) -> Result<bool> {
        Ok(self.read()?.contains_key(key))
    }

    /// Replaces the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RefscoutError::StoreConsistency`] if `key` is not the key of `project_ref`.
    pub fn set(&self, key: &ProjectRefKey, project_ref: ProjectRef) -> Result<()> {
        Self::check_key(key, &project_ref)?;
        self.write()?.insert(key.clone(), project_ref);
        Ok(())
    }

    /// Inserts `project_ref` unless `key` is already present.
    ///
    /// Exactly one of several concurrent callers for the same key gets `true`;
    /// the others leave the winner's record untouched.
    pub fn set_if_absent(&self, key: &ProjectRefKey, project_ref: ProjectRef) -> Result<bool> {
        Self::check_key(key, &project_ref)?;
        let mut refs = self.write()?;
        if refs.contains_key(key) {
            return Ok(false);
        }
        refs.insert(key.clone(), project_ref);
        Ok(true)
    }

    /// Applies `f` to the stored record. Returns `false` if `key` is absent.
    ///
    /// # Errors
    ///
    /// Returns [`RefscoutError::StoreConsistency`] if `f` changes the record's
    /// identity. The stored record is then left as it was.
    pub fn update<F>(&self, key: &ProjectRefKey, f: F) -> Result<bool>
    where
        F: FnOnce(&mut ProjectRef),
    {
        let mut refs = self.write()?;
        let Some(current) = refs.get(key) else {
            return Ok(false);
        };
        let mut updated = current.clone();
        f(&mut updated);
        Self::check_key(key, &updated)?;
        refs.insert(key.clone(), updated);
        Ok(true)
    }

    pub fn delete(&self, key: &ProjectRefKey) -> Result<bool> {
        let removed = self.write()?.remove(key).is_some();
        if removed {
            debug!("Deleted project ref {key} from store");
        }
        Ok(removed)
    }

    /// Point-in-time copy of every tracked ref.
    pub fn projects_refs(&self) -> Result<ProjectsRefs> {
        Ok(self.read()?.clone())
    }

    /// Point-in-time copy of the refs owned by one project.
    pub fn project_refs(&self, project_name: &str) -> Result<ProjectsRefs> {
        Ok(self
            .read()?
            .iter()
            .filter(|(_, pr)| pr.project.name == project_name)
            .map(|(key, pr)| (key.clone(), pr.clone()))
            .collect())
    }

    pub fn keys(&self) -> Result<Vec<ProjectRefKey>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Number of tracked refs per project.
    pub fn count_by_project(&self) -> Result<HashMap<String, usize>> {
        let mut counts = HashMap::new();
        for pr in self.read()?.values() {
            *counts.entry(pr.project.name.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
