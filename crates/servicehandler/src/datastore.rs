//! Service datastore.
//!
//! A synchronous repository keyed by service name. Temporary services live
//! in their own scope so they never shadow a regular service of the same
//! name.

use crate::error::{ServiceHandlerError, ServiceHandlerResult};
use chrono::{DateTime, Utc};
use otn_types::ServicePath;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Administrative state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceState {
    /// Accepted, not yet implemented on the devices
    Planned,
    InService,
    OutOfService,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Planned => write!(f, "planned"),
            ServiceState::InService => write!(f, "inService"),
            ServiceState::OutOfService => write!(f, "outOfService"),
        }
    }
}

/// Stored service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    pub state: ServiceState,
    /// Correlation id of the create request
    pub correlation_id: String,
    pub is_temporary: bool,
    /// Computed paths, once path computation has answered
    pub path_az: Option<ServicePath>,
    pub path_za: Option<ServicePath>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRecord {
    /// Creates a planned record.
    pub fn planned(name: impl Into<String>, correlation_id: impl Into<String>, is_temporary: bool) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            state: ServiceState::Planned,
            correlation_id: correlation_id.into(),
            is_temporary,
            path_az: None,
            path_za: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns both paths when path computation has answered.
    pub fn paths(&self) -> Option<(&ServicePath, &ServicePath)> {
        self.path_az.as_ref().zip(self.path_za.as_ref())
    }
}

/// Repository of services.
pub trait ServiceDataStore: Send + Sync {
    /// Stores a new service; fails if the name is taken.
    fn create_service(&self, record: ServiceRecord) -> ServiceHandlerResult<()>;

    /// Updates the state of an existing service.
    fn modify_service(&self, name: &str, state: ServiceState) -> ServiceHandlerResult<()>;

    /// Removes a service.
    fn delete_service(&self, name: &str) -> ServiceHandlerResult<()>;

    fn get_service(&self, name: &str) -> Option<ServiceRecord>;

    /// Attaches the computed paths to an existing service.
    fn set_paths(&self, name: &str, path_az: ServicePath, path_za: ServicePath) -> ServiceHandlerResult<()>;
}

/// In-memory datastore with a separate temporary-service scope.
#[derive(Debug, Default)]
pub struct InMemoryServiceStore {
    services: RwLock<HashMap<String, ServiceRecord>>,
    temp_services: RwLock<HashMap<String, ServiceRecord>>,
}

impl InMemoryServiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of regular and temporary services.
    pub fn len(&self) -> usize {
        self.services.read().len() + self.temp_services.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f` on the stored record, whichever scope holds it.
    fn update<F>(&self, operation: &str, name: &str, f: F) -> ServiceHandlerResult<()>
    where
        F: FnOnce(&mut ServiceRecord),
    {
        let mut services = self.services.write();
        let mut temp_services = self.temp_services.write();
        let record = services
            .get_mut(name)
            .or_else(|| temp_services.get_mut(name))
            .ok_or_else(|| ServiceHandlerError::service_not_found(name))?;

        f(record);
        record.updated_at = Utc::now();
        debug!(service = name, operation, "service record updated");
        Ok(())
    }
}

impl ServiceDataStore for InMemoryServiceStore {
    fn create_service(&self, record: ServiceRecord) -> ServiceHandlerResult<()> {
        let scope = if record.is_temporary {
            &self.temp_services
        } else {
            &self.services
        };
        let mut services = scope.write();
        if services.contains_key(&record.name) {
            return Err(ServiceHandlerError::service_exists(&record.name));
        }
        debug!(service = %record.name, temporary = record.is_temporary, "service record created");
        services.insert(record.name.clone(), record);
        Ok(())
    }

    fn modify_service(&self, name: &str, state: ServiceState) -> ServiceHandlerResult<()> {
        self.update("modify", name, |record| record.state = state)
    }

    fn delete_service(&self, name: &str) -> ServiceHandlerResult<()> {
        if self.services.write().remove(name).is_some() || self.temp_services.write().remove(name).is_some() {
            debug!(service = name, "service record deleted");
            return Ok(());
        }
        Err(ServiceHandlerError::service_not_found(name))
    }

    fn get_service(&self, name: &str) -> Option<ServiceRecord> {
        if let Some(record) = self.services.read().get(name) {
            return Some(record.clone());
        }
        self.temp_services.read().get(name).cloned()
    }

    fn set_paths(&self, name: &str, path_az: ServicePath, path_za: ServicePath) -> ServiceHandlerResult<()> {
        self.update("set_paths", name, |record| {
            record.path_az = Some(path_az);
            record.path_za = Some(path_za);
        })
    }
}
