use std::sync::Arc;

use thiserror::Error;

use super::{AuthorizeService, DataContext, DataService};
use crate::types::{short_type_name, ServiceKind};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocatorError {
    #[error("Service '{0}' is not registered")]
    NotFound(String),

    #[error("Service '{key}' is a {found:?}, expected a {expected:?}")]
    KindMismatch {
        key: String,
        expected: ServiceKind,
        found: ServiceKind,
    },
}

/// A registered service instance together with its kind
#[derive(Clone)]
pub enum ServiceEntry {
    DataContext { instance: Arc<dyn DataContext>, type_name: &'static str },
    DataService(Arc<dyn DataService>),
    AuthorizeService { instance: Arc<dyn AuthorizeService>, type_name: &'static str },
}

impl ServiceEntry {
    pub fn data_context<T: DataContext + 'static>(instance: T) -> Self {
        ServiceEntry::DataContext {
            instance: Arc::new(instance),
            type_name: short_type_name(std::any::type_name::<T>()),
        }
    }

    pub fn data_service<T: DataService + 'static>(instance: T) -> Self {
        ServiceEntry::DataService(Arc::new(instance))
    }

    pub fn authorize_service<T: AuthorizeService + 'static>(instance: T) -> Self {
        ServiceEntry::AuthorizeService {
            instance: Arc::new(instance),
            type_name: short_type_name(std::any::type_name::<T>()),
        }
    }

    pub fn kind(&self) -> ServiceKind {
        match self {
            ServiceEntry::DataContext { .. } => ServiceKind::DataContext,
            ServiceEntry::DataService(_) => ServiceKind::DataService,
            ServiceEntry::AuthorizeService { .. } => ServiceKind::AuthorizeService,
        }
    }

    /// Key used when a service is registered without an explicit one
    pub fn default_key(&self) -> String {
        match self {
            ServiceEntry::DataContext { type_name, .. } => type_name.to_string(),
            ServiceEntry::DataService(service) => service.name().to_string(),
            ServiceEntry::AuthorizeService { type_name, .. } => type_name.to_string(),
        }
    }
}

impl std::fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self.kind(), self.default_key())
    }
}

/// Typed view of a locator entry, used by [`ServiceCollection::get`]
pub trait FromServiceEntry: Sized {
    const KIND: ServiceKind;

    fn from_entry(entry: &ServiceEntry) -> Option<Self>;
}

impl FromServiceEntry for Arc<dyn DataContext> {
    const KIND: ServiceKind = ServiceKind::DataContext;

    fn from_entry(entry: &ServiceEntry) -> Option<Self> {
        match entry {
            ServiceEntry::DataContext { instance, .. } => Some(instance.clone()),
            _ => None,
        }
    }
}

impl FromServiceEntry for Arc<dyn DataService> {
    const KIND: ServiceKind = ServiceKind::DataService;

    fn from_entry(entry: &ServiceEntry) -> Option<Self> {
        match entry {
            ServiceEntry::DataService(instance) => Some(instance.clone()),
            _ => None,
        }
    }
}

impl FromServiceEntry for Arc<dyn AuthorizeService> {
    const KIND: ServiceKind = ServiceKind::AuthorizeService;

    fn from_entry(entry: &ServiceEntry) -> Option<Self> {
        match entry {
            ServiceEntry::AuthorizeService { instance, .. } => Some(instance.clone()),
            _ => None,
        }
    }
}

/// Registry of singleton services keyed by name.
///
/// Populated during boot through `&mut` access, then shared behind an `Arc`
/// for the lifetime of the process, so lookups never need a lock.
#[derive(Default)]
pub struct ServiceCollection {
    entries: Vec<(String, ServiceEntry)>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entry` under `key`, or under its default key when `key` is absent.
    /// Re-registering a key replaces the previous instance in place.
    pub fn register(&mut self, key: Option<&str>, entry: ServiceEntry) -> String {
        let key = key.map(str::to_string).unwrap_or_else(|| entry.default_key());

        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => {
                tracing::debug!(key = %key, kind = ?entry.kind(), "service replaced");
                slot.1 = entry;
            }
            None => {
                tracing::debug!(key = %key, kind = ?entry.kind(), "service registered");
                self.entries.push((key.clone(), entry));
            }
        }

        key
    }

    pub fn entry(&self, key: &str) -> Option<&ServiceEntry> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, entry)| entry)
    }

    pub fn get<T: FromServiceEntry>(&self, key: &str) -> Result<T, LocatorError> {
        let entry = self
            .entry(key)
            .ok_or_else(|| LocatorError::NotFound(key.to_string()))?;

        T::from_entry(entry).ok_or_else(|| LocatorError::KindMismatch {
            key: key.to_string(),
            expected: T::KIND,
            found: entry.kind(),
        })
    }

    /// All entries of one kind, in registration order
    pub fn get_by_kind(&self, kind: ServiceKind) -> Vec<(&str, &ServiceEntry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.kind() == kind)
            .map(|(key, entry)| (key.as_str(), entry))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
