//! Construction-time configuration of a record service.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use configs::{MultiSetting, ServiceSettings};

use crate::errors::{ServiceError, ServiceResult};
use crate::pagination::PaginationDefaults;
use crate::populate::Populate;

/// Batch-capable methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    Create,
    Patch,
    Remove,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Create => "create",
            Method::Patch => "patch",
            Method::Remove => "remove",
        }
    }

    pub fn parse(s: &str) -> Option<Method> {
        match s {
            "create" => Some(Method::Create),
            "patch" => Some(Method::Patch),
            "remove" => Some(Method::Remove),
            _ => None,
        }
    }
}

/// Which methods accept multi-record calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Multi {
    #[default]
    All,
    Disabled,
    Methods(Vec<Method>),
}

impl Multi {
    pub fn allows(&self, method: Method) -> bool {
        match self {
            Multi::All => true,
            Multi::Disabled => false,
            Multi::Methods(list) => list.contains(&method),
        }
    }
}

#[derive(Clone)]
pub struct ServiceConfig {
    /// Service name, used in logs, events and not-found messages
    pub name: String,
    pub id_field: String,
    pub paginate: Option<PaginationDefaults>,
    pub events: Vec<String>,
    pub multi: Multi,
    pub relations: BTreeMap<String, Arc<dyn Populate>>,
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("name", &self.name)
            .field("id_field", &self.id_field)
            .field("paginate", &self.paginate)
            .field("events", &self.events)
            .field("multi", &self.multi)
            .field("relations", &self.relations.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ServiceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_field: "id".to_string(),
            paginate: None,
            events: Vec::new(),
            multi: Multi::default(),
            relations: BTreeMap::new(),
        }
    }

    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    pub fn paginate(mut self, default: Option<u64>, max: Option<u64>) -> Self {
        self.paginate = Some(PaginationDefaults { default, max });
        self
    }

    pub fn events<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn multi(mut self, multi: Multi) -> Self {
        self.multi = multi;
        self
    }

    /// Register a relation loader under `name` for `populate`.
    pub fn relation(mut self, name: impl Into<String>, loader: impl Populate + 'static) -> Self {
        self.relations.insert(name.into(), Arc::new(loader));
        self
    }

    /// Build from a `[services.<name>]` table.
    pub fn from_settings(name: &str, settings: &ServiceSettings) -> ServiceResult<Self> {
        let mut cfg = ServiceConfig::new(name);
        if let Some(id) = settings.id_field.as_deref().filter(|s| !s.trim().is_empty()) {
            cfg.id_field = id.to_string();
        }
        cfg.paginate = settings.paginate.map(PaginationDefaults::from);
        cfg.events = settings.events.clone();
        cfg.multi = match &settings.multi {
            None | Some(MultiSetting::Flag(true)) => Multi::All,
            Some(MultiSetting::Flag(false)) => Multi::Disabled,
            Some(MultiSetting::Methods(names)) => Multi::Methods(
                names
                    .iter()
                    .map(|n| {
                        Method::parse(n).ok_or_else(|| ServiceError::Config(format!("{name}: unknown multi method '{n}'")))
                    })
                    .collect::<ServiceResult<_>>()?,
            ),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub(crate) fn validate(&self) -> ServiceResult<()> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::Config("service name is empty".into()));
        }
        if let Some(PaginationDefaults { default: Some(d), max: Some(m) }) = self.paginate {
            if d > m {
                return Err(ServiceError::Config(format!("{}: paginate.default ({d}) exceeds max ({m})", self.name)));
            }
        }
        if let Some(bad) = self.events.iter().find(|e| crate::events::STANDARD_EVENTS.contains(&e.as_str())) {
            return Err(ServiceError::Config(format!("{}: '{bad}' is a standard event", self.name)));
        }
        Ok(())
    }
}
