//! Pagination policy for `find`.
//!
//! Decides the effective limit for a call and whether the call returns a
//! plain list, a count-only envelope or a paginated envelope.

use serde::{Deserialize, Serialize};

/// Service-level pagination settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationDefaults {
    /// limit applied when the caller asks for none
    #[serde(default)]
    pub default: Option<u64>,
    /// hard ceiling on any limit
    #[serde(default)]
    pub max: Option<u64>,
}

impl From<configs::PaginationSettings> for PaginationDefaults {
    fn from(s: configs::PaginationSettings) -> Self {
        Self { default: s.default, max: s.max }
    }
}

/// Per-call override carried in `Params::paginate`.
///
/// `false` turns envelopes off for the call (the configured `max` still
/// caps the limit), `true` turns them on with the service defaults, and an
/// object is merged over the service defaults and turns them on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Paginate {
    Toggle(bool),
    Options(PaginationDefaults),
}

/// Effective pagination for one call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PaginationConfig {
    pub defaults: PaginationDefaults,
    pub enabled: bool,
}

impl PaginationConfig {
    pub fn for_call(configured: Option<PaginationDefaults>, requested: Option<Paginate>) -> Self {
        let base = configured.unwrap_or_default();
        match requested {
            None => Self { defaults: base, enabled: base.default.is_some() },
            Some(Paginate::Toggle(false)) => Self {
                defaults: PaginationDefaults { default: None, max: base.max },
                enabled: false,
            },
            Some(Paginate::Toggle(true)) => Self { defaults: base, enabled: true },
            Some(Paginate::Options(o)) => Self {
                defaults: PaginationDefaults {
                    default: o.default.or(base.default),
                    max: o.max.or(base.max),
                },
                enabled: true,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// raw list with the resolved limit/offset
    Plain,
    /// `limit == 0`: count only, no rows fetched
    CountOnly,
    /// find-and-count envelope
    Paginated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub mode: Mode,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
}

impl Resolved {
    pub fn skip_or_zero(&self) -> u64 { self.skip.unwrap_or(0) }
}

/// Resolve the limit and execution mode for a call.
///
/// `max` wins over everything: `min(caller, max)` or `max` alone. Without a
/// `max` the caller's limit (0 included) is used, falling back to `default`.
pub fn resolve(caller_limit: Option<u64>, caller_skip: Option<u64>, cfg: &PaginationConfig) -> Resolved {
    let limit = match (cfg.defaults.max, caller_limit) {
        (Some(max), Some(l)) => Some(l.min(max)),
        (Some(max), None) => Some(max),
        (None, Some(l)) => Some(l),
        (None, None) => cfg.defaults.default,
    };
    let mode = if limit == Some(0) {
        Mode::CountOnly
    } else if cfg.enabled {
        Mode::Paginated
    } else {
        Mode::Plain
    };
    Resolved { mode, limit, skip: caller_skip }
}
