use serde::Serialize;
use serde_json::Value;

/// Paginated `find` envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub total: u64,
    pub limit: u64,
    pub skip: u64,
    pub data: Vec<T>,
}

/// Outcome of `find`: an envelope for count-only and paginated calls, the
/// raw list otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FindResult<T = Value> {
    Page(Paginated<T>),
    All(Vec<T>),
}

impl<T> FindResult<T> {
    pub fn data(&self) -> &[T] {
        match self {
            FindResult::Page(p) => &p.data,
            FindResult::All(v) => v,
        }
    }

    pub fn into_data(self) -> Vec<T> {
        match self {
            FindResult::Page(p) => p.data,
            FindResult::All(v) => v,
        }
    }

    pub fn page(&self) -> Option<&Paginated<T>> {
        match self {
            FindResult::Page(p) => Some(p),
            FindResult::All(_) => None,
        }
    }
}

/// Single record for id-addressed calls, a list for batch calls.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T = Value> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn one(self) -> Option<T> {
        match self {
            OneOrMany::One(v) => Some(v),
            OneOrMany::Many(_) => None,
        }
    }

    pub fn many(self) -> Option<Vec<T>> {
        match self {
            OneOrMany::Many(v) => Some(v),
            OneOrMany::One(_) => None,
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}
