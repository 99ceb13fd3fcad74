//! Query matching for [`Store::select`](crate::Store::select).
//!
//! A [`Filter`] is a list of `(field, term)` pairs. A record matches when
//! every term is a case-sensitive substring of the corresponding field.
//! Callers rely on exactly these semantics for search-as-you-type, so there
//! is no tokenizing, normalization, or case folding.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use taskd_types::{Task, Timestamp};

/// Record fields a filter may reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    Id,
    Title,
    Description,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

impl FilterField {
    pub const ALL: [FilterField; 6] = [
        Self::Id,
        Self::Title,
        Self::Description,
        Self::CompletedAt,
        Self::CreatedAt,
        Self::UpdatedAt,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Description => "description",
            Self::CompletedAt => "completed_at",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }

    /// Text of this field on `task`, or `None` when the record has no value.
    pub fn value_of<'a>(&self, task: &'a Task) -> Option<Cow<'a, str>> {
        match self {
            Self::Id => Some(Cow::Borrowed(task.id.as_str())),
            Self::Title => Some(Cow::Borrowed(task.title.as_str())),
            Self::Description => Some(Cow::Borrowed(task.description.as_str())),
            Self::CompletedAt => task.completed_at.as_ref().map(render),
            Self::CreatedAt => Some(render(&task.created_at)),
            Self::UpdatedAt => Some(render(&task.updated_at)),
        }
    }
}

fn render(ts: &Timestamp) -> Cow<'static, str> {
    Cow::Owned(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A filter named a field records do not have.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter field `{0}`")]
pub struct UnknownField(pub String);

impl FromStr for FilterField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| UnknownField(s.to_owned()))
    }
}

/// Conjunction of substring terms over record fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filter {
    terms: Vec<(FilterField, String)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a term. Terms on the same field are all required.
    pub fn with(mut self, field: FilterField, term: impl Into<String>) -> Self {
        self.terms.push((field, term.into()));
        self
    }

    /// The free-text search used by `GET /tasks?search=`: the term must
    /// appear in both the title and the description.
    pub fn search(term: &str) -> Self {
        Self::new()
            .with(FilterField::Title, term)
            .with(FilterField::Description, term)
    }

    /// Build a filter from `(name, term)` pairs, rejecting unknown names.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, UnknownField>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        pairs.into_iter().try_fold(Self::new(), |filter, (name, term)| {
            Ok(filter.with(name.as_ref().parse()?, term))
        })
    }

    pub fn terms(&self) -> &[(FilterField, String)] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns `true` if `task` satisfies every term.
    pub fn matches(&self, task: &Task) -> bool {
        self.terms.iter().all(|(field, term)| match field.value_of(task) {
            Some(value) => value.contains(term.as_str()),
            None => false,
        })
    }
}

/// Free-function form of [`Filter::matches`].
pub fn matches(task: &Task, filter: &Filter) -> bool {
    filter.matches(task)
}
