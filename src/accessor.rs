//! Relation accessors: `get|add|remove_<subject>[_list|_arraylist|_idlist|_count][_inverted]`.
//!
//! Every accessor an entity supports is registered in its [`AccessorTable`]
//! when the registry is built. Calls by name are looked up there and routed
//! to the typed methods in [`crate::relation`]; nothing is parsed per call.

use core::fmt;

use compact_str::CompactString;
use hashbrown::HashMap;
use tabula_core::{Modifier, Result, Row, SchemaCatalog, TabulaError};

use crate::record::Record;
use crate::relation::RelationQuery;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Get,
    Add,
    Remove,
}

impl Action {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Action::Get => "get",
            Action::Add => "add",
            Action::Remove => "remove",
        }
    }
}

/// Result shape of a `get_<subject>_<view>` accessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum View {
    /// Hydrated records
    List,
    /// Raw column maps
    ArrayList,
    /// Bare ids
    IdList,
    Count,
}

impl View {
    pub const ALL: [View; 4] = [View::List, View::ArrayList, View::IdList, View::Count];

    pub const fn as_str(&self) -> &'static str {
        match self {
            View::List => "list",
            View::ArrayList => "arraylist",
            View::IdList => "idlist",
            View::Count => "count",
        }
    }
}

/// One registered accessor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Accessor {
    pub action: Action,
    pub subject: String,
    /// `None` for `get_<subject>`, `add_*` and `remove_*`
    pub view: Option<View>,
    pub inverted: bool,
}

impl Accessor {
    pub fn new(action: Action, subject: impl Into<String>) -> Self {
        Self {
            action,
            subject: subject.into(),
            view: None,
            inverted: false,
        }
    }

    pub fn get_view(subject: impl Into<String>, view: View, inverted: bool) -> Self {
        Self {
            action: Action::Get,
            subject: subject.into(),
            view: Some(view),
            inverted,
        }
    }

    /// The method name this accessor answers to.
    pub fn name(&self) -> String {
        let mut name = format!("{}_{}", self.action.as_str(), self.subject);
        if let Some(view) = self.view {
            name.push('_');
            name.push_str(view.as_str());
            if self.inverted {
                name.push_str("_inverted");
            }
        }
        name
    }

    /// Splits a method name into its parts. The subject is not checked
    /// against any registry.
    pub fn parse(name: &str) -> Option<Accessor> {
        if let Some(subject) = name.strip_prefix("add_") {
            return (!subject.is_empty()).then(|| Accessor::new(Action::Add, subject));
        }
        if let Some(subject) = name.strip_prefix("remove_") {
            return (!subject.is_empty()).then(|| Accessor::new(Action::Remove, subject));
        }
        let rest = name.strip_prefix("get_")?;
        let (rest, inverted) = match rest.strip_suffix("_inverted") {
            Some(rest) => (rest, true),
            None => (rest, false),
        };
        // longest suffixes first: "_arraylist" also ends in "list"
        for view in [View::ArrayList, View::IdList, View::List, View::Count] {
            if let Some(subject) = rest
                .strip_suffix(view.as_str())
                .and_then(|s| s.strip_suffix('_'))
                .filter(|s| !s.is_empty())
            {
                return Some(Accessor::get_view(subject, view, inverted));
            }
        }
        if inverted || rest.is_empty() {
            return None;
        }
        Some(Accessor::new(Action::Get, rest))
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// The closed set of accessors of one entity, keyed by method name.
#[derive(Clone, Debug, Default)]
pub struct AccessorTable {
    entries: HashMap<CompactString, Accessor>,
}

impl AccessorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every relation accessor for `subject`; `with_parent` adds
    /// `get_<subject>`.
    pub fn register_subject(&mut self, subject: &str, with_parent: bool) {
        if with_parent {
            self.register(Accessor::new(Action::Get, subject));
        }
        self.register(Accessor::new(Action::Add, subject));
        self.register(Accessor::new(Action::Remove, subject));
        for view in View::ALL {
            self.register(Accessor::get_view(subject, view, false));
            self.register(Accessor::get_view(subject, view, true));
        }
    }

    /// Adds an accessor unless its name is already taken.
    pub fn register(&mut self, accessor: Accessor) -> bool {
        let name = CompactString::from(accessor.name());
        if self.entries.contains_key(&name) {
            return false;
        }
        self.entries.insert(name, accessor);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Accessor> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(CompactString::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Arguments of a call by name.
#[derive(Clone, Debug, Default)]
pub enum AccessorArgs {
    #[default]
    None,
    /// Filter/sort for a `get_*` view
    Query {
        modifier: Modifier,
        distinct: Option<bool>,
    },
    /// Ids for `add_*`
    Ids(Vec<i64>),
    /// Id for `remove_*`
    Id(i64),
}

/// Result of a call by name.
#[derive(Debug)]
pub enum AccessorOutput<'db, C: SchemaCatalog> {
    Record(Option<Record<'db, C>>),
    Records(Vec<Record<'db, C>>),
    Rows(Vec<Row>),
    Ids(Vec<i64>),
    Count(u64),
    Done,
}

impl<'db, C: SchemaCatalog> AccessorOutput<'db, C> {
    pub fn into_record(self) -> Option<Record<'db, C>> {
        match self {
            AccessorOutput::Record(record) => record,
            _ => None,
        }
    }

    pub fn into_records(self) -> Vec<Record<'db, C>> {
        match self {
            AccessorOutput::Records(records) => records,
            _ => Vec::new(),
        }
    }

    pub fn into_rows(self) -> Vec<Row> {
        match self {
            AccessorOutput::Rows(rows) => rows,
            _ => Vec::new(),
        }
    }

    pub fn into_ids(self) -> Vec<i64> {
        match self {
            AccessorOutput::Ids(ids) => ids,
            _ => Vec::new(),
        }
    }

    pub fn count(&self) -> u64 {
        match self {
            AccessorOutput::Count(count) => *count,
            AccessorOutput::Records(records) => records.len() as u64,
            AccessorOutput::Rows(rows) => rows.len() as u64,
            AccessorOutput::Ids(ids) => ids.len() as u64,
            AccessorOutput::Record(record) => u64::from(record.is_some()),
            AccessorOutput::Done => 0,
        }
    }
}

fn wrong_args(accessor: &Accessor, args: &AccessorArgs) -> TabulaError {
    TabulaError::argument(accessor.name(), format!("unexpected arguments {args:?}"))
}

impl<'db, C: SchemaCatalog> Record<'db, C> {
    /// Calls a registered accessor by name.
    ///
    /// ```ignore
    /// user.call("add_role", AccessorArgs::Ids(vec![2, 3]))?;
    /// let roles = user.call("get_role_list", AccessorArgs::None)?.into_records();
    /// ```
    pub fn call(&self, name: &str, args: AccessorArgs) -> Result<AccessorOutput<'db, C>> {
        let accessor = self
            .schema()
            .accessors
            .get(name)
            .cloned()
            .ok_or_else(|| {
                TabulaError::NoSuchOperation(format!("{}::{name}", self.entity_name()))
            })?;
        let subject = accessor.subject.as_str();

        match (accessor.action, accessor.view) {
            (Action::Add, _) => match args {
                AccessorArgs::Ids(ids) if ids.is_empty() => {
                    Err(TabulaError::argument("ids", "(empty)"))
                }
                AccessorArgs::Ids(ids) => {
                    self.add(subject, &ids)?;
                    Ok(AccessorOutput::Done)
                }
                AccessorArgs::Id(id) => {
                    self.add(subject, &[id])?;
                    Ok(AccessorOutput::Done)
                }
                other => Err(wrong_args(&accessor, &other)),
            },
            (Action::Remove, _) => match args {
                AccessorArgs::Id(id) => {
                    self.remove(subject, id)?;
                    Ok(AccessorOutput::Done)
                }
                other => Err(wrong_args(&accessor, &other)),
            },
            (Action::Get, None) => match args {
                AccessorArgs::None => Ok(AccessorOutput::Record(self.parent(subject)?)),
                other => Err(wrong_args(&accessor, &other)),
            },
            (Action::Get, Some(view)) => {
                let mut query = match args {
                    AccessorArgs::None => RelationQuery::new(),
                    AccessorArgs::Query { modifier, distinct } => {
                        let mut query = RelationQuery::new().with_modifier(modifier);
                        query.distinct = distinct;
                        query
                    }
                    other => return Err(wrong_args(&accessor, &other)),
                };
                query.inverted = accessor.inverted;
                Ok(match view {
                    View::List => AccessorOutput::Records(self.list(subject, query)?),
                    View::ArrayList => AccessorOutput::Rows(self.arraylist(subject, query)?),
                    View::IdList => AccessorOutput::Ids(self.idlist(subject, query)?),
                    View::Count => AccessorOutput::Count(self.count_related(subject, query)?),
                })
            }
        }
    }
}
