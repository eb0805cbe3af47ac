//! Query building: a [`Select`] projection plus a [`Modifier`] tail render a
//! complete SELECT; [`write`] holds the statements that change rows.

mod condition;
mod join;
mod modifier;
mod select;
pub mod write;

pub use condition::{Condition, Conditions, Logic, Operand, Operator};
pub use join::{Join, JoinType};
pub use modifier::{Modifier, OrderBy};
pub use select::Select;
pub use write::{DeleteStatement, InsertStatement, UpdateStatement};

use crate::{Result, SchemaCatalog};

/// Renders `select` followed by `modifier`.
pub fn to_sql(select: &Select, modifier: &Modifier, catalog: &dyn SchemaCatalog) -> Result<String> {
    Ok(format!(
        "{}{}",
        select.to_sql(catalog.dialect())?,
        modifier.to_sql(catalog)
    ))
}

/// Renders the COUNT form of `select` followed by `modifier`.
pub fn to_count_sql(
    select: &Select,
    modifier: &Modifier,
    catalog: &dyn SchemaCatalog,
) -> Result<String> {
    Ok(format!(
        "{}{}",
        select.to_count_sql()?,
        modifier.to_count_sql(catalog)
    ))
}
