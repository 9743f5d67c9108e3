use crate::schema::links;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// A stored short link.
///
/// The same shape is read from SQLite (diesel) and from PostgREST (serde), so
/// the field names match the `links` columns.
#[derive(Selectable, Queryable, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = links)]
pub struct Link {
    pub id: i64,
    pub short_code: String,
    pub original_url: String,
    pub clicks: i64,
}

#[derive(Insertable, Serialize, Debug, Clone)]
#[diesel(table_name = links)]
pub struct NewLink<'a> {
    pub short_code: &'a str,
    pub original_url: &'a str,
}
