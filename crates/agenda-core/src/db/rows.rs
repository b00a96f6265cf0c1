//! Row mapping between entity structs and their tables

use rusqlite::types::{Type, Value};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::{EntityId, EntityKind, Event, NoteItem, Project, TaskItem};

/// A model stored in its own table. The first column is always `id`.
pub trait TableRow: Sized {
    const KIND: EntityKind;
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> EntityId;
    fn to_values(&self) -> Vec<Value>;
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

pub fn table_for(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Project => Project::TABLE,
        EntityKind::Event => Event::TABLE,
        EntityKind::Task => TaskItem::TABLE,
        EntityKind::Note => NoteItem::TABLE,
    }
}

fn column_list<T: TableRow>() -> String {
    T::COLUMNS.join(", ")
}

pub fn select_one<T: TableRow>(conn: &Connection, id: &EntityId) -> Result<Option<T>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?1",
        column_list::<T>(),
        T::TABLE
    );
    Ok(conn
        .query_row(&sql, [id.as_str()], T::from_row)
        .optional()?)
}

pub fn select_where<T: TableRow>(
    conn: &Connection,
    filter: &str,
    params: &[Value],
) -> Result<Vec<T>> {
    let sql = format!(
        "SELECT {} FROM {} {filter} ORDER BY created_at, id",
        column_list::<T>(),
        T::TABLE
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), T::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn select_all<T: TableRow>(conn: &Connection) -> Result<Vec<T>> {
    select_where(conn, "", &[])
}

pub fn insert_row<T: TableRow>(conn: &Connection, row: &T, confirmed: bool) -> Result<()> {
    let placeholders = (1..=T::COLUMNS.len() + 1)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}, confirmed) VALUES ({placeholders})",
        T::TABLE,
        column_list::<T>()
    );
    let mut values = row.to_values();
    values.push(Value::Integer(i64::from(confirmed)));
    conn.execute(&sql, params_from_iter(values.iter()))?;
    Ok(())
}

/// Overwrite every column except `id`; `confirmed` is only ever raised.
///
/// Returns the number of rows changed (0 when the id is unknown).
pub fn update_row<T: TableRow>(conn: &Connection, row: &T, confirm: bool) -> Result<usize> {
    let assignments = T::COLUMNS
        .iter()
        .enumerate()
        .skip(1)
        .map(|(index, column)| format!("{column} = ?{}", index + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let confirm_clause = if confirm { ", confirmed = 1" } else { "" };
    let sql = format!(
        "UPDATE {} SET {assignments}{confirm_clause} WHERE id = ?1",
        T::TABLE
    );
    let values = row.to_values();
    Ok(conn.execute(&sql, params_from_iter(values.iter()))?)
}

pub fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

pub fn id_value(id: EntityId) -> Value {
    Value::Text(id.as_str())
}

pub fn opt_id_value(id: Option<EntityId>) -> Value {
    id.map_or(Value::Null, id_value)
}

pub fn opt_int_value(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

pub fn bool_value(value: bool) -> Value {
    Value::Integer(i64::from(value))
}

fn conversion_error(
    index: usize,
    error: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, error.into())
}

pub fn parse_id(row: &Row<'_>, index: usize) -> rusqlite::Result<EntityId> {
    let raw: String = row.get(index)?;
    raw.parse().map_err(|error| conversion_error(index, error))
}

pub fn parse_opt_id(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<EntityId>> {
    let raw: Option<String> = row.get(index)?;
    raw.map(|value| value.parse().map_err(|error| conversion_error(index, error)))
        .transpose()
}

fn parse_enum<E: std::str::FromStr<Err = String>>(
    row: &Row<'_>,
    index: usize,
) -> rusqlite::Result<E> {
    let raw: String = row.get(index)?;
    raw.parse().map_err(|error: String| conversion_error(index, error))
}

impl TableRow for Project {
    const KIND: EntityKind = EntityKind::Project;
    const TABLE: &'static str = "projects";
    const COLUMNS: &'static [&'static str] = &["id", "name", "created_at", "updated_at"];

    fn id(&self) -> EntityId {
        self.id
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            id_value(self.id),
            text(&self.name),
            Value::Integer(self.created_at),
            Value::Integer(self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }
}

impl TableRow for Event {
    const KIND: EntityKind = EntityKind::Event;
    const TABLE: &'static str = "events";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "title",
        "start_at",
        "end_at",
        "status",
        "project_id",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> EntityId {
        self.id
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            id_value(self.id),
            text(&self.title),
            Value::Integer(self.start_at),
            Value::Integer(self.end_at),
            text(self.status.as_str()),
            opt_id_value(self.project_id),
            Value::Integer(self.created_at),
            Value::Integer(self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            title: row.get(1)?,
            start_at: row.get(2)?,
            end_at: row.get(3)?,
            status: parse_enum(row, 4)?,
            project_id: parse_opt_id(row, 5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl TableRow for TaskItem {
    const KIND: EntityKind = EntityKind::Task;
    const TABLE: &'static str = "tasks";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "title",
        "due_at",
        "status",
        "completed_at",
        "event_id",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> EntityId {
        self.id
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            id_value(self.id),
            text(&self.title),
            opt_int_value(self.due_at),
            text(self.status.as_str()),
            opt_int_value(self.completed_at),
            opt_id_value(self.event_id),
            Value::Integer(self.created_at),
            Value::Integer(self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            title: row.get(1)?,
            due_at: row.get(2)?,
            status: parse_enum(row, 3)?,
            completed_at: row.get(4)?,
            event_id: parse_opt_id(row, 5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl TableRow for NoteItem {
    const KIND: EntityKind = EntityKind::Note;
    const TABLE: &'static str = "notes";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "title",
        "content",
        "project_id",
        "event_id",
        "is_favorite",
        "is_archived",
        "created_at",
        "updated_at",
    ];

    fn id(&self) -> EntityId {
        self.id
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            id_value(self.id),
            text(&self.title),
            text(&self.content),
            opt_id_value(self.project_id),
            opt_id_value(self.event_id),
            bool_value(self.is_favorite),
            bool_value(self.is_archived),
            Value::Integer(self.created_at),
            Value::Integer(self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            project_id: parse_opt_id(row, 3)?,
            event_id: parse_opt_id(row, 4)?,
            is_favorite: row.get::<_, i64>(5)? != 0,
            is_archived: row.get::<_, i64>(6)? != 0,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}
