use std::collections::HashMap;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sqlparser::ast::{
    self, AssignmentTarget, Expr, FromTable, FunctionArguments, LimitClause, ObjectNamePart,
    SetExpr, Statement, TableFactor, TableObject, Value, ValueWithSpan,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use thiserror::Error;
use ulid::Ulid;

use crate::model::*;

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    InsertReservation {
        input: ReservationInput,
    },
    UpdateReservation {
        id: Ulid,
        patch: ReservationPatch,
    },
    DeleteReservation {
        id: Ulid,
    },
    SelectReservations {
        filter: ReservationFilter,
    },
    InsertBlockedWindow {
        id: Option<Ulid>,
        window: BlockedWindow,
    },
    DeleteBlockedWindow {
        id: Ulid,
    },
    SelectBlockedWindows {
        date: Option<NaiveDate>,
    },
    RefreshBlockedWindows,
    InsertCategory {
        input: CategoryInput,
    },
    DeleteCategory {
        id: Ulid,
    },
    SelectCategories,
    InsertItem {
        input: ItemInput,
    },
    UpdateItem {
        id: Ulid,
        patch: ItemPatch,
    },
    DeleteItem {
        id: Ulid,
    },
    SelectItems {
        filter: ItemFilter,
    },
    SelectItemPicture {
        item_id: Ulid,
    },
    Listen {
        channel: String,
    },
    Unlisten {
        channel: String,
    },
    UnlistenAll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationFilter {
    All(PageRequest),
    ById(Ulid),
    ByIds(Vec<Ulid>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemFilter {
    All(PageRequest),
    ById(Ulid),
    ByIds(Vec<Ulid>),
    ByCategory(Ulid, PageRequest),
    TitlePrefix(String, PageRequest),
}

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let trimmed = sql.trim().trim_end_matches(';').trim();
    if let Some(rest) = strip_keyword(trimmed, "LISTEN") {
        return Ok(Command::Listen {
            channel: channel_name(rest)?,
        });
    }
    if let Some(rest) = strip_keyword(trimmed, "UNLISTEN") {
        if rest.trim() == "*" {
            return Ok(Command::UnlistenAll);
        }
        return Ok(Command::Unlisten {
            channel: channel_name(rest)?,
        });
    }

    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    let stmt = match stmts.as_slice() {
        [] => return Err(SqlError::Empty),
        [one] => one,
        _ => return Err(SqlError::Unsupported("multiple statements".into())),
    };

    match stmt {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Update {
            table,
            assignments,
            selection,
            ..
        } => parse_update(&table.relation, assignments, selection),
        Statement::Delete(delete) => parse_delete(delete),
        Statement::Query(query) => parse_select(query),
        Statement::Call(function) => parse_call(function),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

/// `LISTEN foo` → `Some(" foo")`; case-insensitive, requires a word break.
fn strip_keyword<'a>(sql: &'a str, keyword: &str) -> Option<&'a str> {
    let head = sql.get(..keyword.len())?;
    let rest = &sql[keyword.len()..];
    if head.eq_ignore_ascii_case(keyword) && rest.starts_with(char::is_whitespace) {
        Some(rest)
    } else {
        None
    }
}

fn channel_name(raw: &str) -> Result<String, SqlError> {
    let channel = raw.trim().trim_matches('"');
    if channel.is_empty() {
        return Err(SqlError::Parse("missing channel name".into()));
    }
    Ok(channel.to_string())
}

// ── INSERT ────────────────────────────────────────────────────

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    let row = InsertRow::new(insert)?;

    match table.as_str() {
        "reservations" => {
            row.only(&[
                "id", "date", "time", "party_size", "game", "eat_and_play", "name", "surname",
                "phone", "message",
            ])?;
            Ok(Command::InsertReservation {
                input: ReservationInput {
                    id: row.optional("id", parse_ulid)?,
                    date: row.required("date", parse_date)?,
                    time: row.required("time", parse_time)?,
                    party_size: row.required("party_size", parse_u32)?,
                    game: row.optional("game", parse_bool)?.unwrap_or(false),
                    eat_and_play: row.optional("eat_and_play", parse_bool)?.unwrap_or(false),
                    name: row.required("name", parse_text)?,
                    surname: row.required("surname", parse_text)?,
                    phone: row.required("phone", parse_text)?,
                    message: row.optional("message", parse_text)?,
                },
            })
        }
        "blocked_windows" => {
            row.only(&["id", "date", "start_time", "end_time"])?;
            Ok(Command::InsertBlockedWindow {
                id: row.optional("id", parse_ulid)?,
                window: BlockedWindow {
                    date: row.required("date", parse_date)?,
                    start_time: row.required("start_time", parse_time)?,
                    end_time: row.required("end_time", parse_time)?,
                },
            })
        }
        "categories" => {
            row.only(&["id", "title", "description", "picture_file_name"])?;
            Ok(Command::InsertCategory {
                input: CategoryInput {
                    id: row.optional("id", parse_ulid)?,
                    title: row.required("title", parse_text)?,
                    description: row.optional("description", parse_text)?,
                    picture_file_name: row.optional("picture_file_name", parse_text)?,
                },
            })
        }
        "items" => {
            row.only(&[
                "id", "title", "subtitle", "description", "price", "picture_file_name",
                "category_id",
            ])?;
            Ok(Command::InsertItem {
                input: ItemInput {
                    id: row.optional("id", parse_ulid)?,
                    title: row.required("title", parse_text)?,
                    subtitle: row.optional("subtitle", parse_text)?,
                    description: row.optional("description", parse_text)?,
                    price: row.required("price", parse_decimal)?,
                    picture_file_name: row.optional("picture_file_name", parse_text)?,
                    category_id: row.required("category_id", parse_ulid)?,
                },
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

/// One VALUES row keyed by the INSERT's column list.
struct InsertRow<'a> {
    values: HashMap<String, &'a Expr>,
}

impl<'a> InsertRow<'a> {
    fn new(insert: &'a ast::Insert) -> Result<Self, SqlError> {
        if insert.columns.is_empty() {
            return Err(SqlError::Parse("INSERT needs an explicit column list".into()));
        }
        let exprs = extract_insert_values(insert)?;
        if exprs.len() != insert.columns.len() {
            return Err(SqlError::WrongArity(insert.columns.len(), exprs.len()));
        }
        let values = insert
            .columns
            .iter()
            .map(|c| c.value.to_lowercase())
            .zip(exprs.iter())
            .collect();
        Ok(Self { values })
    }

    fn only(&self, allowed: &[&str]) -> Result<(), SqlError> {
        match self.values.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(col) => Err(SqlError::UnknownColumn(col.clone())),
            None => Ok(()),
        }
    }

    fn required<T>(
        &self,
        col: &'static str,
        parse: fn(&Expr) -> Result<T, SqlError>,
    ) -> Result<T, SqlError> {
        match self.values.get(col) {
            Some(&expr) if !is_null(expr) => parse(expr).map_err(|e| e.in_column(col)),
            _ => Err(SqlError::MissingColumn(col)),
        }
    }

    /// Absent column and NULL both read as `None`.
    fn optional<T>(
        &self,
        col: &'static str,
        parse: fn(&Expr) -> Result<T, SqlError>,
    ) -> Result<Option<T>, SqlError> {
        match self.values.get(col) {
            Some(&expr) if !is_null(expr) => parse(expr).map(Some).map_err(|e| e.in_column(col)),
            _ => Ok(None),
        }
    }
}

// ── UPDATE ────────────────────────────────────────────────────

fn parse_update(
    relation: &TableFactor,
    assignments: &[ast::Assignment],
    selection: &Option<Expr>,
) -> Result<Command, SqlError> {
    let table = table_factor_name(relation)?;
    let id = extract_where_id(selection)?;

    let mut set = Vec::with_capacity(assignments.len());
    for a in assignments {
        let col = match &a.target {
            AssignmentTarget::ColumnName(name) => {
                object_name_last(name).ok_or_else(|| SqlError::Parse("empty column name".into()))?
            }
            AssignmentTarget::Tuple(_) => {
                return Err(SqlError::Unsupported("tuple assignment".into()));
            }
        };
        set.push((col, &a.value));
    }

    match table.as_str() {
        "reservations" => {
            let mut patch = ReservationPatch::default();
            for (col, value) in set {
                let value = Some(value).filter(|v| !is_null(v));
                match col.as_str() {
                    "date" => patch.date = Some(parse_date(not_null(value, &col)?)?),
                    "time" => patch.time = Some(parse_time(not_null(value, &col)?)?),
                    "party_size" => patch.party_size = Some(parse_u32(not_null(value, &col)?)?),
                    "game" => patch.game = Some(parse_bool(not_null(value, &col)?)?),
                    "eat_and_play" => patch.eat_and_play = Some(parse_bool(not_null(value, &col)?)?),
                    "name" => patch.name = Some(parse_text(not_null(value, &col)?)?),
                    "surname" => patch.surname = Some(parse_text(not_null(value, &col)?)?),
                    "phone" => patch.phone = Some(parse_text(not_null(value, &col)?)?),
                    "message" => patch.message = Some(value.map(parse_text).transpose()?),
                    _ => return Err(SqlError::UnknownColumn(col.clone())),
                }
            }
            Ok(Command::UpdateReservation { id, patch })
        }
        "items" => {
            let mut patch = ItemPatch::default();
            for (col, value) in set {
                let value = Some(value).filter(|v| !is_null(v));
                match col.as_str() {
                    "title" => patch.title = Some(parse_text(not_null(value, &col)?)?),
                    "subtitle" => patch.subtitle = Some(value.map(parse_text).transpose()?),
                    "description" => patch.description = Some(value.map(parse_text).transpose()?),
                    "price" => patch.price = Some(parse_decimal(not_null(value, &col)?)?),
                    "picture_file_name" => {
                        patch.picture_file_name = Some(value.map(parse_text).transpose()?)
                    }
                    "category_id" => patch.category_id = Some(parse_ulid(not_null(value, &col)?)?),
                    _ => return Err(SqlError::UnknownColumn(col.clone())),
                }
            }
            Ok(Command::UpdateItem { id, patch })
        }
        "blocked_windows" | "categories" => {
            Err(SqlError::Unsupported(format!("UPDATE {table}")))
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn not_null<'a>(value: Option<&'a Expr>, col: &str) -> Result<&'a Expr, SqlError> {
    value.ok_or_else(|| SqlError::NotNullable(col.to_string()))
}

// ── DELETE ────────────────────────────────────────────────────

fn parse_delete(delete: &ast::Delete) -> Result<Command, SqlError> {
    let table = delete_table_name(delete)?;
    let id = extract_where_id(&delete.selection)?;

    match table.as_str() {
        "reservations" => Ok(Command::DeleteReservation { id }),
        "blocked_windows" => Ok(Command::DeleteBlockedWindow { id }),
        "categories" => Ok(Command::DeleteCategory { id }),
        "items" => Ok(Command::DeleteItem { id }),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

// ── SELECT ────────────────────────────────────────────────────

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    if select.from.is_empty() {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    }
    let table = table_factor_name(&select.from[0].relation)?;
    let page = extract_page(query)?;
    let filter = select.selection.as_ref().map(parse_filter).transpose()?;

    match table.as_str() {
        "reservations" => {
            let filter = match filter {
                None => ReservationFilter::All(page),
                Some(Filter::Eq(col, expr)) if col == "id" => ReservationFilter::ById(parse_ulid(expr)?),
                Some(Filter::In(col, list)) if col == "id" => ReservationFilter::ByIds(parse_ulid_list(list)?),
                Some(other) => return Err(SqlError::UnsupportedFilter(other.describe())),
            };
            Ok(Command::SelectReservations { filter })
        }
        "blocked_windows" => {
            let date = match filter {
                None => None,
                Some(Filter::Eq(col, expr)) if col == "date" => Some(parse_date(expr)?),
                Some(other) => return Err(SqlError::UnsupportedFilter(other.describe())),
            };
            Ok(Command::SelectBlockedWindows { date })
        }
        "categories" => match filter {
            None => Ok(Command::SelectCategories),
            Some(other) => Err(SqlError::UnsupportedFilter(other.describe())),
        },
        "items" => {
            let filter = match filter {
                None => ItemFilter::All(page),
                Some(Filter::Eq(col, expr)) if col == "id" => ItemFilter::ById(parse_ulid(expr)?),
                Some(Filter::In(col, list)) if col == "id" => ItemFilter::ByIds(parse_ulid_list(list)?),
                Some(Filter::Eq(col, expr)) if col == "category_id" => {
                    ItemFilter::ByCategory(parse_ulid(expr)?, page)
                }
                Some(Filter::Like(col, expr)) if col == "title" => {
                    ItemFilter::TitlePrefix(like_prefix(expr)?, page)
                }
                Some(other) => return Err(SqlError::UnsupportedFilter(other.describe())),
            };
            Ok(Command::SelectItems { filter })
        }
        "item_pictures" => match filter {
            Some(Filter::Eq(col, expr)) if col == "item_id" => Ok(Command::SelectItemPicture {
                item_id: parse_ulid(expr)?,
            }),
            _ => Err(SqlError::MissingFilter("item_id")),
        },
        _ => Err(SqlError::UnknownTable(table)),
    }
}

/// The single predicate shapes the SELECTs accept.
enum Filter<'a> {
    Eq(String, &'a Expr),
    In(String, &'a [Expr]),
    Like(String, &'a Expr),
}

impl Filter<'_> {
    fn describe(&self) -> String {
        match self {
            Filter::Eq(col, _) => format!("{col} = ..."),
            Filter::In(col, _) => format!("{col} IN (...)"),
            Filter::Like(col, _) => format!("{col} LIKE ..."),
        }
    }
}

fn parse_filter(expr: &Expr) -> Result<Filter<'_>, SqlError> {
    match expr {
        Expr::Nested(inner) => parse_filter(inner),
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::Eq,
            right,
        } => Ok(Filter::Eq(column_of(left)?, &**right)),
        Expr::InList {
            expr,
            list,
            negated: false,
        } => Ok(Filter::In(column_of(expr)?, list.as_slice())),
        Expr::Like {
            negated: false,
            expr,
            pattern,
            ..
        } => Ok(Filter::Like(column_of(expr)?, &**pattern)),
        other => Err(SqlError::UnsupportedFilter(other.to_string())),
    }
}

/// `'Pizza%'` → `Pizza`. Only trailing-wildcard patterns are accepted.
fn like_prefix(expr: &Expr) -> Result<String, SqlError> {
    let pattern = parse_text(expr)?;
    let prefix = pattern
        .strip_suffix('%')
        .ok_or_else(|| SqlError::UnsupportedFilter(format!("LIKE '{pattern}' (only 'prefix%')")))?;
    if prefix.contains(['%', '_']) {
        return Err(SqlError::UnsupportedFilter(format!(
            "LIKE '{pattern}' (only 'prefix%')"
        )));
    }
    Ok(prefix.to_string())
}

fn extract_page(query: &ast::Query) -> Result<PageRequest, SqlError> {
    let mut page = PageRequest::default();
    match &query.limit_clause {
        None => {}
        Some(LimitClause::LimitOffset { limit, offset, .. }) => {
            if let Some(limit) = limit {
                page.limit = parse_usize(limit)?;
            }
            if let Some(offset) = offset {
                page.offset = parse_usize(&offset.value)?;
            }
        }
        Some(LimitClause::OffsetCommaLimit { offset, limit }) => {
            page.limit = parse_usize(limit)?;
            page.offset = parse_usize(offset)?;
        }
    }
    Ok(page)
}

// ── CALL ──────────────────────────────────────────────────────

fn parse_call(function: &ast::Function) -> Result<Command, SqlError> {
    let name = object_name_last(&function.name)
        .ok_or_else(|| SqlError::Parse("empty procedure name".into()))?;
    let no_args = match &function.args {
        FunctionArguments::None => true,
        FunctionArguments::List(list) => list.args.is_empty(),
        FunctionArguments::Subquery(_) => false,
    };
    match name.as_str() {
        "refresh_blocked_windows" if no_args => Ok(Command::RefreshBlockedWindows),
        "refresh_blocked_windows" => Err(SqlError::Parse(
            "refresh_blocked_windows takes no arguments".into(),
        )),
        _ => Err(SqlError::Unsupported(format!("CALL {name}"))),
    }
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn delete_table_name(delete: &ast::Delete) -> Result<String, SqlError> {
    let tables_with_joins = match &delete.from {
        FromTable::WithFromKeyword(t) | FromTable::WithoutKeyword(t) => t,
    };
    if let Some(first) = tables_with_joins.first() {
        table_factor_name(&first.relation)
    } else {
        Err(SqlError::Parse("DELETE without table".into()))
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn extract_insert_values(insert: &ast::Insert) -> Result<&[Expr], SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => match values.rows.as_slice() {
            [] => Err(SqlError::Parse("empty VALUES".into())),
            [row] => Ok(row),
            _ => Err(SqlError::Unsupported("multi-row INSERT".into())),
        },
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn extract_where_id(selection: &Option<Expr>) -> Result<Ulid, SqlError> {
    let sel = selection.as_ref().ok_or(SqlError::MissingFilter("id"))?;
    match parse_filter(sel)? {
        Filter::Eq(col, right) if col == "id" => parse_ulid(right),
        _ => Err(SqlError::MissingFilter("id")),
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn column_of(expr: &Expr) -> Result<String, SqlError> {
    expr_column_name(expr).ok_or_else(|| SqlError::Parse(format!("expected column, got {expr}")))
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

fn is_null(expr: &Expr) -> bool {
    matches!(extract_value(expr), Some(Value::Null))
}

/// String or bare number literal as text. `-n` keeps its sign.
fn literal_text(expr: &Expr) -> Result<String, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::SingleQuotedString(s)
            | Value::DoubleQuotedString(s)
            | Value::EscapedStringLiteral(s)
            | Value::Number(s, _) => Ok(s.clone()),
            Value::Boolean(b) => Ok(b.to_string()),
            _ => Err(SqlError::Parse(format!("expected literal, got {value}"))),
        }
    } else if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        Ok(format!("-{}", literal_text(expr)?))
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr}")))
    }
}

fn parse_text(expr: &Expr) -> Result<String, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s))
        | Some(Value::DoubleQuotedString(s))
        | Some(Value::EscapedStringLiteral(s)) => Ok(s.clone()),
        _ => Err(SqlError::Parse(format!("expected string, got {expr}"))),
    }
}

fn parse_ulid(expr: &Expr) -> Result<Ulid, SqlError> {
    let s = literal_text(expr)?;
    Ulid::from_string(s.trim()).map_err(|e| SqlError::Parse(format!("bad ULID {s:?}: {e}")))
}

fn parse_ulid_list(list: &[Expr]) -> Result<Vec<Ulid>, SqlError> {
    list.iter().map(parse_ulid).collect()
}

fn parse_date(expr: &Expr) -> Result<NaiveDate, SqlError> {
    let s = literal_text(expr)?;
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| SqlError::Parse(format!("bad date {s:?}: {e}")))
}

/// Accepts `HH:MM` and `HH:MM:SS`. Leap seconds are refused.
fn parse_time(expr: &Expr) -> Result<NaiveTime, SqlError> {
    let s = literal_text(expr)?;
    let t = s.trim();
    let time = NaiveTime::parse_from_str(t, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M"))
        .map_err(|e| SqlError::Parse(format!("bad time {s:?}: {e}")))?;
    if is_leap_second(time) {
        return Err(SqlError::Parse(format!("bad time {s:?}: leap seconds are not supported")));
    }
    Ok(time)
}

fn parse_i64(expr: &Expr) -> Result<i64, SqlError> {
    let s = literal_text(expr)?;
    s.trim()
        .parse()
        .map_err(|e| SqlError::Parse(format!("bad integer {s:?}: {e}")))
}

fn parse_u32(expr: &Expr) -> Result<u32, SqlError> {
    let v = parse_i64(expr)?;
    u32::try_from(v).map_err(|_| SqlError::Parse(format!("{v} out of range")))
}

fn parse_usize(expr: &Expr) -> Result<usize, SqlError> {
    let v = parse_i64(expr)?;
    usize::try_from(v).map_err(|_| SqlError::Parse(format!("{v} out of range")))
}

fn parse_decimal(expr: &Expr) -> Result<Decimal, SqlError> {
    let s = literal_text(expr)?;
    Decimal::from_str(s.trim()).map_err(|e| SqlError::Parse(format!("bad decimal {s:?}: {e}")))
}

fn parse_bool(expr: &Expr) -> Result<bool, SqlError> {
    if let Some(Value::Boolean(b)) = extract_value(expr) {
        return Ok(*b);
    }
    let s = literal_text(expr)?;
    match s.to_lowercase().as_str() {
        "true" | "t" | "1" => Ok(true),
        "false" | "f" | "0" => Ok(false),
        _ => Err(SqlError::Parse(format!("bad bool: {s}"))),
    }
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SqlError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("empty query")]
    Empty,
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("missing column: {0}")]
    MissingColumn(&'static str),
    #[error("column {0} cannot be NULL")]
    NotNullable(String),
    #[error("expected {0} values, got {1}")]
    WrongArity(usize, usize),
    #[error("missing filter: {0}")]
    MissingFilter(&'static str),
    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),
}

impl SqlError {
    fn in_column(self, col: &str) -> Self {
        match self {
            SqlError::Parse(msg) => SqlError::Parse(format!("{col}: {msg}")),
            other => other,
        }
    }
}
