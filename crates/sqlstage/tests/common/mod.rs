//! Shared fixtures: an in-memory `QueryExecutor` and mapped test models.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::iter::Peekable;
use std::str::Chars;

use sqlstage::prelude::*;
use sqlstage::QueryError;

/// Executor backed by in-memory tables.
///
/// `CREATE TABLE` registers a table, `INSERT` appends a parsed row, and
/// `SELECT * FROM t;` serves every row of `t`. Every statement and every column read
/// through a cursor is recorded.
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    tables: RefCell<BTreeMap<String, Vec<Row>>>,
    statements: RefCell<Vec<String>>,
    reads: RefCell<Vec<(String, String)>>,
    failing: RefCell<BTreeSet<String>>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `rows` for `SELECT * FROM table;`.
    pub fn with_rows(self, table: &str, rows: Vec<Row>) -> Self {
        self.tables.borrow_mut().insert(table.to_string(), rows);
        self
    }

    /// Make every query against `table` fail.
    pub fn fail_table(&self, table: &str) {
        self.failing.borrow_mut().insert(table.to_string());
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.borrow().clone()
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables.borrow().get(table).cloned().unwrap_or_default()
    }

    /// Columns read from `table` through cursors, deduplicated, in first-read order.
    pub fn columns_read(&self, table: &str) -> Vec<String> {
        let mut seen = Vec::new();
        for (t, column) in self.reads.borrow().iter() {
            if t == table && !seen.contains(column) {
                seen.push(column.clone());
            }
        }
        seen
    }
}

struct RecordingCursor<'a> {
    table: &'a str,
    inner: RowCursor<'a>,
    reads: &'a RefCell<Vec<(String, String)>>,
}

impl Cursor for RecordingCursor<'_> {
    fn next(&mut self) -> Result<bool> {
        self.inner.next()
    }

    fn value_of(&self, column: &str) -> Result<Value> {
        self.reads
            .borrow_mut()
            .push((self.table.to_string(), column.to_string()));
        self.inner.value_of(column)
    }
}

impl QueryExecutor for MemoryExecutor {
    fn execute_query(
        &self,
        statement: &str,
        handler: &mut dyn FnMut(&mut dyn Cursor) -> Result<()>,
    ) -> Result<()> {
        self.statements.borrow_mut().push(statement.to_string());
        let table = statement
            .strip_prefix("SELECT * FROM ")
            .and_then(|rest| rest.strip_suffix(';'))
            .ok_or_else(|| QueryError::new("unsupported query").with_sql(statement))?;
        if self.failing.borrow().contains(table) {
            return Err(QueryError::new(format!("no such table: {table}"))
                .with_sql(statement)
                .into());
        }
        let rows = self.rows(table);
        let mut cursor = RecordingCursor {
            table,
            inner: RowCursor::new(&rows),
            reads: &self.reads,
        };
        handler(&mut cursor)
    }

    fn execute_update(&self, statement: &str) -> Result<u64> {
        self.statements.borrow_mut().push(statement.to_string());
        if let Some((table, _)) = parse_create(statement) {
            self.tables.borrow_mut().entry(table).or_default();
            return Ok(0);
        }
        if let Some((table, row)) = parse_insert(statement) {
            self.tables.borrow_mut().entry(table).or_default().push(row);
            return Ok(1);
        }
        Ok(0)
    }
}

/// Table name and declared column names of a `CREATE TABLE` statement.
pub fn parse_create(sql: &str) -> Option<(String, Vec<String>)> {
    let rest = sql.strip_prefix("CREATE TABLE ")?;
    let rest = rest.strip_prefix("IF NOT EXISTS ").unwrap_or(rest);
    let (table, body) = rest.split_once(" (")?;
    let body = body.strip_suffix(");")?;
    let columns = body
        .split(", ")
        .filter(|part| !part.starts_with("PRIMARY KEY") && !part.starts_with("FOREIGN KEY"))
        .filter_map(|part| part.split_whitespace().next())
        .filter(|name| !name.ends_with(')'))
        .map(str::to_string)
        .collect();
    Some((table.to_string(), columns))
}

fn parse_insert(sql: &str) -> Option<(String, Row)> {
    let rest = sql.strip_prefix("INSERT INTO ")?;
    let (table, rest) = rest.split_once(" (")?;
    let (columns, rest) = rest.split_once(") VALUES (")?;
    let values = parse_literals(rest.strip_suffix(");")?)?;
    let columns: Vec<&str> = columns.split(", ").collect();
    if columns.len() != values.len() {
        return None;
    }
    Some((table.to_string(), Row::from_pairs(columns.into_iter().zip(values))))
}

fn skip_spaces(chars: &mut Peekable<Chars<'_>>) {
    while chars.peek() == Some(&' ') {
        chars.next();
    }
}

fn parse_literals(sql: &str) -> Option<Vec<Value>> {
    let mut values = Vec::new();
    let mut chars = sql.chars().peekable();
    loop {
        skip_spaces(&mut chars);
        if chars.peek() == Some(&'\'') {
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next()? {
                    '\'' if chars.peek() == Some(&'\'') => {
                        chars.next();
                        text.push('\'');
                    }
                    '\'' => break,
                    c => text.push(c),
                }
            }
            values.push(Value::Text(text));
        } else {
            let mut token = String::new();
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                token.push(c);
                chars.next();
            }
            values.push(parse_literal(token.trim())?);
        }
        skip_spaces(&mut chars);
        match chars.next() {
            Some(',') => continue,
            None => break,
            Some(_) => return None,
        }
    }
    Some(values)
}

fn parse_literal(token: &str) -> Option<Value> {
    match token {
        "NULL" => Some(Value::Null),
        "TRUE" => Some(Value::Bool(true)),
        "FALSE" => Some(Value::Bool(false)),
        _ => token
            .parse::<i64>()
            .map(Value::BigInt)
            .ok()
            .or_else(|| token.parse::<f64>().ok().map(Value::Double)),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Mapped)]
pub struct Address {
    pub city: String,
    pub zip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Mapped)]
#[stage(table = "users")]
pub struct User {
    #[stage(primary_key)]
    pub id: i64,
    pub name: String,
    pub active: bool,
    pub address: Address,
    pub tags: Vec<String>,
    #[stage(skip)]
    pub session_token: Option<String>,
}

pub fn sample_user() -> User {
    User {
        id: 1,
        name: "Ada".to_string(),
        active: true,
        address: Address {
            city: "London".to_string(),
            zip: "N1".to_string(),
        },
        tags: vec!["a".to_string(), "b".to_string(), "c".to_string()],
        session_token: Some("secret".to_string()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Mapped)]
pub struct Contact {
    pub label: String,
    pub address: Address,
}

#[derive(Debug, Clone, Default, PartialEq, Mapped)]
#[stage(table = "people")]
pub struct Person {
    #[stage(primary_key)]
    pub id: i64,
    pub contacts: Vec<Contact>,
}

/// A scalar newtype the default registry does not know about.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Color(pub u8);

impl Persist for Color {
    fn type_ref() -> TypeRef {
        TypeRef::scalar::<Self>(SqlType::SmallInt)
    }

    fn to_datum(&self) -> Datum {
        self.0.to_datum()
    }

    fn from_datum(datum: Datum) -> Result<Self> {
        u8::from_datum(datum).map(Color)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Mapped)]
#[stage(table = "palettes")]
pub struct Palette {
    #[stage(primary_key)]
    pub id: i64,
    pub colors: Vec<Color>,
}

#[derive(Debug, Clone, Default, PartialEq, Mapped)]
#[stage(table = "matrices")]
pub struct Matrix {
    #[stage(primary_key)]
    pub id: i64,
    pub rows: Vec<Vec<i32>>,
}

/// No primary key, so child rows cannot be correlated.
#[derive(Debug, Clone, Default, PartialEq, Mapped)]
#[stage(table = "notes")]
pub struct Note {
    pub body: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Mapped)]
#[stage(table = "shipments")]
pub struct Shipment {
    #[stage(primary_key)]
    pub id: i64,
    pub destination: Option<Address>,
    pub weight: Option<f64>,
}

/// A root column spelled like a flattened embedded column.
#[derive(Debug, Clone, Default, PartialEq, Mapped)]
#[stage(table = "clashes")]
pub struct Clash {
    #[stage(primary_key)]
    pub id: i64,
    pub address: Address,
    pub address_city: String,
}

#[derive(Debug, Clone, Default, PartialEq, Mapped)]
pub struct Inner {
    pub b: Vec<String>,
}

/// `a.b` and `a_b` both map to child table `child_clashes_a_b`.
#[derive(Debug, Clone, Default, PartialEq, Mapped)]
#[stage(table = "child_clashes")]
pub struct ChildClash {
    #[stage(primary_key)]
    pub id: i64,
    pub a: Inner,
    pub a_b: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Mapped)]
pub struct Entry {
    pub address: Address,
    pub address_city: String,
}

#[derive(Debug, Clone, Default, PartialEq, Mapped)]
#[stage(table = "ledgers")]
pub struct Ledger {
    #[stage(primary_key)]
    pub id: i64,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, Default, PartialEq, Mapped)]
pub struct Bag {
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Mapped)]
#[stage(table = "lockers")]
pub struct Locker {
    #[stage(primary_key)]
    pub id: i64,
    pub bag: Option<Bag>,
}

#[derive(Debug, Clone, Default, PartialEq, Mapped)]
pub struct Wrapper {
    pub label: String,
    pub bag: Bag,
}

/// The collection sits two records below the nullable field.
#[derive(Debug, Clone, Default, PartialEq, Mapped)]
#[stage(table = "parcels")]
pub struct Parcel {
    #[stage(primary_key)]
    pub id: i64,
    pub wrapped: Option<Wrapper>,
}

#[derive(Debug, Clone, Default, PartialEq, Mapped)]
#[stage(table = "wishlists")]
pub struct Wishlist {
    #[stage(primary_key)]
    pub id: i64,
    pub items: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Mapped)]
pub struct Region {
    pub name: String,
    pub address: Address,
}

#[derive(Debug, Clone, Default, PartialEq, Mapped)]
pub struct Office {
    pub region: Region,
}

/// Element record nesting a record two levels deep.
#[derive(Debug, Clone, Default, PartialEq, Mapped)]
#[stage(table = "companies")]
pub struct Company {
    #[stage(primary_key)]
    pub id: i64,
    pub offices: Vec<Office>,
}

#[derive(Debug, Clone, Default, PartialEq, Mapped)]
pub struct Team {
    pub members: Vec<String>,
}

/// Element record holding a collection.
#[derive(Debug, Clone, Default, PartialEq, Mapped)]
#[stage(table = "leagues")]
pub struct League {
    #[stage(primary_key)]
    pub id: i64,
    pub teams: Vec<Team>,
}

#[derive(Debug, Clone, Default, PartialEq, Mapped)]
pub struct Profile {
    pub bio: String,
    pub links: Vec<String>,
}

/// Collection declared inside an embedded root field.
#[derive(Debug, Clone, Default, PartialEq, Mapped)]
#[stage(table = "authors")]
pub struct Author {
    #[stage(primary_key)]
    pub id: i64,
    pub name: String,
    pub profile: Profile,
}

pub fn sample_author() -> Author {
    Author {
        id: 5,
        name: "Le Guin".to_string(),
        profile: Profile {
            bio: "writer".to_string(),
            links: vec!["home".to_string(), "blog".to_string()],
        },
    }
}

#[derive(Debug, Clone, Default, PartialEq, Mapped)]
#[stage(table = "libraries")]
pub struct Library {
    #[stage(primary_key)]
    pub id: i64,
    pub shelves: VecDeque<String>,
    pub genres: BTreeSet<String>,
    pub ratings: HashSet<i32>,
}

pub fn sample_library() -> Library {
    Library {
        id: 2,
        shelves: VecDeque::from(["z".to_string(), "a".to_string()]),
        genres: BTreeSet::from(["poetry".to_string(), "drama".to_string()]),
        ratings: HashSet::from([5, 3, 4]),
    }
}

/// A registered collection followed by an unregistered one.
#[derive(Debug, Clone, Default, PartialEq, Mapped)]
#[stage(table = "galleries")]
pub struct Gallery {
    #[stage(primary_key)]
    pub id: i64,
    pub tags: Vec<String>,
    pub colors: Vec<Color>,
}
