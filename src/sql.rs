//! SQL synthesis for the two-direction difference query
//!
//! The statement is the `UNION` of a source-anchored and a
//! destination-anchored `LEFT JOIN`. Both halves project the same aliased
//! columns (`<token>_<column>`), so the union is column compatible and a row
//! present on both sides is emitted once.
//!
//! Identifiers are quoted but never bound. They come from the caller's
//! configuration and must be trusted; only constraint values are passed as
//! parameters.

use crate::config::{ComparisonConfig, TableRef};
use crate::value::Value;

/// Separator between the side token and the column name in projected aliases
pub const ALIAS_SEPARATOR: char = '_';

const TOKEN_PREFIX: char = 't';
const TOKEN_HEX_LEN: usize = 8;

/// Which table a projected value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Source,
    Destination,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::Source => Side::Destination,
            Side::Destination => Side::Source,
        }
    }
}

/// What a projected result column carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRole {
    /// The unaliased primary key of the anchor table
    Key,
    /// The primary key of one side; NULL when that side's row is missing
    Presence(Side),
    /// A compared column of one side
    Value(Side, String),
}

/// One column of the synthesized result set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub alias: String,
    pub role: ColumnRole,
}

/// Disambiguating tokens for the two tables taking part in a comparison
///
/// Tokens are derived from the `(database, table)` pair, so a table name
/// reused across two databases still gets two distinct tokens, and the same
/// pair always maps to the same token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasMap {
    source: String,
    destination: String,
}

impl AliasMap {
    pub fn new(source: &TableRef, destination: &TableRef) -> Self {
        let mut len = TOKEN_HEX_LEN;
        loop {
            let source_token = derive_token(source, len);
            let destination_token = derive_token(destination, len);
            if source_token != destination_token || len >= 64 {
                return Self {
                    source: source_token,
                    destination: destination_token,
                };
            }
            len *= 2;
        }
    }

    pub fn token(&self, side: Side) -> &str {
        match side {
            Side::Source => &self.source,
            Side::Destination => &self.destination,
        }
    }
}

fn derive_token(table: &TableRef, hex_len: usize) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(table.database.as_deref().unwrap_or("").as_bytes());
    hasher.update(&[0]);
    hasher.update(table.name.as_bytes());
    let hex = hasher.finalize().to_hex();
    format!("{}{}", TOKEN_PREFIX, &hex.as_str()[..hex_len])
}

/// Name of the projected column carrying `column` for the side owning `token`
pub fn aliased_column(token: &str, column: &str) -> String {
    format!("{}{}{}", token, ALIAS_SEPARATOR, column)
}

/// Quote a SQL identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn qualified_table(table: &TableRef) -> String {
    match &table.database {
        Some(database) => format!("{}.{}", quote_ident(database), quote_ident(&table.name)),
        None => quote_ident(&table.name),
    }
}

/// A ready-to-run difference query
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedQuery {
    pub sql: String,
    /// Positional values for the `?` placeholders, in order
    pub params: Vec<Value>,
    /// Result columns in projection order
    pub projections: Vec<Projection>,
}

impl SynthesizedQuery {
    pub fn column_names(&self) -> Vec<&str> {
        self.projections.iter().map(|p| p.alias.as_str()).collect()
    }

    /// The same query wrapped in `COUNT(*)`; binds the same parameters
    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM (\n{}\n) AS row_diff", self.sql)
    }
}

/// Builds the difference query for one configuration
pub struct SqlSynthesizer<'a> {
    config: &'a ComparisonConfig,
    aliases: AliasMap,
}

impl<'a> SqlSynthesizer<'a> {
    pub fn new(config: &'a ComparisonConfig) -> Self {
        let aliases = AliasMap::new(config.source(), config.destination());
        Self { config, aliases }
    }

    pub fn aliases(&self) -> &AliasMap {
        &self.aliases
    }

    pub fn synthesize(&self) -> SynthesizedQuery {
        let mut params = Vec::new();
        let source_select = self.select(Side::Source, &mut params);
        let destination_select = self.select(Side::Destination, &mut params);

        SynthesizedQuery {
            sql: format!("{}\nUNION\n{}", source_select, destination_select),
            params,
            projections: self.projections(),
        }
    }

    /// Result columns: the anchor key, then every side's presence key and
    /// compared columns, source side first regardless of anchor
    pub fn projections(&self) -> Vec<Projection> {
        let pk = self.config.primary_key();
        let mut projections = vec![Projection {
            alias: pk.to_string(),
            role: ColumnRole::Key,
        }];

        for side in [Side::Source, Side::Destination] {
            let token = self.aliases.token(side);
            projections.push(Projection {
                alias: aliased_column(token, pk),
                role: ColumnRole::Presence(side),
            });
            for column in self.config.columns() {
                projections.push(Projection {
                    alias: aliased_column(token, column),
                    role: ColumnRole::Value(side, column.clone()),
                });
            }
        }

        projections
    }

    fn table(&self, side: Side) -> &TableRef {
        match side {
            Side::Source => self.config.source(),
            Side::Destination => self.config.destination(),
        }
    }

    fn column_ref(&self, side: Side, column: &str) -> String {
        format!("{}.{}", quote_ident(self.aliases.token(side)), quote_ident(column))
    }

    fn select(&self, anchor: Side, params: &mut Vec<Value>) -> String {
        let joined = anchor.other();
        let pk = self.config.primary_key();

        let select_list = self
            .projections()
            .into_iter()
            .map(|projection| {
                let expr = match &projection.role {
                    ColumnRole::Key => self.column_ref(anchor, pk),
                    ColumnRole::Presence(side) => self.column_ref(*side, pk),
                    ColumnRole::Value(side, column) => self.column_ref(*side, column),
                };
                format!("{} AS {}", expr, quote_ident(&projection.alias))
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "SELECT {}\nFROM {} AS {}\nLEFT JOIN {} AS {} ON {} = {}",
            select_list,
            qualified_table(self.table(anchor)),
            quote_ident(self.aliases.token(anchor)),
            qualified_table(self.table(joined)),
            quote_ident(self.aliases.token(joined)),
            self.column_ref(anchor, pk),
            self.column_ref(joined, pk),
        );

        let mut conditions = Vec::new();
        if let Some(constraints) = self.constraint_clause(params) {
            conditions.push(constraints);
        }
        conditions.push(self.difference_clause(joined));

        sql.push_str("\nWHERE ");
        sql.push_str(&conditions.join(" AND "));
        sql
    }

    /// `(src.col = ? OR dst.col = ?)` per constraint; `None` when there are none
    fn constraint_clause(&self, params: &mut Vec<Value>) -> Option<String> {
        let constraints = self.config.constraints();
        if constraints.is_empty() {
            return None;
        }

        let terms = constraints
            .iter()
            .map(|(column, value)| {
                params.push(value.clone());
                params.push(value.clone());
                format!(
                    "({} = ? OR {} = ?)",
                    self.column_ref(Side::Source, column),
                    self.column_ref(Side::Destination, column)
                )
            })
            .collect::<Vec<_>>();

        Some(terms.join(" AND "))
    }

    /// Any compared column differs, or the joined side's row is absent
    fn difference_clause(&self, missing: Side) -> String {
        let operator = if self.config.null_safe() {
            "IS DISTINCT FROM"
        } else {
            "<>"
        };

        let mut terms = self
            .config
            .columns()
            .iter()
            .map(|column| {
                format!(
                    "{} {} {}",
                    self.column_ref(Side::Source, column),
                    operator,
                    self.column_ref(Side::Destination, column)
                )
            })
            .collect::<Vec<_>>();
        terms.push(format!(
            "{} IS NULL",
            self.column_ref(missing, self.config.primary_key())
        ));

        format!("({})", terms.join(" OR "))
    }
}
