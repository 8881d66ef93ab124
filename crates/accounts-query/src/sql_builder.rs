//! SQL builder for account queries.
//!
//! Conditions are kept as a small tree ([`Condition`]) over a closed set of
//! account columns ([`Field`]). [`QueryBuilder`] renders the tree to a
//! parameterized PostgreSQL statement; every user-supplied value travels as
//! a bind parameter, never inside the SQL text.

use accounts_core::Timestamp;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during SQL building.
#[derive(Debug, Error)]
pub enum SqlBuilderError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Query too complex: {0}")]
    QueryTooComplex(String),
}

/// Maximum number of condition nodes in one query.
pub const MAX_CONDITION_NODES: usize = 256;

const ACCOUNTS_TABLE: &str = "accounts";
const COMPANIES_TABLE: &str = "companies";

/// Validate an identifier (schema or table name).
///
/// Only allows alphanumeric characters and underscores.
fn validate_identifier(name: &str) -> Result<(), SqlBuilderError> {
    if name.is_empty() {
        return Err(SqlBuilderError::InvalidIdentifier(
            "Empty identifier".to_string(),
        ));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SqlBuilderError::InvalidIdentifier(name.to_string()));
    }

    Ok(())
}

/// Escape a PostgreSQL identifier (schema name, table name).
pub fn escape_identifier(name: &str) -> Result<String, SqlBuilderError> {
    validate_identifier(name)?;
    Ok(format!("\"{name}\""))
}

// ============================================================================
// Fields
// ============================================================================

/// A column reachable from an account row.
///
/// `CompanyName` lives on the joined `companies` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Type,
    Currency,
    Account,
    CompanyId,
    CompanyName,
    Archived,
    Created,
    Modified,
}

impl Field {
    /// SQL expression reading this field in the account query.
    ///
    /// Enum and uuid columns compare as text so every operator is valid on
    /// them.
    pub fn accessor(self) -> &'static str {
        match self {
            Self::Id => "a.id",
            Self::Type => "a.\"type\"::text",
            Self::Currency => "a.currency",
            Self::Account => "a.account",
            Self::CompanyId => "a.company_id::text",
            Self::CompanyName => "c.name",
            Self::Archived => "a.archived",
            Self::Created => "a.created",
            Self::Modified => "a.modified",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Type => "type",
            Self::Currency => "currency",
            Self::Account => "account",
            Self::CompanyId => "company_id",
            Self::CompanyName => "company_name",
            Self::Archived => "archived",
            Self::Created => "created",
            Self::Modified => "modified",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Search Condition Types
// ============================================================================

/// Comparison operators for search conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equal (=)
    Eq,
    /// Not equal (!=)
    Ne,
    /// Greater than (>)
    Gt,
    /// Less than (<)
    Lt,
    /// Greater than or equal (>=)
    Ge,
    /// Less than or equal (<=)
    Le,
    /// LIKE pattern match
    Like,
    /// Case-insensitive LIKE
    ILike,
    /// IS NULL check
    IsNull,
    /// IS NOT NULL check
    IsNotNull,
}

impl Operator {
    /// Get the SQL operator string.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Like => "LIKE",
            Self::ILike => "ILIKE",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }
}

/// SQL value types for parameterized queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    Uuid(Uuid),
    Boolean(bool),
    Timestamp(Timestamp),
    Null,
}

impl SqlValue {
    /// Get the value as a string for display/debugging.
    pub fn as_display_str(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Uuid(u) => u.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Timestamp(t) => t.to_string(),
            Self::Null => "NULL".to_string(),
        }
    }
}

/// A predicate over account rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Simple comparison: field op value
    Simple {
        field: Field,
        op: Operator,
        value: SqlValue,
    },

    /// Membership: field IN (values)
    In { field: Field, values: Vec<SqlValue> },

    /// Combine conditions with OR
    Or(Vec<Condition>),

    /// Combine conditions with AND
    And(Vec<Condition>),

    /// Negation of a condition
    Not(Box<Condition>),

    /// Always true (used for empty AND lists)
    True,

    /// Always false (used for empty OR lists)
    False,
}

impl Condition {
    /// Create a simple comparison condition.
    pub fn simple(field: Field, op: Operator, value: SqlValue) -> Self {
        Self::Simple { field, op, value }
    }

    pub fn is_null(field: Field) -> Self {
        Self::simple(field, Operator::IsNull, SqlValue::Null)
    }

    pub fn is_not_null(field: Field) -> Self {
        Self::simple(field, Operator::IsNotNull, SqlValue::Null)
    }

    /// Create a membership condition. An empty list matches nothing.
    pub fn in_list(field: Field, values: Vec<SqlValue>) -> Self {
        if values.is_empty() {
            Self::False
        } else {
            Self::In { field, values }
        }
    }

    /// Create an OR condition.
    pub fn or(mut conditions: Vec<Condition>) -> Self {
        match conditions.len() {
            0 => Self::False,
            1 => conditions.pop().unwrap_or(Self::False),
            _ => Self::Or(conditions),
        }
    }

    /// Create an AND condition.
    pub fn and(mut conditions: Vec<Condition>) -> Self {
        match conditions.len() {
            0 => Self::True,
            1 => conditions.pop().unwrap_or(Self::True),
            _ => Self::And(conditions),
        }
    }

    /// Create a NOT condition.
    pub fn negate(condition: Condition) -> Self {
        Self::Not(Box::new(condition))
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        match self {
            Self::Or(children) | Self::And(children) => {
                1 + children.iter().map(Condition::node_count).sum::<usize>()
            }
            Self::Not(inner) => 1 + inner.node_count(),
            _ => 1,
        }
    }
}

// ============================================================================
// Sort and Pagination
// ============================================================================

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Sort specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: Field,
    pub order: SortOrder,
    pub nulls_last: bool,
}

impl SortSpec {
    pub fn new(field: Field, order: SortOrder) -> Self {
        Self {
            field,
            order,
            nulls_last: true,
        }
    }

    pub fn asc(field: Field) -> Self {
        Self::new(field, SortOrder::Asc)
    }

    pub fn desc(field: Field) -> Self {
        Self::new(field, SortOrder::Desc)
    }
}

/// Pagination settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<u64>,
    pub offset: u64,
}

impl Pagination {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }
}

// ============================================================================
// Query Builder
// ============================================================================

/// Fluent builder for account queries.
///
/// The same builder feeds every storage backend: PostgreSQL renders it with
/// [`QueryBuilder::build`], the in-memory backend walks [`QueryBuilder::predicate`]
/// and [`QueryBuilder::sort_specs`] directly.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    schema: String,
    conditions: Vec<Condition>,
    sort: Vec<SortSpec>,
    pagination: Pagination,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self {
            schema: "public".to_string(),
            conditions: Vec::new(),
            sort: Vec::new(),
            pagination: Pagination::default(),
        }
    }

    /// Set the schema holding the `accounts` and `companies` tables.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Add a condition. Conditions are AND-ed together.
    pub fn where_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Append an ordering clause; earlier clauses take precedence.
    pub fn sort_by(mut self, spec: SortSpec) -> Self {
        self.sort.push(spec);
        self
    }

    pub fn paginate(mut self, limit: u64, offset: u64) -> Self {
        self.pagination = Pagination::new(limit, offset);
        self
    }

    /// A copy of this builder with the given window applied.
    pub fn with_pagination(&self, pagination: Pagination) -> Self {
        let mut builder = self.clone();
        builder.pagination = pagination;
        builder
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// All conditions combined into one predicate.
    pub fn predicate(&self) -> Condition {
        Condition::and(self.conditions.clone())
    }

    pub fn sort_specs(&self) -> &[SortSpec] {
        &self.sort
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    fn validate(&self) -> Result<(), SqlBuilderError> {
        let nodes: usize = self.conditions.iter().map(Condition::node_count).sum();
        if nodes > MAX_CONDITION_NODES {
            return Err(SqlBuilderError::QueryTooComplex(format!(
                "Too many condition nodes: {nodes} (max {MAX_CONDITION_NODES})"
            )));
        }
        Ok(())
    }

    fn from_clause(&self) -> Result<String, SqlBuilderError> {
        let schema = escape_identifier(&self.schema)?;
        let accounts = escape_identifier(ACCOUNTS_TABLE)?;
        let companies = escape_identifier(COMPANIES_TABLE)?;
        Ok(format!(
            "{schema}.{accounts} AS a INNER JOIN {schema}.{companies} AS c ON c.id = a.company_id"
        ))
    }

    fn where_clause(&self, params: &mut Vec<SqlValue>) -> Option<String> {
        if self.conditions.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .conditions
            .iter()
            .map(|c| condition_to_sql(c, params))
            .collect();
        Some(parts.join(" AND "))
    }

    /// Requested ordering, then `a.id` so ties page deterministically.
    fn order_clause(&self) -> String {
        let mut parts: Vec<String> = self
            .sort
            .iter()
            .map(|spec| {
                let nulls = if spec.nulls_last { " NULLS LAST" } else { "" };
                format!("{} {}{nulls}", spec.field.accessor(), spec.order.as_sql())
            })
            .collect();
        if !self.sort.iter().any(|spec| spec.field == Field::Id) {
            parts.push(format!("{} ASC", Field::Id.accessor()));
        }
        parts.join(", ")
    }

    /// Build the row query with ordering and pagination.
    pub fn build(&self) -> Result<BuiltQuery, SqlBuilderError> {
        self.validate()?;

        let mut params = Vec::new();
        let mut sql = format!(
            "SELECT a.id, a.\"type\"::text AS account_type, a.currency, a.account, \
             a.company_id, c.name AS company_name, a.additional_info, a.archived, \
             a.created, a.modified FROM {}",
            self.from_clause()?
        );

        if let Some(where_sql) = self.where_clause(&mut params) {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        sql.push_str(" ORDER BY ");
        sql.push_str(&self.order_clause());

        if let Some(limit) = self.pagination.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if self.pagination.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", self.pagination.offset));
        }

        Ok(BuiltQuery { sql, params })
    }

    /// Build the total-count query. Ordering and pagination are ignored.
    pub fn build_count(&self) -> Result<BuiltQuery, SqlBuilderError> {
        self.validate()?;

        let mut params = Vec::new();
        let mut sql = format!("SELECT COUNT(*) AS total FROM {}", self.from_clause()?);

        if let Some(where_sql) = self.where_clause(&mut params) {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        Ok(BuiltQuery { sql, params })
    }
}

fn push_param(params: &mut Vec<SqlValue>, value: &SqlValue) -> String {
    params.push(value.clone());
    format!("${}", params.len())
}

fn condition_to_sql(condition: &Condition, params: &mut Vec<SqlValue>) -> String {
    match condition {
        Condition::Simple { field, op, value } => {
            let accessor = field.accessor();
            match op {
                Operator::IsNull | Operator::IsNotNull => {
                    format!("({accessor} {})", op.as_sql())
                }
                _ => {
                    let placeholder = push_param(params, value);
                    format!("({accessor} {} {placeholder})", op.as_sql())
                }
            }
        }

        Condition::In { field, values } => {
            if values.is_empty() {
                return "FALSE".to_string();
            }
            let placeholders: Vec<String> =
                values.iter().map(|v| push_param(params, v)).collect();
            format!("({} IN ({}))", field.accessor(), placeholders.join(", "))
        }

        Condition::Or(conditions) => {
            if conditions.is_empty() {
                return "FALSE".to_string();
            }
            let parts: Vec<String> = conditions
                .iter()
                .map(|c| condition_to_sql(c, params))
                .collect();
            format!("({})", parts.join(" OR "))
        }

        Condition::And(conditions) => {
            if conditions.is_empty() {
                return "TRUE".to_string();
            }
            let parts: Vec<String> = conditions
                .iter()
                .map(|c| condition_to_sql(c, params))
                .collect();
            format!("({})", parts.join(" AND "))
        }

        Condition::Not(inner) => format!("(NOT {})", condition_to_sql(inner, params)),

        Condition::True => "TRUE".to_string(),

        Condition::False => "FALSE".to_string(),
    }
}

/// A rendered statement and its bind parameters, in `$N` order.
#[derive(Debug, Clone)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl fmt::Display for BuiltQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)?;
        for (i, param) in self.params.iter().enumerate() {
            write!(f, "\n  ${} = {}", i + 1, param.as_display_str())?;
        }
        Ok(())
    }
}
