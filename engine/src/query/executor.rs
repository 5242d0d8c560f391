//! Query execution engine.
//!
//! Runs a parsed query over a stream of rows in four phases: filter, sort, page and
//! project. Filtered rows are buffered in memory so they can be sorted and counted;
//! projection happens lazily as the [`ResultSet`] is iterated.

use super::ast::{Expression, Query, SortOrder};
use super::evaluator::{EvalError, Evaluator, SortKey};
use crate::config::ComparisonConfig;
use crate::models::{Row, Value};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// A query prepared against a known set of column names.
///
/// # Example
///
/// ```
/// use engine::models::{Row, Value};
/// use engine::query::{parse_query, Executor};
///
/// let query = parse_query("SELECT message WHERE level = 'error'").unwrap();
/// let executor = Executor::new(query, ["level", "message"]);
///
/// let rows = vec![
///     Row::new().with_field("level", "info").with_field("message", "started"),
///     Row::new().with_field("level", "error").with_field("message", "failed"),
/// ];
///
/// let result = executor.execute(rows).unwrap();
/// assert_eq!(result.total_count(), 1);
///
/// let rows: Vec<_> = result.collect();
/// assert_eq!(rows[0].get("message"), Some(&Value::from("failed")));
/// ```
#[derive(Debug, Clone)]
pub struct Executor {
    query: Query,
    columns: Vec<String>,
    evaluator: Evaluator,
}

impl Executor {
    /// Prepares a query. `columns` are the field names rows may carry, in the order
    /// `SELECT *` should output them. With no columns, `SELECT *` outputs every field
    /// found in the matching rows, in the order they first appear.
    ///
    /// Columns referenced by the query but absent from a non-empty `columns` list are
    /// logged as warnings; they still evaluate as missing values.
    pub fn new<I, S>(query: Query, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();

        if !columns.is_empty() {
            for name in query.column_references() {
                if !columns.iter().any(|c| c == name) {
                    warn!(column = name, "Query references unknown column");
                }
            }
        }

        Self {
            query,
            columns,
            evaluator: Evaluator::default(),
        }
    }

    /// Sets the comparison settings used by WHERE and ORDER BY.
    #[must_use]
    pub fn with_config(mut self, config: ComparisonConfig) -> Self {
        self.evaluator = Evaluator::new(config);
        self
    }

    /// The prepared query.
    #[must_use]
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Names of the output columns, in output order.
    ///
    /// For `SELECT *` without known columns this is empty; the columns are taken from
    /// the rows at execution, see [`ResultSet::columns`].
    #[must_use]
    pub fn output_columns(&self) -> Vec<String> {
        if self.is_select_all() {
            self.columns.clone()
        } else {
            self.query
                .select
                .iter()
                .map(super::ast::SelectItem::output_name)
                .collect()
        }
    }

    /// Executes the query over `rows`.
    ///
    /// # Errors
    ///
    /// Returns an `EvalError` if the query uses `*` somewhere other than as the only
    /// select item. Parsed queries never fail here.
    pub fn execute<I>(&self, rows: I) -> Result<ResultSet, EvalError>
    where
        I: IntoIterator<Item = Row>,
    {
        let mut sources = self.cell_sources()?;

        let filtered = self.filter(rows)?;
        let total_count = filtered.len();

        let mut columns = self.output_columns();
        if self.is_select_all() && self.columns.is_empty() {
            columns = field_names(&filtered);
            sources = columns.iter().cloned().map(CellSource::Column).collect();
            debug!(columns = columns.len(), "Took SELECT * columns from row fields");
        }

        let sorted = if self.query.order_by.is_empty() {
            filtered
        } else {
            self.sort(filtered)?
        };

        let offset = self.query.offset.unwrap_or(0);
        let limit = self.query.limit.unwrap_or(usize::MAX);
        let page: Vec<Row> = sorted.into_iter().skip(offset).take(limit).collect();

        debug!(
            total_count,
            offset,
            returned = page.len(),
            "Applied paging"
        );

        Ok(ResultSet {
            columns,
            sources,
            rows: page.into_iter(),
            total_count,
        })
    }

    fn is_select_all(&self) -> bool {
        matches!(self.query.select.as_slice(), [item] if item.expression.is_wildcard())
    }

    fn cell_sources(&self) -> Result<Vec<CellSource>, EvalError> {
        if self.is_select_all() {
            return Ok(self.columns.iter().cloned().map(CellSource::Column).collect());
        }

        self.query
            .select
            .iter()
            .map(|item| match &item.expression {
                Expression::Column(name) => Ok(CellSource::Column(name.clone())),
                Expression::Literal(literal) => Ok(CellSource::Constant(literal.to_value())),
                Expression::Wildcard => Err(EvalError::WildcardNotAValue),
            })
            .collect()
    }

    fn filter<I>(&self, rows: I) -> Result<Vec<Row>, EvalError>
    where
        I: IntoIterator<Item = Row>,
    {
        let Some(ref predicate) = self.query.where_clause else {
            let rows: Vec<Row> = rows.into_iter().collect();
            debug!(rows = rows.len(), "No WHERE clause, all rows pass");
            return Ok(rows);
        };

        let mut scanned = 0usize;
        let mut kept = Vec::new();
        for row in rows {
            scanned += 1;
            if self.evaluator.test(predicate, &row)? {
                kept.push(row);
            }
        }

        debug!(scanned, matched = kept.len(), "Applied WHERE clause");
        Ok(kept)
    }

    fn sort(&self, rows: Vec<Row>) -> Result<Vec<Row>, EvalError> {
        let order_by = &self.query.order_by;

        let mut keyed = rows
            .into_iter()
            .map(|row| {
                let keys = order_by
                    .iter()
                    .map(|item| {
                        let value = self.evaluator.evaluate(&item.expression, &row)?;
                        Ok(self.evaluator.sort_key(&value))
                    })
                    .collect::<Result<Vec<SortKey>, EvalError>>()?;
                Ok((keys, row))
            })
            .collect::<Result<Vec<(Vec<SortKey>, Row)>, EvalError>>()?;

        // sort_by is stable, so ties keep their filtered order.
        keyed.sort_by(|(a, _), (b, _)| {
            order_by
                .iter()
                .zip(a.iter().zip(b))
                .map(|(item, (left, right))| {
                    let ordering = left.cmp(right);
                    match item.order {
                        SortOrder::Asc => ordering,
                        SortOrder::Desc => ordering.reverse(),
                    }
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        debug!(rows = keyed.len(), keys = order_by.len(), "Applied ORDER BY");
        Ok(keyed.into_iter().map(|(_, row)| row).collect())
    }
}

// Union of field names in first-seen order.
fn field_names(rows: &[Row]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in rows.iter().flat_map(Row::column_names) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

#[derive(Debug, Clone)]
enum CellSource {
    Column(String),
    Constant(Value),
}

impl CellSource {
    fn read(&self, row: &Row) -> Value {
        match self {
            Self::Column(name) => row.get(name),
            Self::Constant(value) => value.clone(),
        }
    }
}

/// The rows produced by a query, projected on demand.
#[derive(Debug)]
pub struct ResultSet {
    columns: Vec<String>,
    sources: Vec<CellSource>,
    rows: std::vec::IntoIter<Row>,
    total_count: usize,
}

impl ResultSet {
    /// Output column names, in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows that passed the WHERE clause, before LIMIT and OFFSET.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.total_count
    }
}

impl Iterator for ResultSet {
    type Item = OutputRow;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        let cells = self
            .columns
            .iter()
            .zip(&self.sources)
            .map(|(name, source)| (name.clone(), source.read(&row)))
            .collect();
        Some(OutputRow { cells })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for ResultSet {}

/// One projected row: an ordered list of `(column, value)` cells.
///
/// Serializes as a JSON object with keys in output order.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    cells: Vec<(String, Value)>,
}

impl OutputRow {
    /// Returns the first cell with the given name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// All cells in output order.
    #[must_use]
    pub fn cells(&self) -> &[(String, Value)] {
        &self.cells
    }

    /// Cell values in output order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.cells.iter().map(|(_, value)| value)
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the row has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for OutputRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Executes a parsed query over `rows` with default comparison settings.
///
/// # Errors
///
/// See [`Executor::execute`].
pub fn execute_query<I, C, S>(query: Query, columns: C, rows: I) -> Result<ResultSet, EvalError>
where
    I: IntoIterator<Item = Row>,
    C: IntoIterator<Item = S>,
    S: Into<String>,
{
    Executor::new(query, columns).execute(rows)
}
