use anyhow::Result;
use lingua_common::filters::{FetchedRows, PushdownPredicate, SearchClause};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqlitePool};

/// Lowercased copy of the searchable fields, stored in each table's
/// `search_text` column. Searching it with a lowercased pattern keeps `search`
/// case-insensitive beyond ASCII, which SQLite `LIKE` alone is not.
pub(crate) fn search_text<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    fields
        .into_iter()
        .map(|field| field.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Static SQL fragments of one list endpoint.
pub(crate) struct ListSql {
    /// `SELECT ... FROM ...` including any joins and derived columns.
    pub select: &'static str,
    /// `SELECT COUNT(*) FROM ...` over the same joins as `select`.
    pub count: &'static str,
    /// Tenant column every query is scoped by.
    pub scope_column: &'static str,
    /// Unique column appended to ORDER BY so pages are stable.
    pub id_column: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BuiltListQuery {
    pub data_sql: String,
    /// Only present when the backend applies the row window.
    pub count_sql: Option<String>,
    pub binds: Vec<String>,
}

/// Translates the pushdown predicate into SQLite statements and bind values.
///
/// Bind order is scope, equality values, search patterns; the data statement
/// additionally takes `LIMIT ? OFFSET ?` when a row window is present.
pub(crate) fn build_list_query(
    list: &ListSql,
    scope: &str,
    predicate: &PushdownPredicate,
) -> BuiltListQuery {
    let mut conditions = vec![format!("{} = ?", list.scope_column)];
    let mut binds = vec![scope.to_string()];

    for equality in &predicate.equalities {
        if equality.values.len() == 1 {
            conditions.push(format!("{} = ?", equality.db_column));
        } else {
            let placeholders = vec!["?"; equality.values.len()].join(", ");
            conditions.push(format!("{} IN ({})", equality.db_column, placeholders));
        }
        binds.extend(equality.values.iter().cloned());
    }

    if let Some(search) = &predicate.search {
        let pattern = search.like_pattern();
        let clauses: Vec<String> = search
            .columns
            .iter()
            .map(|column| {
                binds.push(pattern.clone());
                format!("{} LIKE ? ESCAPE '{}'", column, SearchClause::ESCAPE)
            })
            .collect();
        conditions.push(format!("({})", clauses.join(" OR ")));
    }

    let where_clause = conditions.join(" AND ");
    let mut data_sql = format!(
        "{} WHERE {} ORDER BY {} {}, {} ASC",
        list.select,
        where_clause,
        predicate.sort.db_column,
        predicate.sort.direction.as_sql(),
        list.id_column
    );
    let count_sql = predicate.window.map(|_| {
        data_sql.push_str(" LIMIT ? OFFSET ?");
        format!("{} WHERE {}", list.count, where_clause)
    });

    BuiltListQuery {
        data_sql,
        count_sql,
        binds,
    }
}

/// Runs a list query; the count statement only runs for windowed fetches.
///
/// Page and count share one transaction so `total` describes the same
/// snapshot the rows came from.
pub(crate) async fn fetch_list<R>(
    pool: &SqlitePool,
    list: &ListSql,
    scope: &str,
    predicate: &PushdownPredicate,
) -> Result<FetchedRows<R>>
where
    R: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let built = build_list_query(list, scope, predicate);
    let mut tx = pool.begin().await?;

    let mut query = sqlx::query_as::<_, R>(&built.data_sql);
    for value in &built.binds {
        query = query.bind(value.as_str());
    }
    if let Some(window) = predicate.window {
        query = query
            .bind(i64::from(window.limit))
            .bind(i64::try_from(window.offset).unwrap_or(i64::MAX));
    }
    let rows = query.fetch_all(&mut *tx).await?;

    let exact_count = match &built.count_sql {
        Some(count_sql) => {
            let mut count_query = sqlx::query_scalar::<_, i64>(count_sql);
            for value in &built.binds {
                count_query = count_query.bind(value.as_str());
            }
            Some(count_query.fetch_one(&mut *tx).await?.max(0) as u64)
        }
        None => None,
    };

    tx.commit().await?;
    Ok(FetchedRows { rows, exact_count })
}
