use super::date::{evaluate_date_filter_with, parse_date_operand, DateOperator, NullDates};
use super::error::ListError;
use super::option::{evaluate_option_filter, evaluate_text_filter, OptionOperator};
use super::types::{FilterDescriptor, Filterable, PageWindow, SortDescriptor, SortDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Enumerated values compared by set membership.
    Option,
    /// Free text, matched with `contains` by default.
    Text,
    Date(NullDates),
}

/// Declaration of one filterable column of a list endpoint.
///
/// `db_column` is the backend expression for the column; derived columns
/// (computed after fetch) leave it empty and can never be pushed down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub column_id: &'static str,
    pub db_column: Option<&'static str>,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn option(column_id: &'static str, db_column: &'static str) -> Self {
        Self {
            column_id,
            db_column: Some(db_column),
            kind: FieldKind::Option,
        }
    }

    pub const fn derived_option(column_id: &'static str) -> Self {
        Self {
            column_id,
            db_column: None,
            kind: FieldKind::Option,
        }
    }

    pub const fn text(column_id: &'static str) -> Self {
        Self {
            column_id,
            db_column: None,
            kind: FieldKind::Text,
        }
    }

    pub const fn date(column_id: &'static str, null_dates: NullDates) -> Self {
        Self {
            column_id,
            db_column: None,
            kind: FieldKind::Date(null_dates),
        }
    }

    pub fn default_operator(&self) -> &'static str {
        match self.kind {
            FieldKind::Option => "is_any_of",
            FieldKind::Text => "contains",
            FieldKind::Date(_) => "is_between",
        }
    }

    /// Evaluates one descriptor against a record for this column.
    pub fn matches<R: Filterable>(&self, record: &R, descriptor: &FilterDescriptor) -> bool {
        let value = record.field_value(self.column_id);
        match self.kind {
            FieldKind::Option => {
                evaluate_option_filter(&value, &descriptor.values, &descriptor.operator)
            }
            FieldKind::Text => evaluate_text_filter(&value, &descriptor.values, &descriptor.operator),
            FieldKind::Date(null_dates) => {
                let Some(operator) = DateOperator::parse(&descriptor.operator) else {
                    return true;
                };
                let bound = |idx: usize| {
                    descriptor
                        .values
                        .get(idx)
                        .and_then(|v| parse_date_operand(v))
                };
                evaluate_date_filter_with(value.as_date(), bound(0), bound(1), operator, null_dates)
            }
        }
    }

    fn is_pushdown_eligible(&self, descriptor: &FilterDescriptor) -> bool {
        self.kind == FieldKind::Option
            && self.db_column.is_some()
            && matches!(
                OptionOperator::parse_strict(&descriptor.operator),
                Some(OptionOperator::Is | OptionOperator::IsAnyOf)
            )
    }
}

/// Everything the compiler needs to know about one list endpoint.
#[derive(Debug, Clone, Copy)]
pub struct ListSchema {
    /// Plural entity name, used in error messages and logs.
    pub entity: &'static str,
    pub fields: &'static [FieldSpec],
    /// Backend columns searched by the free-text `search` parameter. They
    /// must hold text already lowercased with Unicode rules.
    pub search_columns: &'static [&'static str],
    /// Sortable fields mapped to backend columns.
    pub sort_columns: &'static [(&'static str, &'static str)],
    pub default_sort: (&'static str, SortDirection),
}

impl ListSchema {
    pub fn field(&self, column_id: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.column_id == column_id)
    }

    fn sort_column(&self, field: &str) -> Option<&'static str> {
        self.sort_columns
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, column)| *column)
    }

    fn resolve_sort(&self, sort: Option<&SortDescriptor>) -> SortClause {
        if let Some(sort) = sort {
            if let Some(db_column) = self.sort_column(&sort.field) {
                return SortClause {
                    db_column,
                    direction: sort.direction,
                };
            }
        }
        let (field, direction) = self.default_sort;
        SortClause {
            db_column: self.sort_column(field).unwrap_or(field),
            direction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualityClause {
    pub db_column: &'static str,
    pub values: Vec<String>,
}

/// OR-across-columns case-insensitive substring match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchClause {
    pub columns: &'static [&'static str],
    pub term: String,
}

impl SearchClause {
    /// Escape character used by [`SearchClause::like_pattern`].
    pub const ESCAPE: char = '\\';

    /// `%term%` lowercased, with `%`, `_` and the escape character escaped.
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.term.len() + 2);
        pattern.push('%');
        for c in self.term.to_lowercase().chars() {
            if c == '%' || c == '_' || c == Self::ESCAPE {
                pattern.push(Self::ESCAPE);
            }
            pattern.push(c);
        }
        pattern.push('%');
        pattern
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortClause {
    pub db_column: &'static str,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowWindow {
    pub offset: u64,
    pub limit: u32,
}

/// The part of a list query executed by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushdownPredicate {
    pub equalities: Vec<EqualityClause>,
    pub search: Option<SearchClause>,
    pub sort: SortClause,
    /// `None` means the backend must return the full candidate set.
    pub window: Option<RowWindow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFilter {
    pub field: FieldSpec,
    pub descriptor: FilterDescriptor,
    pub pushed_down: bool,
}

impl ResolvedFilter {
    pub fn matches<R: Filterable>(&self, record: &R) -> bool {
        self.field.matches(record, &self.descriptor)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub entity: &'static str,
    pub pushdown: PushdownPredicate,
    pub filters: Vec<ResolvedFilter>,
    pub page: PageWindow,
}

impl CompiledQuery {
    /// True when residual filters force pagination to happen in memory.
    pub fn needs_in_memory(&self) -> bool {
        self.filters.iter().any(|f| !f.pushed_down)
    }

    pub fn residual(&self) -> impl Iterator<Item = &ResolvedFilter> {
        self.filters.iter().filter(|f| !f.pushed_down)
    }
}

/// Partitions filters into backend predicates and residual in-memory filters.
///
/// Filters without operand values are dropped since they admit every
/// record. If any residual filter remains, the backend gets no row window:
/// every filter is then re-applied in memory and the page is cut from the
/// filtered rows, so `total` always matches the filtered count.
pub fn compile_query(
    schema: &ListSchema,
    filters: &[FilterDescriptor],
    search: Option<&str>,
    sort: Option<&SortDescriptor>,
    page: PageWindow,
) -> Result<CompiledQuery, ListError> {
    let mut resolved = Vec::with_capacity(filters.len());
    let mut equalities = Vec::new();

    for descriptor in filters {
        let field = schema
            .field(&descriptor.column_id)
            .ok_or_else(|| ListError::UnknownField(descriptor.column_id.clone()))?;
        if descriptor.values.iter().all(|v| v.is_empty()) {
            continue;
        }
        let mut descriptor = descriptor.clone();
        if !matches!(field.kind, FieldKind::Date(_)) {
            // date operands are positional, the rest are sets
            descriptor.values.retain(|v| !v.is_empty());
        }

        let pushed_down = field.is_pushdown_eligible(&descriptor);
        if let (true, Some(db_column)) = (pushed_down, field.db_column) {
            equalities.push(EqualityClause {
                db_column,
                values: descriptor.values.clone(),
            });
        }
        resolved.push(ResolvedFilter {
            field: *field,
            descriptor,
            pushed_down,
        });
    }

    let search = search
        .map(str::trim)
        .filter(|term| !term.is_empty() && !schema.search_columns.is_empty())
        .map(|term| SearchClause {
            columns: schema.search_columns,
            term: term.to_string(),
        });

    let window = if resolved.iter().any(|f| !f.pushed_down) {
        None
    } else {
        Some(RowWindow {
            offset: page.offset(),
            limit: page.limit,
        })
    };

    Ok(CompiledQuery {
        entity: schema.entity,
        pushdown: PushdownPredicate {
            equalities,
            search,
            sort: schema.resolve_sort(sort),
            window,
        },
        filters: resolved,
        page,
    })
}

/// Keeps the records that pass every filter, preserving order.
pub fn apply_filters<R: Filterable>(rows: Vec<R>, filters: &[ResolvedFilter]) -> Vec<R> {
    rows.into_iter()
        .filter(|row| filters.iter().all(|f| f.matches(row)))
        .collect()
}
