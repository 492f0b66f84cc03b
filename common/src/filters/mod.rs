//! Filtered list query composition.
//!
//! Filter descriptors from the query string are split into predicates the
//! backend can run (equality/IN, free-text search, sort, row window) and
//! residual predicates evaluated against fetched rows.

mod compiler;
mod date;
mod error;
mod executor;
mod option;
mod params;
mod types;

pub use compiler::{
    apply_filters, compile_query, CompiledQuery, EqualityClause, FieldKind, FieldSpec,
    ListSchema, PushdownPredicate, ResolvedFilter, RowWindow, SearchClause, SortClause,
};
pub use date::{
    evaluate_date_filter, evaluate_date_filter_with, parse_date_operand, DateOperator, NullDates,
};
pub use error::ListError;
pub use executor::{run_list_query, FetchedRows, RowSource};
pub use option::{evaluate_option_filter, evaluate_text_filter, OptionOperator};
pub use params::{parse_list_request, ListRequest};
pub use types::{
    FieldValue, FilterDescriptor, Filterable, PageWindow, ResultEnvelope, SortDescriptor,
    SortDirection,
};
