//! Shared building blocks of the Lingua school administration service.

pub mod filters;

pub use filters::{
    compile_query, evaluate_date_filter, evaluate_option_filter, parse_list_request,
    run_list_query, Filterable, ListError, ListSchema, ResultEnvelope, RowSource,
};
