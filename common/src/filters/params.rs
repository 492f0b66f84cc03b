use super::compiler::{FieldKind, ListSchema};
use super::types::{FilterDescriptor, PageWindow, SortDescriptor, SortDirection};

/// A list request as read from the query string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListRequest {
    pub filters: Vec<FilterDescriptor>,
    pub search: Option<String>,
    pub sort: Option<SortDescriptor>,
    pub page: PageWindow,
}

/// Reads filters, search, sort and pagination from a raw query string.
///
/// Per schema column: `<col>` carries values (repeatable, `<col>[]` also
/// accepted), `<col>_operator` the comparison mode, and date columns may use
/// `<col>_from`/`<col>_to` for their bounds. Unknown keys are ignored.
pub fn parse_list_request(schema: &ListSchema, raw_query: &str) -> ListRequest {
    let pairs = decode_pairs(raw_query);
    let last = |key: &str| last_value(&pairs, key);

    let mut filters = Vec::new();
    for field in schema.fields {
        let mut values = all_values(&pairs, field.column_id);
        if let FieldKind::Date(_) = field.kind {
            let from = last(&format!("{}_from", field.column_id));
            let to = last(&format!("{}_to", field.column_id));
            if from.is_some() || to.is_some() {
                values = vec![
                    from.unwrap_or_default().to_string(),
                    to.unwrap_or_default().to_string(),
                ];
            }
        }
        if values.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        let operator = last(&format!("{}_operator", field.column_id))
            .filter(|op| !op.trim().is_empty())
            .unwrap_or(field.default_operator());
        filters.push(FilterDescriptor::new(field.column_id, values, operator));
    }

    let search = last("search")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let sort = last("sort_by")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|field| {
            let direction = last("sort_order")
                .and_then(SortDirection::parse)
                .unwrap_or(SortDirection::Ascending);
            SortDescriptor::new(field, direction)
        });

    ListRequest {
        filters,
        search,
        sort,
        page: PageWindow::parse_or_default(last("page"), last("limit")),
    }
}

fn last_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn all_values(pairs: &[(String, String)], key: &str) -> Vec<String> {
    pairs
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
        .collect()
}

fn decode_pairs(raw_query: &str) -> Vec<(String, String)> {
    raw_query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(key);
            let key = key.strip_suffix("[]").map(str::to_string).unwrap_or(key);
            (key, decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}
