//! Generic pagination, ordering and filtered-query plumbing
//!
//! Repositories compose a [FilteredQuery] (a data query and a count query
//! sharing the same predicate set), then hand it to [paginate] together
//! with the entity's [OrderMap] and the caller's [PaginationFilter].

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

/// Default page size when the caller supplies no usable limit.
pub const DEFAULT_LIMIT: i64 = 100;

/// Hard ceiling on the page size; larger requests fall back to the default.
pub const MAX_LIMIT: i64 = 1000;

/// Order direction for sorting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    /// Convert to SQL order keyword
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "asc",
            OrderDirection::Desc => "desc",
        }
    }
}

/// A single resolved order clause. The field name is taken from an
/// [OrderMap] allow-list and double-quoted, so the rendered SQL never
/// carries raw client input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    pub field: String,
    pub direction: OrderDirection,
}

impl OrderClause {
    pub fn to_sql(&self) -> String {
        format!("\"{}\" {}", self.field, self.direction.as_sql())
    }
}

/// Allow-list of externally orderable field names.
///
/// Fields absent from the map, or present with `false`, are silently
/// dropped by [translate_order_by].
#[derive(Debug, Clone, Default)]
pub struct OrderMap {
    fields: std::collections::HashMap<String, bool>,
}

impl OrderMap {
    /// Base map shared by all entities: the timestamp columns.
    pub fn base() -> Self {
        Self::default()
            .allow("created_at")
            .allow("updated_at")
            .allow("deleted_at")
    }

    pub fn allow(mut self, field: &str) -> Self {
        self.fields.insert(field.to_string(), true);
        self
    }

    /// Keep the field in the map but disable it.
    pub fn deny(mut self, field: &str) -> Self {
        self.fields.insert(field.to_string(), false);
        self
    }

    pub fn is_orderable(&self, field: &str) -> bool {
        self.fields.get(field).copied().unwrap_or(false)
    }
}

/// Translate a comma-separated, prefix-signed order string into clauses.
///
/// Each trimmed token may carry a leading `+` (ascending, the default) or
/// `-` (descending). Tokens naming fields that are not orderable per the
/// map are dropped without error; surviving clauses keep input order and
/// duplicates are not suppressed. Pure function.
pub fn translate_order_by(order_by: &str, order_map: &OrderMap) -> Vec<OrderClause> {
    let mut out = Vec::new();

    for token in order_by.split(',') {
        let mut field = token.trim();
        let mut direction = OrderDirection::Asc;

        if field.is_empty() {
            continue;
        }

        if let Some(rest) = field.strip_prefix('+') {
            field = rest;
        }

        if let Some(rest) = field.strip_prefix('-') {
            direction = OrderDirection::Desc;
            field = rest;
        }

        if order_map.is_orderable(field) {
            out.push(OrderClause {
                field: field.to_string(),
                direction,
            });
        }
    }

    out
}

/// Pagination and visibility constraints parsed from a list request.
/// Absent fields impose no constraint.
#[derive(Debug, Clone, Default)]
pub struct PaginationFilter {
    pub min_created: Option<DateTime<Utc>>,
    pub max_created: Option<DateTime<Utc>>,
    pub min_updated: Option<DateTime<Utc>>,
    pub max_updated: Option<DateTime<Utc>>,
    pub with_deleted: Option<bool>,
    pub show_count: Option<bool>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub order_by: Option<String>,
}

/// The pagination values actually applied, echoed back to the caller.
/// `order_by` is the raw request string; it stays empty when the default
/// order was used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationResult {
    pub offset: i64,
    pub limit: i64,
    pub order_by: String,
    pub count: i64,
}

/// A data query and a count query built side by side, so the recorded
/// count always reflects the same predicate set as the returned page.
pub struct FilteredQuery<'args> {
    data: QueryBuilder<'args, Postgres>,
    count: QueryBuilder<'args, Postgres>,
    has_where: bool,
}

impl<'args> FilteredQuery<'args> {
    /// Start a query over `table`. The table name must be a trusted
    /// constant, never client input: it is interpolated unescaped.
    pub fn new(table: &str, columns: &str) -> Self {
        Self {
            data: QueryBuilder::new(format!("SELECT {columns} FROM {table}")),
            count: QueryBuilder::new(format!("SELECT COUNT(*) FROM {table}")),
            has_where: false,
        }
    }

    /// Add one predicate. The closure is invoked once per underlying
    /// builder and must push the same SQL fragment (values are bound per
    /// invocation, so capture by reference and clone inside).
    pub fn predicate<F>(&mut self, mut push: F) -> &mut Self
    where
        F: FnMut(&mut QueryBuilder<'args, Postgres>),
    {
        let joiner = if self.has_where { " AND " } else { " WHERE " };
        self.has_where = true;

        self.data.push(joiner);
        push(&mut self.data);
        self.count.push(joiner);
        push(&mut self.count);
        self
    }

    /// The data query, for appending order/limit/offset and executing.
    pub fn data(&mut self) -> &mut QueryBuilder<'args, Postgres> {
        &mut self.data
    }

    /// The count query.
    pub fn count(&mut self) -> &mut QueryBuilder<'args, Postgres> {
        &mut self.count
    }

    fn into_parts(self) -> (QueryBuilder<'args, Postgres>, QueryBuilder<'args, Postgres>) {
        (self.data, self.count)
    }
}

/// Push the soft-delete visibility and timestamp-range predicates from
/// `filter` onto `query`.
pub fn apply_scope(query: &mut FilteredQuery<'_>, table: &str, filter: &PaginationFilter) {
    if !filter.with_deleted.unwrap_or(false) {
        let column = format!("{table}.deleted_at IS NULL");
        query.predicate(move |qb| {
            qb.push(column.clone());
        });
    }

    if let Some(min_created) = filter.min_created {
        let column = format!("{table}.created_at >= ");
        query.predicate(move |qb| {
            qb.push(column.clone()).push_bind(min_created);
        });
    }

    if let Some(max_created) = filter.max_created {
        let column = format!("{table}.created_at <= ");
        query.predicate(move |qb| {
            qb.push(column.clone()).push_bind(max_created);
        });
    }

    if let Some(min_updated) = filter.min_updated {
        let column = format!("{table}.updated_at >= ");
        query.predicate(move |qb| {
            qb.push(column.clone()).push_bind(min_updated);
        });
    }

    if let Some(max_updated) = filter.max_updated {
        let column = format!("{table}.updated_at <= ");
        query.predicate(move |qb| {
            qb.push(column.clone()).push_bind(max_updated);
        });
    }
}

/// Append order-by, limit and offset to the data query and record the
/// effective values into `result`.
pub fn apply_page(
    query: &mut QueryBuilder<'_, Postgres>,
    table: &str,
    order_map: &OrderMap,
    filter: &PaginationFilter,
    result: &mut PaginationResult,
) {
    match filter.order_by.as_deref() {
        Some(order_by) => {
            result.order_by = order_by.to_string();
            let clauses = translate_order_by(order_by, order_map);
            for (i, clause) in clauses.iter().enumerate() {
                query.push(if i == 0 { " ORDER BY " } else { ", " });
                query.push(clause.to_sql());
            }
        }
        None => {
            query.push(format!(" ORDER BY {table}.created_at desc"));
        }
    }

    let limit = match filter.limit {
        Some(limit) if limit > 0 && limit <= MAX_LIMIT => limit,
        _ => DEFAULT_LIMIT,
    };
    result.limit = limit;
    query.push(" LIMIT ").push_bind(limit);

    match filter.offset {
        Some(offset) if offset > 0 => {
            result.offset = offset;
            query.push(" OFFSET ").push_bind(offset);
        }
        _ => result.offset = 0,
    }
}

/// Apply `filter` onto a composed [FilteredQuery]: visibility and time
/// bounds first, then the total count of the filtered set (before any
/// offset/limit), then page clauses on the data query. Returns the data
/// query ready to execute.
pub async fn paginate<'args>(
    mut query: FilteredQuery<'args>,
    pool: &PgPool,
    table: &str,
    order_map: &OrderMap,
    filter: &PaginationFilter,
    result: &mut PaginationResult,
) -> Result<QueryBuilder<'args, Postgres>, sqlx::Error> {
    apply_scope(&mut query, table, filter);

    let (mut data, mut count) = query.into_parts();
    result.count = count
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    apply_page(&mut data, table, order_map, filter, result);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn user_order_map() -> OrderMap {
        OrderMap::base().allow("name").allow("email")
    }

    #[test]
    fn test_translate_drops_unknown_fields() {
        let clauses = translate_order_by("bogus,name,password", &user_order_map());
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].field, "name");
    }

    #[test]
    fn test_translate_drops_disabled_fields() {
        let map = user_order_map().deny("email");
        let clauses = translate_order_by("email,name", &map);
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].field, "name");
    }

    #[test]
    fn test_translate_plus_prefix_is_default() {
        let map = user_order_map();
        assert_eq!(translate_order_by("+name", &map), translate_order_by("name", &map));
        assert_eq!(translate_order_by("name", &map)[0].direction, OrderDirection::Asc);
    }

    #[test]
    fn test_translate_minus_prefix_descends() {
        let clauses = translate_order_by("-name", &user_order_map());
        assert_eq!(clauses[0].direction, OrderDirection::Desc);
        assert_eq!(clauses[0].to_sql(), "\"name\" desc");
    }

    #[test]
    fn test_translate_keeps_input_order_and_duplicates() {
        let clauses = translate_order_by("-created_at,name,-created_at", &user_order_map());
        let rendered: Vec<String> = clauses.iter().map(|c| c.to_sql()).collect();
        assert_eq!(
            rendered,
            vec!["\"created_at\" desc", "\"name\" asc", "\"created_at\" desc"]
        );
    }

    #[test]
    fn test_translate_skips_empty_tokens() {
        let clauses = translate_order_by(" , name , ", &user_order_map());
        assert_eq!(clauses.len(), 1);
    }

    #[test]
    fn test_translate_empty_map_yields_nothing() {
        assert!(translate_order_by("name,-email", &OrderMap::default()).is_empty());
    }

    #[test]
    fn test_apply_page_limit_defaults_and_cap() {
        let cases = [
            (None, DEFAULT_LIMIT),
            (Some(0), DEFAULT_LIMIT),
            (Some(-5), DEFAULT_LIMIT),
            (Some(20), 20),
            (Some(1000), 1000),
            (Some(1001), DEFAULT_LIMIT),
        ];

        for (limit, expected) in cases {
            let filter = PaginationFilter {
                limit,
                ..Default::default()
            };
            let mut result = PaginationResult::default();
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM users");
            apply_page(&mut qb, "users", &user_order_map(), &filter, &mut result);
            assert_eq!(result.limit, expected, "limit {limit:?}");
        }
    }

    #[test]
    fn test_apply_page_default_order_is_created_at_desc() {
        let filter = PaginationFilter::default();
        let mut result = PaginationResult::default();
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM users");
        apply_page(&mut qb, "users", &user_order_map(), &filter, &mut result);

        assert!(qb.sql().contains(" ORDER BY users.created_at desc"));
        assert_eq!(result.order_by, "");
    }

    #[test]
    fn test_apply_page_records_raw_order_string() {
        let filter = PaginationFilter {
            order_by: Some("-name,bogus".to_string()),
            ..Default::default()
        };
        let mut result = PaginationResult::default();
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM users");
        apply_page(&mut qb, "users", &user_order_map(), &filter, &mut result);

        // The raw request string is echoed, not the resolved clauses
        assert_eq!(result.order_by, "-name,bogus");
        assert!(qb.sql().contains(" ORDER BY \"name\" desc"));
        assert!(!qb.sql().contains("bogus"));
    }

    #[test]
    fn test_apply_page_all_tokens_dropped_means_no_order_clause() {
        let filter = PaginationFilter {
            order_by: Some("bogus".to_string()),
            ..Default::default()
        };
        let mut result = PaginationResult::default();
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM users");
        apply_page(&mut qb, "users", &user_order_map(), &filter, &mut result);

        assert!(!qb.sql().contains("ORDER BY"));
    }

    #[test]
    fn test_apply_page_offset_only_when_positive() {
        for (offset, expected, applied) in [(None, 0, false), (Some(0), 0, false), (Some(40), 40, true)] {
            let filter = PaginationFilter {
                offset,
                ..Default::default()
            };
            let mut result = PaginationResult::default();
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM users");
            apply_page(&mut qb, "users", &user_order_map(), &filter, &mut result);
            assert_eq!(result.offset, expected);
            assert_eq!(qb.sql().contains(" OFFSET "), applied, "offset {offset:?}");
        }
    }

    #[test]
    fn test_apply_scope_soft_delete_visibility() {
        let mut query = FilteredQuery::new("users", "*");
        apply_scope(&mut query, "users", &PaginationFilter::default());
        assert!(query.data().sql().contains("users.deleted_at IS NULL"));
        assert!(query.count().sql().contains("users.deleted_at IS NULL"));

        let mut query = FilteredQuery::new("users", "*");
        let filter = PaginationFilter {
            with_deleted: Some(true),
            ..Default::default()
        };
        apply_scope(&mut query, "users", &filter);
        assert!(!query.data().sql().contains("deleted_at IS NULL"));
    }

    #[test]
    fn test_apply_scope_time_bounds_are_inclusive_ranges() {
        let mut query = FilteredQuery::new("users", "*");
        let filter = PaginationFilter {
            min_created: Some(Utc::now()),
            max_updated: Some(Utc::now()),
            ..Default::default()
        };
        apply_scope(&mut query, "users", &filter);

        let sql = query.data().sql().to_string();
        assert!(sql.contains("users.created_at >= "));
        assert!(sql.contains("users.updated_at <= "));
        assert!(!sql.contains("created_at <= "));
        assert!(!sql.contains("updated_at >= "));
    }

    #[test]
    fn test_filtered_query_predicates_reach_both_builders() {
        let mut query = FilteredQuery::new("users", "*");
        query.predicate(|qb| {
            qb.push("users.email = ").push_bind("a@b.c");
        });
        query.predicate(|qb| {
            qb.push("users.status = ").push_bind(1i32);
        });

        let data_sql = query.data().sql().to_string();
        let count_sql = query.count().sql().to_string();
        assert!(data_sql.starts_with("SELECT * FROM users WHERE users.email = "));
        assert!(data_sql.contains(" AND users.status = "));
        assert!(count_sql.starts_with("SELECT COUNT(*) FROM users WHERE users.email = "));
        assert!(count_sql.contains(" AND users.status = "));
    }

    #[test]
    fn test_count_query_never_carries_page_clauses() {
        let mut query = FilteredQuery::new("users", "*");
        let filter = PaginationFilter {
            limit: Some(20),
            offset: Some(40),
            ..Default::default()
        };
        apply_scope(&mut query, "users", &filter);

        let mut result = PaginationResult::default();
        apply_page(query.data(), "users", &user_order_map(), &filter, &mut result);

        let count_sql = query.count().sql().to_string();
        assert!(!count_sql.contains("LIMIT"));
        assert!(!count_sql.contains("OFFSET"));
        assert!(!count_sql.contains("ORDER BY"));
        assert_eq!(result.limit, 20);
        assert_eq!(result.offset, 40);
    }
}
