use crate::domain::value_objects::{enums::interaction_types::InteractionType, posts::PostFilters};

/// A value bound to one `$n` placeholder of a built predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterParam {
    Text(String),
    BigInt(i64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostWhereClause {
    /// Empty when no filter is set, otherwise starts with `WHERE`.
    pub where_sql: String,
    pub params: Vec<FilterParam>,
    /// First placeholder index still free for the caller (e.g. `LIMIT $n`).
    pub next_index: usize,
}

/// Translates `filters` into a parameterized predicate over `posts`. Placeholders are
/// numbered from `start_index` so the fragment can be embedded in a larger statement.
pub fn build_post_where(filters: &PostFilters, start_index: usize) -> PostWhereClause {
    let mut builder = PredicateBuilder::new(start_index);

    if let Some(status) = filters.status {
        let slot = builder.bind(FilterParam::Text(status.to_string()));
        builder.clause(format!("posts.status = {slot}"));
    }

    if let Some(author_id) = filters.author_id {
        let slot = builder.bind(FilterParam::BigInt(author_id));
        builder.clause(format!("posts.author_id = {slot}"));
    }

    if let Some(is_premium) = filters.is_premium {
        let slot = builder.bind(FilterParam::Bool(is_premium));
        builder.clause(format!("posts.is_premium = {slot}"));
    }

    if let Some(label) = filters.label.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        let slot = builder.bind(FilterParam::Text(label.to_string()));
        builder.clause(format!("{slot} = ANY(posts.labels)"));
    }

    if !filters.labels.is_empty() {
        let alternatives = filters
            .labels
            .iter()
            .map(|label| {
                let slot = builder.bind(FilterParam::Text(label.clone()));
                format!("{slot} = ANY(posts.labels)")
            })
            .collect::<Vec<_>>();
        builder.clause(format!("({})", alternatives.join(" OR ")));
    }

    if let Some(q) = filters.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let slot = builder.bind(FilterParam::Text(format!("%{}%", escape_like(q))));
        builder.clause(format!("posts.title ILIKE {slot}"));
    }

    if let Some(user_id) = filters.favorited_by {
        let slot = builder.bind(FilterParam::BigInt(user_id));
        builder.clause(format!(
            "EXISTS (SELECT 1 FROM interactions i WHERE i.post_id = posts.id AND i.user_id = {slot} AND i.type = '{}')",
            InteractionType::Favorite
        ));
    }

    builder.finish()
}

/// Escapes `%`, `_` and the escape character itself so user input matches literally
/// under `LIKE`/`ILIKE` with the default `\` escape.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

struct PredicateBuilder {
    clauses: Vec<String>,
    params: Vec<FilterParam>,
    next_index: usize,
}

impl PredicateBuilder {
    fn new(start_index: usize) -> Self {
        Self {
            clauses: Vec::new(),
            params: Vec::new(),
            next_index: start_index.max(1),
        }
    }

    fn bind(&mut self, param: FilterParam) -> String {
        let slot = format!("${}", self.next_index);
        self.params.push(param);
        self.next_index += 1;
        slot
    }

    fn clause(&mut self, sql: String) {
        self.clauses.push(sql);
    }

    fn finish(self) -> PostWhereClause {
        let where_sql = if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        };

        PostWhereClause {
            where_sql,
            params: self.params,
            next_index: self.next_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::enums::post_statuses::PostStatus;

    #[test]
    fn no_filters_yield_no_predicate() {
        let clause = build_post_where(&PostFilters::default(), 1);
        assert_eq!(clause.where_sql, "");
        assert!(clause.params.is_empty());
        assert_eq!(clause.next_index, 1);
    }

    #[test]
    fn equality_filters_are_anded_in_order() {
        let filters = PostFilters {
            status: Some(PostStatus::Published),
            author_id: Some(9),
            is_premium: Some(true),
            ..Default::default()
        };

        let clause = build_post_where(&filters, 1);

        assert_eq!(
            clause.where_sql,
            "WHERE posts.status = $1 AND posts.author_id = $2 AND posts.is_premium = $3"
        );
        assert_eq!(
            clause.params,
            vec![
                FilterParam::Text("published".to_string()),
                FilterParam::BigInt(9),
                FilterParam::Bool(true),
            ]
        );
        assert_eq!(clause.next_index, 4);
    }

    #[test]
    fn label_and_labels_are_independent_groups() {
        let filters = PostFilters {
            label: Some("rust".to_string()),
            labels: vec!["async".to_string(), "web".to_string()],
            ..Default::default()
        };

        let clause = build_post_where(&filters, 3);

        assert_eq!(
            clause.where_sql,
            "WHERE $3 = ANY(posts.labels) AND ($4 = ANY(posts.labels) OR $5 = ANY(posts.labels))"
        );
        assert_eq!(clause.next_index, 6);
    }

    #[test]
    fn search_term_is_escaped_and_wrapped() {
        let filters = PostFilters {
            q: Some("  50%_off\\  ".to_string()),
            ..Default::default()
        };

        let clause = build_post_where(&filters, 1);

        assert_eq!(clause.where_sql, "WHERE posts.title ILIKE $1");
        assert_eq!(
            clause.params,
            vec![FilterParam::Text("%50\\%\\_off\\\\%".to_string())]
        );
    }

    #[test]
    fn blank_label_and_search_are_ignored() {
        let filters = PostFilters {
            label: Some("  ".to_string()),
            q: Some("".to_string()),
            ..Default::default()
        };

        assert_eq!(build_post_where(&filters, 1).where_sql, "");
    }

    #[test]
    fn favorites_restrict_to_caller() {
        let filters = PostFilters {
            favorited_by: Some(42),
            ..Default::default()
        };

        let clause = build_post_where(&filters, 1);

        assert!(clause.where_sql.contains("i.user_id = $1"));
        assert!(clause.where_sql.contains("i.type = 'favorite'"));
        assert_eq!(clause.params, vec![FilterParam::BigInt(42)]);
    }
}
