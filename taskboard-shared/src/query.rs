/// Helpers for building filtered SQL with `sqlx::QueryBuilder`
///
/// Column names are always string literals in the calling code; every user
/// supplied value goes through `push_bind`.

use sqlx::{Postgres, QueryBuilder};

/// Escapes `\`, `%` and `_` so the input matches literally inside `LIKE`/`ILIKE`
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Turns an optional `search` parameter into a `%...%` pattern
///
/// Blank input means no filter.
pub fn search_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)))
}

/// Accumulates `WHERE` conditions, emitting `WHERE` before the first and
/// `AND` before the rest
///
/// ```
/// use sqlx::{Postgres, QueryBuilder};
/// use taskboard_shared::query::Conditions;
///
/// let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM tags");
/// let mut conditions = Conditions::new();
/// conditions.and(&mut qb).push("name ILIKE ").push_bind("%a%");
/// assert_eq!(qb.sql(), "SELECT * FROM tags WHERE name ILIKE $1");
/// ```
#[derive(Debug, Default)]
pub struct Conditions {
    count: usize,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new condition and returns the builder to append it to
    pub fn and<'q, 'args>(
        &mut self,
        qb: &'q mut QueryBuilder<'args, Postgres>,
    ) -> &'q mut QueryBuilder<'args, Postgres> {
        qb.push(if self.count == 0 { " WHERE " } else { " AND " });
        self.count += 1;
        qb
    }

    /// Number of conditions pushed so far
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
