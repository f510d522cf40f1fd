use tracing::warn;

use super::{qualify, ColumnRef, Comparison, Condition, WhereClause};

/// Query keys consumed elsewhere (paging, projection) and never filtered on.
const RESERVED_PARAMS: &[&str] = &["limit", "offset", "field", "order", "fromTable", "alias"];

/// Separator between the values of one categorical facet.
pub const VALUE_SEPARATOR: char = '|';

/// True when `key` is never turned into an `IN (...)` condition.
pub fn is_reserved(key: &str) -> bool {
    RESERVED_PARAMS.contains(&key) || key.ends_with("floor") || key.ends_with("ceil")
}

/// Builds `column IN (...)` conditions from categorical query parameters.
///
/// `aliases` maps a facet name to the table alias its column lives under in
/// the endpoint's join; facets without an entry stay unqualified.
#[derive(Debug, Clone, Copy)]
pub struct PredicateBuilder<'a> {
    aliases: &'a [(&'a str, &'a str)],
}

impl<'a> PredicateBuilder<'a> {
    pub fn new(aliases: &'a [(&'a str, &'a str)]) -> Self {
        Self { aliases }
    }

    pub fn alias_for(&self, column: &str) -> Option<&'a str> {
        self.aliases
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, alias)| *alias)
    }

    /// Append one condition per non-reserved parameter, in request order.
    pub fn apply(&self, params: &[(String, String)], clause: &mut WhereClause) {
        for (key, raw) in params {
            if is_reserved(key) {
                continue;
            }

            let values: Vec<String> = raw
                .split(VALUE_SEPARATOR)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect();
            if values.is_empty() {
                continue;
            }

            clause.push(Condition::In {
                column: qualify(self.alias_for(key), key),
                values,
            });
        }
    }

    pub fn build(&self, params: &[(String, String)]) -> WhereClause {
        let mut clause = WhereClause::default();
        self.apply(params, &mut clause);
        clause
    }
}

/// A numeric facet filtered as a range over two columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeFacet {
    pub name: &'static str,
    pub floor: ColumnRef,
    pub ceil: ColumnRef,
}

/// Builds `>=` / `<=` conditions from `{facet}_floor` and `{facet}_ceil`.
///
/// The client only sends bounds for facets whose range is enabled, so a
/// missing key means "no bound". Bounds that are not finite numbers are
/// dropped with a warning instead of failing the request.
#[derive(Debug, Clone, Copy)]
pub struct RangeBuilder<'a> {
    facets: &'a [RangeFacet],
}

impl<'a> RangeBuilder<'a> {
    pub fn new(facets: &'a [RangeFacet]) -> Self {
        Self { facets }
    }

    pub fn apply(&self, params: &[(String, String)], clause: &mut WhereClause) {
        for facet in self.facets {
            if let Some(bound) = bound_param(params, facet.name, "floor") {
                clause.push(Condition::Compare {
                    column: facet.floor.qualified(),
                    op: Comparison::AtLeast,
                    bound,
                });
            }
            if let Some(bound) = bound_param(params, facet.name, "ceil") {
                clause.push(Condition::Compare {
                    column: facet.ceil.qualified(),
                    op: Comparison::AtMost,
                    bound,
                });
            }
        }
    }
}

/// Last `{facet}_{suffix}` value that parses as a finite number.
fn bound_param(params: &[(String, String)], facet: &str, suffix: &str) -> Option<f64> {
    let key = format!("{facet}_{suffix}");
    let raw = params
        .iter()
        .rev()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.trim())?;

    if raw.is_empty() {
        return None;
    }

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            warn!("Ignoring malformed range bound {key}={raw:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::types::Value;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const VESTIGES: &[(&str, &str)] = &[("caracterisation", "c"), ("periode", "p")];

    const DATATIONS: &[RangeFacet] = &[RangeFacet {
        name: "datations",
        floor: ColumnRef::aliased("p", "date_debut"),
        ceil: ColumnRef::aliased("p", "date_fin"),
    }];

    #[test]
    fn aliased_in_clause() {
        let clause = PredicateBuilder::new(VESTIGES)
            .build(&params(&[("caracterisation", "mur|colonnade")]));

        assert_eq!(
            clause.render_inline(),
            "WHERE c.\"caracterisation\" IN ('mur','colonnade')"
        );
        let (sql, values) = clause.to_sql();
        assert_eq!(sql, "WHERE c.\"caracterisation\" IN (?1, ?2)");
        assert_eq!(
            values,
            vec![Value::Text("mur".into()), Value::Text("colonnade".into())]
        );
    }

    #[test]
    fn single_quotes_are_doubled_inline_and_bound_verbatim() {
        let clause = PredicateBuilder::new(&[("nom", "p")]).build(&params(&[("nom", "O'Brien")]));

        assert_eq!(clause.render_inline(), "WHERE p.\"nom\" IN ('O''Brien')");
        let (_, values) = clause.to_sql();
        assert_eq!(values, vec![Value::Text("O'Brien".into())]);
    }

    #[test]
    fn unaliased_columns_are_quoted_only() {
        let clause = PredicateBuilder::new(VESTIGES).build(&params(&[("numero", "12")]));
        assert_eq!(clause.render_inline(), "WHERE \"numero\" IN ('12')");
    }

    #[test]
    fn reserved_and_range_keys_are_skipped() {
        let clause = PredicateBuilder::new(VESTIGES).build(&params(&[
            ("limit", "10"),
            ("offset", "5"),
            ("field", "periode"),
            ("fromTable", "periodes"),
            ("alias", "Période"),
            ("order", "date_debut"),
            ("datations_floor", "-300"),
            ("datations_ceil", "100"),
        ]));
        assert!(clause.is_empty());
        assert_eq!(clause.to_sql().0, "");
    }

    #[test]
    fn conditions_follow_request_order() {
        let clause = PredicateBuilder::new(VESTIGES).build(&params(&[
            ("periode", "romaine"),
            ("caracterisation", "mur"),
        ]));
        assert_eq!(
            clause.render_inline(),
            "WHERE p.\"periode\" IN ('romaine') AND c.\"caracterisation\" IN ('mur')"
        );
    }

    #[test]
    fn empty_segments_are_dropped() {
        let clause = PredicateBuilder::new(VESTIGES).build(&params(&[
            ("caracterisation", "mur||"),
            ("periode", ""),
        ]));
        assert_eq!(clause.render_inline(), "WHERE c.\"caracterisation\" IN ('mur')");
    }

    #[test]
    fn hostile_column_names_stay_inside_quotes() {
        let clause = PredicateBuilder::new(&[]).build(&params(&[("a\" OR 1=1 --", "x")]));
        assert_eq!(
            clause.render_inline(),
            "WHERE \"a\"\" OR 1=1 --\" IN ('x')"
        );
    }

    #[test]
    fn range_bounds() {
        let mut clause = WhereClause::default();
        RangeBuilder::new(DATATIONS).apply(
            &params(&[("datations_floor", "-300"), ("datations_ceil", "100")]),
            &mut clause,
        );
        assert_eq!(
            clause.render_inline(),
            "WHERE p.\"date_debut\" >= -300 AND p.\"date_fin\" <= 100"
        );
    }

    #[test]
    fn malformed_or_missing_bounds_are_ignored() {
        let mut clause = WhereClause::default();
        RangeBuilder::new(DATATIONS).apply(
            &params(&[("datations_floor", "abc"), ("datations_ceil", "NaN")]),
            &mut clause,
        );
        assert!(clause.is_empty());

        RangeBuilder::new(DATATIONS).apply(&params(&[("datations_ceil", "395")]), &mut clause);
        assert_eq!(clause.render_inline(), "WHERE p.\"date_fin\" <= 395");
    }
}
