use serde::Deserialize;

use super::{is_plain_ident, quote_ident, SqlError};

/// Options of a distinct facet-value lookup, as sent in the query string.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ProjectionRequest {
    pub field: Option<String>,
    #[serde(rename = "fromTable")]
    pub from_table: Option<String>,
    pub alias: Option<String>,
    pub order: Option<String>,
}

/// `SELECT DISTINCT ...` and ` ORDER BY ...` fragments for one lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub select: String,
    pub order_by: String,
}

impl Projection {
    /// Assemble the full statement against `from` (a FROM/JOIN tail).
    pub fn statement(&self, from: &str) -> String {
        format!("{} FROM {from}{}", self.select, self.order_by)
    }
}

/// Build the projection for a lookup.
///
/// The raw field is always selected so rows carry the internal value used by
/// equality predicates. The alias repeats the field under a display name,
/// and a distinct `order` column is selected so `DISTINCT` can order by it.
pub fn build(request: &ProjectionRequest) -> Result<Projection, SqlError> {
    let field = non_empty(&request.field).ok_or(SqlError::MissingParameter("field"))?;
    let from_table = non_empty(&request.from_table);
    let alias = non_empty(&request.alias);
    let order = non_empty(&request.order);

    check_ident("field", field)?;
    if let Some(table) = from_table {
        check_ident("fromTable", table)?;
    }
    if let Some(order) = order {
        check_ident("order", order)?;
    }

    let qualify = |column: &str| match from_table {
        Some(table) => format!("{table}.{}", quote_ident(column)),
        None => quote_ident(column),
    };

    let qualified_field = qualify(field);
    let mut columns = vec![qualified_field.clone()];

    if let Some(alias) = alias.filter(|a| *a != field) {
        columns.push(format!("{qualified_field} AS {}", quote_ident(alias)));
    }
    if let Some(order) = order.filter(|o| *o != field) {
        columns.push(qualify(order));
    }

    Ok(Projection {
        select: format!("SELECT DISTINCT {}", columns.join(", ")),
        order_by: format!(" ORDER BY {}", qualify(order.unwrap_or(field))),
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn check_ident(param: &'static str, value: &str) -> Result<(), SqlError> {
    if is_plain_ident(value) {
        Ok(())
    } else {
        Err(SqlError::InvalidIdentifier {
            param,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(
        field: &str,
        from_table: Option<&str>,
        alias: Option<&str>,
        order: Option<&str>,
    ) -> ProjectionRequest {
        ProjectionRequest {
            field: Some(field.to_string()),
            from_table: from_table.map(str::to_string),
            alias: alias.map(str::to_string),
            order: order.map(str::to_string),
        }
    }

    #[test]
    fn alias_and_order_columns() {
        let projection =
            build(&request("periode", None, Some("Période"), Some("date_debut"))).unwrap();
        assert_eq!(
            projection.select,
            "SELECT DISTINCT \"periode\", \"periode\" AS \"Période\", \"date_debut\""
        );
        assert_eq!(projection.order_by, " ORDER BY \"date_debut\"");
    }

    #[test]
    fn from_table_qualifies_every_column() {
        let projection =
            build(&request("nom", Some("personnes"), Some("Inventeur"), None)).unwrap();
        assert_eq!(
            projection.select,
            "SELECT DISTINCT personnes.\"nom\", personnes.\"nom\" AS \"Inventeur\""
        );
        assert_eq!(projection.order_by, " ORDER BY personnes.\"nom\"");
        assert_eq!(
            projection.statement("personnes"),
            "SELECT DISTINCT personnes.\"nom\", personnes.\"nom\" AS \"Inventeur\" \
             FROM personnes ORDER BY personnes.\"nom\""
        );
    }

    #[test]
    fn no_duplicate_columns_when_alias_or_order_equal_field() {
        let projection = build(&request("Title", None, Some("Title"), Some("Title"))).unwrap();
        assert_eq!(projection.select, "SELECT DISTINCT \"Title\"");
        assert_eq!(projection.order_by, " ORDER BY \"Title\"");
    }

    #[test]
    fn display_alias_is_quoted() {
        let alias = "Date de la \"découverte\"";
        let projection = build(&request("date_decouverte", None, Some(alias), None)).unwrap();
        assert_eq!(
            projection.select,
            "SELECT DISTINCT \"date_decouverte\", \
             \"date_decouverte\" AS \"Date de la \"\"découverte\"\"\""
        );
    }

    #[test]
    fn rejects_missing_field_and_bad_identifiers() {
        assert_eq!(
            build(&ProjectionRequest::default()),
            Err(SqlError::MissingParameter("field"))
        );
        assert!(matches!(
            build(&request("nom", Some("personnes p; --"), None, None)),
            Err(SqlError::InvalidIdentifier { param: "fromTable", .. })
        ));
        assert!(matches!(
            build(&request("x\"y", None, None, None)),
            Err(SqlError::InvalidIdentifier { param: "field", .. })
        ));
    }
}
