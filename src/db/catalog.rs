//! The fixed set of queries the server knows how to run.
//!
//! Identifier lookups are one join pattern per filter category; value
//! lookups either use a hand-written query for the well-known reference
//! tables or a generic projection over a known FROM clause. Anything not
//! listed here is rejected.

use crate::sql::predicate::{PredicateBuilder, RangeBuilder, RangeFacet};
use crate::sql::{ColumnRef, WhereClause};

/// One identifier lookup: a category's join pattern and its column aliases.
#[derive(Debug, Clone, Copy)]
pub struct EntityQuery {
    pub entity_type: &'static str,
    pub category: &'static str,
    base_sql: &'static str,
    aliases: &'static [(&'static str, &'static str)],
    /// Range columns. The client's filter YAML repeats them in each numeric
    /// facet's `floor`/`ceil` for reference only.
    ranges: &'static [RangeFacet],
}

impl EntityQuery {
    /// Build the WHERE clause for the given request parameters.
    pub fn where_clause(&self, params: &[(String, String)]) -> WhereClause {
        let mut clause = PredicateBuilder::new(self.aliases).build(params);
        RangeBuilder::new(self.ranges).apply(params, &mut clause);
        clause
    }

    /// Full SQL text (with `?N` placeholders) for a clause from `where_clause`.
    pub fn statement(&self, clause_sql: &str) -> String {
        if clause_sql.is_empty() {
            self.base_sql.to_string()
        } else {
            format!("{} {clause_sql}", self.base_sql)
        }
    }
}

pub const ENTITY_QUERIES: &[EntityQuery] = &[
    EntityQuery {
        entity_type: "sitesFouilles",
        category: "vestiges",
        base_sql: "SELECT DISTINCT sf.fid AS id FROM sites_fouilles AS sf \
                   JOIN vestiges AS v ON v.id_site = sf.id \
                   JOIN datations AS dat ON dat.id_vestige = v.id \
                   JOIN periodes AS p ON dat.id_periode = p.id \
                   JOIN caracterisations AS c ON v.id_caracterisation = c.id",
        aliases: &[("caracterisation", "c"), ("periode", "p")],
        ranges: &[RangeFacet {
            name: "datations",
            floor: ColumnRef::aliased("p", "date_debut"),
            ceil: ColumnRef::aliased("p", "date_fin"),
        }],
    },
    EntityQuery {
        entity_type: "sitesFouilles",
        category: "decouvertes",
        base_sql: "SELECT DISTINCT sf.fid AS id FROM sites_fouilles AS sf \
                   JOIN decouvertes AS d ON sf.id = d.id_site \
                   JOIN personnes AS p ON d.id_inventeur = p.id",
        aliases: &[("nom", "p"), ("date_decouverte", "d")],
        ranges: &[],
    },
    EntityQuery {
        entity_type: "sitesFouilles",
        category: "bibliographies",
        base_sql: "SELECT DISTINCT sf.fid AS id FROM sites_fouilles AS sf \
                   JOIN references_biblio AS rb ON sf.fid = rb.fid_site \
                   JOIN bibliography_zotero AS b ON b.id = rb.id_biblio",
        aliases: &[("Title", "b"), ("Publication_Title", "b"), ("Author", "b")],
        ranges: &[],
    },
    EntityQuery {
        entity_type: "parcellesRegion",
        category: "general",
        base_sql: "SELECT fid AS id FROM parcelles_region",
        aliases: &[],
        ranges: &[],
    },
];

pub fn entity_query(entity_type: &str, category: &str) -> Option<&'static EntityQuery> {
    ENTITY_QUERIES
        .iter()
        .find(|q| q.entity_type == entity_type && q.category == category)
}

/// How the distinct values of a facet are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetSource {
    /// A hand-written query with a fixed column set.
    Fixed(&'static str),
    /// A generic projection over this FROM/JOIN tail.
    Projected { from: &'static str },
}

/// Resolve the value source for `table` (and `field`, for tables whose
/// fixed queries depend on it). `None` means the lookup is not allowed.
pub fn facet_source(table: &str, field: Option<&str>) -> Option<FacetSource> {
    match (table, field) {
        ("vestiges", Some("caracterisation")) => Some(FacetSource::Fixed(
            "SELECT DISTINCT c.caracterisation, c.\"labelFr\" AS label \
             FROM vestiges v JOIN caracterisations c ON v.id_caracterisation = c.id \
             ORDER BY label",
        )),
        ("vestiges", Some("periode")) => Some(FacetSource::Fixed(
            "SELECT DISTINCT p.periode, p.\"labelFr\" AS label, p.date_debut \
             FROM periodes p JOIN datations d ON p.id = d.id_periode \
             JOIN vestiges v ON d.id_vestige = v.id \
             ORDER BY p.date_debut",
        )),
        ("vestiges", _) => None,
        ("periodes", _) => Some(FacetSource::Fixed(
            "SELECT DISTINCT periode, \"labelFr\" AS label, date_debut \
             FROM periodes ORDER BY date_debut",
        )),
        ("discovery_types", _) => Some(FacetSource::Fixed(
            "SELECT DISTINCT id, \"labelFr\" AS label FROM discovery_types ORDER BY label",
        )),
        ("bibliographies", _) => Some(FacetSource::Projected {
            from: "bibliography_zotero",
        }),
        ("decouvertes", _) => Some(FacetSource::Projected {
            from: "decouvertes JOIN personnes ON decouvertes.id_inventeur = personnes.id",
        }),
        ("parcellesRegion", _) => Some(FacetSource::Projected {
            from: "parcelles_region",
        }),
        _ => None,
    }
}

pub const SITE_DETAILS_SQL: &str = "SELECT sf.id, sf.fid, sf.num_tkaczow, sf.commentaire, \
     sf.\"labelFr\" AS label \
     FROM sites_fouilles AS sf WHERE sf.fid = ?1";

pub const SITE_DISCOVERIES_SQL: &str = "SELECT p.nom AS inventeur, d.date_decouverte, \
     dt.\"labelFr\" AS type_decouverte \
     FROM decouvertes AS d \
     JOIN sites_fouilles AS sf ON d.id_site = sf.id \
     LEFT JOIN personnes AS p ON d.id_inventeur = p.id \
     LEFT JOIN discovery_types AS dt ON d.type = dt.id \
     WHERE sf.fid = ?1 ORDER BY d.date_decouverte ASC";

pub const SITE_VESTIGES_SQL: &str = "SELECT c.\"labelFr\" AS caracterisation, \
     p.\"labelFr\" AS periode \
     FROM vestiges v \
     JOIN sites_fouilles AS sf ON v.id_site = sf.id \
     JOIN caracterisations c ON v.id_caracterisation = c.id \
     LEFT JOIN datations d ON v.id = d.id_vestige \
     LEFT JOIN periodes p ON d.id_periode = p.id \
     WHERE sf.fid = ?1";

pub const SITE_BIBLIOGRAPHY_SQL: &str = "SELECT b.\"Title\" AS title, b.\"Author\" AS author, \
     b.\"Date\" AS date, \
     b.\"Publication_Title\" AS publication_title, b.\"Volume\" AS volume, b.\"Issue\" AS issue, \
     b.\"Pages\" AS pages, b.\"Place\" AS place, b.\"Publisher\" AS publisher, b.\"Url\" AS url, \
     b.\"Access_Date\" AS access_date, b.\"Item_Type\" AS item_type \
     FROM bibliography_zotero b \
     JOIN references_biblio rb ON b.id = rb.id_biblio \
     WHERE rb.fid_site = ?1";
