use anyhow::Result;
use rusqlite::Connection;

/// Create the reference tables read by the filter endpoints.
///
/// Mixed-case columns (`"labelFr"`, the Zotero export columns) are quoted
/// so their case survives, matching how the queries address them.
pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Version tracking
        CREATE TABLE IF NOT EXISTS cartalex_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sites_fouilles (
            id INTEGER PRIMARY KEY,
            fid INTEGER NOT NULL UNIQUE,
            num_tkaczow TEXT,
            commentaire TEXT,
            "labelFr" TEXT
        );

        -- Remains
        CREATE TABLE IF NOT EXISTS caracterisations (
            id INTEGER PRIMARY KEY,
            caracterisation TEXT NOT NULL,
            "labelFr" TEXT
        );

        CREATE TABLE IF NOT EXISTS periodes (
            id INTEGER PRIMARY KEY,
            periode TEXT NOT NULL,
            "labelFr" TEXT,
            date_debut INTEGER,
            date_fin INTEGER
        );

        CREATE TABLE IF NOT EXISTS vestiges (
            id INTEGER PRIMARY KEY,
            id_site INTEGER NOT NULL REFERENCES sites_fouilles(id) ON DELETE CASCADE,
            id_caracterisation INTEGER NOT NULL REFERENCES caracterisations(id)
        );

        CREATE TABLE IF NOT EXISTS datations (
            id INTEGER PRIMARY KEY,
            id_vestige INTEGER NOT NULL REFERENCES vestiges(id) ON DELETE CASCADE,
            id_periode INTEGER NOT NULL REFERENCES periodes(id)
        );

        -- Discoveries
        CREATE TABLE IF NOT EXISTS personnes (
            id INTEGER PRIMARY KEY,
            nom TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS discovery_types (
            id INTEGER PRIMARY KEY,
            "labelFr" TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS decouvertes (
            id INTEGER PRIMARY KEY,
            id_site INTEGER NOT NULL REFERENCES sites_fouilles(id) ON DELETE CASCADE,
            id_inventeur INTEGER REFERENCES personnes(id),
            date_decouverte INTEGER,
            type INTEGER REFERENCES discovery_types(id)
        );

        -- Bibliography (Zotero export)
        CREATE TABLE IF NOT EXISTS bibliography_zotero (
            id INTEGER PRIMARY KEY,
            "Title" TEXT,
            "Author" TEXT,
            "Date" TEXT,
            "Publication_Title" TEXT,
            "Volume" TEXT,
            "Issue" TEXT,
            "Pages" TEXT,
            "Place" TEXT,
            "Publisher" TEXT,
            "Url" TEXT,
            "Access_Date" TEXT,
            "Item_Type" TEXT
        );

        CREATE TABLE IF NOT EXISTS references_biblio (
            fid_site INTEGER NOT NULL REFERENCES sites_fouilles(fid) ON DELETE CASCADE,
            id_biblio INTEGER NOT NULL REFERENCES bibliography_zotero(id),
            PRIMARY KEY (fid_site, id_biblio)
        );

        -- Cadastral parcels
        CREATE TABLE IF NOT EXISTS parcelles_region (
            fid INTEGER PRIMARY KEY,
            nom TEXT,
            numero TEXT
        );

        -- Indexes for the join patterns
        CREATE INDEX IF NOT EXISTS idx_vestiges_site ON vestiges(id_site);
        CREATE INDEX IF NOT EXISTS idx_datations_vestige ON datations(id_vestige);
        CREATE INDEX IF NOT EXISTS idx_decouvertes_site ON decouvertes(id_site);
        CREATE INDEX IF NOT EXISTS idx_references_biblio ON references_biblio(id_biblio);
        "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO cartalex_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
