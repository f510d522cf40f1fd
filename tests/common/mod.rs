#![allow(dead_code)]

use cartalex::config::ServerConfig;
use cartalex::db::Database;
use cartalex::server::AppState;
use rusqlite::Connection;
use tempfile::TempDir;

/// Four excavation sites (fids 101..=104) with their remains, discoveries
/// and bibliography:
///
/// | fid | remains          | period      | inventor | bibliography |
/// |-----|------------------|-------------|----------|--------------|
/// | 101 | mur              | ptolemaique | Durand   | 1            |
/// | 102 | colonnade        | romaine     | O'Brien  | 1            |
/// | 103 | citerne          | byzantine   | Durand   |              |
/// | 104 | mur              | byzantine   | Breccia  | 2            |
const SEED: &str = r#"
INSERT INTO sites_fouilles (id, fid, num_tkaczow, commentaire, "labelFr") VALUES
    (1, 101, 'T-1', 'Rue R4', 'Site 101'),
    (2, 102, 'T-2', NULL, 'Site 102'),
    (3, 103, 'T-3', NULL, 'Site 103'),
    (4, 104, NULL, NULL, 'Site 104');

INSERT INTO caracterisations (id, caracterisation, "labelFr") VALUES
    (1, 'mur', 'Mur'),
    (2, 'colonnade', 'Colonnade'),
    (3, 'citerne', 'Citerne');

INSERT INTO periodes (id, periode, "labelFr", date_debut, date_fin) VALUES
    (1, 'ptolemaique', 'Ptolémaïque', -332, -30),
    (2, 'romaine', 'Romaine', -30, 395),
    (3, 'byzantine', 'Byzantine', 395, 641);

INSERT INTO vestiges (id, id_site, id_caracterisation) VALUES
    (1, 1, 1), (2, 2, 2), (3, 3, 3), (4, 4, 1);

INSERT INTO datations (id, id_vestige, id_periode) VALUES
    (1, 1, 1), (2, 2, 2), (3, 3, 3), (4, 4, 3);

INSERT INTO personnes (id, nom) VALUES
    (1, 'Durand'), (2, 'O''Brien'), (3, 'Breccia');

INSERT INTO discovery_types (id, "labelFr") VALUES (1, 'Fouille'), (2, 'Sondage');

INSERT INTO decouvertes (id, id_site, id_inventeur, date_decouverte, type) VALUES
    (1, 1, 1, 1905, 1),
    (2, 2, 2, 1910, 2),
    (3, 3, 1, 1920, 1),
    (4, 4, 3, 1898, 1);

INSERT INTO bibliography_zotero (id, "Title", "Author", "Date", "Publication_Title") VALUES
    (1, 'Alexandrea ad Aegyptum', 'Breccia', '1922', NULL),
    (2, 'Ancient Alexandria', 'Tkaczow', '1993', 'Topography');

INSERT INTO references_biblio (fid_site, id_biblio) VALUES (101, 1), (102, 1), (104, 2);

INSERT INTO parcelles_region (fid, nom, numero) VALUES
    (1, 'Kom el-Dikka', '12'),
    (2, 'Chatby', '7');
"#;

/// A seeded database in a temp directory. Keep the `TempDir` alive for as
/// long as the database is used.
pub fn fixture_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cartalex.db");
    let db = Database::create(&path).unwrap();

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(SEED).unwrap();
    drop(conn);

    (dir, db)
}

pub fn test_state(db: Database) -> AppState {
    AppState::new(db, &ServerConfig::default())
}
