use ::rusqlite::Connection;
use tabula::{EntityConfig, SqliteCatalog, Tabula, TabulaConfig};

/// Users with a profile extension, sites, roles (many-to-many with users),
/// passports (one-to-one with users), shifts (children of users) and
/// access codes (a unique pair).
const SCHEMA: &str = "
CREATE TABLE {p}site (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL DEFAULT 'open' CHECK (status IN ('open', 'closed')),
    create_timestamp TEXT DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE {p}user (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    active INTEGER NOT NULL DEFAULT 1,
    site_id INTEGER REFERENCES {p}site (id),
    passport_id INTEGER,
    create_timestamp TEXT DEFAULT CURRENT_TIMESTAMP,
    update_timestamp TEXT DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE {p}user_profile (
    user_id INTEGER PRIMARY KEY REFERENCES {p}user (id),
    bio TEXT CHECK (bio IS NULL OR length(bio) <= 20),
    name TEXT
);
CREATE TABLE {p}role (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE {p}user_has_role (
    user_id INTEGER NOT NULL REFERENCES {p}user (id),
    role_id INTEGER NOT NULL REFERENCES {p}role (id),
    PRIMARY KEY (user_id, role_id)
);
CREATE TABLE {p}passport (
    id INTEGER PRIMARY KEY,
    user_id INTEGER REFERENCES {p}user (id),
    number TEXT
);
CREATE TABLE {p}shift (
    id INTEGER PRIMARY KEY,
    user_id INTEGER REFERENCES {p}user (id),
    start_datetime TEXT,
    end_datetime TEXT NOT NULL DEFAULT '1970-01-01 00:00:00',
    start_time TEXT,
    end_time TEXT
);
CREATE TABLE {p}access (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES {p}user (id),
    site_id INTEGER NOT NULL REFERENCES {p}site (id),
    code TEXT,
    UNIQUE (user_id, site_id)
);
";

/// Default configuration: `user` extended by `user_profile`.
pub fn config() -> TabulaConfig {
    let mut user = EntityConfig::new("user");
    user.extending.push("profile".to_string());
    TabulaConfig::default().with_entity(user)
}

pub fn setup_db() -> Tabula<SqliteCatalog> {
    setup_db_with(config())
}

pub fn setup_db_with(config: TabulaConfig) -> Tabula<SqliteCatalog> {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    create_schema(&conn, &config.prefix);
    let catalog = SqliteCatalog::new(conn).with_prefix(config.prefix.clone());
    Tabula::from_config(catalog, config).expect("Failed to build registry")
}

pub fn create_schema(conn: &Connection, prefix: &str) {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .expect("Failed to enable foreign keys");
    conn.execute_batch(&SCHEMA.replace("{p}", prefix))
        .expect("Failed to create tables");
}

/// Saves a named record of `entity` and returns its id.
pub fn insert_named(db: &Tabula<SqliteCatalog>, entity: &str, name: &str) -> i64 {
    let mut record = db.new_record(entity).expect("unknown entity");
    record.set("name", name).expect("no name column");
    record.save().expect("Failed to save");
    record.id().expect("no id after save")
}
