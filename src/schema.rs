use anyhow::Result;
use rusqlite::Connection;

/// Create the reference-catalog layout if it is missing.
///
/// A populated catalog ships with the application; this DDL exists so tests
/// and fresh installs can work against an empty or in-memory database.
pub fn init_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch(CATALOG_SQL)?;
    Ok(())
}

/// Create the user-data layout (RDA overrides, food log, meal slots).
pub fn init_user(conn: &Connection) -> Result<()> {
    conn.execute_batch(USER_SQL)?;
    Ok(())
}

const CATALOG_SQL: &str = "
CREATE TABLE IF NOT EXISTS fdgrp (
    id          INTEGER PRIMARY KEY,
    fdgrp_desc  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS food_des (
    id          INTEGER PRIMARY KEY,
    long_desc   TEXT NOT NULL,
    fdgrp_id    INTEGER NOT NULL REFERENCES fdgrp(id)
);

CREATE INDEX IF NOT EXISTS idx_food_des_group ON food_des(fdgrp_id);

CREATE TABLE IF NOT EXISTS nutr_def (
    id          INTEGER PRIMARY KEY,
    nutr_desc   TEXT NOT NULL,
    unit        TEXT NOT NULL,
    flav_class  TEXT
);

CREATE TABLE IF NOT EXISTS nut_data (
    food_id     INTEGER NOT NULL REFERENCES food_des(id),
    nutr_id     INTEGER NOT NULL REFERENCES nutr_def(id),
    nutr_val    REAL NOT NULL,
    PRIMARY KEY (food_id, nutr_id)
);

CREATE INDEX IF NOT EXISTS idx_nut_data_food ON nut_data(food_id);

CREATE TABLE IF NOT EXISTS nutrients_overview (
    id          INTEGER PRIMARY KEY,
    rda         REAL
);

CREATE TABLE IF NOT EXISTS serv_desc (
    id          INTEGER PRIMARY KEY,
    msre_desc   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS serving (
    food_id     INTEGER NOT NULL REFERENCES food_des(id),
    msre_id     INTEGER NOT NULL REFERENCES serv_desc(id),
    grams       REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_serving_food ON serving(food_id);
";

const USER_SQL: &str = "
CREATE TABLE IF NOT EXISTS rda (
    profile_id  INTEGER NOT NULL,
    nutr_id     INTEGER NOT NULL,
    rda         REAL NOT NULL,
    PRIMARY KEY (profile_id, nutr_id)
);

CREATE TABLE IF NOT EXISTS meal_name (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS log_food (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    profile_id  INTEGER NOT NULL DEFAULT 1,
    date        INTEGER NOT NULL,
    meal_id     INTEGER NOT NULL,
    food_id     INTEGER NOT NULL,
    msre_id     INTEGER NOT NULL DEFAULT 0,
    amt         REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_log_food_day ON log_food(profile_id, date);

INSERT OR IGNORE INTO meal_name (id, name) VALUES
    (1, 'Breakfast'),
    (2, 'Lunch'),
    (3, 'Dinner'),
    (4, 'Snack');
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_init_runs_without_error() {
        let conn = Connection::open_in_memory().unwrap();
        init_catalog(&conn).unwrap();
    }

    #[test]
    fn init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_catalog(&conn).unwrap();
        init_catalog(&conn).unwrap();
        init_user(&conn).unwrap();
        init_user(&conn).unwrap();
    }

    #[test]
    fn default_meal_slots_seeded() {
        let conn = Connection::open_in_memory().unwrap();
        init_user(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM meal_name", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 4);
    }
}
