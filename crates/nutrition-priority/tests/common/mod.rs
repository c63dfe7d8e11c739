#![allow(dead_code)]

use nutrition_priority::store::{SqliteSession, StoreOptions};
use rusqlite::{params, Connection};

pub const SCHEMA: &str = "
    CREATE TABLE kecamatan (
        kecamatan TEXT PRIMARY KEY,
        jumlah_stunting INTEGER NOT NULL CHECK (jumlah_stunting >= 0),
        geom TEXT
    );
    CREATE TABLE balita (id INTEGER PRIMARY KEY, nama TEXT, kecamatan TEXT, status_gizi TEXT);
    CREATE TABLE faskes (id INTEGER PRIMARY KEY, nama TEXT, kecamatan TEXT, jenis TEXT);
";

pub fn square(offset: f64) -> String {
    format!(
        r#"{{"type":"Polygon","coordinates":[[[{a},{a}],[{b},{a}],[{b},{b}],[{a},{a}]]]}}"#,
        a = offset,
        b = offset + 1.0
    )
}

/// Fixture database builder; seed while the connection is still writable.
pub struct Fixture {
    conn: Connection,
}

impl Fixture {
    pub fn new() -> Self {
        let conn = Connection::open_in_memory().expect("in-memory database");
        conn.execute_batch(SCHEMA).expect("schema applies");
        Self { conn }
    }

    pub fn region(self, name: &str, severity: i64, geometry: Option<&str>) -> Self {
        self.conn
            .execute(
                "INSERT INTO kecamatan (kecamatan, jumlah_stunting, geom) VALUES (?1, ?2, ?3)",
                params![name, severity, geometry],
            )
            .expect("region inserted");
        self
    }

    pub fn beneficiaries(self, count: usize) -> Self {
        for index in 0..count {
            self.conn
                .execute(
                    "INSERT INTO balita (nama) VALUES (?1)",
                    params![format!("balita-{index}")],
                )
                .expect("beneficiary inserted");
        }
        self
    }

    pub fn facilities(self, count: usize) -> Self {
        for index in 0..count {
            self.conn
                .execute(
                    "INSERT INTO faskes (nama) VALUES (?1)",
                    params![format!("puskesmas-{index}")],
                )
                .expect("facility inserted");
        }
        self
    }

    pub fn child(self, district: Option<&str>, status: Option<&str>) -> Self {
        self.conn
            .execute(
                "INSERT INTO balita (nama, kecamatan, status_gizi) VALUES ('balita', ?1, ?2)",
                params![district, status],
            )
            .expect("child inserted");
        self
    }

    pub fn facility(self, district: &str, kind: &str) -> Self {
        self.conn
            .execute(
                "INSERT INTO faskes (nama, kecamatan, jenis) VALUES ('faskes', ?1, ?2)",
                params![district, kind],
            )
            .expect("facility inserted");
        self
    }

    pub fn session(self) -> SqliteSession {
        SqliteSession::attach(self.conn, &StoreOptions::default()).expect("session attaches")
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }
}
