//! SQL schema for the defect SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE … IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per make/model/year. Never deleted.
CREATE TABLE IF NOT EXISTS vehicles (
    vehicle_id  TEXT PRIMARY KEY,
    make        TEXT NOT NULL,     -- trimmed, upper-cased
    model       TEXT NOT NULL,     -- trimmed, upper-cased
    year        INTEGER NOT NULL,
    created_at  TEXT NOT NULL,
    UNIQUE (make, model, year)
);

-- Decoded VINs and the vehicle they resolved to.
CREATE TABLE IF NOT EXISTS vehicle_vins (
    vin         TEXT PRIMARY KEY,
    vehicle_id  TEXT NOT NULL REFERENCES vehicles(vehicle_id),
    recorded_at TEXT NOT NULL
);

-- Complaints are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS complaints (
    odi_number     TEXT PRIMARY KEY,
    vehicle_id     TEXT NOT NULL REFERENCES vehicles(vehicle_id),
    manufacturer   TEXT,
    component      TEXT,
    summary        TEXT,
    summary_folded TEXT,            -- lower-cased summary for substring search
    incident_date  TEXT,            -- YYYY-MM-DD
    filed_date     TEXT,            -- YYYY-MM-DD
    crash          INTEGER NOT NULL DEFAULT 0,
    fire           INTEGER NOT NULL DEFAULT 0,
    injuries       INTEGER NOT NULL DEFAULT 0 CHECK (injuries >= 0),
    deaths         INTEGER NOT NULL DEFAULT 0 CHECK (deaths >= 0),
    vin            TEXT,
    products_json  TEXT,
    ingested_at    TEXT NOT NULL
);

-- Recall campaigns; append-only like complaints.
CREATE TABLE IF NOT EXISTS recalls (
    campaign_number TEXT PRIMARY KEY,
    vehicle_id      TEXT NOT NULL REFERENCES vehicles(vehicle_id),
    recall_number   TEXT,
    component       TEXT,
    summary         TEXT,
    consequence     TEXT,
    remedy          TEXT,
    notes           TEXT,
    report_date     TEXT,           -- YYYY-MM-DD
    ingested_at     TEXT NOT NULL
);

-- Every vehicle a record was fetched for. `vehicle_id` on the record tables
-- is only the first of these.
CREATE TABLE IF NOT EXISTS vehicle_complaints (
    vehicle_id TEXT NOT NULL REFERENCES vehicles(vehicle_id),
    odi_number TEXT NOT NULL REFERENCES complaints(odi_number),
    PRIMARY KEY (vehicle_id, odi_number)
);

CREATE TABLE IF NOT EXISTS vehicle_recalls (
    vehicle_id      TEXT NOT NULL REFERENCES vehicles(vehicle_id),
    campaign_number TEXT NOT NULL REFERENCES recalls(campaign_number),
    PRIMARY KEY (vehicle_id, campaign_number)
);

CREATE INDEX IF NOT EXISTS vehicle_vins_vehicle_idx ON vehicle_vins(vehicle_id);
CREATE INDEX IF NOT EXISTS complaints_filed_idx     ON complaints(filed_date);
CREATE INDEX IF NOT EXISTS recalls_report_idx       ON recalls(report_date);

PRAGMA user_version = 1;
";
