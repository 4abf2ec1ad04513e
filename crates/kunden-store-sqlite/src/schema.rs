//! SQL schema for the registry's SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS agents (
    agent_id          INTEGER PRIMARY KEY AUTOINCREMENT,
    given_name        TEXT NOT NULL,
    family_name       TEXT,
    company           TEXT,
    deleted           INTEGER NOT NULL DEFAULT 0,   -- boolean soft-delete flag
    reference_number  TEXT NOT NULL UNIQUE CHECK (length(reference_number) <= 36)
);

-- The owning side of customer -> agent: agents.customers is derived from
-- this column and never stored.
CREATE TABLE IF NOT EXISTS customers (
    customer_id  TEXT PRIMARY KEY,           -- UUID, server-assigned
    name         TEXT NOT NULL,
    given_name   TEXT NOT NULL,
    company      TEXT,
    birth_date   TEXT,                       -- YYYY-MM-DD
    deleted      INTEGER,                    -- NULL or 0 = active
    gender       TEXT,                       -- 'männlich' | 'weiblich' | 'divers'
    email        TEXT,
    agent_id     INTEGER NOT NULL REFERENCES agents(agent_id)
);

CREATE TABLE IF NOT EXISTS addresses (
    address_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    street       TEXT,
    postal_code  TEXT,
    city         TEXT,
    country      TEXT
);

CREATE TABLE IF NOT EXISTS customer_addresses (
    customer_id  TEXT NOT NULL REFERENCES customers(customer_id) ON DELETE CASCADE,
    address_id   INTEGER NOT NULL REFERENCES addresses(address_id),
    PRIMARY KEY (customer_id, address_id)
);

-- The owning side of the one-to-one customer link; removing a customer
-- removes its user.
CREATE TABLE IF NOT EXISTS users (
    user_id      TEXT PRIMARY KEY,
    username     TEXT NOT NULL UNIQUE,
    customer_id  TEXT UNIQUE REFERENCES customers(customer_id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS customers_agent_idx ON customers(agent_id);

PRAGMA user_version = 1;
";
