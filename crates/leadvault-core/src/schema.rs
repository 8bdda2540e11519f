//! Logical table definitions and the idempotency key naming variants.

/// Table holding verbatim submission payloads.
pub const RAW_CAPTURES_TABLE: &str = "raw_captures";

/// Table holding normalized leads.
pub const LEADS_TABLE: &str = "leads";

/// Known spellings of the idempotency key field across schema versions.
///
/// A constraint violation reporting any of these (case-insensitively) is the
/// duplicate-submission case.
pub const IDEMPOTENCY_KEY_FIELDS: [&str; 2] = ["idempotency_key", "idempotencyKey"];

/// Whether `name` is one of the idempotency key spellings.
pub fn is_idempotency_key_field(name: &str) -> bool {
    IDEMPOTENCY_KEY_FIELDS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(name.trim()))
}

/// DDL for the raw capture table.
///
/// `UNIQUE` on `idempotency_key` does not constrain NULLs, so submissions
/// without a key always get their own row.
pub const RAW_CAPTURES_DDL: &str = "
CREATE TABLE IF NOT EXISTS raw_captures (
    id              VARCHAR PRIMARY KEY,
    payload         VARCHAR NOT NULL,
    idempotency_key VARCHAR UNIQUE,
    request_id      VARCHAR,
    created_at      TIMESTAMP NOT NULL
)";

/// DDL for the normalized lead table.
pub const LEADS_DDL: &str = "
CREATE TABLE IF NOT EXISTS leads (
    id              VARCHAR PRIMARY KEY,
    first_name      VARCHAR,
    last_name       VARCHAR,
    email           VARCHAR,
    phone           VARCHAR,
    company         VARCHAR,
    job_title       VARCHAR,
    source          VARCHAR,
    campaign        VARCHAR,
    utm_source      VARCHAR,
    utm_medium      VARCHAR,
    utm_campaign    VARCHAR,
    utm_term        VARCHAR,
    utm_content     VARCHAR,
    landing_page    VARCHAR,
    referrer        VARCHAR,
    description     VARCHAR,
    idempotency_key VARCHAR UNIQUE,
    request_id      VARCHAR,
    status          VARCHAR NOT NULL DEFAULT 'new',
    assigned_to     VARCHAR,
    created_at      TIMESTAMP NOT NULL
)";
