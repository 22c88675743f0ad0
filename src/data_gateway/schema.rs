//! Database schema for directory.db.
//!
//! Holds the tenant registry and the tenant-owned directory entities.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

/// Tenant registry. Deliberately absent from the tenant-field map: teams are
/// the tenants themselves and are never filtered.
const TEAMS_TABLE_V1: Table = Table {
    name: "teams",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("slug", &SqlType::Text, is_unique = true),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
};

/// Users, owned by a team.
const USERS_TABLE_V1: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("team_id", &SqlType::Text),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("password", &SqlType::Text),
        sqlite_column!("verification_token", &SqlType::Text),
        sqlite_column!("email_verified_at", &SqlType::Integer),
        sqlite_column!(
            "failed_login_attempts",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_users_team", "team_id")],
};

/// Box memberships, owned by a box.
const BOX_USERS_TABLE_V1: Table = Table {
    name: "box_users",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("box_id", &SqlType::Text),
        sqlite_column!("user_id", &SqlType::Text, non_null = true),
        sqlite_column!("role", &SqlType::Text, non_null = true),
        sqlite_column!(
            "status",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'active'")
        ),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_box_users_box", "box_id"),
        ("idx_box_users_user", "user_id"),
    ],
};

pub const DIRECTORY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[TEAMS_TABLE_V1, USERS_TABLE_V1, BOX_USERS_TABLE_V1],
    migration: None,
}];
