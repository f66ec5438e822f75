//! # Database Schema
//!
//! SQL schema definitions for the Amity database.
//!
//! ## Schema Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         DATABASE SCHEMA                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐      │
//! │  │     users       │    │  friendships    │    │ friend_requests │      │
//! │  ├─────────────────┤    ├─────────────────┤    ├─────────────────┤      │
//! │  │ id              │◄───│ user_id         │    │ user_id         │───►  │
//! │  │ username        │    │ friend_id       │    │ requester_id    │      │
//! │  │ username_lower  │    │ position        │    │ position        │      │
//! │  │ email           │    └─────────────────┘    └─────────────────┘      │
//! │  │ password_hash   │                                                    │
//! │  │ bio / avatar    │    ┌─────────────────┐                             │
//! │  │ interests(json) │    │     media       │                             │
//! │  │ profile_complete│    ├─────────────────┤                             │
//! │  │ version         │◄───│ owner_id        │                             │
//! │  │ created_at      │    │ filename        │                             │
//! │  │ updated_at      │    │ storage_key     │                             │
//! │  └─────────────────┘    │ kind / size     │                             │
//! │                         └─────────────────┘                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL to create all tables
pub const CREATE_TABLES: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Users table
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    -- Lowercased copy of username for case-insensitive search
    username_lower TEXT NOT NULL,
    -- Stored lowercased
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    bio TEXT,
    avatar TEXT,
    -- JSON array of strings
    interests TEXT NOT NULL DEFAULT '[]',
    profile_complete INTEGER NOT NULL DEFAULT 0,
    -- Optimistic concurrency token, bumped on every save
    version INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_users_username_lower ON users(username_lower);

-- Accepted friends, one row per direction
CREATE TABLE IF NOT EXISTS friendships (
    user_id TEXT NOT NULL,
    friend_id TEXT NOT NULL,
    -- Insertion order within the owner's list
    position INTEGER NOT NULL,
    PRIMARY KEY (user_id, friend_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_friendships_friend ON friendships(friend_id);

-- Pending requests, keyed by recipient
CREATE TABLE IF NOT EXISTS friend_requests (
    user_id TEXT NOT NULL,
    requester_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (user_id, requester_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- Media metadata; bytes live in object storage under storage_key
CREATE TABLE IF NOT EXISTS media (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    filename TEXT NOT NULL,
    filename_lower TEXT NOT NULL,
    storage_key TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('image', 'video')),
    content_type TEXT NOT NULL,
    size INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_media_owner ON media(owner_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_media_created ON media(created_at DESC);
"#;

/// Migration from schema v1 to v2: media metadata.
pub const MIGRATE_V1_TO_V2: &str = r#"
CREATE TABLE IF NOT EXISTS media (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    filename TEXT NOT NULL,
    filename_lower TEXT NOT NULL,
    storage_key TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('image', 'video')),
    content_type TEXT NOT NULL,
    size INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_media_owner ON media(owner_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_media_created ON media(created_at DESC);

UPDATE schema_version SET version = 2;
"#;
