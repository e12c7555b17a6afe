//! # Database Schema
//!
//! SQL schema definitions for the EcoQuest database.
//!
//! ## Schema Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         DATABASE SCHEMA                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────────┐   ┌─────────────────────┐   ┌────────────────┐    │
//! │  │    profiles      │   │ leaderboard_entries │   │  point_events  │    │
//! │  ├──────────────────┤   ├─────────────────────┤   ├────────────────┤    │
//! │  │ id               │◄──│ user_id             │   │ user_id        │──► │
//! │  │ total_points     │   │ community_id ('' =  │   │ community_id   │    │
//! │  │ role / is_admin  │   │   global scope)     │   │ amount         │    │
//! │  │ current_streak   │   │ period              │   │ source         │    │
//! │  │ last_active_day  │   │ points              │   │ created_at     │    │
//! │  └──────────────────┘   └─────────────────────┘   └────────────────┘    │
//! │                                                                         │
//! │  challenges ◄── challenge_progress      game_sessions                   │
//! │  communities ◄── community_members      community_requests             │
//! │  actions        badges ◄── user_badges  tasks ◄── task_completions     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Uniqueness constraints carry the idempotence rules: one leaderboard row
//! per (user, scope, period), one progress row per (user, challenge), one
//! grant per (user, badge), one pending community request per user, one
//! task completion per (user, task, day).

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL to create all tables
pub const CREATE_TABLES: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Profiles
-- One per authenticated user; created by the identity sync webhook
CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    avatar_url TEXT,
    total_points INTEGER NOT NULL DEFAULT 0 CHECK (total_points >= 0),
    -- 'member' or 'community_leader'
    role TEXT NOT NULL DEFAULT 'member',
    is_admin INTEGER NOT NULL DEFAULT 0,
    current_streak INTEGER NOT NULL DEFAULT 0,
    longest_streak INTEGER NOT NULL DEFAULT 0,
    -- UTC day number of the last qualifying activity
    last_active_day INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_profiles_points ON profiles(total_points DESC);

-- Challenge catalog (seeded)
CREATE TABLE IF NOT EXISTS challenges (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL,
    difficulty TEXT NOT NULL,
    points INTEGER NOT NULL CHECK (points >= 0),
    max_progress INTEGER NOT NULL CHECK (max_progress >= 1),
    is_active INTEGER NOT NULL DEFAULT 1
);

-- Communities
CREATE TABLE IF NOT EXISTS communities (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
    description TEXT,
    join_code TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL DEFAULT 'APPROVED',
    total_points INTEGER NOT NULL DEFAULT 0,
    creator_id TEXT REFERENCES profiles(id) ON DELETE SET NULL,
    created_at INTEGER NOT NULL
);

-- Leaderboard aggregates
-- community_id is '' for the global scope so the UNIQUE key holds
CREATE TABLE IF NOT EXISTS leaderboard_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    community_id TEXT NOT NULL DEFAULT '',
    period TEXT NOT NULL,
    points INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (user_id, community_id, period)
);
CREATE INDEX IF NOT EXISTS idx_leaderboard_scope
    ON leaderboard_entries(period, community_id, points DESC);

-- Append-only award journal
CREATE TABLE IF NOT EXISTS point_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    community_id TEXT,
    amount INTEGER NOT NULL CHECK (amount > 0),
    source TEXT NOT NULL,
    source_id TEXT,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_point_events_created ON point_events(created_at);
CREATE INDEX IF NOT EXISTS idx_point_events_user ON point_events(user_id);

-- Per-user challenge progress
CREATE TABLE IF NOT EXISTS challenge_progress (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    challenge_id TEXT NOT NULL REFERENCES challenges(id) ON DELETE CASCADE,
    status TEXT NOT NULL,
    progress INTEGER NOT NULL DEFAULT 0 CHECK (progress >= 0),
    started_at INTEGER NOT NULL,
    completed_at INTEGER,
    UNIQUE (user_id, challenge_id)
);

-- Game sessions
CREATE TABLE IF NOT EXISTS game_sessions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    game_type TEXT NOT NULL,
    challenge_id TEXT REFERENCES challenges(id) ON DELETE SET NULL,
    status TEXT NOT NULL DEFAULT 'ACTIVE',
    score INTEGER NOT NULL DEFAULT 0,
    started_at INTEGER NOT NULL,
    ended_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_game_sessions_challenge
    ON game_sessions(user_id, challenge_id, status);

-- Eco-action submissions
CREATE TABLE IF NOT EXISTS actions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    community_id TEXT REFERENCES communities(id) ON DELETE SET NULL,
    category TEXT NOT NULL,
    description TEXT,
    before_image_url TEXT NOT NULL,
    after_image_url TEXT NOT NULL,
    latitude REAL,
    longitude REAL,
    status TEXT NOT NULL DEFAULT 'PENDING',
    ai_confidence REAL NOT NULL DEFAULT 0,
    points_awarded INTEGER NOT NULL DEFAULT 0,
    admin_note TEXT,
    created_at INTEGER NOT NULL,
    reviewed_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_actions_status ON actions(status, created_at);
CREATE INDEX IF NOT EXISTS idx_actions_user ON actions(user_id);

-- Community creation requests (moderation queue)
CREATE TABLE IF NOT EXISTS community_requests (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'PENDING',
    admin_note TEXT,
    created_at INTEGER NOT NULL,
    reviewed_at INTEGER
);
-- One pending request per user
CREATE UNIQUE INDEX IF NOT EXISTS idx_community_requests_one_pending
    ON community_requests(user_id) WHERE status = 'PENDING';

-- Community membership (leaving deactivates, never deletes)
CREATE TABLE IF NOT EXISTS community_members (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    community_id TEXT NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    role TEXT NOT NULL DEFAULT 'MEMBER',
    active INTEGER NOT NULL DEFAULT 1,
    joined_at INTEGER NOT NULL,
    left_at INTEGER,
    UNIQUE (community_id, user_id)
);

-- Badge catalog (seeded) and grants
CREATE TABLE IF NOT EXISTS badges (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    condition TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_badges (
    user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    badge_id TEXT NOT NULL REFERENCES badges(id) ON DELETE CASCADE,
    earned_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, badge_id)
);

-- Daily tasks (seeded) and completions
CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    points INTEGER NOT NULL CHECK (points >= 0)
);

CREATE TABLE IF NOT EXISTS task_completions (
    user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    day INTEGER NOT NULL,
    points INTEGER NOT NULL,
    completed_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, task_id, day)
);
"#;

/// Default catalog: challenges, badges and daily tasks.
///
/// `INSERT OR IGNORE` keeps re-seeding harmless.
pub const SEED_CATALOG: &str = r#"
INSERT OR IGNORE INTO challenges (id, title, description, category, difficulty, points, max_progress, is_active) VALUES
    ('plastic-free-week', 'Plastic-Free Week', 'Avoid single-use plastic for seven days.', 'waste', 'MEDIUM', 100, 7, 1),
    ('waste-sorting-master', 'Waste Sorting Master', 'Finish five waste sorting rounds.', 'recycling', 'EASY', 50, 5, 1),
    ('energy-saver', 'Energy Saver', 'Log five days of switching off idle devices.', 'energy', 'MEDIUM', 75, 5, 1),
    ('eco-quiz-champion', 'Eco Quiz Champion', 'Pass three climate quizzes.', 'education', 'EASY', 40, 3, 1),
    ('tree-planter', 'Tree Planter', 'Plant three trees with your community.', 'nature', 'HARD', 200, 3, 1);

INSERT OR IGNORE INTO badges (id, name, description, condition) VALUES
    ('badge-first-action', 'First Step', 'Submit your first eco-action.', 'first_action'),
    ('badge-five-actions', 'Habit Former', 'Submit five eco-actions.', 'five_actions'),
    ('badge-first-approved', 'Verified Green', 'Get an eco-action approved.', 'first_approved_action'),
    ('badge-ten-approved', 'Planet Guardian', 'Get ten eco-actions approved.', 'ten_approved_actions'),
    ('badge-first-challenge', 'Challenger', 'Complete a challenge.', 'first_challenge'),
    ('badge-five-challenges', 'Challenge Veteran', 'Complete five challenges.', 'five_challenges'),
    ('badge-points-100', 'Seedling', 'Earn 100 points.', 'points_100'),
    ('badge-points-500', 'Sapling', 'Earn 500 points.', 'points_500'),
    ('badge-points-1000', 'Old Oak', 'Earn 1000 points.', 'points_1000'),
    ('badge-community-member', 'Team Player', 'Join a community.', 'community_member'),
    ('badge-community-founder', 'Founder', 'Lead an approved community.', 'community_founder'),
    ('badge-streak-3', 'On a Roll', 'Three active days in a row.', 'streak_3'),
    ('badge-streak-7', 'Week Warrior', 'Seven active days in a row.', 'streak_7'),
    ('badge-streak-30', 'Unstoppable', 'Thirty active days in a row.', 'streak_30');

INSERT OR IGNORE INTO tasks (id, title, points) VALUES
    ('turn-off-lights', 'Turn off unused lights', 5),
    ('reusable-bottle', 'Use a reusable bottle', 5),
    ('walk-or-bike', 'Walk or bike instead of driving', 10),
    ('pick-up-litter', 'Pick up litter', 10);
"#;
