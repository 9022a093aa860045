pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    full_name TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'principal' CHECK (role IN ('principal', 'foundation', 'admin')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS credentials (
    user_id TEXT PRIMARY KEY REFERENCES profiles(id) ON DELETE CASCADE,
    salt TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS auth_sessions (
    token TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS password_resets (
    token TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    consumed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reports (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    date TEXT NOT NULL,
    principal_name TEXT NOT NULL DEFAULT '',
    school_name TEXT NOT NULL DEFAULT '',
    period TEXT NOT NULL DEFAULT 'unset' CHECK (period IN ('unset', 'monthly', 'odd_semester', 'even_semester', 'annual')),
    principal_evaluation JSON NOT NULL DEFAULT '{}',
    foundation_evaluation JSON NOT NULL DEFAULT '{}',
    foundation_comment TEXT,
    status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'submitted', 'approved')),
    submitted_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS activities (
    id TEXT PRIMARY KEY,
    report_id TEXT NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT,
    date TEXT,
    position INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS achievements (
    id TEXT PRIMARY KEY,
    report_id TEXT NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    description TEXT,
    position INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS rab_data (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    institution_name TEXT NOT NULL DEFAULT '',
    period TEXT NOT NULL DEFAULT '',
    year INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'submitted', 'approved', 'rejected')),
    submitted_at TEXT,
    reviewed_at TEXT,
    review_comment TEXT,
    sig_prepared_by TEXT,
    sig_treasurer TEXT,
    sig_principal TEXT,
    sig_committee_chair TEXT,
    sig_foundation_chair TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS expense_items (
    id TEXT PRIMARY KEY,
    rab_id TEXT NOT NULL REFERENCES rab_data(id) ON DELETE CASCADE,
    kind TEXT NOT NULL CHECK (kind IN ('routine', 'incidental')),
    description TEXT NOT NULL,
    volume INTEGER NOT NULL DEFAULT 0,
    unit TEXT NOT NULL DEFAULT 'unit',
    unit_price INTEGER NOT NULL DEFAULT 0,
    amount INTEGER NOT NULL DEFAULT 0,
    fund_source TEXT NOT NULL DEFAULT 'other',
    estimated_week TEXT NOT NULL DEFAULT 'week_1',
    position INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS rab_realizations (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    rab_id TEXT NOT NULL REFERENCES rab_data(id) ON DELETE CASCADE,
    status TEXT NOT NULL DEFAULT 'in_progress' CHECK (status IN ('in_progress', 'submitted', 'approved', 'completed')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS realization_items (
    id TEXT PRIMARY KEY,
    realization_id TEXT NOT NULL REFERENCES rab_realizations(id) ON DELETE CASCADE,
    expense_item_id TEXT NOT NULL,
    description TEXT NOT NULL,
    planned_amount INTEGER NOT NULL DEFAULT 0,
    actual_amount INTEGER NOT NULL DEFAULT 0,
    notes TEXT,
    position INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS memos (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
    memo_number TEXT NOT NULL,
    subject TEXT NOT NULL,
    date TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'final', 'sent_to_foundation')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS memo_tables (
    id TEXT PRIMARY KEY,
    memo_id TEXT NOT NULL REFERENCES memos(id) ON DELETE CASCADE,
    title TEXT,
    headers JSON NOT NULL DEFAULT '[]',
    rows JSON NOT NULL DEFAULT '[]',
    position INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_auth_sessions_user ON auth_sessions(user_id);
CREATE INDEX IF NOT EXISTS idx_reports_user ON reports(user_id);
CREATE INDEX IF NOT EXISTS idx_reports_status ON reports(status);
CREATE INDEX IF NOT EXISTS idx_activities_report ON activities(report_id);
CREATE INDEX IF NOT EXISTS idx_achievements_report ON achievements(report_id);
CREATE INDEX IF NOT EXISTS idx_rab_user ON rab_data(user_id);
CREATE INDEX IF NOT EXISTS idx_rab_status ON rab_data(status);
CREATE INDEX IF NOT EXISTS idx_expense_items_rab ON expense_items(rab_id);
CREATE INDEX IF NOT EXISTS idx_realizations_rab ON rab_realizations(rab_id);
CREATE INDEX IF NOT EXISTS idx_realization_items ON realization_items(realization_id);
CREATE INDEX IF NOT EXISTS idx_memos_user ON memos(user_id);
CREATE INDEX IF NOT EXISTS idx_memo_tables_memo ON memo_tables(memo_id);
"#;
