pub const SCHEMA: &str = r#"
-- Photos: one logical capture event
CREATE TABLE IF NOT EXISTS photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    photo_uid TEXT NOT NULL UNIQUE,
    photo_path TEXT NOT NULL DEFAULT '',
    photo_name TEXT NOT NULL DEFAULT '',
    original_name TEXT NOT NULL DEFAULT '',

    photo_title TEXT NOT NULL DEFAULT '',
    title_src TEXT NOT NULL DEFAULT 'auto',
    photo_description TEXT NOT NULL DEFAULT '',
    description_src TEXT NOT NULL DEFAULT 'auto',

    taken_at TEXT,
    taken_at_local TEXT,
    taken_src TEXT NOT NULL DEFAULT 'auto',
    time_zone TEXT NOT NULL DEFAULT '',
    photo_year INTEGER NOT NULL DEFAULT 0,
    photo_month INTEGER NOT NULL DEFAULT 0,
    photo_day INTEGER NOT NULL DEFAULT 0,

    photo_lat REAL NOT NULL DEFAULT 0,
    photo_lng REAL NOT NULL DEFAULT 0,
    photo_altitude INTEGER NOT NULL DEFAULT 0,
    location_src TEXT NOT NULL DEFAULT 'auto',
    place_id TEXT NOT NULL DEFAULT '',

    camera_id INTEGER NOT NULL DEFAULT 1,
    lens_id INTEGER NOT NULL DEFAULT 1,
    camera_src TEXT NOT NULL DEFAULT 'auto',
    camera_serial TEXT NOT NULL DEFAULT '',
    focal_length REAL NOT NULL DEFAULT 0,
    f_number REAL NOT NULL DEFAULT 0,
    iso INTEGER NOT NULL DEFAULT 0,
    exposure TEXT NOT NULL DEFAULT '',

    photo_type TEXT NOT NULL DEFAULT 'image',
    photo_resolution INTEGER NOT NULL DEFAULT 0,
    photo_private INTEGER NOT NULL DEFAULT 0,
    photo_quality INTEGER NOT NULL DEFAULT 0,
    document_id TEXT NOT NULL DEFAULT '',

    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT,
    deleted_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_photos_path_name ON photos(photo_path, photo_name);
CREATE INDEX IF NOT EXISTS idx_photos_location ON photos(photo_lat, photo_lng, taken_at);
CREATE INDEX IF NOT EXISTS idx_photos_document ON photos(document_id);
CREATE INDEX IF NOT EXISTS idx_photos_quality ON photos(photo_quality);

-- Details: free-text companion of a photo
CREATE TABLE IF NOT EXISTS details (
    photo_id INTEGER PRIMARY KEY,
    keywords TEXT NOT NULL DEFAULT '',
    notes TEXT NOT NULL DEFAULT '',
    subject TEXT NOT NULL DEFAULT '',
    artist TEXT NOT NULL DEFAULT '',
    copyright TEXT NOT NULL DEFAULT ''
);

-- Files: physical renditions belonging to photos
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_uid TEXT NOT NULL UNIQUE,
    photo_id INTEGER NOT NULL DEFAULT 0,
    photo_uid TEXT NOT NULL DEFAULT '',

    file_root TEXT NOT NULL DEFAULT '/',
    file_name TEXT NOT NULL,
    original_name TEXT NOT NULL DEFAULT '',

    file_hash TEXT NOT NULL DEFAULT '',
    file_size INTEGER NOT NULL DEFAULT 0,
    file_modified TEXT,

    file_type TEXT NOT NULL DEFAULT '',
    file_mime TEXT NOT NULL DEFAULT '',
    file_codec TEXT NOT NULL DEFAULT '',
    file_orientation INTEGER NOT NULL DEFAULT 0,

    file_width INTEGER NOT NULL DEFAULT 0,
    file_height INTEGER NOT NULL DEFAULT 0,
    file_aspect_ratio REAL NOT NULL DEFAULT 0,
    file_portrait INTEGER NOT NULL DEFAULT 0,
    file_duration_ms INTEGER NOT NULL DEFAULT 0,

    file_main_color TEXT NOT NULL DEFAULT '',
    file_colors TEXT NOT NULL DEFAULT '',
    file_luminance TEXT NOT NULL DEFAULT '',
    file_chroma INTEGER NOT NULL DEFAULT 0,
    file_diff INTEGER NOT NULL DEFAULT 0,

    file_primary INTEGER NOT NULL DEFAULT 0,
    file_sidecar INTEGER NOT NULL DEFAULT 0,
    file_video INTEGER NOT NULL DEFAULT 0,
    file_missing INTEGER NOT NULL DEFAULT 0,
    file_error TEXT NOT NULL DEFAULT '',

    instance_id TEXT NOT NULL DEFAULT '',
    created_in_ms INTEGER NOT NULL DEFAULT 0,
    updated_in_ms INTEGER NOT NULL DEFAULT 0,

    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    deleted_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_files_name ON files(file_name);
CREATE UNIQUE INDEX IF NOT EXISTS idx_files_hash
    ON files(file_hash) WHERE deleted_at IS NULL AND file_hash != '';
CREATE INDEX IF NOT EXISTS idx_files_photo ON files(photo_id);
CREATE INDEX IF NOT EXISTS idx_files_instance ON files(instance_id);

-- Reference entities, resolved first-or-create
CREATE TABLE IF NOT EXISTS cameras (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    camera_slug TEXT NOT NULL UNIQUE,
    camera_make TEXT NOT NULL DEFAULT '',
    camera_model TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS lenses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    lens_slug TEXT NOT NULL UNIQUE,
    lens_make TEXT NOT NULL DEFAULT '',
    lens_model TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS places (
    id TEXT PRIMARY KEY,
    place_label TEXT NOT NULL DEFAULT '',
    place_city TEXT NOT NULL DEFAULT '',
    place_state TEXT NOT NULL DEFAULT '',
    place_country TEXT NOT NULL DEFAULT '',
    place_keywords TEXT NOT NULL DEFAULT '',
    place_favorite INTEGER NOT NULL DEFAULT 0
);

-- Labels accumulate per photo and are never removed by re-indexing
CREATE TABLE IF NOT EXISTS labels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    label_slug TEXT NOT NULL UNIQUE,
    label_name TEXT NOT NULL DEFAULT '',
    label_priority INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS photo_labels (
    photo_id INTEGER NOT NULL,
    label_id INTEGER NOT NULL,
    uncertainty INTEGER NOT NULL DEFAULT 100,
    source TEXT NOT NULL DEFAULT 'image',
    PRIMARY KEY (photo_id, label_id)
);

-- Keyword index derived from details.keywords
CREATE TABLE IF NOT EXISTS keywords (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    keyword TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS photo_keywords (
    photo_id INTEGER NOT NULL,
    keyword_id INTEGER NOT NULL,
    PRIMARY KEY (photo_id, keyword_id)
);

-- Ingest provenance: the name a file was downloaded under
CREATE TABLE IF NOT EXISTS downloads (
    file_name TEXT PRIMARY KEY,
    file_id INTEGER NOT NULL
);
"#;

/// Idempotent statements run after the schema, seeding sentinel rows.
pub const MIGRATIONS: &[&str] = &[
    "INSERT OR IGNORE INTO cameras (id, camera_slug, camera_make, camera_model) VALUES (1, 'zz', '', 'Unknown')",
    "INSERT OR IGNORE INTO lenses (id, lens_slug, lens_make, lens_model) VALUES (1, 'zz', '', 'Unknown')",
    "INSERT OR IGNORE INTO places (id, place_label, place_country) VALUES ('zz', 'Unknown', 'zz')",
];
