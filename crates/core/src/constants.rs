/// Constants used throughout the coldstore codebase
// On-disk layout
pub const CACHE_DIR_NAME: &str = "coldstore_cache";
pub const COLLECTIONS_DIR_NAME: &str = "collections";
pub const ENTRY_EXTENSION: &str = "json";
// Longest file stem kept readable; longer keys are stored under a digest
pub const MAX_ENTRY_STEM_LEN: usize = 200;
pub const HASHED_STEM_PREFIX: &str = "%H";

// Default byte ceiling for persisted entries (100 MiB)
pub const DEFAULT_MAX_CACHE_BYTES: u64 = 100 * 1024 * 1024;

// Portable encoding tags
pub const TYPE_TAG: &str = "__type__";
pub const TAG_TIMESTAMP: &str = "timestamp";
pub const TAG_GEO_POINT: &str = "geopoint";
pub const TAG_REFERENCE: &str = "reference";
pub const TAG_ARRAY: &str = "array";
pub const TAG_DOUBLE: &str = "double";
pub const TAG_MAP: &str = "map";

// Environment variable names
pub const COLDSTORE_CACHE_DIR_VAR: &str = "COLDSTORE_CACHE_DIR";
pub const COLDSTORE_AUTO_WATCH_VAR: &str = "COLDSTORE_AUTO_WATCH";
pub const COLDSTORE_CACHE_UNLIMITED_VAR: &str = "COLDSTORE_CACHE_UNLIMITED";
pub const COLDSTORE_MAX_CACHE_BYTES_VAR: &str = "COLDSTORE_MAX_CACHE_BYTES";
pub const COLDSTORE_LOG_VAR: &str = "COLDSTORE_LOG";
