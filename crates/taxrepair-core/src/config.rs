//! Centralized configuration constants for the taxonomy repair engine.

use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "Taxonomy Repair";
    pub const DEFAULT_DB_FILENAME: &'static str = "wordpress.sqlite";
}

/// Defaults for the host data store.
pub struct StoreDefaults;

impl StoreDefaults {
    pub const TABLE_PREFIX: &'static str = "wp_";
    pub const BUSY_TIMEOUT: Duration = Duration::from_secs(30);
    pub const TERMS_TABLE: &'static str = "terms";
    pub const TERM_TAXONOMY_TABLE: &'static str = "term_taxonomy";
    pub const RELATIONSHIPS_TABLE: &'static str = "term_relationships";
}

/// Taxonomies a stock install registers.
pub struct TaxonomyDefaults;

impl TaxonomyDefaults {
    pub const CORE_TAXONOMIES: [&'static str; 5] = [
        "category",
        "post_tag",
        "nav_menu",
        "link_category",
        "post_format",
    ];
}
