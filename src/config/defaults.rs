pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_port() -> u16 {
    8080
}

pub fn default_environment() -> String {
    "development".to_string()
}

pub fn default_logging_level() -> String {
    "info".to_string()
}

pub fn default_logging_json_format() -> bool {
    true
}

pub fn default_db_max_connections() -> u32 {
    10
}

pub fn default_db_min_connections() -> u32 {
    1
}

pub fn default_db_acquire_timeout_seconds() -> u64 {
    10
}

pub fn default_db_idle_timeout_seconds() -> u64 {
    600
}

pub fn default_db_max_lifetime_seconds() -> u64 {
    1800
}

pub fn default_db_test_before_acquire() -> bool {
    true
}

pub fn default_store_op_timeout_ms() -> u64 {
    2_000
}

pub fn default_store_scan_batch() -> usize {
    200
}

pub fn default_store_cleanup_interval_seconds() -> u64 {
    3_600
}

pub fn default_jwt_kid() -> String {
    "v1".to_string()
}

pub fn default_jwt_expiration_seconds() -> u64 {
    86_400
}

pub fn default_jwt_remember_expiration_seconds() -> u64 {
    604_800
}

pub fn default_refresh_token_expiration_days() -> u64 {
    30
}

pub fn default_cors_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

pub fn default_metrics_allow_private_only() -> bool {
    true
}

pub fn default_throttle_window_seconds() -> u64 {
    60
}

pub fn default_loop_max_attempts() -> u32 {
    5
}

pub fn default_loop_window_ms() -> u64 {
    2_000
}

pub fn default_loop_block_seconds() -> u64 {
    30
}

pub fn default_throttle_retention_seconds() -> u64 {
    300
}

pub fn default_throttle_max_tracked_keys() -> usize {
    10_000
}

pub fn default_throttle_sweep_interval_seconds() -> u64 {
    60
}

pub fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
