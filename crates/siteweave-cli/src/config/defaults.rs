use std::path::PathBuf;

pub fn default_timeout_ms() -> u64 {
    10_000
}

pub fn default_template_dir() -> PathBuf {
    PathBuf::from("templates")
}

pub fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

pub fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

pub fn default_port() -> u16 {
    3000
}

pub fn default_debounce_ms() -> u64 {
    500
}

pub fn default_reload_delay_ms() -> u64 {
    500
}

pub fn default_reattach_delay_ms() -> u64 {
    3_000
}
