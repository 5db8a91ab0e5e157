use std::fs;
use std::fs::OpenOptions;

use env_logger::{Builder, Target};
use fabula_core::config::SystemConfig;

use crate::config_gen;

pub fn init() {
    let config_path = "config.toml";

    config_gen::ensure_config_exists(config_path);

    if let Err(e) = fabula_shared::config::init(config_path) {
        eprintln!("Config load warning: {}", e);
    }

    init_logger();
}

// The terminal presenter owns stdout, so logs go to file only.
fn init_logger() {
    let sys_cfg: SystemConfig = fabula_shared::config::get("system");
    if let Err(e) = fs::create_dir_all(&sys_cfg.log_path) {
        eprintln!("Failed to create log dir: {}", e);
    }

    let log_file_path = std::path::Path::new(&sys_cfg.log_path).join("fabula.log");

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .expect("Failed to open log file");

    Builder::from_env(env_logger::Env::default().default_filter_or(&sys_cfg.log_level))
        .target(Target::Pipe(Box::new(log_file)))
        .init();
}
