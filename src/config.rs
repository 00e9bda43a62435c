use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub max_concurrent: usize,
    pub page_size: u32,
    pub pipe_capacity: usize,
    pub compression_level: u32,
    pub retry_after_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub export: ExportConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        let defaults: &str = include_str!("../config/default.toml");
        match ::config::Config::builder()
            .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
            .build()
        {
            Ok(cfg) => match cfg.try_deserialize() {
                Ok(app_cfg) => app_cfg,
                Err(e) => {
                    eprintln!("FATAL: Failed to deserialize default config: {}", e);
                    panic!("Failed to deserialize default config: {}", e);
                }
            },
            Err(e) => {
                eprintln!("FATAL: Failed to parse default config: {}", e);
                panic!("Failed to parse default config: {}", e);
            }
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        // Mirror defaults from config/default.toml
        Self {
            max_concurrent: 4,
            page_size: 100,
            pipe_capacity: 1,
            compression_level: 6,
            retry_after_seconds: 5,
        }
    }
}

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let defaults: &str = include_str!("../config/default.toml");
    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
        // Optional local file: bildwald.toml (in CWD)
        .add_source(::config::File::with_name("bildwald").required(false));

    if let Ok(custom_path) = std::env::var("BILDWALD_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(::config::Environment::with_prefix("BILDWALD").separator("__"));

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub(crate) fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }

    if cfg.storage.root.as_os_str().is_empty() {
        return Err(anyhow::anyhow!("storage.root must not be empty"));
    }

    let ex = &cfg.export;
    if ex.max_concurrent == 0 || ex.max_concurrent > 256 {
        return Err(anyhow::anyhow!("export.max_concurrent must be in 1..=256"));
    }
    if ex.page_size == 0 || ex.page_size > 1000 {
        return Err(anyhow::anyhow!("export.page_size must be in 1..=1000"));
    }
    if ex.pipe_capacity == 0 {
        return Err(anyhow::anyhow!("export.pipe_capacity must be > 0"));
    }
    if ex.compression_level > 9 {
        return Err(anyhow::anyhow!("export.compression_level must be in 0..=9"));
    }

    Ok(())
}

pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    if let Some(path) = url.strip_prefix("sqlite://") {
        let p = Path::new(path);
        if let Some(parent) = p.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
