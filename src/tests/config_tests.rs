#[cfg(test)]
mod tests {
    use crate::config::{self, AppConfig, ExportConfig};
    use std::env;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "sqlite://data/bildwald.db");
        assert_eq!(config.storage.root, std::path::PathBuf::from("data/images"));
        assert_eq!(config.export.max_concurrent, 4);
        assert_eq!(config.export.pipe_capacity, 1);
        assert_eq!(config.export.compression_level, 6);
        assert_eq!(config.export.retry_after_seconds, 5);
    }

    #[test]
    fn test_export_default_matches_embedded_toml() {
        let embedded = AppConfig::default().export;
        let fallback = ExportConfig::default();
        assert_eq!(embedded.max_concurrent, fallback.max_concurrent);
        assert_eq!(embedded.page_size, fallback.page_size);
        assert_eq!(embedded.pipe_capacity, fallback.pipe_capacity);
        assert_eq!(embedded.compression_level, fallback.compression_level);
        assert_eq!(embedded.retry_after_seconds, fallback.retry_after_seconds);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(config::validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let cases: Vec<(fn(&mut AppConfig), &str)> = vec![
            (|c: &mut AppConfig| c.server.port = 0, "invalid server.port"),
            (|c: &mut AppConfig| c.storage.root = Default::default(), "storage.root"),
            (|c: &mut AppConfig| c.export.max_concurrent = 0, "export.max_concurrent"),
            (|c: &mut AppConfig| c.export.max_concurrent = 257, "export.max_concurrent"),
            (|c: &mut AppConfig| c.export.page_size = 0, "export.page_size"),
            (|c: &mut AppConfig| c.export.page_size = 1001, "export.page_size"),
            (|c: &mut AppConfig| c.export.pipe_capacity = 0, "export.pipe_capacity"),
            (|c: &mut AppConfig| c.export.compression_level = 10, "export.compression_level"),
        ];

        for (mutate, expected) in cases {
            let mut cfg = AppConfig::default();
            mutate(&mut cfg);
            let err = config::validate(&cfg).unwrap_err().to_string();
            assert!(err.contains(expected), "expected {:?} in {:?}", expected, err);
        }
    }

    #[test]
    fn test_file_and_env_layers() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[export]\nmax_concurrent = 9\nretry_after_seconds = 30").unwrap();

        env::set_var("BILDWALD_CONFIG", file.path());
        env::set_var("BILDWALD__EXPORT__RETRY_AFTER_SECONDS", "12");
        let result = config::load();
        env::remove_var("BILDWALD_CONFIG");
        env::remove_var("BILDWALD__EXPORT__RETRY_AFTER_SECONDS");

        let cfg = result.unwrap();
        assert_eq!(cfg.export.max_concurrent, 9);
        // Environment wins over the file
        assert_eq!(cfg.export.retry_after_seconds, 12);
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn test_ensure_sqlite_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("deeper").join("app.db");
        let url = format!("sqlite://{}", db.display());
        config::ensure_sqlite_parent_dir(&url).unwrap();
        assert!(db.parent().unwrap().is_dir());

        // Non-file URLs are left alone
        config::ensure_sqlite_parent_dir("sqlite::memory:").unwrap();
    }
}
