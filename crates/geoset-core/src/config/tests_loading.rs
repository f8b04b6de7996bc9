//! Loading-focused tests for configuration
//!
//! File parsing, layering, environment and CLI overrides.

#[cfg(test)]
mod loading_tests {
    use std::path::{Path, PathBuf};

    use crate::{
        config::{load_config, load_toml_table, Config, Overrides, SourceConfig},
        coordination::CeilingPolicy,
        geo::TileServer,
        output::Compression,
        Error, Result,
    };

    const GRID_CONFIG: &str = r#"
[run]
batch_size = 25
num_workers = 3

[queue]
max_unprocessed = 4
db_path = "state/queue.db"
ceiling = "unprocessed"

[source]
type = "grid"
bbox = [28.9, 41.0, 29.1, 41.1]
spacing = 0.01
start_id = 1000

[[modalities]]
name = "satellite"
zoom_level = 17
tile_server = "osm"
"#;

    fn write_config(dir: &Path, content: &str) -> Result<PathBuf> {
        let path = dir.join("geoset.toml");
        std::fs::write(&path, content)?;
        Ok(path)
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.queue.max_unprocessed, 10);
        assert_eq!(config.queue.db_path, PathBuf::from("output_queue.db"));
        assert_eq!(config.queue.ceiling, CeilingPolicy::Pending);
        assert_eq!(config.run.batch_size, 100);
        assert_eq!(config.run.num_workers, 1);
        assert_eq!(config.busy_timeout().as_secs(), 30);
        assert_eq!(config.poll_interval().as_millis(), 1000);
    }

    #[test]
    fn test_parse_grid_config() -> Result<()> {
        let config = Config::from_toml_str(GRID_CONFIG)?;
        assert_eq!(config.run.batch_size, 25);
        assert_eq!(config.queue.ceiling, CeilingPolicy::Unprocessed);
        // Unset keys keep their defaults
        assert_eq!(config.queue.poll_interval_ms, 1000);

        let Some(SourceConfig::Grid(grid)) = &config.source else {
            return Err(Error::config("expected grid source"));
        };
        assert_eq!(grid.start_id, 1000);
        assert_eq!(grid.start_label, 0);
        assert!(!grid.incremental);

        let modality = &config.modalities[0];
        assert_eq!(modality.kind, "tms");
        assert!((modality.bbox_size - 0.001).abs() < f64::EPSILON);
        assert_eq!(modality.tile_server, TileServer::Osm);
        assert!(modality.blank_on_fetch_error);
        Ok(())
    }

    #[test]
    fn test_parse_file_source_defaults_columns() -> Result<()> {
        let config = Config::from_toml_str(
            "[source]\ntype = \"file\"\npath = \"points.geojson\"\nlabel_column = \"class\"\n",
        )?;
        let Some(SourceConfig::File(file)) = config.source else {
            return Err(Error::config("expected file source"));
        };
        assert_eq!(file.id_column, "id");
        assert_eq!(file.label_column, "class");
        Ok(())
    }

    #[test]
    fn test_unknown_enum_values_are_config_errors() {
        let bad_server = "[[modalities]]\nname = \"m\"\ntile_server = \"nope\"\n";
        assert!(matches!(Config::from_toml_str(bad_server), Err(Error::Config(_))));

        let bad_ceiling = "[queue]\nceiling = \"everything\"\n";
        assert!(matches!(Config::from_toml_str(bad_ceiling), Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_toml_returns_parse_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_config(dir.path(), "run = \n invalid toml [[[")?;
        assert!(matches!(load_toml_table(&path), Err(Error::Parse(_))));
        Ok(())
    }

    #[test]
    fn test_directory_is_not_a_config_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        assert!(matches!(load_toml_table(dir.path()), Err(Error::Config(_))));
        Ok(())
    }

    #[test]
    fn test_load_explicit_file_with_overrides() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_config(dir.path(), GRID_CONFIG)?;
        let overrides = Overrides {
            max_unprocessed: Some(7),
            queue_db: Some(PathBuf::from("other.db")),
            batch_size: None,
            num_workers: Some(2),
        };

        let config = load_config(Some(&path), &overrides)?;
        assert_eq!(config.queue.max_unprocessed, 7);
        assert_eq!(config.queue.db_path, PathBuf::from("other.db"));
        assert_eq!(config.run.batch_size, 25);
        assert_eq!(config.run.num_workers, 2);
        Ok(())
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let result = load_config(Some(Path::new("/nonexistent/geoset.toml")), &Overrides::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_env_overrides() -> Result<()> {
        let config = Config::default().apply_env_with(|name| match name {
            "GEOSET_MAX_UNPROCESSED" => Some("3".to_string()),
            "GEOSET_QUEUE_DB" => Some("/tmp/q.db".to_string()),
            "GEOSET_BATCH_SIZE" => Some(" 50 ".to_string()),
            _ => None,
        })?;
        assert_eq!(config.queue.max_unprocessed, 3);
        assert_eq!(config.queue.db_path, PathBuf::from("/tmp/q.db"));
        assert_eq!(config.run.batch_size, 50);
        assert_eq!(config.run.num_workers, 1);
        Ok(())
    }

    #[test]
    fn test_invalid_env_value() {
        let result = Config::default().apply_env_with(|name| {
            (name == "GEOSET_NUM_WORKERS").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));

        let empty = Config::default()
            .apply_env_with(|name| (name == "GEOSET_QUEUE_DB").then(String::new));
        assert!(empty.is_err());
    }

    #[test]
    fn test_output_compression_parses() -> Result<()> {
        let config = Config::from_toml_str("[output]\ncompress = \"deflate\"\n")?;
        assert_eq!(config.output.map(|o| o.compress), Some(Compression::Deflate));
        Ok(())
    }
}
