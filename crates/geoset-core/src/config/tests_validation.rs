//! Validation and per-modality resolution tests

#[cfg(test)]
mod validation_tests {
    use std::path::PathBuf;

    use crate::{
        config::{Config, OutputConfig},
        output::{Compression, OutputFormat},
        Error, Result,
    };

    fn grid_config(extra: &str) -> Result<Config> {
        Config::from_toml_str(&format!(
            "[source]\ntype = \"grid\"\nbbox = [0.0, 0.0, 1.0, 1.0]\nspacing = 0.5\n{extra}"
        ))
    }

    #[test]
    fn test_valid_minimal_config() -> Result<()> {
        grid_config("")?.validate()
    }

    #[test]
    fn test_missing_source_rejected() {
        assert!(matches!(Config::default().validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_values_rejected() -> Result<()> {
        let mut config = grid_config("")?;
        config.run.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = grid_config("")?;
        config.run.num_workers = 0;
        assert!(config.validate().is_err());

        let mut config = grid_config("")?;
        config.queue.max_unprocessed = 0;
        assert!(config.validate().is_err());
        Ok(())
    }

    #[test]
    fn test_grid_requires_bbox_or_region() -> Result<()> {
        let config = Config::from_toml_str("[source]\ntype = \"grid\"\nspacing = 0.1\n")?;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let with_region = Config::from_toml_str(
            "[source]\ntype = \"grid\"\nspacing = 0.1\n\
             [source.region]\npath = \"countries.geojson\"\ncolumn = \"NAME\"\nvalue = \"Turkey\"\n",
        )?;
        with_region.validate()
    }

    #[test]
    fn test_grid_spacing_and_bbox_order() -> Result<()> {
        let zero_spacing = Config::from_toml_str(
            "[source]\ntype = \"grid\"\nbbox = [0.0, 0.0, 1.0, 1.0]\nspacing = 0.0\n",
        )?;
        assert!(zero_spacing.validate().is_err());

        let inverted = Config::from_toml_str(
            "[source]\ntype = \"grid\"\nbbox = [1.0, 0.0, 0.0, 1.0]\nspacing = 0.1\n",
        )?;
        assert!(inverted.validate().is_err());
        Ok(())
    }

    #[test]
    fn test_modality_ranges() -> Result<()> {
        let deep_zoom = grid_config("[[modalities]]\nname = \"m\"\nzoom_level = 23\n")?;
        assert!(deep_zoom.validate().is_err());

        let zero_bbox = grid_config("[[modalities]]\nname = \"m\"\nbbox_size = 0.0\n")?;
        assert!(zero_bbox.validate().is_err());

        let duplicate = grid_config("[[modalities]]\nname = \"m\"\n[[modalities]]\nname = \"m\"\n")?;
        assert!(duplicate.validate().is_err());
        Ok(())
    }

    #[test]
    fn test_output_resolution_defaults() -> Result<()> {
        let config = grid_config("[[modalities]]\nname = \"only\"\n")?;
        let output = config.output_for(&config.modalities[0])?;
        assert_eq!(output.format, OutputFormat::Tif);
        assert_eq!(output.dir, PathBuf::from("output"));
        assert_eq!(output.crs, "EPSG:4326");
        assert_eq!(output.compression, Compression::Lzw);
        Ok(())
    }

    #[test]
    fn test_output_resolution_prefers_modality_table() -> Result<()> {
        let config = grid_config(
            "[output]\nformat = \"tif\"\ndir = \"global\"\n\
             [[modalities]]\nname = \"a\"\n\
             [[modalities]]\nname = \"b\"\n[modalities.output]\nformat = \"archive\"\ndir = \"own\"\n",
        )?;

        let a = config.output_for(&config.modalities[0])?;
        assert_eq!(a.format, OutputFormat::Tif);
        assert_eq!(a.dir, PathBuf::from("global").join("a"));

        let b = config.output_for(&config.modalities[1])?;
        assert_eq!(b.format, OutputFormat::Archive);
        assert_eq!(b.dir, PathBuf::from("own").join("b"));
        Ok(())
    }

    #[test]
    fn test_unsupported_format_fails_only_on_resolution() -> Result<()> {
        let mut config = grid_config("[[modalities]]\nname = \"m\"\n")?;
        config.modalities[0].output = Some(OutputConfig {
            format: "h5".to_string(),
            ..OutputConfig::default()
        });
        config.validate()?;
        assert!(matches!(
            config.output_for(&config.modalities[0]),
            Err(Error::Config(_))
        ));
        Ok(())
    }
}
