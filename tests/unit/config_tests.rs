// Configuration unit tests
//
// Engine config loading and the persisted YAML form of watermark specs.

use photomark::config::*;
use photomark::watermark::{
    DateFormat, ImageWatermarkStyle, OutputFormat, PositionSpec, ScaleMode, TextStyle,
    WatermarkPosition, WatermarkSpec,
};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_can_deserialize_minimal_yaml_config() {
    let config = EngineConfig::from_yaml_with_env("base_padding: 4\n").unwrap();
    assert_eq!(config.base_padding, 4);
    assert!(config.system_fonts);
    assert!(config.font_dirs.is_empty());
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_empty_document_is_all_defaults() {
    assert_eq!(
        EngineConfig::from_yaml_with_env("  \n").unwrap(),
        EngineConfig::default()
    );
}

#[test]
fn test_full_config_parses() {
    let yaml = r#"
font_dirs:
  - /opt/fonts
  - ./fonts
system_fonts: false
base_padding: 16
output_format: webp
logging:
  level: photomark=debug
  format: pretty
"#;
    let config = EngineConfig::from_yaml_with_env(yaml).unwrap();
    assert_eq!(config.font_dirs.len(), 2);
    assert!(!config.system_fonts);
    assert_eq!(config.base_padding, 16);
    assert_eq!(config.output_format, Some(OutputFormat::Webp));
    assert_eq!(config.logging.format, LogFormat::Pretty);
    config.validate().unwrap();
}

#[test]
fn test_env_var_substitution_in_font_dirs() {
    std::env::set_var("PHOTOMARK_TEST_FONT_ROOT", "/srv/fonts");
    let yaml = "font_dirs:\n  - ${PHOTOMARK_TEST_FONT_ROOT}/brand\n";
    let config = EngineConfig::from_yaml_with_env(yaml).unwrap();
    assert_eq!(
        config.font_dirs,
        vec![std::path::PathBuf::from("/srv/fonts/brand")]
    );
}

#[test]
fn test_missing_env_var_is_rejected() {
    let yaml = "default_font: ${PHOTOMARK_TEST_UNSET_VARIABLE}\n";
    match EngineConfig::from_yaml_with_env(yaml) {
        Err(ConfigError::MissingEnvVar(name)) => {
            assert_eq!(name, "PHOTOMARK_TEST_UNSET_VARIABLE")
        }
        other => panic!("expected MissingEnvVar, got {:?}", other),
    }
}

#[test]
fn test_unknown_output_format_is_a_parse_error() {
    let result = EngineConfig::from_yaml_with_env("output_format: gif\n");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_from_file_reads_yaml() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "base_padding: 0").unwrap();
    writeln!(file, "logging:\n  level: warn").unwrap();

    let config = EngineConfig::from_file(file.path()).unwrap();
    assert_eq!(config.base_padding, 0);
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_from_file_missing_path_is_io_error() {
    let result = EngineConfig::from_file("/nonexistent/photomark.yaml");
    match result {
        Err(err @ ConfigError::Io { .. }) => {
            assert!(err.to_string().contains("/nonexistent/photomark.yaml"))
        }
        other => panic!("expected Io error, got {:?}", other),
    }
}

#[test]
fn test_validate_rejects_bad_values() {
    let padding = EngineConfig {
        base_padding: 5000,
        ..EngineConfig::default()
    };
    assert!(padding.validate().is_err());

    let missing_font = EngineConfig {
        default_font: Some("/nonexistent/font.ttf".into()),
        ..EngineConfig::default()
    };
    assert!(missing_font.validate().is_err());

    let bad_level = EngineConfig {
        logging: LogConfig {
            level: "photomark=loud".to_string(),
            format: LogFormat::Json,
        },
        ..EngineConfig::default()
    };
    assert!(bad_level.validate().is_err());
}

#[test]
fn test_text_spec_yaml_uses_kebab_case() {
    let yaml = r##"
type: text
text: "Copyright 2025"
color: "#FFCC00"
alpha: 0.6
rotation: -45
stroke:
  width: 3
"##;
    let spec: WatermarkSpec = serde_yaml::from_str(yaml).unwrap();
    let WatermarkSpec::Text(style) = spec else {
        panic!("expected a text spec");
    };
    assert_eq!(style.text, "Copyright 2025");
    assert_eq!(style.color, "#FFCC00");
    assert_eq!(style.rotation, -45.0);
    assert_eq!(style.stroke.unwrap().width, 3);
    assert!(style.shadow.is_none());
}

#[test]
fn test_image_spec_yaml_scale_modes() {
    let yaml = r#"
type: image
path: /brand/logo.png
scale:
  mode: pixel-exact
  width: 300
  height: 120
flip_horizontal: true
"#;
    let spec: WatermarkSpec = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(
        spec,
        WatermarkSpec::Image(ImageWatermarkStyle {
            scale: ScaleMode::PixelExact {
                width: 300,
                height: 120,
                keep_aspect_ratio: true
            },
            flip_horizontal: true,
            ..ImageWatermarkStyle::new("/brand/logo.png")
        })
    );

    let adaptive: ScaleMode = serde_yaml::from_str("mode: adaptive-to-target").unwrap();
    assert_eq!(adaptive, ScaleMode::AdaptiveToTarget);
}

#[test]
fn test_timestamp_spec_yaml_flattens_style() {
    let yaml = r#"
type: timestamp
captured_at: "2023-12-31T23:59:00"
date_format: mmm-dd-yyyy
size: 32
"#;
    let spec: WatermarkSpec = serde_yaml::from_str(yaml).unwrap();
    let WatermarkSpec::Timestamp(timestamp) = spec else {
        panic!("expected a timestamp spec");
    };
    assert_eq!(timestamp.date_format, DateFormat::MmmDdYyyy);
    let style = timestamp.to_text_style().unwrap();
    assert_eq!(style.text, "Dec 31, 2023");
    assert_eq!(style.size, Some(32));
}

#[test]
fn test_position_spec_persists_anchor_name() {
    let position = PositionSpec::anchored(WatermarkPosition::CenterLeft, 12);
    let yaml = serde_yaml::to_string(&position).unwrap();
    assert!(yaml.contains("anchor: center-left"));
    assert!(!yaml.contains("custom"));

    let back: PositionSpec = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(back, position);

    let text = TextStyle::new("x");
    let yaml = serde_yaml::to_string(&text).unwrap();
    assert!(!yaml.contains("font_path"));
}
