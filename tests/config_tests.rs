use rust_slideshow::config::{
    ConfigFileSource, Configuration, SettingsOverrides, SettingsSource,
};
use rust_slideshow::sequencer::SelectionMode;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
photo-library-path: "/photos"
random: true
show-duration: 12s
fade-duration: 1500ms
random-seed: 7
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.photo_library_path, PathBuf::from("/photos"));
    assert!(cfg.random);
    assert_eq!(cfg.show_duration, Duration::from_secs(12));
    assert_eq!(cfg.fade_duration, Duration::from_millis(1500));
    assert_eq!(cfg.random_seed, Some(7));
}

#[test]
fn empty_config_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    assert_eq!(cfg, Configuration::default());
    assert_eq!(cfg.photo_library_path, PathBuf::from("."));
    assert!(!cfg.random);
    assert_eq!(cfg.show_duration, Duration::from_secs(5));
    assert_eq!(cfg.fade_duration, Duration::from_secs(5));
    assert_eq!(cfg.random_seed, None);
}

#[test]
fn unknown_keys_are_rejected() {
    let yaml = r#"
photo-library-path: "/photos"
showtime: 5
"#;
    assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());
}

#[test]
fn validation_rejects_empty_dir_and_huge_fade() {
    let cfg = Configuration {
        photo_library_path: PathBuf::new(),
        ..Configuration::default()
    };
    assert!(cfg.validated().is_err());

    let cfg = Configuration {
        fade_duration: Duration::from_secs(2 * 60 * 60),
        ..Configuration::default()
    };
    assert!(cfg.validated().is_err());

    assert!(Configuration::default().validated().is_ok());
}

#[test]
fn settings_project_mode_and_durations() {
    let cfg = Configuration {
        photo_library_path: PathBuf::from("/pics"),
        random: true,
        show_duration: Duration::from_secs(9),
        fade_duration: Duration::from_secs(2),
        random_seed: None,
    };
    let settings = cfg.settings();
    assert_eq!(settings.photo_dir, PathBuf::from("/pics"));
    assert_eq!(settings.mode, SelectionMode::Random);
    assert_eq!(settings.show_duration, Duration::from_secs(9));
    assert_eq!(settings.fade_duration, Duration::from_secs(2));
}

#[test]
fn overrides_win_over_file_values() {
    let overrides = SettingsOverrides {
        photo_dir: Some(PathBuf::from("/override")),
        random: Some(false),
        show_duration: None,
        fade_duration: Some(Duration::from_secs(1)),
        random_seed: Some(42),
    };
    let cfg = overrides.apply(Configuration {
        photo_library_path: PathBuf::from("/file"),
        random: true,
        show_duration: Duration::from_secs(30),
        fade_duration: Duration::from_secs(8),
        random_seed: None,
    });
    assert_eq!(cfg.photo_library_path, PathBuf::from("/override"));
    assert!(!cfg.random);
    assert_eq!(cfg.show_duration, Duration::from_secs(30));
    assert_eq!(cfg.fade_duration, Duration::from_secs(1));
    assert_eq!(cfg.random_seed, Some(42));
}

#[test]
fn file_source_reports_only_changes_and_survives_bad_edits() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("slideshow.yaml");
    fs::write(&path, "photo-library-path: /a\nshow-duration: 3s\n").unwrap();

    let (mut source, cfg) = ConfigFileSource::open(&path, SettingsOverrides::default()).unwrap();
    assert_eq!(cfg.photo_library_path, PathBuf::from("/a"));
    assert_eq!(source.refresh(), None, "unchanged file should not report");

    fs::write(&path, "photo-library-path: /b\nrandom: true\n").unwrap();
    let updated = source.refresh().expect("changed file should report");
    assert_eq!(updated.photo_dir, PathBuf::from("/b"));
    assert_eq!(updated.mode, SelectionMode::Random);
    assert_eq!(updated.show_duration, Duration::from_secs(5));

    fs::write(&path, "photo-library-path: [not, a, path\n").unwrap();
    assert_eq!(source.refresh(), None, "broken file keeps previous settings");
}

#[test]
fn file_source_keeps_cli_overrides_across_reloads() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("slideshow.yaml");
    fs::write(&path, "fade-duration: 2s\n").unwrap();

    let overrides = SettingsOverrides {
        photo_dir: Some(PathBuf::from("/cli")),
        ..SettingsOverrides::default()
    };
    let (mut source, cfg) = ConfigFileSource::open(&path, overrides).unwrap();
    assert_eq!(cfg.photo_library_path, PathBuf::from("/cli"));

    fs::write(&path, "photo-library-path: /file\nfade-duration: 4s\n").unwrap();
    let updated = source.refresh().unwrap();
    assert_eq!(updated.photo_dir, PathBuf::from("/cli"));
    assert_eq!(updated.fade_duration, Duration::from_secs(4));
}

#[test]
fn open_fails_for_missing_file() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("missing.yaml");
    assert!(ConfigFileSource::open(missing, SettingsOverrides::default()).is_err());
}
