//! A storm-scene `.rain` document, covering every sub-config (mixer buses,
//! matrix, thunder), should round-trip through `save`/`load` untouched, and
//! a document with a single corrupted bus should still load cleanly as a
//! whole-document parse failure falling back to defaults.

use rainydesk::config::{load, save, BusConfig, RainscapeConfig, WindConfig};

#[test]
fn full_storm_document_round_trips_every_sub_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storm.rain");

    let mut cfg = RainscapeConfig::default();
    cfg.sim.intensity = 0.95;
    cfg.winds.push(WindConfig { speed: 0.8, direction: 0.0 });
    cfg.thunder.mean_interval_s = 6.0;
    cfg.thunder.storm_intensity = 0.9;
    cfg.matrix.enabled = true;
    cfg.matrix.tempo_bpm = 90.0;
    cfg.mixer.master_gain = 0.8;
    cfg.mixer.thunder = BusConfig { gain: 1.2, ..Default::default() };
    cfg.mixer.matrix = BusConfig { gain: 0.0, muted: true, ..Default::default() };

    save(&path, &cfg).expect("save should succeed in a writable temp dir");
    let loaded = load(&path);

    assert_eq!(loaded.sim.intensity, 0.95);
    assert_eq!(loaded.winds[0].speed, 0.8);
    assert_eq!(loaded.thunder.mean_interval_s, 6.0);
    assert!(loaded.matrix.enabled);
    assert_eq!(loaded.matrix.tempo_bpm, 90.0);
    assert_eq!(loaded.mixer.master_gain, 0.8);
    assert_eq!(loaded.mixer.thunder.gain, 1.2);
    assert!(loaded.mixer.matrix.muted);
}

#[test]
fn truncated_document_falls_back_to_defaults_instead_of_panicking() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.rain");
    std::fs::write(&path, "{ \"sim\": { \"intensity\": 0.5, ").unwrap();

    let loaded = load(&path);
    assert_eq!(loaded.sim.intensity, RainscapeConfig::default().sim.intensity);
}

#[test]
fn save_overwrites_previous_document_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.rain");

    let mut first = RainscapeConfig::default();
    first.sim.intensity = 0.1;
    save(&path, &first).unwrap();

    let mut second = RainscapeConfig::default();
    second.sim.intensity = 0.9;
    save(&path, &second).unwrap();

    let loaded = load(&path);
    assert_eq!(loaded.sim.intensity, 0.9);
    assert!(!dir.path().join("scene.rain.tmp").exists());
}
