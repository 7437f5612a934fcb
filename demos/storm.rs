//! Heavier scenario harness: two displays, a maximized window acting as a
//! glass surface, storm-intensity config (heavy rain, high wind, frequent
//! thunder, matrix layer enabled) driven straight through `RainscapeConfig`
//! rather than loaded from disk.

use bevy::audio::AudioPlugin;
use bevy::prelude::*;
use rainydesk::prelude::*;

fn storm_config() -> RainscapeConfig {
    let mut config = RainscapeConfig::default();
    config.sim.intensity = 0.95;
    config.sim.wind_base = 0.6;
    config.sim.turbulence = 60.0;
    config.sheets = vec![rainydesk::config::schema::SheetConfig { intensity: 0.9, ..Default::default() }];
    config.winds = vec![rainydesk::config::schema::WindConfig { speed: 0.8, direction: 0.4 }];
    config.thunder.mean_interval_s = 6.0;
    config.thunder.storm_intensity = 0.8;
    config.matrix.enabled = true;
    config.matrix.intensity = 0.5;
    config
}

fn apply_storm_config(mut config: ResMut<RainscapeConfig>) {
    *config = storm_config();
}

fn main() {
    App::new()
        .add_plugins(MinimalPlugins)
        .add_plugins(AssetPlugin::default())
        .add_plugins(AudioPlugin::default())
        .add_plugins(RainydeskPlugin {
            settings: RainydeskSettings {
                displays: vec![
                    DisplayInfo {
                        id: 0,
                        x: 0.0,
                        y: 0.0,
                        width: 1920.0,
                        height: 1080.0,
                        scale_factor: 1.0,
                    },
                    DisplayInfo {
                        id: 1,
                        x: 1920.0,
                        y: 0.0,
                        width: 1280.0,
                        height: 1024.0,
                        scale_factor: 1.0,
                    },
                ],
                document_path: None,
                autosave_interval_s: 30.0,
                ir_manifest_path: None,
            },
        })
        .add_systems(Startup, apply_storm_config)
        .run();
}
