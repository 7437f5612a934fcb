//! Minimal host harness: one virtual display, default config, rain and
//! ambient layers running at their defaults. Mirrors the teacher's plain
//! `App::new().add_plugins(...)` main function shape.

use bevy::audio::AudioPlugin;
use bevy::prelude::*;
use rainydesk::prelude::*;

fn main() {
    App::new()
        .add_plugins(MinimalPlugins)
        .add_plugins(AssetPlugin::default())
        .add_plugins(AudioPlugin::default())
        .add_plugins(RainydeskPlugin {
            settings: RainydeskSettings {
                displays: vec![DisplayInfo {
                    id: 0,
                    x: 0.0,
                    y: 0.0,
                    width: 1920.0,
                    height: 1080.0,
                    scale_factor: 1.0,
                }],
                document_path: None,
                autosave_interval_s: 10.0,
                ir_manifest_path: None,
            },
        })
        .run();
}
