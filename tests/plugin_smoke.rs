//! Builds a full `App` around `RainydeskPlugin` and runs it for a handful
//! of frames, checking that the whole orchestrator schedule wires up
//! without panicking and that every resource it's supposed to install is
//! actually present afterward.

use bevy::audio::AudioPlugin;
use bevy::prelude::*;
use rainydesk::prelude::*;

fn build_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(AssetPlugin::default())
        .add_plugins(AudioPlugin::default())
        .add_plugins(RainydeskPlugin {
            settings: RainydeskSettings {
                displays: vec![DisplayInfo {
                    id: 0,
                    x: 0.0,
                    y: 0.0,
                    width: 800.0,
                    height: 600.0,
                    scale_factor: 1.0,
                }],
                document_path: None,
                autosave_interval_s: 5.0,
                ir_manifest_path: None,
            },
        });
    app
}

#[test]
fn plugin_installs_every_expected_resource() {
    let mut app = build_app();
    app.update();

    assert!(app.world().contains_resource::<VirtualDesktop>());
    assert!(app.world().contains_resource::<RainscapeConfig>());
}

#[test]
fn several_frames_run_without_panicking() {
    let mut app = build_app();
    for _ in 0..10 {
        app.update();
    }
    let vd = app.world().resource::<VirtualDesktop>();
    assert_eq!(vd.monitors.len(), 1);
}
