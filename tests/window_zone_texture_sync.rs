//! Drives `RainydeskPlugin` through a window-geometry push and checks the
//! Texture Layer actually reacts: a zone naming a material gets a resident
//! `TextureVoice`, and the LRU cache evicts once capacity is exceeded.

use bevy::audio::AudioPlugin;
use bevy::prelude::*;
use rainydesk::audio::layers::texture::TEXTURE_CACHE_CAPACITY;
use rainydesk::audio::layers::TextureVoice;
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

fn zone_with_material(material: &str) -> WindowZone {
    WindowZone {
        x: 10.0,
        y: 10.0,
        width: 200.0,
        height: 150.0,
        title: None,
        material: Some(material.to_string()),
        is_maximized: false,
        kind: WindowZoneKind::Normal,
    }
}

fn live_texture_voice_count(app: &mut App) -> usize {
    let world = app.world_mut();
    let mut query = world.query::<&TextureVoice>();
    query.iter(world).count()
}

#[test]
fn a_zone_naming_a_material_gets_a_resident_texture_voice() {
    let mut app = build_app();
    app.update();

    app.world_mut().resource_mut::<WindowZones>().0 = vec![zone_with_material("glass")];
    app.update();
    app.update();

    assert_eq!(live_texture_voice_count(&mut app), 1);
}

#[test]
fn pushing_the_same_zones_again_does_not_spawn_duplicates() {
    let mut app = build_app();
    app.update();

    app.world_mut().resource_mut::<WindowZones>().0 = vec![zone_with_material("glass")];
    app.update();

    app.world_mut().resource_mut::<WindowZones>().0 = vec![zone_with_material("glass")];
    app.update();
    app.update();

    assert_eq!(live_texture_voice_count(&mut app), 1);
}

#[test]
fn exceeding_cache_capacity_evicts_down_to_the_limit() {
    let mut app = build_app();
    app.update();

    let zones: Vec<WindowZone> = (0..(TEXTURE_CACHE_CAPACITY + 3))
        .map(|i| zone_with_material(&format!("mat{i}")))
        .collect();
    app.world_mut().resource_mut::<WindowZones>().0 = zones;
    app.update();
    app.update();

    assert_eq!(live_texture_voice_count(&mut app), TEXTURE_CACHE_CAPACITY);
}
