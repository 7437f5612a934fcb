use bevy::audio::AddAudioSource;
use bevy::prelude::*;

use crate::audio::dsp::source::ProceduralAudio;
use crate::audio::layers::IrManifest;
use crate::config::{PersistenceState, RainscapeConfig};
use crate::geometry::{DisplayInfo, VirtualDesktop};
use crate::orchestrator::{self, SimulatorRes};

/// Default pool sizing for the Lagrangian buffers (spec.md §3, "Drops" /
/// "Splashes" capacity defaults).
const DEFAULT_MAX_DROPS: usize = 4096;
const DEFAULT_MAX_SPLASHES: usize = 1024;

/// Everything a host needs to mount the engine: the initial display
/// layout, and where (if anywhere) to load/autosave a `.rain` document
/// (spec.md §6).
pub struct RainydeskSettings {
    pub displays: Vec<DisplayInfo>,
    pub document_path: Option<std::path::PathBuf>,
    pub autosave_interval_s: f32,
    /// Path to `ir-manifest.json` (spec.md §6, "Surface IR asset
    /// directory"). Left unset, the thunder layer falls back to
    /// [`crate::audio::layers::thunder::fallback_ir`] for every environment.
    pub ir_manifest_path: Option<std::path::PathBuf>,
}

impl Default for RainydeskSettings {
    fn default() -> Self {
        Self {
            displays: Vec::new(),
            document_path: None,
            autosave_interval_s: 10.0,
            ir_manifest_path: None,
        }
    }
}

/// Main plugin. Registers the procedural audio asset type, loads (or
/// defaults) the `.rain` document, constructs the simulator over the
/// host's reported displays, and wires the full orchestrator schedule
/// (spec.md §2, "Orchestrator").
pub struct RainydeskPlugin {
    pub settings: RainydeskSettings,
}

impl Default for RainydeskPlugin {
    fn default() -> Self {
        Self { settings: RainydeskSettings::default() }
    }
}

impl Plugin for RainydeskPlugin {
    fn build(&self, app: &mut App) {
        let vd = VirtualDesktop::from_displays(&self.settings.displays);
        let sim_res = SimulatorRes::new(&vd, DEFAULT_MAX_DROPS, DEFAULT_MAX_SPLASHES);

        let config = match &self.settings.document_path {
            Some(path) => crate::config::load(path),
            None => RainscapeConfig::default(),
        };
        let persistence_path = self
            .settings
            .document_path
            .clone()
            .unwrap_or_else(|| std::path::PathBuf::from("rainscape.rain"));

        let ir_manifest = match &self.settings.ir_manifest_path {
            Some(path) => IrManifest::load(path),
            None => IrManifest::default(),
        };

        app.insert_non_send_resource(sim_res)
            .insert_resource(vd)
            .insert_resource(config)
            .insert_resource(ir_manifest)
            .insert_resource(PersistenceState::new(persistence_path, self.settings.autosave_interval_s))
            .add_audio_source::<ProceduralAudio>();

        orchestrator::build_schedule(app);
    }
}
