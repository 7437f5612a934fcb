use bevy::prelude::*;
use fundsp::prelude32::*;

use crate::audio::dsp::param::ParamHandle;
use crate::orchestrator::SimulatorRes;

/// Continuous rain-sheet bed: a single filtered-noise wash whose brightness
/// and level track overall rain intensity (spec.md §4.5, "Sheet Layer").
#[derive(Component, Debug, Clone)]
pub struct SheetLayer {
    /// 0.0 (silent) – 1.0 (loudest), derived every frame from the live
    /// simulator drop count by [`sheet_live_intensity_system`] — not a
    /// config value.
    pub intensity: f32,
    pub base_cutoff_hz: f32,
}

impl Default for SheetLayer {
    fn default() -> Self {
        Self {
            intensity: 0.0,
            base_cutoff_hz: 3200.0,
        }
    }
}

#[derive(Component)]
pub struct SheetParams {
    pub intensity: ParamHandle,
    pub cutoff: ParamHandle,
}

/// Builds the sheet DSP graph. Cutoff and level both scale with intensity:
/// a light drizzle is a narrow high hiss, a downpour opens into a wide,
/// louder wash.
pub fn build_sheet_graph(sheet: &SheetLayer) -> (Box<dyn AudioUnit>, SheetParams) {
    let intensity_param = ParamHandle::new("sheet_intensity", sheet.intensity, 0.0, 1.0);
    let cutoff_param = ParamHandle::new("sheet_cutoff", sheet.base_cutoff_hz, 200.0, 12000.0);

    let intensity_s = intensity_param.shared().clone();
    let cutoff_s = cutoff_param.shared().clone();
    let base_cutoff = sheet.base_cutoff_hz;

    let mut net = Net::new(0, 2);
    let noise_id = net.push(Box::new(noise()));
    let cutoff_id = net.push(Box::new(
        var(&cutoff_s) >> map(move |f: &Frame<f32, U1>| (f[0] * 0.4 + base_cutoff * 0.6).max(200.0)),
    ));
    let q_id = net.push(Box::new(dc(1.2)));
    let filter_id = net.push(Box::new(bandpass()));
    net.connect(noise_id, 0, filter_id, 0);
    net.connect(cutoff_id, 0, filter_id, 1);
    net.connect(q_id, 0, filter_id, 2);

    // `intensity` already carries the live min/max-volume lerp computed by
    // `sheet_live_intensity_system`, so the graph applies it directly rather
    // than re-remapping it against a second, config-independent curve.
    let level_id = net.push(Box::new(var(&intensity_s) >> map(|f: &Frame<f32, U1>| f[0].clamp(0.0, 1.0))));
    let mul_id = net.push(Box::new(map(|f: &Frame<f32, U2>| f[0] * f[1])));
    net.connect(filter_id, 0, mul_id, 0);
    net.connect(level_id, 0, mul_id, 1);

    let split_id = net.push(Box::new(split::<U2>()));
    net.connect(mul_id, 0, split_id, 0);
    net.connect_output(split_id, 0, 0);
    net.connect_output(split_id, 1, 1);

    let params = SheetParams {
        intensity: intensity_param,
        cutoff: cutoff_param,
    };
    (Box::new(net), params)
}

pub fn sheet_sync_system(query: Query<(&SheetLayer, &SheetParams), Changed<SheetLayer>>) {
    for (sheet, params) in &query {
        params.intensity.set(sheet.intensity);
        params.cutoff.set(sheet.base_cutoff_hz);
    }
}

/// Derives every Sheet Layer's live loudness from the simulator's current
/// drop count (spec.md §4.5: `lerp(minVolume, maxVolume, min(1,
/// particleCount/maxParticleCount))`, forced to true silence below a 0.001
/// ratio rather than a barely-audible floor).
pub fn sheet_live_intensity_system(
    sim_res: bevy::ecs::system::NonSend<SimulatorRes>,
    config: Res<crate::config::RainscapeConfig>,
    mut sheets: Query<(&crate::orchestrator::SheetSlot, &mut SheetLayer)>,
) {
    let particle_count = sim_res.sim.drops().count as f32;
    let default_cfg = crate::config::schema::SheetConfig::default();
    for (slot, mut sheet) in &mut sheets {
        let cfg = config.sheets.get(slot.0).unwrap_or(&default_cfg);
        if !cfg.enabled {
            sheet.intensity = 0.0;
            continue;
        }
        let ratio = (particle_count / cfg.max_particle_count.max(1.0)).min(1.0);
        sheet.intensity = if ratio < 0.001 { 0.0 } else { cfg.min_volume + (cfg.max_volume - cfg.min_volume) * ratio };
    }
}
