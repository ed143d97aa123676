//! Vector-Base Amplitude Panning core (§4.5 "VBAP object rendering of one
//! sub-block"): snap detection, extended-source generation, and the 3-speaker
//! triangle gain solve.

use crate::render::config::RendererConfig;
use crate::structs::object_subblock::{PanInfo, SpreadMode};
use crate::structs::position::{l2_distance, linf_distance, SphericalPosition, UnitCubePosition};
use crate::utils::errors::{IabError, Result};

/// One candidate direction to solve VBAP for — a point source has exactly one,
/// a spread source is split into several spread around the aperture (§4.5 step 3).
#[derive(Debug, Clone, Copy)]
struct ExtendedSource {
    azimuth_deg: f32,
    elevation_deg: f32,
}

/// Per-output-channel gain vector, one entry per `physical_speakers` slot.
#[derive(Debug, Clone, PartialEq)]
pub struct GainVector(pub Vec<f32>);

impl GainVector {
    fn zeros(n: usize) -> Self {
        Self(vec![0.0; n])
    }

    fn add_scaled(&mut self, other: &GainVector, scale: f32) {
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a += b * scale;
        }
    }
}

/// Solves VBAP over a fixed loudspeaker triangulation. Holds a worker-local,
/// lock-free extended-source gain cache (§5 "shared mutable state"), keyed by a
/// quantized (azimuth, elevation, aperture) triple, cleared once it grows past
/// [`CACHE_CLEAR_THRESHOLD`] entries.
pub struct VbapEngine<'a> {
    config: &'a RendererConfig,
    speaker_dirs: Vec<[f32; 3]>,
    cache: std::collections::HashMap<(i32, i32, i32), GainVector>,
}

const CACHE_CLEAR_THRESHOLD: usize = 250;

impl<'a> VbapEngine<'a> {
    pub fn new(config: &'a RendererConfig) -> Self {
        let speaker_dirs = config
            .physical_speakers
            .iter()
            .map(|s| normalize(s.vbap_xyz))
            .collect();
        Self {
            config,
            speaker_dirs,
            cache: std::collections::HashMap::new(),
        }
    }

    fn speaker_count(&self) -> usize {
        self.config.physical_speakers.len()
    }

    /// Object-snap test (§4.5 step 1): true + the matching physical-speaker index
    /// when the object sits within `pan.snap.tolerance` (L∞) of exactly one best
    /// speaker and carries no spread.
    pub fn try_snap(&self, position: UnitCubePosition, pan: &PanInfo) -> Option<usize> {
        if !pan.snap.present || pan.spread.aperture_fraction() > 0.0 {
            return None;
        }
        let tolerance = pan.snap.tolerance_fraction();

        let mut best: Option<(usize, f32)> = None;
        for (i, dir) in self.speaker_dirs.iter().enumerate() {
            let speaker_cube = SphericalPosition::from_cartesian_direction(*dir).to_unit_cube();
            if linf_distance(position, speaker_cube) > tolerance {
                continue;
            }
            let d = l2_distance(position, speaker_cube);
            match best {
                Some((_, best_d)) if best_d <= d => {}
                _ => best = Some((i, d)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Full VBAP gain-vector solve for one sub-block's pan info (§4.5 steps 2-5).
    pub fn solve(&mut self, position: UnitCubePosition, pan: &PanInfo) -> Result<GainVector> {
        if position.is_room_center() {
            return Err(IabError::VbapFailure(
                "object position is the degenerate room centre".into(),
            ));
        }
        let spherical = position.to_spherical();
        let aperture = pan.spread.aperture_fraction();
        let sources = extended_sources(spherical, aperture, pan.spread.mode);

        let mut total = GainVector::zeros(self.speaker_count());
        for source in &sources {
            let gains = self.solve_cached(*source)?;
            total.add_scaled(&gains, 1.0 / sources.len() as f32);
        }

        let gain_linear = pan.gain.to_linear();
        for g in total.0.iter_mut() {
            *g *= gain_linear;
        }

        if pan.zone_gains9.enabled {
            apply_zone_mask(&mut total, &self.speaker_dirs, &pan.zone_gains9);
        }

        if self.cache.len() > CACHE_CLEAR_THRESHOLD {
            self.cache.clear();
        }

        Ok(total)
    }

    fn solve_cached(&mut self, source: ExtendedSource) -> Result<GainVector> {
        let key = quantize_key(source);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }
        let gains = self.solve_triangle(source)?;
        self.cache.insert(key, gains.clone());
        Ok(gains)
    }

    fn solve_triangle(&self, source: ExtendedSource) -> Result<GainVector> {
        let dir = SphericalPosition::new(source.azimuth_deg, source.elevation_deg).to_cartesian_direction();

        let mut best: Option<([f32; 3], &[usize; 3])> = None;
        for triangle in &self.config.vbap_triangulation {
            let [i, j, k] = *triangle;
            let l = [self.speaker_dirs[i], self.speaker_dirs[j], self.speaker_dirs[k]];
            if let Some(gains) = solve_3x3(l, dir) {
                if gains.iter().all(|&g| g >= -1e-4) {
                    let energy: f32 = gains.iter().map(|g| g.max(0.0).powi(2)).sum();
                    if energy > 0.0
                        && best
                            .as_ref()
                            .map(|(prev, _)| energy > prev.iter().map(|g| g.max(0.0).powi(2)).sum())
                            .unwrap_or(true)
                    {
                        best = Some((gains, triangle));
                    }
                }
            }
        }

        let (gains, triangle) =
            best.ok_or_else(|| IabError::VbapFailure("no triangle in the configured mesh accepted the source".into()))?;

        let energy: f32 = gains.iter().map(|g| g.max(0.0).powi(2)).sum();
        let norm = if energy > 0.0 { energy.sqrt().recip() } else { 0.0 };

        let mut vector = GainVector::zeros(self.speaker_count());
        for (idx, g) in triangle.iter().zip(gains) {
            vector.0[*idx] = g.max(0.0) * norm;
        }
        Ok(vector)
    }
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len < f32::EPSILON {
        return [0.0, 1.0, 0.0];
    }
    [v[0] / len, v[1] / len, v[2] / len]
}

/// Solves `L^T g = source` for the 3 speaker-direction gains via Cramer's rule;
/// `None` when the triangle's basis is singular (degenerate/collinear speakers).
fn solve_3x3(l: [[f32; 3]; 3], source: [f32; 3]) -> Option<[f32; 3]> {
    let det = |m: [[f32; 3]; 3]| -> f32 {
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    };
    // Columns are the three speaker direction vectors.
    let m = [
        [l[0][0], l[1][0], l[2][0]],
        [l[0][1], l[1][1], l[2][1]],
        [l[0][2], l[1][2], l[2][2]],
    ];
    let d = det(m);
    if d.abs() < 1e-6 {
        return None;
    }
    let mut gains = [0.0f32; 3];
    for col in 0..3 {
        let mut m_sub = m;
        for row in 0..3 {
            m_sub[row][col] = source[row];
        }
        gains[col] = det(m_sub) / d;
    }
    Some(gains)
}

/// Builds the set of extended-source directions for a spread object (§4.5 step 3).
/// A point source (`aperture == 0`) is a single source at the object's direction.
/// `High1D`/`Low1D` spread a fan of sources along the horizontal azimuth arc;
/// `High3D` additionally fans across elevation.
fn extended_sources(center: SphericalPosition, aperture: f32, mode: SpreadMode) -> Vec<ExtendedSource> {
    if aperture <= 0.0 {
        return vec![ExtendedSource {
            azimuth_deg: center.azimuth_deg,
            elevation_deg: center.elevation_deg,
        }];
    }

    const FAN: usize = 5;
    let half_angle = aperture * 90.0;
    let mut sources = Vec::with_capacity(FAN * if mode == SpreadMode::High3D { FAN } else { 1 });

    for i in 0..FAN {
        let t = i as f32 / (FAN - 1) as f32 * 2.0 - 1.0;
        let az = center.azimuth_deg + t * half_angle;
        if mode == SpreadMode::High3D {
            for j in 0..FAN {
                let u = j as f32 / (FAN - 1) as f32 * 2.0 - 1.0;
                let el = (center.elevation_deg + u * half_angle).clamp(-90.0, 90.0);
                sources.push(ExtendedSource {
                    azimuth_deg: az,
                    elevation_deg: el,
                });
            }
        } else {
            sources.push(ExtendedSource {
                azimuth_deg: az,
                elevation_deg: center.elevation_deg,
            });
        }
    }
    sources
}

fn quantize_key(source: ExtendedSource) -> (i32, i32, i32) {
    ((source.azimuth_deg * 4.0) as i32, (source.elevation_deg * 4.0) as i32, 0)
}

/// Maps a Cartesian direction to one of 9 octant-ish zones: the 8 signed-octant
/// corners (by (x,y,z) sign) plus the centre-height band, matching the "nine
/// per-octant multipliers" of `ZoneGains9` (§3).
fn zone_index(dir: [f32; 3]) -> usize {
    if dir[2].abs() < 0.2 {
        8
    } else {
        let x_bit = if dir[0] >= 0.0 { 1 } else { 0 };
        let y_bit = if dir[1] >= 0.0 { 1 } else { 0 };
        let z_bit = if dir[2] >= 0.0 { 1 } else { 0 };
        (x_bit | (y_bit << 1) | (z_bit << 2)) % 8
    }
}

fn apply_zone_mask(vector: &mut GainVector, speaker_dirs: &[[f32; 3]], zones: &crate::structs::object_subblock::ZoneGains9) {
    for (gain, dir) in vector.0.iter_mut().zip(speaker_dirs) {
        let zone = zone_index(*dir);
        *gain *= zones.levels[zone].to_linear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::config::RendererConfig;
    use crate::structs::object_subblock::PanInfo;

    fn triangle_config() -> RendererConfig {
        let yaml = r#"
physical_speakers:
  - uri: "L"
    vbap_xyz: [-1.0, 1.0, 0.0]
    output_index: 0
  - uri: "R"
    vbap_xyz: [1.0, 1.0, 0.0]
    output_index: 1
  - uri: "C"
    vbap_xyz: [0.0, 1.0, 1.0]
    output_index: 2
vbap_triangulation:
  - [0, 1, 2]
target_soundfield: custom
"#;
        RendererConfig::from_yaml(yaml).unwrap()
    }

    #[test]
    fn point_source_centered_in_triangle_solves_to_positive_gains() {
        let config = triangle_config();
        let mut engine = VbapEngine::new(&config);
        let pan = PanInfo::centered();
        let position = UnitCubePosition::new(0.5, 0.0, 0.6);
        let gains = engine.solve(position, &pan).unwrap();
        assert!(gains.0.iter().any(|&g| g > 0.0));
        assert!(gains.0.iter().all(|&g| g >= -1e-4));
    }

    #[test]
    fn snap_finds_exact_speaker_within_tolerance() {
        let config = triangle_config();
        let engine = VbapEngine::new(&config);
        let mut pan = PanInfo::centered();
        pan.snap.present = true;
        pan.snap.tolerance = 4095;

        let left_speaker_cube = SphericalPosition::from_cartesian_direction(normalize([-1.0, 1.0, 0.0])).to_unit_cube();
        let found = engine.try_snap(left_speaker_cube, &pan);
        assert_eq!(found, Some(0));
    }

    #[test]
    fn room_center_position_is_rejected() {
        let config = triangle_config();
        let mut engine = VbapEngine::new(&config);
        let pan = PanInfo::centered();
        let err = engine.solve(UnitCubePosition::CENTER, &pan).unwrap_err();
        assert!(matches!(err, IabError::VbapFailure(_)));
    }
}
