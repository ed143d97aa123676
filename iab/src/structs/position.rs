//! Position quantization (§4.2) and the "pyramid-mesa" cube↔spherical transform used
//! by the renderer's VBAP core (§4.5, GLOSSARY).
//!
//! The wire format only specifies the quantization law (`round(value * 65535)` per
//! axis, §4.2); the cube↔spherical geometry itself is an internal VBAP implementation
//! detail not carried on the wire. This module picks one consistent, invertible
//! mapping: height maps linearly to elevation (floor = -90°, mid-height = ear-level
//! 0°, ceiling apex = +90°), and the horizontal footprint maps to azimuth by its
//! squared-off ("pyramid") direction from room centre, matching the glossary's
//! description of a dome top over a flat screen wall.

use crate::utils::bitstream_io::{BitReader, BitWriter};
use crate::utils::errors::Result;

/// A position in the `[0,1]^3` authoring cube: x = left(0)..right(1),
/// y = front/screen(0)..rear(1), z = floor(0)..ceiling/dome-apex(1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitCubePosition {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// A direction on the listening sphere, in degrees, the space VBAP triangle maths
/// and the renderer configuration's speaker coordinates are expressed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalPosition {
    pub azimuth_deg: f32,
    pub elevation_deg: f32,
}

impl UnitCubePosition {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const CENTER: UnitCubePosition = UnitCubePosition {
        x: 0.5,
        y: 0.5,
        z: 0.5,
    };

    pub fn read(reader: &mut BitReader) -> Result<Self> {
        let x = code_to_unit(reader.read(16)? as u16);
        let y = code_to_unit(reader.read(16)? as u16);
        let z = code_to_unit(reader.read(16)? as u16);
        Ok(Self { x, y, z })
    }

    pub fn write(self, writer: &mut BitWriter) -> Result<()> {
        writer.write(unit_to_code(self.x) as u64, 16)?;
        writer.write(unit_to_code(self.y) as u64, 16)?;
        writer.write(unit_to_code(self.z) as u64, 16)?;
        Ok(())
    }

    /// True when this is the exact geometric centre of the room — the degenerate
    /// direction VBAP cannot assign an azimuth to.
    pub fn is_room_center(self) -> bool {
        (self.x - 0.5).abs() < f32::EPSILON
            && (self.y - 0.5).abs() < f32::EPSILON
            && (self.z - 0.5).abs() < f32::EPSILON
    }

    /// Forward pyramid-mesa transform: cube position to a listening-sphere direction.
    pub fn to_spherical(self) -> SphericalPosition {
        let cx = 2.0 * self.x - 1.0;
        let cy = 2.0 * self.y - 1.0;
        let azimuth_deg = cx.atan2(-cy).to_degrees();
        let elevation_deg = ((self.z - 0.5) * 180.0).clamp(-90.0, 90.0);
        SphericalPosition {
            azimuth_deg,
            elevation_deg,
        }
    }

    /// Unit Cartesian direction vector matching the convention physical speakers'
    /// `vbap_xyz` coordinates are given in, for use in the VBAP triangle solve.
    pub fn to_cartesian_direction(self) -> [f32; 3] {
        self.to_spherical().to_cartesian_direction()
    }
}

impl SphericalPosition {
    pub fn new(azimuth_deg: f32, elevation_deg: f32) -> Self {
        Self {
            azimuth_deg,
            elevation_deg,
        }
    }

    pub fn to_cartesian_direction(self) -> [f32; 3] {
        let az = self.azimuth_deg.to_radians();
        let el = self.elevation_deg.to_radians();
        [az.sin() * el.cos(), -az.cos() * el.cos(), el.sin()]
    }

    pub fn from_cartesian_direction(dir: [f32; 3]) -> Self {
        let [x, y, z] = dir;
        let elevation_deg = z.clamp(-1.0, 1.0).asin().to_degrees();
        let azimuth_deg = x.atan2(-y).to_degrees();
        Self {
            azimuth_deg,
            elevation_deg,
        }
    }

    /// Inverse pyramid-mesa transform, used only for converting a physical speaker's
    /// fixed direction into IAB cube coordinates for the object-snap test (§4.5 step
    /// 1). Assumes the speaker lies on the cube's boundary shell (Chebyshev radius 1
    /// in the horizontal plane), which holds for any physically mounted speaker.
    pub fn to_unit_cube(self) -> UnitCubePosition {
        let az = self.azimuth_deg.to_radians();
        let sin_az = az.sin();
        let cos_az = az.cos();
        let scale = 1.0 / sin_az.abs().max(cos_az.abs()).max(f32::EPSILON);
        let cx = sin_az * scale;
        let cy = -cos_az * scale;

        let z = (self.elevation_deg / 180.0 + 0.5).clamp(0.0, 1.0);
        UnitCubePosition {
            x: ((cx + 1.0) / 2.0).clamp(0.0, 1.0),
            y: ((cy + 1.0) / 2.0).clamp(0.0, 1.0),
            z,
        }
    }
}

fn unit_to_code(value: f32) -> u16 {
    (value.clamp(0.0, 1.0) * 65535.0).round() as u16
}

fn code_to_unit(code: u16) -> f32 {
    code as f32 / 65535.0
}

/// L-infinity distance between two cube positions, used by object snap (§4.5 step 1).
pub fn linf_distance(a: UnitCubePosition, b: UnitCubePosition) -> f32 {
    (a.x - b.x).abs().max((a.y - b.y).abs()).max((a.z - b.z).abs())
}

/// L2 distance, the snap tie-break when multiple speakers are within tolerance.
pub fn l2_distance(a: UnitCubePosition, b: UnitCubePosition) -> f32 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2) + (a.z - b.z).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_quantization_round_trips() {
        for &(x, y, z) in &[(0.0, 0.0, 0.0), (1.0, 1.0, 1.0), (0.5, 0.5, 0.5), (0.25, 0.75, 0.1)] {
            let mut w = BitWriter::new();
            UnitCubePosition::new(x, y, z).write(&mut w).unwrap();
            let bytes = w.into_bytes().unwrap();
            let mut r = BitReader::new(&bytes);
            let back = UnitCubePosition::read(&mut r).unwrap();
            assert!((back.x - x).abs() < 1e-4);
            assert!((back.y - y).abs() < 1e-4);
            assert!((back.z - z).abs() < 1e-4);
        }
    }

    #[test]
    fn mid_height_maps_to_ear_level_elevation() {
        let p = UnitCubePosition::new(0.5, 0.5, 0.5);
        assert!((p.to_spherical().elevation_deg).abs() < 1e-3);
    }

    #[test]
    fn left_wall_speaker_inverts_to_expected_cube_position() {
        // The same speaker from testable scenario 4: azimuth -90 deg, ear level.
        let speaker = SphericalPosition::new(-90.0, 0.0);
        let cube = speaker.to_unit_cube();
        assert!((cube.x - 0.0).abs() < 1e-3);
        assert!((cube.y - 0.5).abs() < 1e-3);
        assert!((cube.z - 0.0).abs() < 1e-3);
    }

    #[test]
    fn spherical_cartesian_round_trip() {
        for &(az, el) in &[(0.0, 0.0), (45.0, 30.0), (-90.0, -10.0), (179.0, 89.0)] {
            let s = SphericalPosition::new(az, el);
            let dir = s.to_cartesian_direction();
            let back = SphericalPosition::from_cartesian_direction(dir);
            assert!((back.elevation_deg - el).abs() < 1e-2);
            // azimuth is ill-conditioned near the poles; only check away from them.
            if el.abs() < 80.0 {
                assert!((back.azimuth_deg - az).abs() < 1e-1);
            }
        }
    }
}
