//! Direction vector to pan/tilt angles.
//!
//! The argument order of `atan2(x, -y)` encodes how the microphone array is
//! mounted relative to the pan axis: azimuth 0 points along -y and grows
//! toward +x.

/// Pointing angles in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Angles {
    /// In `[0, 360)`.
    pub azimuth: f64,
    /// In `[-90, 90]`.
    pub elevation: f64,
}

/// Convert an (approximately) unit direction vector to azimuth/elevation.
///
/// The vector is not normalized. `z` is clamped to `[-1, 1]` so noisy
/// over-unit readings saturate at +/-90 degrees instead of yielding NaN.
pub fn direction_to_angles(x: f64, y: f64, z: f64) -> Angles {
    let azimuth = (x.atan2(-y).to_degrees() + 360.0) % 360.0;
    let elevation = z.clamp(-1.0, 1.0).asin().to_degrees();
    Angles { azimuth, elevation }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_cardinal_directions() {
        assert!(approx(direction_to_angles(0.0, -1.0, 0.0).azimuth, 0.0));
        assert!(approx(direction_to_angles(1.0, 0.0, 0.0).azimuth, 90.0));
        assert!(approx(direction_to_angles(0.0, 1.0, 0.0).azimuth, 180.0));
        assert!(approx(direction_to_angles(-1.0, 0.0, 0.0).azimuth, 270.0));
        assert!(approx(direction_to_angles(0.0, -1.0, 0.0).elevation, 0.0));
    }

    #[test]
    fn test_elevation() {
        assert!(approx(direction_to_angles(0.0, 0.0, 1.0).elevation, 90.0));
        assert!(approx(direction_to_angles(0.0, 0.0, -1.0).elevation, -90.0));
        assert!(approx(direction_to_angles(0.0, -0.866_025_403_784_438_6, 0.5).elevation, 30.0));
    }

    #[test]
    fn test_out_of_range_z_is_clamped() {
        let a = direction_to_angles(0.0, 0.0, 1.02);
        assert_eq!(a.elevation, 90.0);
        let a = direction_to_angles(0.0, 0.0, -1.5);
        assert_eq!(a.elevation, -90.0);
    }

    #[test]
    fn test_azimuth_stays_in_range() {
        for i in 0..720 {
            let theta = (i as f64) * 0.5_f64.to_radians();
            let a = direction_to_angles(theta.sin(), -theta.cos(), 0.0);
            assert!(a.azimuth >= 0.0 && a.azimuth < 360.0, "azimuth {} out of range", a.azimuth);
        }
        // Negative zero and tiny negative angles wrap to 0 rather than 360.
        let a = direction_to_angles(-1e-300, -1.0, 0.0);
        assert!(a.azimuth >= 0.0 && a.azimuth < 360.0);
    }
}
