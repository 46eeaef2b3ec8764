use serde::{Deserialize, Serialize};

use crate::{Camera, Result, genicam};

/// Current value and constraints of an integer feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntFeatureRange {
    pub value: i64,
    pub min: i64,
    pub max: i64,
    pub inc: i64,
}

impl IntFeatureRange {
    /// The valid value `min + k*inc` (within `[min, max]`) closest to
    /// `desired`. Ties resolve to the lower value.
    pub fn closest_valid(&self, desired: f64) -> i64 {
        let inc = self.inc.max(1);
        if self.max <= self.min {
            return self.min;
        }
        let desired = desired.clamp(self.min as f64, self.max as f64);
        let steps = ((desired - self.min as f64) / inc as f64).floor() as i64;
        let lower = self.min + steps * inc;
        let upper = lower + inc;
        if upper > self.max || desired - lower as f64 <= upper as f64 - desired {
            lower
        } else {
            upper
        }
    }
}

/// Offset change which moves the clicked point of the displayed image to its
/// center.
pub fn click_to_offset_delta(click: (f64, f64), image_size: (u32, u32)) -> (f64, f64) {
    let (x, y) = click;
    let (w, h) = image_size;
    (x - f64::from(w) / 2.0, y - f64::from(h) / 2.0)
}

/// Run `f` with acquisition stopped, restarting it afterwards if it was
/// running before.
///
/// Many features (image size and offset, for example) are locked while the
/// camera is acquiring.
pub fn with_acquisition_paused<C, F, T>(cam: &mut C, f: F) -> Result<T>
where
    C: Camera + ?Sized,
    F: FnOnce(&mut C) -> Result<T>,
{
    let was_acquiring = cam.is_acquiring();
    if was_acquiring {
        cam.acquisition_stop()?;
    }
    let result = f(cam);
    if was_acquiring {
        cam.acquisition_start()?;
    }
    result
}

/// Move the sensor window by `(dx, dy)` pixels, snapping to valid offsets.
///
/// Returns the resulting `(OffsetX, OffsetY)`.
pub fn update_image_offset<C: Camera + ?Sized>(cam: &mut C, dx: f64, dy: f64) -> Result<(i64, i64)> {
    if !dx.is_finite() || !dy.is_finite() {
        return Err(format!("invalid image offset change ({dx}, {dy})").into());
    }
    with_acquisition_paused(cam, |cam| {
        let new_x = move_int_feature(cam, genicam::OFFSET_X, dx)?;
        let new_y = move_int_feature(cam, genicam::OFFSET_Y, dy)?;
        tracing::debug!("image offset now ({new_x}, {new_y})");
        Ok((new_x, new_y))
    })
}

fn move_int_feature<C: Camera + ?Sized>(cam: &mut C, name: &str, delta: f64) -> Result<i64> {
    let range = cam.feature_int_range(name)?;
    let target = range.closest_valid(range.value as f64 + delta);
    if target == range.value {
        return Ok(range.value);
    }
    if cam.feature_is_writable(name)? {
        cam.feature_int_set(name, target)?;
        Ok(target)
    } else {
        tracing::warn!("{name} is not writable, keeping {}", range.value);
        Ok(range.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min: i64, max: i64, inc: i64) -> IntFeatureRange {
        IntFeatureRange {
            value: min,
            min,
            max,
            inc,
        }
    }

    #[test]
    fn snaps_to_increment() {
        let r = range(0, 100, 4);
        assert_eq!(r.closest_valid(9.0), 8);
        assert_eq!(r.closest_valid(11.0), 12);
        assert_eq!(r.closest_valid(-50.0), 0);
    }

    #[test]
    fn tie_goes_to_lower_value() {
        assert_eq!(range(0, 100, 4).closest_valid(10.0), 8);
    }

    #[test]
    fn max_is_reachable() {
        assert_eq!(range(0, 96, 4).closest_valid(500.0), 96);
        // max not on the increment grid
        assert_eq!(range(0, 98, 4).closest_valid(500.0), 96);
    }

    #[test]
    fn degenerate_range() {
        assert_eq!(range(16, 16, 4).closest_valid(40.0), 16);
        assert_eq!(range(0, 10, 0).closest_valid(3.4), 3);
    }

    #[test]
    fn click_at_center_does_not_move() {
        assert_eq!(click_to_offset_delta((320.0, 240.0), (640, 480)), (0.0, 0.0));
        assert_eq!(
            click_to_offset_delta((0.0, 480.0), (640, 480)),
            (-320.0, 240.0)
        );
    }
}
