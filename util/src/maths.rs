//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Convert an angle in degrees into radians.
pub fn deg_to_rad<T>(deg: T) -> T
where
    T: Float
{
    deg * T::from(std::f64::consts::PI).unwrap() / T::from(180.0).unwrap()
}

/// Convert an angle in radians into degrees.
pub fn rad_to_deg<T>(rad: T) -> T
where
    T: Float
{
    rad * T::from(180.0).unwrap() / T::from(std::f64::consts::PI).unwrap()
}

/// Return the euclidian norm (distance between) of two points.
///
/// If the points do not have the same number of dimentions then `None` is
/// returned.
pub fn norm<T>(point_0: &[T], point_1: &[T]) -> Option<T>
where
    T: Float + std::ops::AddAssign
{
    // Check that the dimentions match
    if point_0.len() != point_1.len() {
        return None;
    }

    // Sum all elements of the points
    let mut sum = T::from(0).unwrap();

    for i in 0..point_0.len() {
        sum += (point_0[i] - point_1[i]).powi(2);
    }

    // Return the squareroot of the sum
    Some(sum.sqrt())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_deg_rad_conversions() {
        const PI: f64 = std::f64::consts::PI;

        assert!((deg_to_rad(180f64) - PI).abs() < 1e-12);
        assert!((deg_to_rad(-90f64) + PI / 2f64).abs() < 1e-12);
        assert!((rad_to_deg(PI) - 180f64).abs() < 1e-12);
        assert!((rad_to_deg(deg_to_rad(25f64)) - 25f64).abs() < 1e-12);
    }

    #[test]
    fn test_norm() {
        assert_eq!(norm(&[0f64, 0f64], &[3f64, 4f64]), Some(5f64));
        assert_eq!(norm(&[1f64], &[1f64, 2f64]), None);
    }
}
