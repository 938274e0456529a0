use crate::config::Number;
use wide::f32x8;

/// Squared Euclidean distance between two vectors of equal length, eight
/// lanes at a time. Returns `None` when the lengths differ.
pub fn l2_distance_squared_simd(a: &[Number], b: &[Number]) -> Option<Number> {
    if a.len() != b.len() {
        log::debug!("Vector length mismatch: {} vs {}", a.len(), b.len());
        return None;
    }

    let mut acc = f32x8::splat(0.0);

    let len = a.len();
    let simd_len = len - (len % 8);

    for i in (0..simd_len).step_by(8) {
        let va = f32x8::new([
            a[i],
            a[i + 1],
            a[i + 2],
            a[i + 3],
            a[i + 4],
            a[i + 5],
            a[i + 6],
            a[i + 7],
        ]);
        let vb = f32x8::new([
            b[i],
            b[i + 1],
            b[i + 2],
            b[i + 3],
            b[i + 4],
            b[i + 5],
            b[i + 6],
            b[i + 7],
        ]);
        let diff = va - vb;
        acc += diff * diff;
    }

    let mut distance = acc.reduce_add();

    // Remainder
    for i in simd_len..len {
        let diff = a[i] - b[i];
        distance += diff * diff;
    }

    Some(distance)
}
