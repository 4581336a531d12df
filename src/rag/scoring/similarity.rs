//! Cosine similarity between embedding vectors

/// Cosine similarity: dot(a, b) / (|a| * |b|).
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or when
/// either magnitude is zero, and when the sums overflow or the input holds
/// NaN. Otherwise the result lies in `[-1.0, 1.0]` up to floating-point
/// error; it is not clamped.
pub fn similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if score.is_finite() {
        score
    } else {
        0.0
    }
}
