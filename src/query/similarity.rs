use crate::model::factors::dot;

/// Cosine similarity `dot(a, b) / (|a| * |b|)`, clamped to `[-1, 1]`.
///
/// Returns `0.0` when either vector has zero norm or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let denom = dot(a, a).sqrt() * dot(b, b).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    (dot(a, b) / denom).clamp(-1.0, 1.0)
}
