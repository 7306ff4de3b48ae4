//! Vector normalization utilities.

/// L2 norm of a vector.
pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// L2 normalize a vector in place (unit length).
///
/// A zero vector is left unchanged: its norm is treated as 1.
pub fn normalize_l2(vector: &mut [f32]) {
    let norm = l2_norm(vector);
    let divisor = if norm == 0.0 { 1.0 } else { norm };
    for v in vector.iter_mut() {
        *v /= divisor;
    }
}

/// Owned variant of [`normalize_l2`].
pub fn normalized(mut vector: Vec<f32>) -> Vec<f32> {
    normalize_l2(&mut vector);
    vector
}

/// Compute dot product between two vectors.
///
/// For unit vectors this is the cosine similarity.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product(a, b) / (norm_a * norm_b)
}
