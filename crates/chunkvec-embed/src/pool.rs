/// Scales `v` to unit L2 norm in place. A zero vector is left untouched; its
/// norm is clamped so nothing is divided by zero.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-12);
    for x in v.iter_mut() {
        *x /= norm;
    }
}
