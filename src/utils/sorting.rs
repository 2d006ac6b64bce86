/// Macro that sorts an arbitrary number of vecs by the float values of
/// the first one.
///
/// The sort is stable and uses `f64::total_cmp`, so NaNs sort last
/// instead of panicking.
///
/// NOTE: This macro creates a new ordered vec for each one.
///
/// # Example
/// ```
/// use chromextract::sort_vecs_by_first_f64;
///
/// let mzs: Vec<f64> = vec![300.2, 100.1, 200.5];
/// let intensities = vec![1.0, 2.0, 3.0];
/// let out = sort_vecs_by_first_f64!(&mzs, &intensities);
///
/// assert_eq!(out.0, vec![100.1, 200.5, 300.2]);
/// assert_eq!(out.1, vec![2.0, 3.0, 1.0]);
/// ```
///
#[macro_export]
macro_rules! sort_vecs_by_first_f64 {
    ($first:expr $(,$rest:expr)*) => {{
        let first_vec = $first;
        let len = first_vec.len();

        let mut indices: Vec<usize> = (0..len).collect();
        indices.sort_by(|&a, &b| first_vec[a].total_cmp(&first_vec[b]));

        let sorted_first: Vec<f64> = indices.iter().map(|&i| first_vec[i]).collect();

        (sorted_first, $( {
            let other_vec = $rest;
            debug_assert_eq!(other_vec.len(), len, "All vectors must have the same length");
            indices.iter().map(|&i| other_vec[i]).collect::<Vec<_>>()
        }, )*)
    }};
}

/// True if `values` never decreases.
pub fn is_sorted_ascending(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] <= w[1])
}
