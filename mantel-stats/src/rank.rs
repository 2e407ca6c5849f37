//! Fractional ranking for rank-based correlation.

/// Assign fractional ranks (1-based) to `data`.
///
/// Tied values receive the average of the ranks they would occupy, so
/// `[3, 1, 2, 2]` ranks as `[4, 1, 2.5, 2.5]`. Empty input produces empty
/// output.
pub fn fractional_rank(data: &[f64]) -> Vec<f64> {
    let n = data.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| data[a].total_cmp(&data[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        // Find the end of the tie group.
        let mut j = i + 1;
        while j < n && data[order[j]].total_cmp(&data[order[i]]).is_eq() {
            j += 1;
        }

        // Ranks in the group are (i+1)..=j, whose mean is (i+1+j)/2.
        let rank_val = (i + 1 + j) as f64 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = rank_val;
        }

        i = j;
    }

    ranks
}

// ── Tests ──────────────────────────────────────────────────────────────────
