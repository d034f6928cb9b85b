//! Near-duplicate detection via longest-common-subsequence similarity.
//!
//! `ratio = lcs_len(a, b) / max(len(a), len(b))`, computed with the classic
//! O(n·m) dynamic-programming LCS length over Unicode scalar values.

/// Length of the longest common subsequence of `a` and `b`.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 {
        return 0;
    }
    let mut row = vec![0usize; m + 1];
    for i in 1..=n {
        let mut prev_diag = 0usize;
        for j in 1..=m {
            let prev_row_j = row[j];
            row[j] = if a[i - 1] == b[j - 1] {
                prev_diag + 1
            } else {
                row[j].max(row[j - 1])
            };
            prev_diag = prev_row_j;
        }
    }
    row[m]
}

/// LCS-based similarity ratio of `a` and `b`, in `[0, 1]`.
///
/// Two empty strings are defined as dissimilar (`0.0`) rather than `NaN`.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let denom = a_chars.len().max(b_chars.len());
    if denom == 0 {
        return 0.0;
    }
    lcs_len(&a_chars, &b_chars) as f64 / denom as f64
}

/// The first entry in `past` whose similarity to `text` meets or exceeds
/// `threshold`, alongside the ratio.
pub fn find_near_duplicate<'a>(
    text: &str,
    past: &'a [String],
    threshold: f64,
) -> Option<(&'a str, f64)> {
    past.iter().find_map(|candidate| {
        let ratio = similarity_ratio(text, candidate);
        if ratio >= threshold {
            Some((candidate.as_str(), ratio))
        } else {
            None
        }
    })
}
