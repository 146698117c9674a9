//! Edit-distance alignment of a test sequence onto a control sequence.
//!
//! The substitution cost is supplied by the caller so alignment can weigh
//! the underlying numeric values rather than symbol identity alone. The
//! result maps every control position to the test index placed there, or
//! `None` when no test sample lines up with it.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Control and test positions paired.
    Match,
    /// Control position left without a test sample.
    Delete,
    /// Test sample dropped.
    Insert,
}

/// Outcome of [`align`].
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// Test index placed at each control position.
    pub indices: Vec<Option<usize>>,
    /// Total edit cost.
    pub cost: f64,
}

impl Alignment {
    /// Whether every position keeps its own test index.
    pub fn is_identity(&self) -> bool {
        self.indices
            .iter()
            .enumerate()
            .all(|(i, idx)| *idx == Some(i))
    }

    /// Rearrange `test` into control order, filling unmatched positions.
    pub fn reorder<T: Clone>(&self, test: &[T], fill: T) -> Vec<T> {
        self.indices
            .iter()
            .map(|idx| match idx {
                Some(j) => test[*j].clone(),
                None => fill.clone(),
            })
            .collect()
    }
}

/// Minimum-cost alignment of `test_len` test positions onto `control_len`
/// control positions. Inserting or deleting a position costs `indel_cost`;
/// pairing control `i` with test `j` costs `substitution(i, j)`.
///
/// Ties prefer pairing, then deletion, so a sequence aligned with itself
/// comes back as the identity at zero cost.
pub fn align<F>(
    control_len: usize,
    test_len: usize,
    indel_cost: f64,
    mut substitution: F,
) -> Alignment
where
    F: FnMut(usize, usize) -> f64,
{
    let width = test_len + 1;
    let mut cost = vec![0.0_f64; (control_len + 1) * width];
    let mut steps = vec![Step::Match; (control_len + 1) * width];

    for j in 1..=test_len {
        cost[j] = j as f64 * indel_cost;
        steps[j] = Step::Insert;
    }
    for i in 1..=control_len {
        cost[i * width] = i as f64 * indel_cost;
        steps[i * width] = Step::Delete;

        for j in 1..=test_len {
            let pair = cost[(i - 1) * width + (j - 1)] + substitution(i - 1, j - 1);
            let delete = cost[(i - 1) * width + j] + indel_cost;
            let insert = cost[i * width + (j - 1)] + indel_cost;

            let (best, step) = if pair <= delete && pair <= insert {
                (pair, Step::Match)
            } else if delete <= insert {
                (delete, Step::Delete)
            } else {
                (insert, Step::Insert)
            };
            cost[i * width + j] = best;
            steps[i * width + j] = step;
        }
    }

    let mut indices = vec![None; control_len];
    let (mut i, mut j) = (control_len, test_len);
    while i > 0 || j > 0 {
        match steps[i * width + j] {
            Step::Match if i > 0 && j > 0 => {
                indices[i - 1] = Some(j - 1);
                i -= 1;
                j -= 1;
            }
            Step::Delete if i > 0 => i -= 1,
            _ => j -= 1,
        }
    }

    Alignment {
        indices,
        cost: cost[control_len * width + test_len],
    }
}
