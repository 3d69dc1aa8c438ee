//! Myers' diff algorithm, adapted from <https://github.com/mitsuhiko/similar/blob/7e15c44de11a1cd61e1149189929e189ef977fd8/src/algorithms/myers.rs>
//!
//! * time: `O((N+M)D)`
//! * space `O(N+M)`
//!
//! See [the original article by Eugene W. Myers](http://www.xmailserver.org/diff2.pdf)
//! describing it.
//!
//! The search for the middle snake gives up once `deadline` has passed and
//! the remaining range is reported as a plain delete followed by an insert,
//! which is still a valid (just not minimal) edit script.

use std::{
    ops::{Index, IndexMut, Range},
    time::Instant,
};

use crate::utils::common_affix::{common_prefix_len, common_suffix_len};

/// A run of the edit script. Insert ranges index into the new sequence,
/// equal and delete runs are counted on the old sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffRun {
    Equal(usize),
    Delete(usize),
    Insert(Range<usize>),
}

/// Computes a shortest edit script turning `old` into `new`.
pub fn myers_diff<T: PartialEq>(old: &[T], new: &[T], deadline: Option<Instant>) -> Vec<DiffRun> {
    let max_d = max_d(old.len(), new.len());
    let mut vf = V::new(max_d);
    let mut vb = V::new(max_d);
    let mut result = Vec::new();

    conquer(
        old,
        0..old.len(),
        new,
        0..new.len(),
        &mut vf,
        &mut vb,
        deadline,
        &mut result,
    );

    result
}

fn max_d(old_length: usize, new_length: usize) -> usize { (old_length + new_length).div_ceil(2) + 1 }

/// `V` contains the endpoints of the furthest reaching `D-paths`. For each
/// recorded endpoint `(x,y)` in diagonal `k`, we only need to retain `x`
/// because `y` can be computed from `x - k`.
///
/// `k` can be negative so the vector is shifted by `offset`.
#[derive(Debug)]
struct V {
    offset: isize,
    v: Vec<usize>,
}

impl V {
    fn new(max_d: usize) -> Self {
        Self {
            offset: max_d as isize,
            v: vec![0; 2 * max_d],
        }
    }
}

impl Index<isize> for V {
    type Output = usize;

    fn index(&self, index: isize) -> &Self::Output { &self.v[(index + self.offset) as usize] }
}

impl IndexMut<isize> for V {
    fn index_mut(&mut self, index: isize) -> &mut Self::Output {
        &mut self.v[(index + self.offset) as usize]
    }
}

fn split_at(range: Range<usize>, at: usize) -> (Range<usize>, Range<usize>) {
    (range.start..at, at..range.end)
}

/// Finds the middle snake of an optimal D-path by running the forward and
/// backward searches simultaneously until they overlap.
fn find_middle_snake<T: PartialEq>(
    old: &[T],
    old_range: Range<usize>,
    new: &[T],
    new_range: Range<usize>,
    vf: &mut V,
    vb: &mut V,
    deadline: Option<Instant>,
) -> Option<(usize, usize)> {
    let n = old_range.len();
    let m = new_range.len();

    // By Lemma 1 in the paper, the optimal edit script length is odd or even as
    // `delta` is odd or even.
    let delta = n as isize - m as isize;
    let odd = delta & 1 == 1;

    vf[1] = 0;
    vb[1] = 0;

    let d_max = max_d(n, m) as isize;

    for d in 0..d_max {
        if deadline.is_some_and(|deadline| Instant::now() > deadline) {
            break;
        }

        // Forward path
        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && vf[k - 1] < vf[k + 1]) {
                vf[k + 1]
            } else {
                vf[k - 1] + 1
            };
            let y = (x as isize - k) as usize;

            let (x0, y0) = (x, y);
            if x < n && y < m {
                x += common_prefix_len(
                    old,
                    old_range.start + x..old_range.end,
                    new,
                    new_range.start + y..new_range.end,
                );
            }

            vf[k] = x;

            if odd && (k - delta).abs() <= (d - 1) && vf[k] + vb[-(k - delta)] >= n {
                return Some((x0 + old_range.start, y0 + new_range.start));
            }
        }

        // Backward path
        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && vb[k - 1] < vb[k + 1]) {
                vb[k + 1]
            } else {
                vb[k - 1] + 1
            };
            let mut y = (x as isize - k) as usize;

            if x < n && y < m {
                let advance = common_suffix_len(
                    old,
                    old_range.start..old_range.start + n - x,
                    new,
                    new_range.start..new_range.start + m - y,
                );
                x += advance;
                y += advance;
            }

            vb[k] = x;

            if !odd && (k - delta).abs() <= d && vb[k] + vf[-(k - delta)] >= n {
                return Some((n - x + old_range.start, m - y + new_range.start));
            }
        }
    }

    None
}

#[allow(clippy::too_many_arguments)]
fn conquer<T: PartialEq>(
    old: &[T],
    mut old_range: Range<usize>,
    new: &[T],
    mut new_range: Range<usize>,
    vf: &mut V,
    vb: &mut V,
    deadline: Option<Instant>,
    result: &mut Vec<DiffRun>,
) {
    let prefix_length = common_prefix_len(old, old_range.clone(), new, new_range.clone());
    if prefix_length > 0 {
        push_run(result, DiffRun::Equal(prefix_length));
    }
    old_range.start += prefix_length;
    new_range.start += prefix_length;

    let suffix_length = common_suffix_len(old, old_range.clone(), new, new_range.clone());
    old_range.end -= suffix_length;
    new_range.end -= suffix_length;

    if old_range.is_empty() && new_range.is_empty() {
        // only the common prefix and suffix remain
    } else if new_range.is_empty() {
        push_run(result, DiffRun::Delete(old_range.len()));
    } else if old_range.is_empty() {
        push_run(result, DiffRun::Insert(new_range));
    } else if let Some((x_start, y_start)) =
        find_middle_snake(old, old_range.clone(), new, new_range.clone(), vf, vb, deadline)
    {
        let (old_a, old_b) = split_at(old_range, x_start);
        let (new_a, new_b) = split_at(new_range, y_start);
        conquer(old, old_a, new, new_a, vf, vb, deadline, result);
        conquer(old, old_b, new, new_b, vf, vb, deadline, result);
    } else {
        push_run(result, DiffRun::Delete(old_range.len()));
        push_run(result, DiffRun::Insert(new_range));
    }

    if suffix_length > 0 {
        push_run(result, DiffRun::Equal(suffix_length));
    }
}

/// Appends a run, merging it into the previous one when they are of the same
/// kind and adjacent.
fn push_run(result: &mut Vec<DiffRun>, run: DiffRun) {
    match (result.last_mut(), run) {
        (Some(DiffRun::Equal(previous)), DiffRun::Equal(length))
        | (Some(DiffRun::Delete(previous)), DiffRun::Delete(length)) => *previous += length,
        (Some(DiffRun::Insert(previous)), DiffRun::Insert(range)) if previous.end == range.start => {
            previous.end = range.end;
        }
        (_, run) => result.push(run),
    }
}
