//! Parallel-for helpers that fall back to plain loops without the `parallel` feature.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// `(0..n).map(f).collect()`, spread over the Rayon pool when available.
#[cfg(feature = "parallel")]
pub(crate) fn map_range<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    (0..n).into_par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn map_range<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    (0..n).map(f).collect()
}

/// Call `f(row_index, row)` for every `width`-long row of `buf`.
#[cfg(feature = "parallel")]
pub(crate) fn for_each_row<T, F>(buf: &mut [T], width: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    buf.par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| f(y, row));
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn for_each_row<T, F>(buf: &mut [T], width: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    buf.chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| f(y, row));
}

/// Serial variant of [`for_each_row`], used when parallelism is switched off at runtime.
pub(crate) fn for_each_row_serial<T, F>(buf: &mut [T], width: usize, f: F)
where
    F: Fn(usize, &mut [T]),
{
    buf.chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| f(y, row));
}
