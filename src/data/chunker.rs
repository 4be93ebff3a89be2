// ============================================================
// Layer 4 — Index Chunker
// ============================================================
// Splits a list (usually sample indices) into mini-batches
// and applies a function per batch.
//
//   chunklist([0..7], 3)       → [0,1,2] [3,4,5]
//   maybe_chunked(v, None, ..) → one call over all of v
//   maybe_chunked(v, Some(k))  → one call per full chunk
//
// IMPORTANT: a trailing partial chunk is DROPPED.
//   With 7 samples and a batch size of 3, sample 6 is never
//   visited. Training and inference both inherit this: an
//   epoch over N samples uses ⌊N/k⌋·k of them, and infer()
//   returns ⌊N/k⌋·k rows. Pick a batch size that divides the
//   data, or pass None, when every row matters.
//
// The _with variants thread a `&mut S` state into both
// handlers. The training loop needs that: both handlers are
// `train_step`, which borrows the model mutably, so the model
// is passed in as state instead of being captured twice.
//
// Reference: Rust Book §8 (Slices), §13 (Closures)

use std::convert::Infallible;

/// Consecutive chunks of exactly `length` elements.
/// The trailing `values.len() % length` elements are dropped.
///
/// # Panics
/// Panics if `length` is 0.
pub fn chunklist<T>(values: &[T], length: usize) -> std::slice::ChunksExact<'_, T> {
    assert!(length > 0, "chunk length must be positive");
    values.chunks_exact(length)
}

// ─── Chunked ──────────────────────────────────────────────────────────────────
/// Result of [`maybe_chunked`]: either the single result of the
/// not-chunked handler, or one result per chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunked<R> {
    Whole(R),
    Parts(Vec<R>),
}

impl<R> Chunked<R> {
    pub fn was_chunked(&self) -> bool {
        matches!(self, Chunked::Parts(_))
    }
}

/// Apply `on_chunked` to every full chunk of `values` when a
/// length is given, otherwise apply `on_not_chunked` once.
pub fn maybe_chunked<T, R>(
    values:         &[T],
    length:         Option<usize>,
    mut on_chunked: impl FnMut(&[T]) -> R,
    on_not_chunked: impl FnOnce(&[T]) -> R,
) -> Chunked<R> {
    let res: Result<_, Infallible> = try_maybe_chunked_with(
        values,
        length,
        &mut (),
        |_, chunk| Ok(on_chunked(chunk)),
        |_, all| Ok(on_not_chunked(all)),
    );
    match res {
        Ok(chunked) => chunked,
        Err(never)  => match never {},
    }
}

/// Fallible, stateful form of [`maybe_chunked`].
/// Stops at the first chunk whose handler fails.
pub fn try_maybe_chunked_with<T, S, R, E>(
    values:         &[T],
    length:         Option<usize>,
    state:          &mut S,
    mut on_chunked: impl FnMut(&mut S, &[T]) -> Result<R, E>,
    on_not_chunked: impl FnOnce(&mut S, &[T]) -> Result<R, E>,
) -> Result<Chunked<R>, E> {
    match length {
        None => Ok(Chunked::Whole(on_not_chunked(state, values)?)),
        Some(length) => {
            let parts = chunklist(values, length)
                .map(|chunk| on_chunked(state, chunk))
                .collect::<Result<Vec<_>, E>>()?;
            Ok(Chunked::Parts(parts))
        }
    }
}

/// Multi-function form: every function in `on_chunked` runs over
/// all chunks, and the lists it returns are concatenated.
/// `Parts` then holds one concatenated list per function (not
/// one entry per chunk).
pub fn maybe_chunked_each<T, R>(
    values:         &[T],
    length:         Option<usize>,
    on_chunked:     &mut [&mut dyn FnMut(&[T]) -> Vec<R>],
    on_not_chunked: impl FnOnce(&[T]) -> Vec<R>,
) -> Chunked<Vec<R>> {
    match length {
        None => Chunked::Whole(on_not_chunked(values)),
        Some(length) => Chunked::Parts(
            on_chunked
                .iter_mut()
                .map(|f| chunklist(values, length).flat_map(|chunk| f(chunk)).collect())
                .collect(),
        ),
    }
}
