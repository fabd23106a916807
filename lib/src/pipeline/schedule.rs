//! Two-phase data-parallel scheduling.
//!
//! Phase one fills a pre-sized slot vector in parallel, one task per slot.
//! The barrier is the return of that parallel loop: afterwards every slot is
//! written and the vector is only read. Phase two runs one task per slot
//! again, each seeing its own slot, its neighbours and the whole frozen
//! vector.

use rayon::prelude::*;

/// What a second-phase task may read.
#[derive(Debug)]
pub struct Neighbours<'a, C> {
    pub index: usize,
    pub below: Option<&'a C>,
    pub current: &'a C,
    pub above: Option<&'a C>,
    /// Every first-phase result.
    pub all: &'a [C],
}

impl<'a, C> Clone for Neighbours<'a, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, C> Copy for Neighbours<'a, C> {}

impl<'a, C> Neighbours<'a, C> {
    fn at(all: &'a [C], index: usize) -> Self {
        Self {
            index,
            below: index.checked_sub(1).and_then(|i| all.get(i)),
            current: &all[index],
            above: all.get(index + 1),
            all,
        }
    }
}

/// Run `first` for every index, then `barrier` on the complete vector, then
/// `second` for every index of what the barrier left.
///
/// Slots are pre-sized with `Default` values and every task writes only its
/// own slot.
pub fn run_two_phase<C, O, F, B, S>(len: usize, first: F, barrier: B, second: S) -> Vec<O>
where
    C: Default + Send + Sync,
    O: Default + Send,
    F: Fn(usize) -> C + Sync + Send,
    B: FnOnce(&mut Vec<C>),
    S: Fn(Neighbours<'_, C>) -> O + Sync + Send,
{
    let mut slots: Vec<C> = std::iter::repeat_with(C::default).take(len).collect();
    slots
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, slot)| *slot = first(i));

    barrier(&mut slots);
    let frozen: &[C] = &slots;

    let mut outputs: Vec<O> = std::iter::repeat_with(O::default)
        .take(frozen.len())
        .collect();
    outputs
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, out)| *out = second(Neighbours::at(frozen, i)));
    outputs
}
