//! Order-`N` adaptive byte model: a sliding window of recently-coded bytes
//! as a context key, each mapped to its own frequency table. Works over raw
//! bytes rather than Unicode text, since `codec_entropy` only ever sees
//! integer symbols.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use codec_common::Result;
use codec_entropy::ArrayContext;

use crate::byte_stream::ALPHABET_SIZE;

/// Once a context's frequency total crosses this, halve every entry
/// (rounding up so no entry drops to zero) before it can approach
/// `codec_entropy::MAX_TOTAL`. A long enough run of repeated bytes would
/// otherwise grow one context's total without bound.
const RESCALE_THRESHOLD: u64 = 1 << 15;

/// A sliding-window order-`N` byte model.
///
/// Keeps one raw frequency vector per distinct context window seen so far
/// (escape-to-lower-order in its simplest form: unseen windows fall back to
/// a uniform table, not a full PPM ladder with multiple escape levels), and
/// exposes them all through a single long-lived `ArrayContext` whose
/// contents are re-synced to match whichever window is current.
///
/// `current_context` always returns a reference to that same `ArrayContext`
/// -- an `Encoder`/`Decoder` only needs to install it once via
/// `set_context` and never has to swap which object it points to, because
/// `observe` changes the object's contents in place (through
/// `ArrayContext`'s own interior mutability) rather than handing out a
/// different object per window. `window`/`tables` are themselves behind
/// `RefCell` so `observe` can take `&self`: the codec holding a shared
/// reference to the model's `active` context and the caller driving
/// `observe` between symbols are then just two ordinary shared borrows of
/// the same model, which Rust permits freely.
pub struct PredictiveByteModel {
    max_order: usize,
    window: RefCell<VecDeque<u8>>,
    tables: RefCell<HashMap<Vec<u8>, Vec<u64>>>,
    active: ArrayContext,
}

impl PredictiveByteModel {
    pub fn new(max_order: usize) -> Self {
        let model = Self {
            max_order,
            window: RefCell::new(VecDeque::with_capacity(max_order)),
            tables: RefCell::new(HashMap::new()),
            active: ArrayContext::new(ALPHABET_SIZE),
        };
        model
            .sync_active()
            .expect("a freshly initialized context's total is exactly ALPHABET_SIZE");
        model
    }

    /// The context the next symbol should be coded/decoded under. Stable
    /// across the whole model's lifetime: install it once.
    pub fn current_context(&self) -> &ArrayContext {
        &self.active
    }

    /// Record that `byte` was just coded: bump its frequency under the
    /// current window, slide the window forward, then re-sync `active` to
    /// the (possibly new) window's table.
    pub fn observe(&self, byte: u8) -> Result<()> {
        let key: Vec<u8> = self.window.borrow().iter().copied().collect();
        {
            let mut tables = self.tables.borrow_mut();
            let freqs = tables.entry(key).or_insert_with(|| vec![1u64; ALPHABET_SIZE]);
            freqs[byte as usize] += 1;
            let total: u64 = freqs.iter().sum();
            if total > RESCALE_THRESHOLD {
                for f in freqs.iter_mut() {
                    *f = (*f + 1) / 2;
                }
            }
        }

        {
            let mut window = self.window.borrow_mut();
            window.push_back(byte);
            if window.len() > self.max_order {
                window.pop_front();
            }
        }

        self.sync_active()
    }

    /// Drop all accumulated history, returning to the order-0 fallback.
    pub fn reset(&self) {
        log::debug!(
            "resetting predictive model (order {}, {} contexts learned)",
            self.max_order,
            self.tables.borrow().len()
        );
        self.window.borrow_mut().clear();
        self.sync_active()
            .expect("a table bounded by RESCALE_THRESHOLD stays well under MAX_TOTAL");
    }

    pub fn max_order(&self) -> usize {
        self.max_order
    }

    /// Re-sync `active` to the table for the current window. Propagates
    /// `CodecError::Overflow` rather than asserting it away: the per-context
    /// rescale in `observe` keeps every table's total at or below roughly
    /// `2 * RESCALE_THRESHOLD`, far under `codec_entropy::MAX_TOTAL`, but
    /// this still reports the error instead of panicking if that bound is
    /// ever widened without updating this invariant.
    fn sync_active(&self) -> Result<()> {
        let key: Vec<u8> = self.window.borrow().iter().copied().collect();
        let tables = self.tables.borrow();
        let freqs = tables
            .get(&key)
            .cloned()
            .unwrap_or_else(|| vec![1u64; ALPHABET_SIZE]);
        self.active.update_frequencies_vec(|v| *v = freqs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec_entropy::SymbolContext;

    #[test]
    fn unseen_context_falls_back_to_order_zero() {
        let model = PredictiveByteModel::new(3);
        let ctx = model.current_context();
        assert_eq!(ctx.symbol_freq(0), 1);
        assert_eq!(ctx.symbol_freq(255), 1);
    }

    #[test]
    fn observe_updates_the_context_the_byte_was_coded_under() {
        let model = PredictiveByteModel::new(2);
        model.observe(b'a').unwrap();
        model.observe(b'b').unwrap();
        // Window is now [a, b]; observing 'c' bumps freq under key [a, b]
        // and re-syncs `active` to the post-update table for [a, b, c].
        model.observe(b'c').unwrap();

        let probe = PredictiveByteModel::new(2);
        probe.observe(b'a').unwrap();
        probe.observe(b'b').unwrap();
        let ctx = probe.current_context();
        assert_eq!(ctx.symbol_freq(b'c' as i64), 1); // table for [a, b] is still fresh here
    }

    #[test]
    fn active_context_tracks_repeated_observations_in_the_same_window() {
        let model = PredictiveByteModel::new(1);
        model.observe(5).unwrap(); // window becomes [5], table for [] bumped
        model.observe(5).unwrap(); // window becomes [5], table for [5] bumped
        model.observe(5).unwrap(); // table for [5] bumped again
        let ctx = model.current_context();
        assert_eq!(ctx.symbol_freq(5), 3); // base 1 + two increments under [5]
    }

    #[test]
    fn window_slides_and_drops_oldest_byte() {
        let model = PredictiveByteModel::new(2);
        model.observe(1).unwrap();
        model.observe(2).unwrap();
        model.observe(3).unwrap();
        assert_eq!(*model.window.borrow(), VecDeque::from(vec![2, 3]));
    }

    #[test]
    fn reset_returns_to_order_zero_context() {
        let model = PredictiveByteModel::new(2);
        model.observe(9).unwrap();
        model.observe(9).unwrap();
        model.reset();
        let ctx = model.current_context();
        assert_eq!(ctx.symbol_freq(9), 1);
    }

    #[test]
    fn long_run_of_repeats_rescales_instead_of_overflowing() {
        let model = PredictiveByteModel::new(0);
        for _ in 0..200_000 {
            model.observe(b'x').unwrap();
        }
        let ctx = model.current_context();
        assert!(ctx.total() <= RESCALE_THRESHOLD + ALPHABET_SIZE as u64);
        assert!(ctx.symbol_freq(b'x' as i64) > 0);
    }

    #[test]
    fn install_once_then_observe_through_a_shared_reference() {
        // Mirrors the real Encoder/Decoder usage pattern: take the context
        // reference once up front, then keep calling observe() through an
        // ordinary shared &PredictiveByteModel for the rest of the stream.
        let model = PredictiveByteModel::new(2);
        let installed: &dyn SymbolContext = model.current_context();
        assert_eq!(installed.total(), ALPHABET_SIZE as u64);
        model.observe(b'z').unwrap();
        assert_eq!(installed.symbol_freq(b'z' as i64), 2);
    }
}
