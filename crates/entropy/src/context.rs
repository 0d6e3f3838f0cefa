//! The probability model queried per symbol.
//!
//! `SymbolContext` is the codec's only view into the caller's model: total
//! frequency, per-symbol frequency, and cumulative position. `ArrayContext`
//! is the dense, array-backed implementation for alphabets `[0, N)`.

use std::cell::{Cell, RefCell};

use codec_common::{CodecError, Result};

/// Frequency-sum ceiling. Exceeding this risks the working interval
/// shrinking below `total` during renormalization.
pub const MAX_TOTAL: u64 = 1 << 31;

/// The cumulative-frequency model queried per symbol.
///
/// Implementations must keep `total()`, `symbol_freq()`, and `symbol_pos()`
/// mutually consistent: `symbol_pos(s + 1) - symbol_pos(s) == symbol_freq(s)`
/// for every representable `s`, and `symbol_pos` must be monotonic
/// non-decreasing. The encoder and decoder report violations of this
/// contract as `CodecError::InconsistentContext` rather than attempting to
/// recover from them.
///
/// Every method here takes `&self`. `Encoder`/`Decoder` hold a shared,
/// non-owning reference to "the current context" for as long as it is
/// installed (see `set_context`), but the spec also requires that the
/// caller be able to mutate that same context in place between symbol
/// calls (e.g. to adapt frequencies). A `&mut self` mutation API would
/// conflict with the codec's live shared borrow, so every implementation
/// here — the lazy position cache as well as the caller-facing frequency
/// mutators — uses interior mutability (`Cell`/`RefCell`) instead.
pub trait SymbolContext {
    /// Sum of all frequencies over the entire representable alphabet.
    fn total(&self) -> u64;

    /// Frequency of `symbol`. Zero outside the valid alphabet.
    fn symbol_freq(&self, symbol: i64) -> u64;

    /// Sum of frequencies of symbols strictly less than `symbol`. Zero for
    /// `symbol <= min_symbol`, `total()` for `symbol > max_symbol`.
    fn symbol_pos(&self, symbol: i64) -> u64;
}

/// Dense, array-backed context for alphabets `[0, N)`.
///
/// Maintains a lazily-extended cumulative table: `positions[i]` is the sum
/// of `freqs[0..i]` once computed, and `positions_valid_until` is the
/// high-water index up to which the table is authoritative. Point updates
/// invalidate only the suffix above the touched index; bulk updates
/// invalidate the whole table.
///
/// All mutation methods take `&self` (see the note on `SymbolContext`
/// above): a caller holding a plain `&ArrayContext` — the same reference an
/// `Encoder`/`Decoder` was handed via `set_context` — can still call
/// `set_symbol_frequency`/`increment_symbol_frequency`/`update_frequencies`
/// between symbol calls.
pub struct ArrayContext {
    freqs: RefCell<Vec<u64>>,
    total: Cell<u64>,
    // positions[i] == sum(freqs[0..i]) for i in 0..=positions_valid_until.
    positions: RefCell<Vec<u64>>,
    // -1 means nothing is cached yet.
    positions_valid_until: Cell<i64>,
}

impl ArrayContext {
    /// A context of `len` symbols, each with frequency 1.
    pub fn new(len: usize) -> Self {
        Self::with_initializer(len, |_| 1)
    }

    /// A context of `len` symbols, frequency `init(i)` for symbol `i`.
    pub fn with_initializer(len: usize, init: impl Fn(usize) -> u64) -> Self {
        let freqs: Vec<u64> = (0..len).map(init).collect();
        let total = freqs.iter().sum();
        Self {
            freqs: RefCell::new(freqs),
            total: Cell::new(total),
            positions: RefCell::new(Vec::with_capacity(len + 1)),
            positions_valid_until: Cell::new(-1),
        }
    }

    /// A context built from an explicit frequency vector, taken by value.
    pub fn from_frequencies(freqs: Vec<u64>) -> Result<Self> {
        let total: u64 = freqs.iter().sum();
        if total > MAX_TOTAL {
            return Err(CodecError::Overflow {
                new_total: total,
                max: MAX_TOTAL,
            });
        }
        let cap = freqs.len() + 1;
        Ok(Self {
            freqs: RefCell::new(freqs),
            total: Cell::new(total),
            positions: RefCell::new(Vec::with_capacity(cap)),
            positions_valid_until: Cell::new(-1),
        })
    }

    pub fn len(&self) -> usize {
        self.freqs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.freqs.borrow().is_empty()
    }

    pub fn frequencies(&self) -> Vec<u64> {
        self.freqs.borrow().clone()
    }

    /// Set `freqs[s]` to `new`, updating `total` and invalidating the
    /// cumulative cache above `s`.
    pub fn set_symbol_frequency(&self, s: usize, new: u64) -> Result<()> {
        let mut freqs = self.freqs.borrow_mut();
        self.bounds_check(&freqs, s)?;
        let old = freqs[s];
        let new_total = self.total.get() as i128 - old as i128 + new as i128;
        if new_total > MAX_TOTAL as i128 {
            return Err(CodecError::Overflow {
                new_total: new_total as u64,
                max: MAX_TOTAL,
            });
        }
        freqs[s] = new;
        self.total.set(new_total as u64);
        drop(freqs);

        // Positions <= s are unaffected by a change to freqs[s] (they sum
        // freqs strictly below s); positions > s are invalidated. Taking the
        // min guards against marking never-computed slots valid when s is
        // past the current high-water mark: an unconditional `:= s` could
        // mark positions in `(old_valid_until, s]` valid even though they
        // were never computed, silently corrupting the cache.
        let until = self.positions_valid_until.get();
        self.positions_valid_until.set(until.min(s as i64));
        Ok(())
    }

    /// Add `delta` to `freqs[s]`. Fails if the result would be negative.
    pub fn increment_symbol_frequency(&self, s: usize, delta: i64) -> Result<()> {
        let current = {
            let freqs = self.freqs.borrow();
            self.bounds_check(&freqs, s)?;
            freqs[s] as i64
        };
        let updated = current
            .checked_add(delta)
            .ok_or_else(|| CodecError::InvalidArgument("frequency delta overflow".into()))?;
        if updated < 0 {
            return Err(CodecError::InvalidArgument(format!(
                "increment_symbol_frequency({s}, {delta}) would make the frequency negative"
            )));
        }
        self.set_symbol_frequency(s, updated as u64)
    }

    /// Run `mutator` over the frequency vector, then fully invalidate the
    /// cumulative cache and recompute `total`.
    pub fn update_frequencies(&self, mutator: impl FnOnce(&mut [u64])) -> Result<()> {
        mutator(&mut self.freqs.borrow_mut());
        self.recompute_after_bulk_update()
    }

    /// As `update_frequencies`, but the mutator may replace the underlying
    /// vector entirely (e.g. to resize the alphabet).
    pub fn update_frequencies_vec(&self, mutator: impl FnOnce(&mut Vec<u64>)) -> Result<()> {
        mutator(&mut self.freqs.borrow_mut());
        self.recompute_after_bulk_update()
    }

    fn recompute_after_bulk_update(&self) -> Result<()> {
        let total: u64 = self.freqs.borrow().iter().sum();
        if total > MAX_TOTAL {
            return Err(CodecError::Overflow {
                new_total: total,
                max: MAX_TOTAL,
            });
        }
        self.total.set(total);
        self.positions_valid_until.set(-1);
        self.positions.borrow_mut().clear();
        Ok(())
    }

    fn bounds_check(&self, freqs: &[u64], s: usize) -> Result<()> {
        if s >= freqs.len() {
            return Err(CodecError::OutOfRange {
                index: s as i64,
                len: freqs.len(),
            });
        }
        Ok(())
    }

    /// Extend the cumulative cache so that `positions[target]` is valid.
    fn ensure_cached(&self, target: usize) {
        let mut until = self.positions_valid_until.get();
        if until >= target as i64 {
            return;
        }
        let freqs = self.freqs.borrow();
        let mut positions = self.positions.borrow_mut();
        if positions.is_empty() {
            positions.push(0);
            until = 0;
        }
        while until < target as i64 {
            let i = until as usize;
            let next = positions[i] + freqs[i];
            positions.push(next);
            until += 1;
        }
        self.positions_valid_until.set(until);
    }
}

impl SymbolContext for ArrayContext {
    fn total(&self) -> u64 {
        self.total.get()
    }

    fn symbol_freq(&self, symbol: i64) -> u64 {
        let freqs = self.freqs.borrow();
        if symbol < 0 || symbol as usize >= freqs.len() {
            return 0;
        }
        freqs[symbol as usize]
    }

    fn symbol_pos(&self, symbol: i64) -> u64 {
        if symbol <= 0 {
            return 0;
        }
        let n = self.freqs.borrow().len() as i64;
        if symbol >= n {
            return self.total.get();
        }
        let target = symbol as usize;
        self.ensure_cached(target);
        self.positions.borrow()[target]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_context_positions() {
        let ctx = ArrayContext::new(4);
        assert_eq!(ctx.total(), 4);
        assert_eq!(ctx.symbol_pos(0), 0);
        assert_eq!(ctx.symbol_pos(1), 1);
        assert_eq!(ctx.symbol_pos(4), 4);
        assert_eq!(ctx.symbol_pos(100), 4);
        assert_eq!(ctx.symbol_pos(-5), 0);
    }

    #[test]
    fn lazy_cache_is_consistent_with_eager_recompute() {
        let ctx = ArrayContext::from_frequencies(vec![10, 30, 10]).unwrap();
        // Query out of order, forcing forward extension from scratch each time
        // plus reuse of the cache.
        assert_eq!(ctx.symbol_pos(2), 40);
        assert_eq!(ctx.symbol_pos(1), 10);
        assert_eq!(ctx.symbol_pos(3), 50);
        for s in 0..3 {
            assert_eq!(
                ctx.symbol_pos(s + 1) - ctx.symbol_pos(s),
                ctx.symbol_freq(s)
            );
        }
    }

    #[test]
    fn set_symbol_frequency_invalidates_suffix_only() {
        let ctx = ArrayContext::from_frequencies(vec![1, 1, 1, 1]).unwrap();
        assert_eq!(ctx.symbol_pos(4), 4);
        ctx.set_symbol_frequency(1, 5).unwrap();
        assert_eq!(ctx.total(), 8);
        assert_eq!(ctx.symbol_pos(1), 1); // unaffected: sums freqs[0..1]
        assert_eq!(ctx.symbol_pos(2), 6); // now includes the new freq[1]
        assert_eq!(ctx.symbol_pos(4), 8);
    }

    #[test]
    fn increment_rejects_negative_result() {
        let ctx = ArrayContext::new(3);
        let err = ctx.increment_symbol_frequency(0, -5).unwrap_err();
        assert!(matches!(err, CodecError::InvalidArgument(_)));
    }

    #[test]
    fn from_frequencies_rejects_overflowing_total() {
        let err = ArrayContext::from_frequencies(vec![MAX_TOTAL, 1]).unwrap_err();
        assert!(matches!(err, CodecError::Overflow { .. }));
    }

    #[test]
    fn out_of_range_mutation_is_reported() {
        let ctx = ArrayContext::new(2);
        let err = ctx.set_symbol_frequency(5, 1).unwrap_err();
        assert!(matches!(err, CodecError::OutOfRange { index: 5, len: 2 }));
    }

    #[test]
    fn update_frequencies_vec_can_resize() {
        let ctx = ArrayContext::new(2);
        ctx.update_frequencies_vec(|v| v.push(7)).unwrap();
        assert_eq!(ctx.len(), 3);
        assert_eq!(ctx.total(), 9);
        assert_eq!(ctx.symbol_pos(3), 9);
    }

    #[test]
    fn mutation_through_shared_reference_is_visible_to_a_holder_of_the_same_reference() {
        // Mirrors how Encoder/Decoder hold `&dyn SymbolContext`: a second
        // shared reference to the same ArrayContext can still drive
        // mutation via interior mutability.
        let ctx = ArrayContext::new(4);
        let held_by_codec: &dyn SymbolContext = &ctx;
        assert_eq!(held_by_codec.total(), 4);
        ctx.increment_symbol_frequency(0, 10).unwrap();
        assert_eq!(held_by_codec.total(), 14);
    }
}
