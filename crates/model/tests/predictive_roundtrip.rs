//! Round-trips a byte stream coded under a `PredictiveByteModel` on both
//! ends. The model's context is installed once; `observe` keeps its
//! contents current in place rather than swapping which object is
//! installed, so the codec never needs to call `set_context` again mid
//! stream.

use codec_entropy::{Decoder, Encoder, SymbolContext};
use codec_model::PredictiveByteModel;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn gen_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    // Skew toward a handful of bytes so the predictive model has
    // something to learn, rather than pure uniform noise.
    let palette = [b'a', b'a', b'a', b'b', b'b', b'c', b'\n', b' '];
    (0..len)
        .map(|_| palette[rng.gen_range(0..palette.len())])
        .collect()
}

#[test]
fn order_two_model_roundtrips_skewed_text() {
    let data = gen_bytes(7, 2000);

    let model = PredictiveByteModel::new(2);
    let mut buf = Vec::new();
    {
        let mut enc = Encoder::new(&mut buf, model.current_context() as &dyn SymbolContext);
        for &b in &data {
            enc.write_symbol(b as i64).unwrap();
            model.observe(b).unwrap();
        }
        enc.finalize(true).unwrap();
    }

    let model = PredictiveByteModel::new(2);
    let mut dec = Decoder::new(&buf[..], model.current_context() as &dyn SymbolContext);
    let mut decoded = Vec::with_capacity(data.len());
    for _ in 0..data.len() {
        let symbol = dec.read_symbol().unwrap();
        let b = symbol as u8;
        decoded.push(b);
        model.observe(b).unwrap();
    }
    dec.finalize(true).unwrap();

    assert_eq!(decoded, data);
}

#[test]
fn order_two_model_beats_uniform_on_skewed_text() {
    use codec_model::uniform_byte_context;

    let data = gen_bytes(11, 5000);

    let model = PredictiveByteModel::new(2);
    let mut predictive_buf = Vec::new();
    {
        let mut enc = Encoder::new(
            &mut predictive_buf,
            model.current_context() as &dyn SymbolContext,
        );
        for &b in &data {
            enc.write_symbol(b as i64).unwrap();
            model.observe(b).unwrap();
        }
        enc.finalize(true).unwrap();
    }

    let ctx = uniform_byte_context();
    let mut uniform_buf = Vec::new();
    {
        let mut enc = Encoder::new(&mut uniform_buf, &ctx as &dyn SymbolContext);
        for &b in &data {
            enc.write_symbol(b as i64).unwrap();
        }
        enc.finalize(true).unwrap();
    }

    assert!(predictive_buf.len() < uniform_buf.len());
}
