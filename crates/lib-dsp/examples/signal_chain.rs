//! Generate a noisy tone, window it, low-pass it and print the result.
//!
//! Run with `cargo run -p lib-dsp --example signal_chain`.

use lib_dsp::filter::{fir, lp_fir_design};
use lib_dsp::window::{apply_window_in_place, WindowType};
use lib_dsp::{signal, vector, DspResult, ParkMiller};
use lib_fixed::Q15;

fn main() -> DspResult<()> {
    const LEN: usize = 64;
    const TAPS: usize = 15;

    let mut tone = vec![Q15::ZERO; LEN + TAPS - 1];
    signal::gen_sin(&mut tone, 500, 8000, Q15::ZERO)?;
    vector::real_mul_in_place(&mut tone, Q15::from_f64(0.5));

    let mut noise = vec![Q15::ZERO; tone.len()];
    signal::noise(&mut noise, Q15::from_f64(0.25), &mut ParkMiller::new());
    vector::add_in_place(&mut tone, &noise)?;
    apply_window_in_place(WindowType::Hann, &mut tone)?;

    let mut h = vec![Q15::ZERO; TAPS];
    lp_fir_design(&mut h, 1000, 8000)?;
    let mut out = vec![Q15::ZERO; LEN];
    fir(&mut out, &tone, &h)?;

    for (n, sample) in out.iter().enumerate() {
        println!("{n:3} {:+.5}", sample.to_f64());
    }
    Ok(())
}
