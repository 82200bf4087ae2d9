//! Filter throughput benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lib_dsp::filter::{self, lp_fir_design};
use lib_dsp::{signal, Generic, LmsFilter, ParkMiller, Unrolled};
use lib_fixed::{Q15, Q31};

fn noise_q15(len: usize) -> Vec<Q15> {
    let mut buf = vec![Q15::ZERO; len];
    signal::noise(&mut buf, Q15::from_f64(0.5), &mut ParkMiller::new());
    buf
}

fn bench_fir(c: &mut Criterion) {
    let mut group = c.benchmark_group("fir");

    for taps in [8usize, 32, 128].iter() {
        let mut h = vec![Q15::ZERO; *taps];
        lp_fir_design(&mut h, 1000, 8000).unwrap();
        let x = noise_q15(4096 + taps - 1);
        let mut y = vec![Q15::ZERO; 4096];

        group.bench_with_input(BenchmarkId::new("generic", taps), &h, |b, h| {
            b.iter(|| filter::fir_with::<Generic, _, 15>(&mut y, black_box(&x), h).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("unrolled", taps), &h, |b, h| {
            b.iter(|| filter::fir_with::<Unrolled, _, 15>(&mut y, black_box(&x), h).unwrap());
        });
    }

    group.finish();
}

fn bench_iir(c: &mut Criterion) {
    let mut group = c.benchmark_group("iir");

    let num: Vec<Q31> = [0.0675, 0.135, 0.0675].iter().map(|&v| Q31::from_f64(v)).collect();
    let den: Vec<Q31> = [-1.143, 0.4128].iter().map(|&v| Q31::from_f64(v / 2.0)).collect();
    let x: Vec<Q31> = noise_q15(4096 + 2).iter().map(|s| s.convert()).collect();
    let mut y = vec![Q31::ZERO; 4096 + 2];

    group.bench_function("biquad_generic", |b| {
        b.iter(|| {
            filter::iir_with::<Generic, _, 31>(&mut y, black_box(&x), &num, 0, &den, 1).unwrap()
        });
    });
    group.bench_function("biquad_unrolled", |b| {
        b.iter(|| {
            filter::iir_with::<Unrolled, _, 31>(&mut y, black_box(&x), &num, 0, &den, 1).unwrap()
        });
    });

    group.finish();
}

fn bench_lms(c: &mut Criterion) {
    let mut group = c.benchmark_group("lms");

    for taps in [16usize, 64].iter() {
        let x = noise_q15(1024);
        group.bench_with_input(BenchmarkId::new("lms", taps), taps, |b, &taps| {
            b.iter(|| {
                let mut lms = LmsFilter::<i16, 15>::new(taps).unwrap();
                for &sample in &x {
                    black_box(lms.process(sample, sample).unwrap());
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fir, bench_iir, bench_lms);
criterion_main!(benches);
