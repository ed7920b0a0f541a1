mod common;

use techno::analysis::analyze;
use techno::filter::{high_pass, DEFAULT_ORDER};
use techno::fx::bit_crush;
use techno::phrase::{Element, Phrase, Volumes};
use techno::presets::{HiHat, Kick};
use techno::time::TimingCalculator;
use techno::{Buffer, Channels, Error};

const SAMPLE_MS: f64 = 1000.0 / 44100.0;

#[test]
fn test_bars_are_linear_and_invertible() {
    for bpm in [60.0, 118.0, 124.0, 138.5, 200.0] {
        let t = TimingCalculator::new(bpm).unwrap();
        let one = t.bars_to_ms(1.0);
        for n in 0..40 {
            let ms = t.bars_to_ms(n as f64);
            assert!((ms - n as f64 * one).abs() < 1e-6, "bpm {} bars {}", bpm, n);
            assert!((t.bars_to_ms(t.ms_to_bars(ms)) - ms).abs() < SAMPLE_MS, "bpm {} bars {}", bpm, n);
        }
    }
}

#[test]
fn test_nearest_bar_is_idempotent() {
    let t = TimingCalculator::new(124.0).unwrap();
    for ms in [0.0, 1.0, 967.0, 1935.0, 2903.2, 10_000.0, 123_456.7] {
        let once = t.nearest_bar(ms);
        assert_eq!(t.nearest_bar(once), once, "{}", ms);
    }
}

#[test]
fn test_16_bit_round_trip_within_one_lsb() {
    let b = common::chord(&[55.0, 440.0, 3000.0]).gain(-1.0);
    let back = Buffer::from_i16(&b.to_i16(), b.sample_rate(), Channels::Mono).unwrap();
    for (x, y) in b.samples().iter().zip(back.samples()) {
        assert!((x - y).abs() <= 1.0 / 32768.0, "{} vs {}", x, y);
    }
}

#[test]
fn test_tone_band_shares() {
    let sub = analyze(&common::tone(50.0));
    assert!(sub.percentage("sub").unwrap() > 50.0);
    assert!(sub.percentage("air").unwrap() < 5.0);

    let mid = analyze(&common::tone(1000.0));
    assert!(mid.percentage("mids").unwrap() > 50.0);
    assert!(mid.percentage("sub").unwrap() < 5.0);
    assert!(mid.percentage("air").unwrap() < 5.0);
}

#[test]
fn test_high_pass_removes_sub_keeps_mids() {
    let mixed = common::chord(&[50.0, 1000.0]);
    let before = analyze(&mixed);
    let after = analyze(&high_pass(&mixed, 80.0, DEFAULT_ORDER).unwrap());
    assert!(after.percentage("sub").unwrap() < before.percentage("sub").unwrap());
    assert!(after.percentage("mids").unwrap() >= before.percentage("mids").unwrap() * 0.8);
}

#[test]
fn test_bit_crush_reduces_distinct_values() {
    let b = common::tone(440.0);
    let crushed4 = bit_crush(&b, 4).unwrap();
    let crushed8 = bit_crush(&b, 8).unwrap();
    assert!(common::distinct_values(&crushed4) < common::distinct_values(&b));
    assert!(common::distinct_values(&crushed4) < common::distinct_values(&crushed8));
}

#[test]
fn test_hihat_closedness_bounds() {
    let hat = HiHat::new(common::seeded(128.0));
    for c in [-0.1, 1.1] {
        assert!(matches!(hat.generate(80.0, c), Err(Error::InvalidParameter { .. })));
    }
    for c in [0.0, 1.0] {
        let b = hat.generate(80.0, c).unwrap();
        assert!(!b.is_empty());
        assert!((b.duration_ms() - 80.0).abs() <= SAMPLE_MS);
    }
}

#[test]
fn test_minimal_kick_end_to_end() {
    let b = Kick::new(common::seeded(130.0)).generate_minimal().unwrap();
    assert_eq!(b.channels(), Channels::Mono);
    assert!(b.duration_ms() >= 50.0 && b.duration_ms() <= 300.0);
    assert!((b.peak() - 1.0).abs() <= 0.01);
}

#[test]
fn test_kick_phrase_length() {
    let phrase = Phrase::new(common::seeded(124.0));
    let b = phrase.build(&[Element::Kick], &Volumes::new()).unwrap();
    let expected = 8.0 * 4.0 * 60_000.0 / 124.0;
    assert!((b.duration_ms() - expected).abs() < 5.0, "{}", b.duration_ms());
}
