//! End-to-end scenarios from the specification's testable-properties
//! section: full round trips through the public API rather than
//! per-module unit tests.

use std::f32::consts::PI;
use tempfile::NamedTempFile;
use whistler_dsp::classifier::{Classifier, Topology};
use whistler_dsp::feature::ResultValue;
use whistler_dsp::identifier::{Identifier, Mode};
use whistler_dsp::learner::Learner;
use whistler_dsp::localizer::Localizer;
use whistler_dsp::pattern::Pattern;

/// Scenario 1: construct a classifier with all weights set to 0.5, save
/// it through a pattern, reload, and compare weight-sensitive output.
#[test]
fn scenario_load_save_roundtrip_all_weights_half() {
    let topology = Topology::Small;
    let bytes: Vec<u8> = (0..topology.total_weights())
        .flat_map(|_| (0.5_f32).to_be_bytes())
        .collect();
    let classifier = Classifier::from_bytes(topology, &bytes).unwrap();

    let pattern = Pattern::new(500, 4000, 44_100, topology.name(), classifier.serialize());
    let file = NamedTempFile::new().unwrap();
    pattern.save(file.path()).unwrap();
    let loaded = Pattern::load(file.path()).unwrap();

    assert_eq!(pattern, loaded);
    let reloaded_bytes = loaded.classifier_data(topology.name()).unwrap();
    for chunk in reloaded_bytes.chunks(4) {
        let v = f32::from_be_bytes(chunk.try_into().unwrap());
        assert!((v - 0.5).abs() < 1e-6);
    }
}

/// Scenario 3: a broadband signal delayed by 5 samples on the second
/// channel localizes to the spec's worked-example angle. (A pure tone is
/// avoided here since its period aliases within the lag search range.)
#[test]
fn scenario_delay_localization() {
    let sample_rate = 44_100;
    let distance = 34.4;
    let frame_len = 512;
    let delay = 5usize;

    let total = frame_len + delay;
    let signal: Vec<f32> = (0..total)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * PI * 600.0 * t).sin() + 0.6 * (2.0 * PI * 2_357.0 * t).sin()
                - 0.4 * (2.0 * PI * 5_111.0 * t).sin()
        })
        .collect();

    let mut loc = Localizer::new(frame_len, sample_rate, distance).unwrap();
    loc.process(&signal[0..frame_len], &signal[0..frame_len]);
    let angle = loc.process(&signal[delay..delay + frame_len], &signal[0..frame_len]);

    let expected = (delay as f64 * 34_400.0 / (sample_rate as f64 * distance)).asin();
    assert!(
        (angle - expected).abs() < 0.02,
        "expected ~{expected}, got {angle}"
    );
}

/// Scenario 5: two well-separated Gaussian-ish blobs of MFCCs, labelled
/// 0/1, train to at least 90% accuracy.
#[test]
fn scenario_training_convergence() {
    let mut rng_state: u64 = 0xdead_beef_1234_5678;
    let mut next = || {
        rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (rng_state >> 33) as f64 / u32::MAX as f64
    };

    let mut samples = Vec::new();
    for _ in 0..250 {
        let mut vec = [0.0; 32];
        vec[0] = 5.0 + next();
        vec[1] = 5.0 + next();
        samples.push(ResultValue::new(1, vec));
    }
    for _ in 0..250 {
        let mut vec = [0.0; 32];
        vec[0] = -5.0 + next();
        vec[1] = -5.0 + next();
        samples.push(ResultValue::new(0, vec));
    }

    let mut classifier = Classifier::learn(Topology::Small, &samples, 0.9, 7);
    let correct = samples
        .iter()
        .filter(|s| {
            let score = classifier.forward(&s.vec);
            let predicted = if score >= 0.5 { 1 } else { 0 };
            predicted == s.label
        })
        .count();
    assert!(correct as f64 / samples.len() as f64 >= 0.9);
}

/// Scenario 6: a sample-rate mismatch between a loaded pattern and the
/// identifier's construction parameters fails cleanly.
#[test]
fn scenario_sample_rate_mismatch_rejected() {
    let classifier = Classifier::randomized(Topology::Small, 3);
    let pattern = Pattern::new(0, 0, 44_100, Topology::Small.name(), classifier.serialize());

    let file = NamedTempFile::new().unwrap();
    pattern.save(file.path()).unwrap();
    let loaded = Pattern::load(file.path()).unwrap();

    let err = Identifier::new(48_000, 1024, 2, 20.0, &loaded);
    assert!(err.is_err());
}

/// A learner trained end-to-end: process labelled frames, save state,
/// reload, and generate a pattern an identifier can then consume.
#[test]
fn scenario_learner_to_identifier_pipeline() {
    let frame_len = 256;
    let sample_rate = 16_000;

    let mut learner = Learner::new(Topology::Small, sample_rate, frame_len, 0, 0).unwrap();
    for i in 0..40u32 {
        let label = (i % 2) as i32;
        let freq = if label == 1 { 2000.0 } else { 200.0 };
        let frame: Vec<f32> = (0..frame_len)
            .map(|n| (2.0 * PI * freq * n as f32 / sample_rate as f32).sin())
            .collect();
        learner.process(label, &frame).unwrap();
    }
    learner.finish_sequence();

    let state_file = NamedTempFile::new().unwrap();
    learner.save_state(state_file.path()).unwrap();

    let reloaded =
        Learner::new_from_state(Topology::Small, sample_rate, frame_len, state_file.path(), None)
            .unwrap();
    let pattern = reloaded.generate_pattern_seeded(0.6, 11);

    let pattern_file = NamedTempFile::new().unwrap();
    pattern.save(pattern_file.path()).unwrap();
    let loaded_pattern = Pattern::load(pattern_file.path()).unwrap();

    let mut identifier =
        Identifier::new(sample_rate, frame_len, 2, 20.0, &loaded_pattern).unwrap();
    let frame = vec![0.3_f32; frame_len * 2];
    let result = identifier.process(&frame, Mode::CLASSIFY).unwrap();
    assert!((0.0..=1.0).contains(&result.score));
}
