use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use keyword_study::analysis::FeatureExtractor;
use keyword_study::audio::{add_noise, AudioLoader, DEFAULT_NOISE_SCALE};
use keyword_study::error::AudioErrorCodes;
use keyword_study::fixtures::{encode_wav, SyntheticPattern, SyntheticSpec};
use keyword_study::session::{evaluate_session, RecordingOutcome};
use keyword_study::{
    AudioError, Classifier, InferenceEngine, InferenceError, KeywordPipeline, PipelineConfig,
    PipelineError,
};
use ndarray::Array4;
use rand::{rngs::StdRng, SeedableRng};

/// Maps the mean log-power of the feature map through a sigmoid
struct MeanEnergyClassifier {
    shape: Vec<Option<usize>>,
}

impl Classifier for MeanEnergyClassifier {
    fn input_shape(&self) -> &[Option<usize>] {
        &self.shape
    }

    fn predict(&mut self, input: Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let mean = input.mean().unwrap_or(0.0);
        Ok(vec![1.0 / (1.0 + (-mean).exp())])
    }
}

fn pipeline() -> KeywordPipeline {
    let classifier = MeanEnergyClassifier {
        shape: vec![None, Some(99), Some(27), Some(1)],
    };
    let engine = InferenceEngine::from_classifiers(vec![Box::new(classifier)], 0.5)
        .expect("engine from stub classifier");
    KeywordPipeline::new(PipelineConfig::default(), Arc::new(engine)).expect("pipeline")
}

fn session_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("kws_session_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create session dir");
    dir
}

fn write_recording(dir: &PathBuf, name: &str, spec: &SyntheticSpec) {
    let wav = spec.to_wav(16_000).expect("synthetic WAV");
    fs::write(dir.join(name), wav).expect("write recording");
}

#[test]
fn detection_is_deterministic_across_calls_and_clones() {
    let pipeline = pipeline();
    let bytes = SyntheticSpec::tone_burst(3_000, 700, 500)
        .to_wav(16_000)
        .unwrap();

    let first = pipeline.extract_and_detect(&bytes, Some("wav")).unwrap();
    let second = pipeline.clone().extract_and_detect(&bytes, Some("wav")).unwrap();
    assert_eq!(first, second);
    assert!((0.0..=1.0).contains(&first.probability));
    assert_eq!(first.detected, first.probability >= 0.5);
}

#[test]
fn resampled_input_yields_same_feature_shape() {
    let pipeline = pipeline();
    let spec = SyntheticSpec::tone_burst(2_500, 900, 400);
    let bytes = encode_wav(&spec.render(44_100), 44_100).unwrap();

    let extracted = pipeline.extract_features(&bytes, Some("wav")).unwrap();
    assert_eq!(extracted.features.shape(), &[99, 27]);
    assert!(extracted.features.iter().all(|v| v.is_finite()));
}

#[test]
fn feature_extractor_agrees_with_pipeline() {
    let config = PipelineConfig::default();
    let extractor = FeatureExtractor::new(&config).unwrap();
    let bytes = SyntheticSpec::tone_burst(3_000, 1_500, 300)
        .to_wav(16_000)
        .unwrap();

    let buffer = AudioLoader::new(16_000).load(&bytes, None).unwrap();
    let direct = extractor.extract(&buffer.samples).unwrap();
    let via_pipeline = pipeline().extract_features(&bytes, None).unwrap();

    assert_eq!(direct.selection, via_pipeline.selection);
    assert_eq!(direct.features, via_pipeline.features);
}

#[test]
fn short_and_silent_recordings_are_rejected() {
    let pipeline = pipeline();

    let short = encode_wav(&vec![0.3; 8_000], 16_000).unwrap();
    assert_eq!(
        pipeline.extract_and_detect(&short, None),
        Err(PipelineError::Audio(AudioError::InsufficientAudio {
            required: 16_000,
            available: 8_000,
        }))
    );

    let silent = encode_wav(&vec![0.0; 20_000], 16_000).unwrap();
    assert_eq!(
        pipeline.extract_and_detect(&silent, None),
        Err(PipelineError::Audio(AudioError::SilentAudio))
    );
}

#[test]
fn undecodable_bytes_fail_with_decode_error() {
    let err = pipeline()
        .extract_and_detect(b"definitely not audio", None)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Audio(AudioError::Decode { .. })));
}

#[test]
fn noise_meter_on_silence_and_full_scale_sine() {
    let pipeline = pipeline();

    let silence = encode_wav(&vec![0.0; 48_000], 16_000).unwrap();
    assert_eq!(pipeline.measure_noise_level(&silence, None).unwrap(), -120.0);

    let sine = SyntheticSpec {
        pattern: SyntheticPattern::Sine,
        amplitude: 1.0,
        frequency_hz: 1_000.0,
        ..SyntheticSpec::default()
    };
    let level = pipeline
        .measure_noise_level(&sine.to_wav(16_000).unwrap(), None)
        .unwrap();
    assert!((level + 3.01).abs() < 0.05, "got {level}");
}

#[test]
fn augmented_recording_still_detects() {
    let pipeline = pipeline();
    let speech = SyntheticSpec::tone_burst(2_000, 500, 400).render(16_000);
    let noise = SyntheticSpec {
        pattern: SyntheticPattern::WhiteNoise,
        amplitude: 0.2,
        duration_ms: 5_000,
        ..SyntheticSpec::default()
    }
    .render(16_000);

    let mut rng = StdRng::seed_from_u64(7);
    let noisy = add_noise(&speech, &noise, DEFAULT_NOISE_SCALE, &mut rng).unwrap();
    assert_eq!(noisy.len(), speech.len());

    let bytes = encode_wav(&noisy, 16_000).unwrap();
    let result = pipeline.extract_and_detect(&bytes, None).unwrap();
    assert!((0.0..=1.0).contains(&result.probability));
}

#[test]
fn session_reports_every_recording_and_noise_level() {
    let dir = session_dir("full");
    write_recording(
        &dir,
        "noise_0.wav",
        &SyntheticSpec {
            pattern: SyntheticPattern::WhiteNoise,
            amplitude: 0.05,
            duration_ms: 3_000,
            ..SyntheticSpec::default()
        },
    );
    write_recording(&dir, "50cm_0.wav", &SyntheticSpec::tone_burst(3_000, 1_000, 500));
    write_recording(&dir, "1m_0.wav", &SyntheticSpec::tone_burst(3_000, 200, 500));
    write_recording(
        &dir,
        "3m_0.wav",
        &SyntheticSpec {
            duration_ms: 500,
            ..SyntheticSpec::default()
        },
    );
    write_recording(
        &dir,
        "5m_0.wav",
        &SyntheticSpec {
            pattern: SyntheticPattern::Silence,
            duration_ms: 2_000,
            ..SyntheticSpec::default()
        },
    );
    fs::write(dir.join("notes.txt"), "ignored").unwrap();

    let report = evaluate_session(&pipeline(), &dir).unwrap();

    let noise = report.noise_level_dbfs.expect("noise level measured");
    assert!(noise < -20.0 && noise > -40.0, "got {noise}");

    let files: Vec<&str> = report.recordings.iter().map(|r| r.file.as_str()).collect();
    assert_eq!(files, ["1m_0.wav", "3m_0.wav", "50cm_0.wav", "5m_0.wav"]);
    assert!(report
        .recordings
        .iter()
        .all(|row| row.noise_level_dbfs == Some(noise)));

    let by_name = |name: &str| {
        report
            .recordings
            .iter()
            .find(|row| row.file == name)
            .expect("row present")
    };
    assert_eq!(by_name("50cm_0.wav").distance, "50cm");
    assert!(matches!(
        by_name("50cm_0.wav").outcome,
        RecordingOutcome::Detected { .. }
    ));
    assert!(matches!(
        by_name("3m_0.wav").outcome,
        RecordingOutcome::Failed { code: AudioErrorCodes::INSUFFICIENT_AUDIO, .. }
    ));
    assert!(matches!(
        by_name("5m_0.wav").outcome,
        RecordingOutcome::Failed { code: AudioErrorCodes::SILENT_AUDIO, .. }
    ));
    assert_eq!(report.failed_count(), 2);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn session_without_noise_recording_still_evaluates() {
    let dir = session_dir("no_noise");
    write_recording(&dir, "1m_0.wav", &SyntheticSpec::tone_burst(2_000, 300, 400));

    let report = evaluate_session(&pipeline(), &dir).unwrap();
    assert_eq!(report.noise_level_dbfs, None);
    assert_eq!(report.recordings.len(), 1);
    assert_eq!(report.failed_count(), 0);

    let _ = fs::remove_dir_all(&dir);
}
