mod common;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use heliolapse_core::error::HelioError;
use heliolapse_core::filters::histogram::levels_u16;
use heliolapse_core::filters::normalize::normalize;
use heliolapse_core::io::image_io::load_png;
use heliolapse_core::io::FileCodec;
use heliolapse_core::pipeline::config::AlignConfig;
use heliolapse_core::pipeline::{
    run_alignment, run_alignment_reported, CancelFlag, JobState, PipelineStage, ProgressReporter,
    RunOutcome, MANIFEST_FILE_NAME,
};
use heliolapse_core::video::FrameManifest;

use common::{mean_abs_diff, solar_disk, write_corrupt_frame, write_png_frame};

const H: usize = 48;
const W: usize = 56;

/// Five frames: three drifting disks and two corrupt files.
fn mixed_sequence(dir: &Path) -> PathBuf {
    let reference = write_png_frame(dir, "sun_000.png", &solar_disk(H, W, 23.5, 27.5, 17.0));
    write_corrupt_frame(dir, "sun_001.png");
    write_png_frame(dir, "sun_002.png", &solar_disk(H, W, 24.5, 26.5, 17.0));
    write_corrupt_frame(dir, "sun_003.png");
    write_png_frame(dir, "sun_004.png", &solar_disk(H, W, 22.0, 29.0, 17.0));
    reference
}

fn test_config(reference: &Path, input: &Path, aligned: &Path) -> AlignConfig {
    let mut config = AlignConfig::new(reference, input, aligned);
    config.workers = Some(2);
    config.registration.iterations = 12;
    config.registration.std_dev = 2.0;
    config
}

fn png_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .path()
                .extension()
                .is_some_and(|x| x == "png")
        })
        .count()
}

#[test]
fn test_partial_run_with_corrupt_frames() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let aligned = out.path().join("aligned");
    let reference = mixed_sequence(input.path());

    let report = run_alignment(&test_config(&reference, input.path(), &aligned)).unwrap();

    assert_eq!(report.total(), 5);
    assert_eq!(report.succeeded(), 3);
    assert_eq!(report.outcome(), RunOutcome::Partial);
    assert_eq!(report.outcome().exit_code(), 2);
    assert_eq!(png_count(&aligned), 3);

    let indices: Vec<_> = report.results.iter().map(|r| r.index()).collect();
    assert_eq!(indices, [0, 1, 2, 3, 4]);

    let failed: Vec<_> = report
        .failures()
        .map(|f| f.input.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(failed, ["sun_001.png", "sun_003.png"]);
    assert!(report.failures().all(|f| !f.reason.is_empty()));

    let captions: Vec<_> = report.manifest.iter().map(|e| e.caption.as_str()).collect();
    assert_eq!(captions, ["sun_000", "sun_002", "sun_004"]);
    assert_eq!(report.manifest.frames[1].path, aligned.join("sun_002.png"));

    let written = FrameManifest::read_json(&aligned.join(MANIFEST_FILE_NAME)).unwrap();
    assert_eq!(written, report.manifest);
}

#[test]
fn test_outputs_take_reference_shape() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let reference = write_png_frame(out.path(), "ref.png", &solar_disk(H, W, 23.5, 27.5, 17.0));
    write_png_frame(input.path(), "a.png", &solar_disk(60, 60, 29.5, 29.5, 17.0));
    write_png_frame(input.path(), "b.png", &solar_disk(40, 50, 19.5, 24.5, 17.0));

    let aligned = out.path().join("aligned");
    let report = run_alignment(&test_config(&reference, input.path(), &aligned)).unwrap();
    assert_eq!(report.outcome(), RunOutcome::Complete);
    assert_eq!(report.outcome().exit_code(), 0);

    for entry in report.manifest.iter() {
        let raw = load_png(&entry.path).unwrap();
        assert_eq!((raw.height(), raw.width()), (H, W));
        assert_eq!(raw.bit_depth, 16);
    }
}

#[test]
fn test_runs_are_deterministic() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let reference = mixed_sequence(input.path());

    let first = out.path().join("first");
    let second = out.path().join("second");
    run_alignment(&test_config(&reference, input.path(), &first)).unwrap();
    let mut config = test_config(&reference, input.path(), &second);
    config.workers = Some(1);
    run_alignment(&config).unwrap();

    for name in ["sun_000.png", "sun_002.png", "sun_004.png"] {
        let a = load_png(&first.join(name)).unwrap().to_quantized();
        let b = load_png(&second.join(name)).unwrap().to_quantized();
        assert_eq!(a, b, "{name} differs between runs");
    }
}

#[test]
fn test_empty_input_is_fatal() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let reference = write_png_frame(out.path(), "ref.png", &solar_disk(H, W, 23.5, 27.5, 17.0));

    let err = run_alignment(&test_config(&reference, input.path(), &out.path().join("a")))
        .unwrap_err();
    assert!(matches!(err, HelioError::EmptySequence(_)));
}

#[test]
fn test_unreadable_reference_is_fatal() {
    let input = tempfile::tempdir().unwrap();
    let reference = mixed_sequence(input.path());
    let broken = input.path().join("sun_001.png");
    let aligned = input.path().join("aligned");

    let err = run_alignment(&test_config(&broken, input.path(), &aligned)).unwrap_err();
    assert!(matches!(err, HelioError::Reference { .. }));
    assert!(!aligned.exists());
    assert!(reference.exists());
}

#[test]
fn test_unsupported_reference_extension_is_fatal() {
    let input = tempfile::tempdir().unwrap();
    let reference = input.path().join("ref.tiff");
    std::fs::write(&reference, b"x").unwrap();
    let err = run_alignment(&test_config(&reference, input.path(), &input.path().join("o")))
        .unwrap_err();
    assert!(matches!(err, HelioError::Reference { .. }));
}

#[test]
fn test_cancelled_run_aligns_nothing() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let reference = mixed_sequence(input.path());
    let aligned = out.path().join("aligned");

    let cancel = CancelFlag::new();
    cancel.cancel();
    let err = run_alignment_reported(
        &test_config(&reference, input.path(), &aligned),
        Arc::new(FileCodec),
        Arc::new(heliolapse_core::pipeline::NoOpReporter),
        &cancel,
    )
    .unwrap_err();
    assert!(matches!(err, HelioError::Cancelled));
    assert_eq!(png_count(&aligned), 0);
    assert!(!aligned.join(MANIFEST_FILE_NAME).exists());
}

#[derive(Default)]
struct Recorder {
    stages: Mutex<Vec<PipelineStage>>,
    events: Mutex<Vec<(usize, JobState)>>,
}

impl ProgressReporter for Recorder {
    fn begin_stage(&self, stage: PipelineStage, _total: Option<usize>) {
        self.stages.lock().unwrap().push(stage);
    }

    fn job_state(&self, index: usize, _path: &Path, state: JobState, reason: Option<&str>) {
        assert_eq!(state == JobState::Failed, reason.is_some());
        self.events.lock().unwrap().push((index, state));
    }
}

#[test]
fn test_reporter_sees_every_job() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let reference = mixed_sequence(input.path());
    let recorder = Arc::new(Recorder::default());

    run_alignment_reported(
        &test_config(&reference, input.path(), &out.path().join("aligned")),
        Arc::new(FileCodec),
        recorder.clone(),
        &CancelFlag::new(),
    )
    .unwrap();

    let stages = recorder.stages.lock().unwrap().clone();
    assert_eq!(
        stages,
        [
            PipelineStage::LoadingReference,
            PipelineStage::Listing,
            PipelineStage::Aligning,
            PipelineStage::WritingManifest,
        ]
    );

    let events = recorder.events.lock().unwrap().clone();
    for index in 0..5 {
        let states: Vec<_> = events
            .iter()
            .filter(|(i, _)| *i == index)
            .map(|(_, s)| *s)
            .collect();
        let expected = if index % 2 == 1 {
            JobState::Failed
        } else {
            JobState::Succeeded
        };
        assert_eq!(
            states,
            [JobState::Pending, JobState::Running, expected],
            "job {index}"
        );
    }
}

fn running_order(recorder: &Recorder) -> Vec<usize> {
    recorder
        .events
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, s)| *s == JobState::Running)
        .map(|(i, _)| *i)
        .collect()
}

fn drifting_sequence(dir: &Path, frames: usize) -> PathBuf {
    for i in 0..frames {
        let drift = (i % 4) as f64 * 0.5;
        let name = format!("sun_{i:03}.png");
        write_png_frame(dir, &name, &solar_disk(H, W, 23.5 + drift, 27.5 - drift, 17.0));
    }
    dir.join("sun_000.png")
}

#[test]
fn test_single_worker_dispatches_in_file_order() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let reference = drifting_sequence(input.path(), 8);
    let recorder = Arc::new(Recorder::default());

    let mut config = test_config(&reference, input.path(), &out.path().join("aligned"));
    config.workers = Some(1);
    run_alignment_reported(&config, Arc::new(FileCodec), recorder.clone(), &CancelFlag::new())
        .unwrap();

    assert_eq!(running_order(&recorder), (0..8).collect::<Vec<_>>());
}

#[test]
fn test_pool_dispatch_follows_file_order() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let reference = drifting_sequence(input.path(), 12);
    let recorder = Arc::new(Recorder::default());

    run_alignment_reported(
        &test_config(&reference, input.path(), &out.path().join("aligned")),
        Arc::new(FileCodec),
        recorder.clone(),
        &CancelFlag::new(),
    )
    .unwrap();

    let order = running_order(&recorder);
    let mut sorted = order.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..12).collect::<Vec<_>>());
    for (position, &index) in order.iter().enumerate() {
        assert!(
            position.abs_diff(index) <= 3,
            "job {index} started at position {position}: {order:?}"
        );
    }
}

#[test]
fn test_reference_aligned_onto_itself_is_unchanged() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let aligned = out.path().join("aligned");
    let reference = mixed_sequence(input.path());

    run_alignment(&test_config(&reference, input.path(), &aligned)).unwrap();

    let expected = levels_u16(&normalize(&load_png(&reference).unwrap()).unwrap().data);
    let output = load_png(&aligned.join("sun_000.png")).unwrap().to_quantized();
    let max_err = expected
        .iter()
        .zip(output.data.iter())
        .map(|(&a, &b)| (a as i32 - b as i32).abs())
        .max()
        .unwrap();
    assert!(max_err <= 1, "self-alignment moved a level by {max_err}");
}

#[test]
fn test_shifted_frame_lands_on_reference() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let aligned = out.path().join("aligned");
    let reference =
        write_png_frame(out.path(), "ref.png", &solar_disk(H, W, 23.5, 27.5, 17.0));
    let shifted = solar_disk(H, W, 24.5, 29.5, 17.0);
    write_png_frame(input.path(), "shifted.png", &shifted);

    let report = run_alignment(&test_config(&reference, input.path(), &aligned)).unwrap();
    assert_eq!(report.outcome(), RunOutcome::Complete);

    let target = normalize(&load_png(&reference).unwrap()).unwrap().data;
    let result = normalize(&load_png(&aligned.join("shifted.png")).unwrap())
        .unwrap()
        .data;
    let before = normalize(&load_png(&input.path().join("shifted.png")).unwrap())
        .unwrap()
        .data;

    let interior = ndarray::s![4..H - 4, 4..W - 4];
    let err_after = mean_abs_diff(
        &target.slice(interior).to_owned(),
        &result.slice(interior).to_owned(),
    );
    let err_before = mean_abs_diff(
        &target.slice(interior).to_owned(),
        &before.slice(interior).to_owned(),
    );
    assert!(err_after < 0.03, "aligned error {err_after}");
    assert!(err_after < 0.5 * err_before, "{err_after} vs {err_before}");
}
