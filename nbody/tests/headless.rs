use compute::BackendKind;
use nbody::{run, Cli};

fn small(backend: BackendKind) -> Cli {
    Cli {
        particles: Some(256),
        backend: Some(backend),
        threads: Some(2),
        frames: 6,
        ..Cli::default()
    }
}

#[test]
fn runs_the_requested_frames() {
    let summary = run(&small(BackendKind::ScalarCpu)).unwrap();
    assert_eq!(summary.frames, 6);
    assert_eq!(summary.frames_presented, 6);
    assert_eq!(summary.backend_switches, 0);
    assert_eq!(summary.final_backend, BackendKind::ScalarCpu);
    // The first frame always publishes a sample.
    assert!(summary.last_title.is_some());
}

#[test]
fn cycling_switches_backend_with_a_reset() {
    let cli = Cli {
        cycle_every: Some(2),
        ..small(BackendKind::VectorCpu)
    };
    let summary = run(&cli).unwrap();
    assert_eq!(summary.backend_switches, 2);
    assert_eq!(summary.frames_presented, 6);
}

#[test]
fn invalid_config_is_reported_before_any_frame() {
    let cli = Cli {
        particles: Some(100),
        ..small(BackendKind::ScalarCpu)
    };
    let err = run(&cli).unwrap_err();
    assert!(format!("{err:#}").contains("not a multiple of 8"), "{err:#}");
}

#[test]
fn missing_config_file_names_the_path() {
    let cli = Cli {
        config: Some("does/not/exist.json".into()),
        ..small(BackendKind::ScalarCpu)
    };
    let err = run(&cli).unwrap_err();
    assert!(format!("{err:#}").contains("does/not/exist.json"), "{err:#}");
}
