use glam::Vec3;
use std::io::Write;
use symbios_arbor::{
    CancellationToken, Error, GroupingPolicy, JsonSink, LSystemConfig, RecordLayout, Scene,
    SceneSink, SegmentGroups, Stage, emit, generate, generate_batch, generate_cancellable,
    segments_from_json,
};

const TREE: &str = r#"{
    "unit": 1.0,
    "angle": 0.4363323,
    "axiom": "F",
    "iterations": 2,
    "rules": { "F": "F[+F]F[-F]F" },
    "radius": 0.05,
    "material": "Bark"
}"#;

#[test]
fn test_config_from_json() {
    let config = LSystemConfig::from_json_str(TREE).unwrap();

    assert_eq!(config.iterations, 2);
    assert_eq!(config.rules["F"], "F[+F]F[-F]F");
    assert_eq!(config.material.as_deref(), Some("Bark"));
    assert_eq!(config.grouping, GroupingPolicy::Exact);
    assert!(!config.strict);
}

#[test]
fn test_config_from_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(TREE.as_bytes()).unwrap();

    let config = LSystemConfig::from_path(file.path()).unwrap();
    assert_eq!(config.axiom, "F");

    let missing = LSystemConfig::from_path(file.path().with_extension("missing"));
    assert!(matches!(missing, Err(Error::Io(_))));
}

#[test]
fn test_config_rejects_invalid_fields() {
    let negative = TREE.replace(r#""iterations": 2"#, r#""iterations": -1"#);
    assert!(matches!(
        LSystemConfig::from_json_str(&negative),
        Err(Error::InvalidConfig(_))
    ));

    let long_key = TREE.replace(r#""F": "F[+F]F[-F]F""#, r#""FF": "F""#);
    assert!(matches!(
        LSystemConfig::from_json_str(&long_key),
        Err(Error::InvalidConfig(_))
    ));

    let both = TREE.replace(r#""radius": 0.05"#, r#""radius": 0.05, "proportion": 0.1"#);
    assert!(matches!(
        LSystemConfig::from_json_str(&both),
        Err(Error::ConflictingRadiusMode { .. })
    ));

    let zero_unit = TREE.replace(r#""unit": 1.0"#, r#""unit": 0.0"#);
    assert!(matches!(
        LSystemConfig::from_json_str(&zero_unit),
        Err(Error::InvalidConfig(_))
    ));

    let bad_bucket = TREE.replace(
        r#""material": "Bark""#,
        r#""grouping": {"mode": "quantized", "step": 0.0}"#,
    );
    assert!(matches!(
        LSystemConfig::from_json_str(&bad_bucket),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn test_zero_iterations_single_segment() {
    let model = generate(&LSystemConfig::new("F", 0)).unwrap();

    assert_eq!(model.symbol_count, 1);
    assert_eq!(model.segments.len(), 1);
    let s = model.segments[0];
    assert!(s.from.abs_diff_eq(Vec3::ZERO, 1e-6));
    assert!(s.to.abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), 1e-6));
    assert_eq!(s.length, 1.0);
}

#[test]
fn test_generate_tree() {
    let config = LSystemConfig::from_json_str(TREE).unwrap();
    let model = generate(&config).unwrap();

    // Generation 2 of F -> F[+F]F[-F]F has 5^2 = 25 forward tokens, and no
    // two of them are adjacent.
    assert_eq!(model.segments.len(), 25);
    assert!(model.segments.iter().all(|s| s.length == 1.0 && s.radius == 0.05));
    assert_eq!(model.groups().len(), 1);
}

#[test]
fn test_generate_groups_by_run_length() {
    let config = LSystemConfig::new("X", 2)
        .with_rule('X', "F[+X]FX")
        .with_rule('F', "FF");
    let model = generate(&config).unwrap();

    // FF[+F[+X]FX]FFF[+X]FX: runs of 2, 1, 1, 3, 1 ('X' draws nothing but ends a run).
    let lengths: Vec<f32> = model.segments.iter().map(|s| s.length).collect();
    assert_eq!(lengths, vec![2.0, 1.0, 1.0, 3.0, 1.0]);

    let groups = model.groups();
    let keys: Vec<f32> = groups.keys().map(|k| k.value()).collect();
    assert_eq!(keys, vec![2.0, 1.0, 3.0]);
    assert_eq!(groups.get(1.0).unwrap().len(), 3);
}

#[test]
fn test_strict_pipeline_accepts_command_tokens() {
    let mut config = LSystemConfig::from_json_str(TREE).unwrap();
    config.strict = true;
    assert!(generate(&config).is_ok());

    config.axiom = "FX".into();
    let err = generate(&config).unwrap_err();
    assert_eq!(
        err,
        Error::UnknownSymbol {
            symbol: 'X',
            index: 1,
            stage: Stage::Derivation { step: 0 }
        }
    );
}

#[test]
fn test_strict_pipeline_accepts_grammar_variables() {
    let mut config = LSystemConfig::new("X", 2)
        .with_rule('X', "F[+X]FX")
        .with_rule('F', "FF");
    config.strict = true;
    let model = generate(&config).unwrap();

    let lengths: Vec<f32> = model.segments.iter().map(|s| s.length).collect();
    assert_eq!(lengths, vec![2.0, 1.0, 1.0, 3.0, 1.0]);
    assert_eq!(model, {
        config.strict = false;
        generate(&config).unwrap()
    });
}

#[test]
fn test_batch_matches_sequential() {
    let a = LSystemConfig::from_json_str(TREE).unwrap();
    let mut b = a.clone();
    b.iterations = 3;
    b.randomness = Some(0.02);
    b.seed = Some(11);
    let mut c = a.clone();
    c.radius = Some(-1.0);

    let batch = generate_batch(&[a.clone(), b.clone(), c]);

    assert_eq!(batch.len(), 3);
    assert_eq!(batch[0].as_ref().unwrap(), &generate(&a).unwrap());
    assert_eq!(batch[1].as_ref().unwrap(), &generate(&b).unwrap());
    assert!(matches!(batch[2], Err(Error::InvalidConfig(_))));
}

#[test]
fn test_cancelled_generation() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let config = LSystemConfig::from_json_str(TREE).unwrap();
    let err = generate_cancellable(&config, &cancel).unwrap_err();
    assert!(matches!(err, Error::Cancelled { .. }));
}

#[test]
fn test_json_sink_writes_both_layouts() {
    let model = generate(&LSystemConfig::from_json_str(TREE).unwrap()).unwrap();

    let mut grouped = JsonSink::new(Vec::new(), RecordLayout::Grouped);
    emit(&model, &mut grouped).unwrap();
    let back = SegmentGroups::from_json(std::str::from_utf8(&grouped.into_inner()).unwrap())
        .unwrap();
    assert_eq!(back, model.groups());

    let mut flat = JsonSink::new(Vec::new(), RecordLayout::Flat).pretty(true);
    emit(&model, &mut flat).unwrap();
    let records = segments_from_json(std::str::from_utf8(&flat.into_inner()).unwrap()).unwrap();
    assert_eq!(records, model.segments);
}

#[test]
fn test_flat_layout_keeps_emission_order() {
    // Runs of 2, 1, 2: grouping would list both 2.0 runs first.
    let model = generate(&LSystemConfig::new("FF+F+FF", 0)).unwrap();
    let lengths: Vec<f32> = model.segments.iter().map(|s| s.length).collect();
    assert_eq!(lengths, vec![2.0, 1.0, 2.0]);
    assert_ne!(model.groups().into_segments(), model.segments);

    let mut flat = JsonSink::new(Vec::new(), RecordLayout::Flat);
    emit(&model, &mut flat).unwrap();
    let records = segments_from_json(std::str::from_utf8(&flat.into_inner()).unwrap()).unwrap();
    assert_eq!(records, model.segments);
}

#[test]
fn test_custom_sink_receives_material() {
    #[derive(Default)]
    struct Recorder {
        material: Option<String>,
        segments: usize,
    }

    impl SceneSink for Recorder {
        fn consume(&mut self, scene: &Scene<'_>) -> symbios_arbor::Result<()> {
            self.material = scene.material.map(str::to_owned);
            self.segments = scene.groups.segment_count();
            assert_eq!(scene.segments.len(), self.segments);
            Ok(())
        }
    }

    let model = generate(&LSystemConfig::from_json_str(TREE).unwrap()).unwrap();
    let mut recorder = Recorder::default();
    emit(&model, &mut recorder).unwrap();

    assert_eq!(recorder.material.as_deref(), Some("Bark"));
    assert_eq!(recorder.segments, model.segments.len());
}
