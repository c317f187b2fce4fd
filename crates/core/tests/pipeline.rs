use pathcut_core::config::{load_slice_config, SliceConfig};
use pathcut_core::dependence::{DefUseBackend, RecordedBackend, RecordedGraph};
use pathcut_core::ir::Module;
use pathcut_core::pipeline::SliceRunner;
use pathcut_core::SliceError;
use tempfile::tempdir;

const PROGRAM: &str = r#"
name: program
functions:
  - name: main
    ret: i32
    body:
      - { id: a, op: call, callee: "@helper_a", ty: i32, loc: "file.c:10" }
      - { op: call, callee: "@llvm.dbg.value", args: ["%a"] }
      - { op: call, callee: "@banner" }
      - { op: ret, args: ["%a"] }
  - name: helper_a
    ret: i32
    body:
      - { id: r, op: call, callee: "@helper_b", ty: i32, loc: "file.c:20" }
      - { op: ret, args: ["%r"] }
  - name: helper_b
    ret: i32
    body:
      - { id: v, op: add, ty: i32, args: [40, 2], loc: "file.c:42" }
      - { op: ret, args: ["%v"] }
  - name: banner
    body:
      - { op: ret }
  - name: dead_code
    ret: i32
    body:
      - { op: ret, args: [0] }
  - name: llvm.dbg.value
    params: [i32]
"#;

#[test]
fn run_slices_instruments_and_strips() {
    let mut module = Module::from_yaml_str(PROGRAM).unwrap();
    let runner = SliceRunner::new(SliceConfig::for_target("file.c", 42), &DefUseBackend);
    let report = runner.run(&mut module).unwrap();

    assert_eq!(report.module, "program");
    assert_eq!(report.backend, "def-use");
    assert_eq!(report.source_function, "main");
    assert_eq!(report.target, "file.c:42");
    assert_eq!(report.targets, vec!["helper_b:%v"]);
    let path: Vec<&str> = report.path.iter().map(|s| s.function.as_str()).collect();
    assert_eq!(path, vec!["main", "helper_a", "helper_b"]);
    assert_eq!(report.path[0].instructions, 3);
    assert_eq!(report.removed_functions, vec!["banner", "dead_code"]);
    assert_eq!(report.erased_call_sites, 1);
    assert_eq!(report.injected_calls, 1);
    assert_eq!(report.exit_calls, 1);
    let strip = report.strip.unwrap();
    assert_eq!(strip.intrinsic_calls_erased, 1);
    // llvm.dbg.value is protected by default: its calls go, the declaration stays.
    assert_eq!(strip.declarations_erased, 0);

    let names: Vec<&str> = module.functions().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["main", "helper_a", "helper_b", "llvm.dbg.value", "__pathcut_extract", "__pathcut_exit"]
    );

    let helper_b = module.function_by_name("helper_b").unwrap();
    let body: Vec<String> =
        module.instructions(helper_b).map(|i| module.render_instruction(i)).collect();
    assert_eq!(
        body,
        vec!["%v = add i32 40, 2", "call @__pathcut_extract(%v)", "call @__pathcut_exit(0)", "ret %v"]
    );
}

#[test]
fn unprotected_debug_declarations_are_stripped() {
    let mut module = Module::from_yaml_str(PROGRAM).unwrap();
    let mut config = SliceConfig::for_target("file.c", 42);
    config.protected_functions.clear();
    let report = SliceRunner::new(config, &DefUseBackend).run(&mut module).unwrap();

    assert_eq!(report.strip.unwrap().declarations_erased, 1);
    assert!(module.function_by_name("llvm.dbg.value").is_none());
}

#[test]
fn every_instruction_on_the_target_line_survives_and_is_instrumented() {
    // The void call to logger sits in its own block, off the path, on the target line.
    let text = r#"
name: shared_line
functions:
  - name: main
    ret: i32
    body:
      - { id: a, op: call, callee: "@helper_b", ty: i32 }
      - { op: call, callee: "@banner" }
      - { op: ret, args: ["%a"] }
  - name: helper_b
    ret: i32
    body:
      - { id: v, op: add, ty: i32, args: [40, 2], loc: "file.c:42" }
      - { op: call, callee: "@logger", loc: "file.c:42" }
      - { op: ret, args: ["%v"] }
  - name: logger
    body:
      - { op: call, callee: "@sink" }
      - { op: ret }
  - name: sink
    body:
      - { op: ret }
  - name: banner
    body:
      - { op: ret }
"#;
    let mut module = Module::from_yaml_str(text).unwrap();
    let report = SliceRunner::new(SliceConfig::for_target("file.c", 42), &DefUseBackend)
        .run(&mut module)
        .unwrap();

    assert_eq!(report.targets, vec!["helper_b:%v", "helper_b#1"]);
    assert_eq!(report.injected_calls, 2);
    assert_eq!(report.exit_calls, 2);
    // logger runs in full once reached, so sink stays with it.
    assert_eq!(report.removed_functions, vec!["banner"]);
    assert!(module.function_by_name("logger").is_some());
    assert!(module.function_by_name("sink").is_some());

    let helper_b = module.function_by_name("helper_b").unwrap();
    let body: Vec<String> =
        module.instructions(helper_b).map(|i| module.render_instruction(i)).collect();
    assert_eq!(
        body,
        vec![
            "%v = add i32 40, 2",
            "call @__pathcut_extract(%v)",
            "call @__pathcut_exit(0)",
            "call @logger()",
            "call @__pathcut_extract(-1)",
            "call @__pathcut_exit(0)",
            "ret %v",
        ]
    );
}

#[test]
fn targets_in_removed_functions_are_dropped() {
    let text = PROGRAM.replace(
        "      - { op: ret, args: [0] }\n",
        "      - { id: z, op: add, ty: i32, args: [1, 2], loc: \"vendor/file.c:42\" }\n      - { op: ret, args: [0] }\n",
    );
    let mut module = Module::from_yaml_str(&text).unwrap();
    let report = SliceRunner::new(SliceConfig::for_target("file.c", 42), &DefUseBackend)
        .run(&mut module)
        .unwrap();

    assert_eq!(report.targets, vec!["helper_b:%v"]);
    assert_eq!(report.injected_calls, 1);
    assert_eq!(report.removed_functions, vec!["banner", "dead_code"]);
    assert!(module.verify().is_ok());
}

#[test]
fn analyze_leaves_the_module_alone() {
    let module = Module::from_yaml_str(PROGRAM).unwrap();
    let before = module.clone();
    let runner = SliceRunner::new(SliceConfig::for_target("file.c", 42), &DefUseBackend);
    let analysis = runner.analyze(&module).unwrap();
    assert_eq!(analysis.path.len(), 3);
    assert_eq!(analysis.steps(&module).len(), 3);
    assert_eq!(module, before);
}

#[test]
fn verbose_runs_trace_without_changing_the_result() {
    let mut quiet = Module::from_yaml_str(PROGRAM).unwrap();
    let mut loud = quiet.clone();
    let mut config = SliceConfig::for_target("file.c", 42);
    let expected = SliceRunner::new(config.clone(), &DefUseBackend).run(&mut quiet).unwrap();
    config.verbose = true;
    let report = SliceRunner::new(config, &DefUseBackend).run(&mut loud).unwrap();

    assert_eq!(report, expected);
    assert_eq!(loud, quiet);
}

#[test]
fn options_disable_exit_and_stripping() {
    let mut module = Module::from_yaml_str(PROGRAM).unwrap();
    let mut config = SliceConfig::for_target("file.c", 42);
    config.exit_function = None;
    config.strip_debug = false;
    config.protected_functions.push("banner".into());
    let report = SliceRunner::new(config, &DefUseBackend).run(&mut module).unwrap();

    assert_eq!(report.exit_calls, 0);
    assert!(report.strip.is_none());
    assert_eq!(report.removed_functions, vec!["dead_code"]);
    assert!(module.function_by_name("__pathcut_exit").is_none());
    assert!(module.function_by_name("llvm.dbg.value").is_some());
    assert!(module.all_instructions().any(|i| i.loc.is_some()));
}

#[test]
fn errors_abort_before_any_change() {
    let module = Module::from_yaml_str(PROGRAM).unwrap();

    let cases: [(SliceConfig, fn(&SliceError) -> bool); 4] = [
        (SliceConfig::default(), |e| matches!(e, SliceError::Config(_))),
        (
            SliceConfig { source_function: "start".into(), ..SliceConfig::for_target("file.c", 42) },
            |e| matches!(e, SliceError::RootNotFound(name) if name == "start"),
        ),
        (SliceConfig::for_target("file.c", 99), |e| matches!(e, SliceError::TargetNotFound { .. })),
        (
            SliceConfig { source_function: "dead_code".into(), ..SliceConfig::for_target("file.c", 42) },
            |e| matches!(e, SliceError::PathNotFound { .. }),
        ),
    ];

    for (config, expected) in cases {
        let mut copy = module.clone();
        let err = SliceRunner::new(config, &DefUseBackend).run(&mut copy).unwrap_err();
        assert!(expected(&err), "unexpected error: {err}");
        assert_eq!(copy, module);
    }
}

#[test]
fn unsafe_removal_keeps_module_and_helpers_out() {
    let text = PROGRAM.replace(
        "      - { op: call, callee: \"@banner\" }\n",
        "      - { id: d, op: call, callee: \"@dead_code\", ty: i32 }\n      - { id: sum, op: add, ty: i32, args: [\"%d\", 1] }\n",
    );
    let mut module = Module::from_yaml_str(&text).unwrap();
    let before = module.clone();
    let err = SliceRunner::new(SliceConfig::for_target("file.c", 42), &DefUseBackend)
        .run(&mut module)
        .unwrap_err();
    assert!(matches!(err, SliceError::UnsafeRemoval { .. }));
    assert_eq!(module, before);
    assert!(module.function_by_name("__pathcut_extract").is_none());
}

#[test]
fn recorded_backend_drives_the_same_pipeline() {
    // Without recorded data edges every instruction is its own block; the call to
    // helper_a still leads the way.
    let mut module = Module::from_yaml_str(PROGRAM).unwrap();
    let backend = RecordedBackend::new(RecordedGraph::default());
    let report =
        SliceRunner::new(SliceConfig::for_target("file.c", 42), &backend).run(&mut module).unwrap();
    assert_eq!(report.backend, "recorded");
    assert_eq!(report.path[0].instructions, 1);
    assert_eq!(report.path.len(), 3);
}

#[test]
fn config_defaults_and_protected_set() {
    let config = SliceConfig::default();
    assert_eq!(config.source_function, "main");
    assert_eq!(config.backend, "def-use");
    assert!(config.strip_debug);
    assert!(!config.verbose);
    assert!(matches!(config.validate(), Err(SliceError::Config(_))));

    let mut config = SliceConfig::for_target("a.c", 1);
    config.protected_functions = vec!["keep".into()];
    config.extraction_function = "grab".into();
    assert_eq!(config.protected_set(), vec!["keep", "grab", "__pathcut_exit"]);
    config.exit_function = Some("grab".into());
    assert!(matches!(config.validate(), Err(SliceError::Config(_))));

    let zero_line = SliceConfig::for_target("a.c", 0);
    assert!(zero_line.target().is_err());
}

#[test]
fn config_files_load_as_yaml_or_json() {
    let temp = tempdir().unwrap();

    let yaml = temp.path().join("slice.yaml");
    std::fs::write(
        &yaml,
        "source_function: start\ntarget_file: file.c\ntarget_line: 42\nprotected_functions: [keep]\nexit_function: null\n",
    )
    .unwrap();
    let config = load_slice_config(&yaml).unwrap();
    assert_eq!(config.source_function, "start");
    assert_eq!(config.target().unwrap(), ("file.c", 42));
    assert_eq!(config.protected_functions, vec!["keep"]);
    assert_eq!(config.exit_function, None);
    assert_eq!(config.extraction_function, "__pathcut_extract");

    let json = temp.path().join("slice.json");
    std::fs::write(&json, r#"{"target_file": "b.c", "target_line": 7, "verbose": true}"#).unwrap();
    let config = load_slice_config(&json).unwrap();
    assert!(config.verbose);
    assert_eq!(config.source_function, "main");

    let empty = temp.path().join("empty.yaml");
    std::fs::write(&empty, "").unwrap();
    assert_eq!(load_slice_config(&empty).unwrap(), SliceConfig::default());

    let broken = temp.path().join("broken.json");
    std::fs::write(&broken, "{").unwrap();
    let err = load_slice_config(&broken).unwrap_err();
    assert!(err.to_string().contains("Failed to parse slice config JSON"));
}
