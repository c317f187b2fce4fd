use pathcut_core::ir::{FunctionId, Module, Operand, Type};
use pathcut_core::locate::locate_targets;
use pathcut_core::transform::{
    declare_helper, inject_exit, inject_extraction, strip_debug_info, EXTRACTION_SENTINEL,
};

const TARGETS: &str = r#"
name: targets
functions:
  - name: main
    ret: i32
    body:
      - { id: v, op: add, ty: i32, args: [40, 2], loc: "file.c:42" }
      - { op: call, callee: "@log_event", args: ["%v"], loc: "file.c:43" }
      - { op: call, callee: "@llvm.dbg.value", args: ["%v"] }
      - { op: ret, args: ["%v"] }
  - name: log_event
    params: [i32]
    body:
      - { op: ret }
  - name: llvm.dbg.value
    params: [i32]
"#;

fn setup() -> (Module, FunctionId) {
    let mut module = Module::from_yaml_str(TARGETS).unwrap();
    let extract = declare_helper(&mut module, "__pathcut_extract");
    (module, extract)
}

fn body_callees(module: &Module, function: &str) -> Vec<Option<String>> {
    let f = module.function_by_name(function).unwrap();
    module
        .instructions(f)
        .map(|i| i.direct_callee().map(|c| module.function_name(c).to_string()))
        .collect()
}

#[test]
fn helpers_are_declared_once_as_void_i64() {
    let (mut module, extract) = setup();
    let helper = module.function(extract).unwrap();
    assert_eq!(helper.ret, Type::Void);
    assert_eq!(helper.params, vec![Type::I64]);
    assert!(helper.is_declaration());
    assert_eq!(declare_helper(&mut module, "__pathcut_extract"), extract);
}

#[test]
fn extraction_call_follows_target_with_its_value() {
    let (mut module, extract) = setup();
    let targets = locate_targets(&module, "file.c", 42).unwrap();
    let injected = inject_extraction(&mut module, &targets, extract).unwrap();

    assert_eq!(injected.len(), 1);
    let call = module.instruction(injected[0]).unwrap();
    assert_eq!(call.direct_callee(), Some(extract));
    assert_eq!(call.operands, vec![Operand::Value(targets[0])]);
    assert_eq!(module.position(injected[0]), Some(1));
}

#[test]
fn repeated_injection_appends_in_order() {
    let (mut module, extract) = setup();
    let targets = locate_targets(&module, "file.c", 42).unwrap();
    let first = inject_extraction(&mut module, &targets, extract).unwrap();
    let second = inject_extraction(&mut module, &targets, extract).unwrap();

    assert_eq!(module.position(targets[0]), Some(0));
    assert_eq!(module.position(first[0]), Some(1));
    assert_eq!(module.position(second[0]), Some(2));
    assert_eq!(
        body_callees(&module, "main"),
        vec![
            None,
            Some("__pathcut_extract".to_string()),
            Some("__pathcut_extract".to_string()),
            Some("log_event".to_string()),
            Some("llvm.dbg.value".to_string()),
            None,
        ]
    );
}

#[test]
fn void_targets_receive_the_sentinel() {
    let (mut module, extract) = setup();
    let targets = locate_targets(&module, "file.c", 43).unwrap();
    let injected = inject_extraction(&mut module, &targets, extract).unwrap();
    let call = module.instruction(injected[0]).unwrap();
    assert_eq!(call.operands, vec![Operand::Const(EXTRACTION_SENTINEL)]);
    assert_eq!(EXTRACTION_SENTINEL, -1);
}

#[test]
fn exit_call_lands_after_extraction_calls_once() {
    let (mut module, extract) = setup();
    let exit = declare_helper(&mut module, "__pathcut_exit");
    let targets = locate_targets(&module, "file.c", 42).unwrap();

    inject_extraction(&mut module, &targets, extract).unwrap();
    let exits = inject_exit(&mut module, &targets, extract, exit).unwrap();
    assert_eq!(exits.len(), 1);
    assert_eq!(module.instruction(exits[0]).unwrap().operands, vec![Operand::Const(0)]);
    assert!(inject_exit(&mut module, &targets, extract, exit).unwrap().is_empty());

    // A later extraction still goes before the exit.
    inject_extraction(&mut module, &targets, extract).unwrap();
    let callees = body_callees(&module, "main");
    assert_eq!(callees[1].as_deref(), Some("__pathcut_extract"));
    assert_eq!(callees[2].as_deref(), Some("__pathcut_extract"));
    assert_eq!(callees[3].as_deref(), Some("__pathcut_exit"));
}

#[test]
fn terminator_targets_are_instrumented_before_they_run() {
    let text = r#"
name: terminator
functions:
  - name: main
    ret: i32
    body:
      - { id: v, op: add, ty: i32, args: [40, 2] }
      - { op: ret, args: ["%v"], loc: "file.c:44" }
"#;
    let mut module = Module::from_yaml_str(text).unwrap();
    let extract = declare_helper(&mut module, "__pathcut_extract");
    let exit = declare_helper(&mut module, "__pathcut_exit");
    let targets = locate_targets(&module, "file.c", 44).unwrap();

    let injected = inject_extraction(&mut module, &targets, extract).unwrap();
    assert_eq!(
        module.instruction(injected[0]).unwrap().operands,
        vec![Operand::Const(EXTRACTION_SENTINEL)]
    );
    inject_extraction(&mut module, &targets, extract).unwrap();
    assert_eq!(inject_exit(&mut module, &targets, extract, exit).unwrap().len(), 1);
    assert!(inject_exit(&mut module, &targets, extract, exit).unwrap().is_empty());

    let main = module.function_by_name("main").unwrap();
    let body: Vec<String> =
        module.instructions(main).map(|i| module.render_instruction(i)).collect();
    assert_eq!(
        body,
        vec![
            "%v = add i32 40, 2",
            "call @__pathcut_extract(-1)",
            "call @__pathcut_extract(-1)",
            "call @__pathcut_exit(0)",
            "ret %v  ; file.c:44",
        ]
    );
}

#[test]
fn strip_removes_locations_and_debug_intrinsics() {
    let (mut module, _) = setup();
    let stats = strip_debug_info(&mut module, &[]).unwrap();

    assert_eq!(stats.locations_cleared, 2);
    assert_eq!(stats.intrinsic_calls_erased, 1);
    assert_eq!(stats.declarations_erased, 1);
    assert!(module.function_by_name("llvm.dbg.value").is_none());
    assert!(module.all_instructions().all(|i| i.loc.is_none()));

    let again = strip_debug_info(&mut module, &[]).unwrap();
    assert_eq!(again, Default::default());
}

#[test]
fn strip_keeps_protected_intrinsic_declarations() {
    let (mut module, _) = setup();
    let stats = strip_debug_info(&mut module, &["llvm.dbg.value".to_string()]).unwrap();

    assert_eq!(stats.intrinsic_calls_erased, 1);
    assert_eq!(stats.declarations_erased, 0);
    let intrinsic = module.function_by_name("llvm.dbg.value").unwrap();
    assert!(module.references_to(intrinsic).is_empty());
}
