use std::collections::HashSet;

use pathcut_core::analysis::{build_call_graph, build_dependency_blocks, compute_blocks};
use pathcut_core::dependence::{DefUseBackend, DependenceBackend, DependencyGraph};
use pathcut_core::ir::Module;
use pathcut_core::SliceError;

const PROGRAM: &str = r#"
name: program
functions:
  - name: main
    ret: i32
    body:
      - { id: a, op: call, callee: "@helper_a", ty: i32, loc: "file.c:10" }
      - { op: call, callee: "@log_event", args: [1], loc: "file.c:11" }
      - { id: b, op: add, ty: i32, args: ["%a", 1] }
      - { op: call, callee: "@helper_a", ty: i32 }
      - { op: ret, args: ["%b"] }
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
  - name: log_event
    params: [i32]
    body:
      - { op: ret }
  - name: external
"#;

fn analyze(module: &Module) -> DependencyGraph {
    DefUseBackend.analyze(module).unwrap()
}

#[test]
fn blocks_partition_every_function() {
    let module = Module::from_yaml_str(PROGRAM).unwrap();
    let deps = analyze(&module);
    let blocks = build_dependency_blocks(&module, &deps);

    for func in module.functions() {
        let mut seen = HashSet::new();
        for id in blocks.blocks_of(func.id()) {
            let block = blocks.block(*id).unwrap();
            assert_eq!(block.function, func.id());
            for inst in &block.instructions {
                assert!(seen.insert(*inst), "{inst} appears in two blocks");
                assert_eq!(blocks.block_of(*inst), Some(*id));
            }
        }
        let body: HashSet<_> = func.body().iter().copied().collect();
        assert_eq!(seen, body, "blocks of @{} must cover its body exactly", func.name);
    }
}

#[test]
fn blocks_group_by_data_dependencies_only() {
    let module = Module::from_yaml_str(PROGRAM).unwrap();
    let deps = analyze(&module);
    let main = module.function_by_name("main").unwrap();
    let body = module.function(main).unwrap().body().to_vec();

    let groups = compute_blocks(&module, main, &deps);
    // a -> b -> ret form one value chain; each void/unused call stands alone.
    assert_eq!(groups, vec![vec![body[0], body[2], body[4]], vec![body[1]], vec![body[3]]]);
}

#[test]
fn return_edges_do_not_merge_blocks_across_functions() {
    let module = Module::from_yaml_str(PROGRAM).unwrap();
    let deps = analyze(&module);
    let blocks = build_dependency_blocks(&module, &deps);
    for block in blocks.iter() {
        for inst in &block.instructions {
            assert_eq!(module.instruction(*inst).unwrap().parent(), block.function);
        }
    }
}

#[test]
fn functions_without_body_have_an_empty_entry() {
    let module = Module::from_yaml_str(PROGRAM).unwrap();
    let deps = analyze(&module);
    let blocks = build_dependency_blocks(&module, &deps);
    let external = module.function_by_name("external").unwrap();
    assert!(blocks.has_function(external));
    assert!(blocks.blocks_of(external).is_empty());

    let graph = build_call_graph(&module, &blocks).unwrap();
    assert!(graph.has_function(external));
    assert!(graph.blocks_of(external).is_empty());
}

#[test]
fn call_graph_links_every_direct_call() {
    let module = Module::from_yaml_str(PROGRAM).unwrap();
    let deps = analyze(&module);
    let blocks = build_dependency_blocks(&module, &deps);
    let graph = build_call_graph(&module, &blocks).unwrap();

    let mut calls = 0;
    for inst in module.all_instructions() {
        let Some(callee) = inst.direct_callee() else { continue };
        calls += 1;
        let block = blocks.block_of(inst.id()).unwrap();
        assert!(graph.callees_of(block).contains(&callee));
        assert!(graph.blocks_of(inst.parent()).contains(&block));
        assert!(graph.callers_of(callee).contains(&block));
    }
    assert_eq!(calls, 4);
    // The two calls to helper_a sit in different blocks of main.
    let helper_a = module.function_by_name("helper_a").unwrap();
    assert_eq!(graph.callers_of(helper_a).len(), 2);
    assert_eq!(graph.edge_count(), 4);
    assert_eq!(graph.edges().len(), 4);
}

#[test]
fn call_graph_dedupes_callees_within_a_block() {
    let text = r#"
name: twice
functions:
  - name: main
    body:
      - { id: x, op: call, callee: "@f", ty: i32 }
      - { id: y, op: call, callee: "@f", ty: i32 }
      - { id: z, op: add, ty: i32, args: ["%x", "%y"] }
      - { op: ret }
  - name: f
    ret: i32
"#;
    let module = Module::from_yaml_str(text).unwrap();
    let deps = analyze(&module);
    let blocks = build_dependency_blocks(&module, &deps);
    let graph = build_call_graph(&module, &blocks).unwrap();
    let main = module.function_by_name("main").unwrap();
    let f = module.function_by_name("f").unwrap();

    let first = graph.blocks_of(main)[0];
    assert_eq!(blocks.block(first).unwrap().len(), 3);
    assert_eq!(graph.callees_of(first), &[f]);
}

#[test]
fn indirect_calls_abort_call_graph_construction() {
    let text = r#"
name: indirect
functions:
  - name: main
    params: [ptr]
    body:
      - { op: call, callee: "$0" }
      - { op: ret }
"#;
    let module = Module::from_yaml_str(text).unwrap();
    let deps = analyze(&module);
    let blocks = build_dependency_blocks(&module, &deps);
    let err = build_call_graph(&module, &blocks).unwrap_err();
    assert!(matches!(err, SliceError::Resolution { ref function, ref instruction }
        if function == "main" && instruction == "main#0"));
    assert!(err.to_string().contains("main#0"));
}
