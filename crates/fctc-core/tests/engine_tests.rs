//! Decomposition engine integration tests
//!
//! Every run talks to a scripted oracle, so call counts are exact.

mod common;

use common::{engine, recipe, World};
use fctc_core::engine::prompts;
use fctc_core::{
    CancelFlag, Engine, EngineOptions, FctcConfig, FctcError, ItemGraph, ItemNode, ItemStatus,
    ItemTree, KbValue, QueryCache, RepairMode, RunRequest, Step, ToolCanonicalizer,
};
use fctc_oracle::ScriptedOracle;
use tempfile::TempDir;

fn request(roots: &[&str]) -> RunRequest {
    RunRequest {
        roots: roots.iter().map(|s| s.to_string()).collect(),
        ..RunRequest::default()
    }
}

fn config_in(dir: &TempDir) -> FctcConfig {
    let mut config = FctcConfig::default();
    config.storage.data_dir = dir.path().to_path_buf();
    config
}

// === Decomposition ===

#[test]
fn test_natural_root_is_a_base_item() {
    let oracle = World::knife().oracle();
    let mut engine = engine(&oracle, EngineOptions::default());

    let summary = engine.run(&request(&["wood"])).unwrap();
    assert_eq!(summary.roots, 1);

    let wood = engine.graph().get("wood").unwrap();
    assert_eq!(wood.status, ItemStatus::Complete);
    assert_eq!(wood.is_natural, Some(true));
    assert!(wood.user_requested);
    assert!(wood.steps.is_none());
    assert_eq!(oracle.call_count(), 2);
}

#[test]
fn test_knife_decomposes_into_hammer_iron_and_wood() {
    let oracle = World::knife().oracle();
    let mut engine = engine(&oracle, EngineOptions::default());
    engine.run(&request(&["knife"])).unwrap();

    let graph = engine.graph();
    let knife = graph.get("knife").unwrap();
    assert_eq!(knife.status, ItemStatus::Complete);
    assert_eq!(knife.estimated_age.as_deref(), Some("1000 BCE"));
    assert!(knife.user_requested);

    let steps = knife.steps();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].label, "forge blade");
    assert_eq!(steps[0].tools, vec!["hammer"]);
    assert_eq!(steps[0].raw_materials, vec!["iron"]);
    assert!(steps[1].tools.is_empty());
    assert_eq!(steps[1].raw_materials, vec!["wood"]);

    let hammer = graph.get("hammer").unwrap();
    assert!(hammer.is_tool);
    assert!(!hammer.user_requested);
    assert_eq!(hammer.status, ItemStatus::Complete);
    assert_eq!(hammer.steps()[0].raw_materials, vec!["stone", "wood"]);

    for name in ["iron", "wood", "stone"] {
        let node = graph.get(name).unwrap();
        assert_eq!(node.status, ItemStatus::Complete, "{} should be complete", name);
        assert!(node.is_base_item());
        assert!(!node.is_tool);
    }

    assert!(graph.incomplete().is_empty());
    assert_eq!(graph.requested(), vec!["knife"]);
    assert_eq!(oracle.call_count(), 15);
}

#[test]
fn test_dependency_counts_for_knife() {
    let oracle = World::knife().oracle();
    let mut engine = engine(&oracle, EngineOptions::default());
    engine.run(&request(&["knife"])).unwrap();

    let counts = engine.graph().dependency_counts("knife");
    assert_eq!(counts.unique_tools, 1);
    assert_eq!(counts.total_tools, 1);
    assert_eq!(counts.unique_raw_materials, 3);
}

#[test]
fn test_every_prompt_reaches_the_oracle_once() {
    let oracle = World::knife().oracle();
    let mut engine = engine(&oracle, EngineOptions::default());
    engine.run(&request(&["knife"])).unwrap();

    let calls = oracle.calls();
    let mut unique = calls.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(calls.len(), unique.len());
}

#[test]
fn test_cached_answers_replay_without_oracle() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    let first = World::knife().oracle();
    let mut engine = Engine::from_config(&config, Box::new(first.clone())).unwrap();
    engine.run(&request(&["knife"])).unwrap();
    let expected = engine.graph().to_json().unwrap();

    // Fresh graph, same cache file
    std::fs::remove_file(config.storage.item_db_path()).unwrap();
    let second = ScriptedOracle::unavailable();
    let mut replay = Engine::from_config(&config, Box::new(second.clone())).unwrap();
    replay.run(&request(&["knife"])).unwrap();

    assert_eq!(second.call_count(), 0);
    assert_eq!(replay.graph().to_json().unwrap(), expected);
}

#[test]
fn test_requesting_a_complete_item_again_asks_nothing() {
    let oracle = World::knife().oracle();
    let mut engine = engine(&oracle, EngineOptions::default());
    engine.run(&request(&["knife"])).unwrap();
    let calls = oracle.call_count();

    engine.run(&request(&["knife", "hammer"])).unwrap();
    assert_eq!(oracle.call_count(), calls);
    assert!(engine.graph().get("hammer").unwrap().user_requested);
}

#[test]
fn test_knowledge_base_records_classifications() {
    let oracle = World::knife().oracle();
    let mut engine = engine(&oracle, EngineOptions::default());
    engine.run(&request(&["knife"])).unwrap();

    let natural = engine.cache().knowledge(prompts::NATURAL_KB_KEY).unwrap();
    assert_eq!(natural.get("wood"), Some(&KbValue::Bool(true)));
    assert_eq!(natural.get("hammer"), Some(&KbValue::Bool(false)));

    let parts = engine.cache().knowledge(prompts::PART_KB_KEY).unwrap();
    assert_eq!(parts.get("knife"), Some(&KbValue::Bool(false)));
}

#[test]
fn test_natural_part_of_larger_item_is_decomposed() {
    let mut world = World::knife();
    world.natural.insert("branch".into());
    world.natural.insert("tree".into());
    world.parts.insert("branch".into());
    world
        .recipes
        .insert("spear".into(), vec![recipe("sharpen tip", &[], &["branch"])]);
    world
        .recipes
        .insert("branch".into(), vec![recipe("break off", &[], &["tree"])]);
    let oracle = world.oracle();
    let mut engine = engine(&oracle, EngineOptions::default());
    engine.run(&request(&["spear"])).unwrap();

    let branch = engine.graph().get("branch").unwrap();
    assert_eq!(branch.is_natural, Some(true));
    assert_eq!(branch.is_part_of_larger, Some(true));
    assert!(!branch.is_base_item());
    assert_eq!(branch.status, ItemStatus::Complete);
    assert_eq!(branch.steps()[0].raw_materials, vec!["tree"]);
    assert!(engine.graph().get("tree").unwrap().steps.is_none());
}

#[test]
fn test_useless_answers_are_dropped() {
    let mut world = World::knife();
    world
        .recipes
        .insert("song".into(), vec![recipe("sing", &["None"], &["Nothing"])]);
    let oracle = world.oracle();
    let mut engine = engine(&oracle, EngineOptions::default());
    engine.run(&request(&["song"])).unwrap();

    let song = engine.graph().get("song").unwrap();
    assert_eq!(song.steps().len(), 1);
    assert!(song.steps()[0].tools.is_empty());
    assert!(song.steps()[0].raw_materials.is_empty());
    assert_eq!(engine.graph().len(), 1);
}

// === Tool vocabulary ===

#[test]
fn test_equivalent_tool_is_substituted() {
    let mut world = World::knife();
    world.recipes.insert(
        "knife".into(),
        vec![
            recipe("forge blade", &["hammer"], &["iron"]),
            recipe("sharpen edge", &["mallet"], &[]),
        ],
    );
    world.equivalent.insert("mallet".into(), "hammer".into());
    let oracle = world.oracle();
    let mut engine = engine(&oracle, EngineOptions::default());
    engine.run(&request(&["knife"])).unwrap();

    let knife = engine.graph().get("knife").unwrap();
    assert_eq!(knife.steps()[1].tools, vec!["hammer"]);
    assert!(!engine.graph().contains("mallet"));
    assert_eq!(engine.tools().resolve("mallet"), "hammer");
    assert_eq!(oracle.calls_containing("with step \"sharpen edge\"").len(), 1);
    assert_eq!(
        oracle.calls_containing("When using tool \"hammer\" with step \"sharpen edge\"").len(),
        1
    );
}

// === Primitive ages ===

#[test]
fn test_primitive_age_uses_older_dependency_age() {
    let oracle = World::knife().oracle();
    let options = EngineOptions {
        primitive_age_for_all: true,
        ..EngineOptions::default()
    };
    let mut engine = engine(&oracle, options);
    engine.run(&request(&["knife"])).unwrap();

    let hammer = engine.graph().get("hammer").unwrap();
    assert_eq!(hammer.estimated_age.as_deref(), Some("3000 BCE"));
    assert_eq!(
        oracle
            .calls_containing("primitive \"hammer\"")
            .iter()
            .filter(|p| p.contains("existed at 3000 BCE"))
            .count(),
        1
    );
}

#[test]
fn test_primitive_age_keeps_parent_age_for_younger_dependency() {
    let mut world = World::knife();
    world.ages.insert("hammer".into(), "1500 AD".into());
    let oracle = world.oracle();
    let options = EngineOptions {
        primitive_age_for_all: true,
        ..EngineOptions::default()
    };
    let mut engine = engine(&oracle, options);
    engine.run(&request(&["knife"])).unwrap();

    assert_eq!(
        engine.graph().get("hammer").unwrap().estimated_age.as_deref(),
        Some("1500 AD")
    );
    let hammer_steps = oracle.calls_containing("primitive \"hammer\"");
    assert_eq!(hammer_steps.len(), 1);
    assert!(hammer_steps[0].contains("existed at 1000 BCE"));
}

#[test]
fn test_inherited_age_without_primitive_mode() {
    let oracle = World::knife().oracle();
    let mut engine = engine(&oracle, EngineOptions::default());
    engine.run(&request(&["knife"])).unwrap();

    assert!(oracle
        .calls_containing("Roughly what year was the first human made \"hammer\"")
        .is_empty());
    assert!(oracle.calls_containing("primitive \"hammer\"")[0].contains("existed at 1000 BCE"));
}

// === Corruption and repair ===

fn interrupted_graph() -> ItemGraph {
    let mut graph = ItemGraph::new();
    let mut knife = ItemNode::new("knife");
    knife.status = ItemStatus::InProgress;
    knife.is_natural = Some(false);
    knife.is_part_of_larger = Some(false);
    knife.user_requested = true;
    graph.insert(knife);
    graph
}

fn engine_over(graph: ItemGraph, oracle: &ScriptedOracle) -> Engine {
    Engine::new(
        graph,
        QueryCache::in_memory(Box::new(oracle.clone())),
        ToolCanonicalizer::new(),
        EngineOptions::default(),
    )
}

#[test]
fn test_incomplete_graph_is_refused() {
    let oracle = World::knife().oracle();
    let mut engine = engine_over(interrupted_graph(), &oracle);

    let err = engine.run(&request(&["axe"])).unwrap_err();
    match err {
        FctcError::Corrupted { names } => assert_eq!(names, vec!["knife"]),
        other => panic!("expected corruption, got {:?}", other),
    }
    assert_eq!(oracle.call_count(), 0);
}

#[test]
fn test_ignore_corruption_proceeds() {
    let oracle = World::knife().oracle();
    let mut engine = engine_over(interrupted_graph(), &oracle);

    let summary = engine
        .run(&RunRequest {
            roots: vec!["wood".into()],
            ignore_corruption: true,
            ..RunRequest::default()
        })
        .unwrap();
    assert_eq!(summary.incomplete_at_start, 1);
    assert_eq!(summary.repaired, 0);
    assert_eq!(engine.graph().get("knife").unwrap().status, ItemStatus::InProgress);
}

#[test]
fn test_repair_incomplete_rebuilds_interrupted_item() {
    let oracle = World::knife().oracle();
    let mut engine = engine_over(interrupted_graph(), &oracle);

    let summary = engine
        .run(&RunRequest {
            repair: RepairMode::Incomplete,
            ..RunRequest::default()
        })
        .unwrap();
    assert_eq!(summary.repaired, 1);

    let knife = engine.graph().get("knife").unwrap();
    assert_eq!(knife.status, ItemStatus::Complete);
    assert!(knife.user_requested);
    assert_eq!(knife.steps().len(), 2);
    assert!(engine.graph().incomplete().is_empty());
}

#[test]
fn test_repair_all_rebuilds_complete_items() {
    let oracle = World::knife().oracle();
    let mut engine = engine(&oracle, EngineOptions::default());
    engine.run(&request(&["knife"])).unwrap();
    let before = oracle.call_count();

    let summary = engine
        .run(&RunRequest {
            repair: RepairMode::All,
            ..RunRequest::default()
        })
        .unwrap();
    assert_eq!(summary.repaired, engine.graph().len());
    assert!(engine.graph().incomplete().is_empty());
    assert!(oracle.call_count() > before);
    assert_eq!(oracle.calls_containing("primitive \"knife\"").len(), 1);
}

// === Cycle repair ===

#[test]
fn test_repair_cycles_is_idempotent() {
    let mut graph = ItemGraph::new();
    let mut fire = ItemNode::new("fire");
    fire.user_requested = true;
    fire.steps = Some(vec![Step::new("strike", vec!["flint".into()], vec![])]);
    let mut flint = ItemNode::new("flint");
    flint.steps = Some(vec![Step::new("knap", vec!["fire".into()], vec![])]);
    graph.insert(fire);
    graph.insert(flint);

    assert_eq!(graph.repair_cycles(), 1);
    assert_eq!(graph.repair_cycles(), 0);
    assert!(graph.get("flint").unwrap().steps()[0].tools.is_empty());
}

// === Persistence ===

#[test]
fn test_saved_graph_loads_identically() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    let oracle = World::knife().oracle();
    let mut engine = Engine::from_config(&config, Box::new(oracle)).unwrap();
    engine.run(&request(&["knife"])).unwrap();

    let loaded = ItemGraph::open(config.storage.item_db_path(), false).unwrap();
    assert_eq!(loaded.to_json().unwrap(), engine.graph().to_json().unwrap());
    assert!(config.storage.cache_path().exists());

    let tools = ToolCanonicalizer::open(config.storage.tool_path()).unwrap();
    assert!(tools.data().known.contains("hammer"));
}

#[test]
fn test_tree_report_over_decomposed_graph() {
    let oracle = World::knife().oracle();
    let mut engine = engine(&oracle, EngineOptions::default());
    engine.run(&request(&["knife"])).unwrap();

    let tree = ItemTree::build(engine.graph(), "knife").unwrap();
    assert_eq!(tree.counts.steps, 3);
    assert_eq!(tree.counts.tools, 1);
    assert_eq!(tree.counts.duplicates, 1);
    assert!(tree.to_plain().contains("wood (seen)"));
}

// === Cancellation ===

#[test]
fn test_cancellation_stops_at_checkpoint_and_saves() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);

    let cancel = CancelFlag::new();
    cancel.cancel();
    let oracle = World::knife().oracle();
    let mut engine = Engine::from_config(&config, Box::new(oracle))
        .unwrap()
        .with_cancel_flag(cancel);

    let err = engine.run(&request(&["knife"])).unwrap_err();
    assert!(err.is_cancelled());

    let saved = ItemGraph::open(config.storage.item_db_path(), false).unwrap();
    assert_eq!(saved.get("hammer").unwrap().status, ItemStatus::Complete);
    assert_eq!(saved.get("knife").unwrap().status, ItemStatus::InProgress);

    // The next run refuses until asked to repair, then finishes the job
    let oracle = World::knife().oracle();
    let mut resumed = Engine::from_config(&config, Box::new(oracle)).unwrap();
    assert!(matches!(
        resumed.run(&request(&[])),
        Err(FctcError::Corrupted { .. })
    ));
    resumed
        .run(&RunRequest {
            repair: RepairMode::Incomplete,
            ..RunRequest::default()
        })
        .unwrap();
    assert_eq!(
        resumed.graph().get("knife").unwrap().status,
        ItemStatus::Complete
    );
}
