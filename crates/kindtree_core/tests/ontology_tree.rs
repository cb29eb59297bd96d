use kindtree_core::db::open_db_in_memory;
use kindtree_core::{
    KindName, MemoryOntologyStore, OntologyService, OntologyStore, PropertySet,
    SqliteOntologyStore, ROOT_KIND,
};
use rusqlite::Connection;

const NO_PROPERTIES: [&str; 0] = [];

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn props(values: &[&str]) -> PropertySet {
    values.iter().map(|value| value.to_string()).collect()
}

fn name(raw: &str) -> KindName {
    KindName::new(raw).unwrap()
}

#[test]
fn create_on_empty_store_adds_root_and_child() {
    let conn = setup();
    let store = SqliteOntologyStore::try_new(&conn).unwrap();
    let service = OntologyService::new(store);

    service.create_kind("Person", ROOT_KIND, NO_PROPERTIES).unwrap();

    let tree = service.ontology_graph().unwrap().unwrap();
    assert_eq!(tree.kind_count(), 2);
    assert!(tree.root().properties().is_empty());
    assert_eq!(tree.children(&KindName::root()).unwrap(), &[name("Person")]);
    assert_eq!(
        service.get_kind_properties("Person").unwrap(),
        Some(PropertySet::new())
    );
}

#[test]
fn child_inherits_parent_properties_at_creation() {
    let conn = setup();
    let service = OntologyService::new(SqliteOntologyStore::try_new(&conn).unwrap());

    service.create_kind("Person", ROOT_KIND, ["name"]).unwrap();
    service
        .create_kind("Employee", "Person", ["salary"])
        .unwrap();

    assert_eq!(
        service.get_kind_properties("Employee").unwrap(),
        Some(props(&["name", "salary"]))
    );
    assert_eq!(
        service.get_descendant_kinds("Person").unwrap(),
        Some(vec!["Employee".to_string()])
    );
}

#[test]
fn employee_under_propertyless_person_keeps_requested_properties() {
    let conn = setup();
    let service = OntologyService::new(SqliteOntologyStore::try_new(&conn).unwrap());

    service.create_kind("Person", ROOT_KIND, NO_PROPERTIES).unwrap();
    service
        .create_kind("Employee", "Person", ["salary"])
        .unwrap();

    assert_eq!(
        service.get_kind_properties("Employee").unwrap(),
        Some(props(&["salary"]))
    );
}

#[test]
fn missing_parent_is_added_under_root() {
    let conn = setup();
    let service = OntologyService::new(SqliteOntologyStore::try_new(&conn).unwrap());

    service.create_kind("Manager", "Department", NO_PROPERTIES).unwrap();

    assert_eq!(
        service.get_descendant_kinds(ROOT_KIND).unwrap(),
        Some(vec!["Department".to_string()])
    );
    assert_eq!(
        service.get_descendant_kinds("Department").unwrap(),
        Some(vec!["Manager".to_string()])
    );
}

#[test]
fn kind_names_are_case_insensitive() {
    let store = MemoryOntologyStore::new();
    let service = OntologyService::new(&store);

    service.create_kind("person", "kind", ["name"]).unwrap();
    service.create_kind("PERSON", ROOT_KIND, ["age"]).unwrap();
    service.create_kind("employee", "pErSoN", NO_PROPERTIES).unwrap();

    let tree = store.snapshot().unwrap();
    assert_eq!(tree.kind_count(), 3);
    assert_eq!(
        service.get_kind_properties("Person").unwrap(),
        Some(props(&["name"]))
    );
    assert_eq!(
        service.get_descendant_kinds("PERSON").unwrap(),
        Some(vec!["Employee".to_string()])
    );
}

#[test]
fn duplicate_create_leaves_stored_tree_unchanged() {
    let store = MemoryOntologyStore::new();
    let service = OntologyService::new(&store);
    service.create_kind("Person", ROOT_KIND, ["name"]).unwrap();
    service.create_kind("Employee", "Person", NO_PROPERTIES).unwrap();
    let before = store.snapshot().unwrap();
    let saves_before = store.save_count();

    let returned = service
        .create_kind("Employee", ROOT_KIND, ["salary"])
        .unwrap();

    assert_eq!(returned, before);
    assert_eq!(store.snapshot().unwrap(), before);
    assert_eq!(store.save_count(), saves_before);
}

#[test]
fn creating_the_root_kind_is_a_no_op() {
    let store = MemoryOntologyStore::new();
    let service = OntologyService::new(&store);
    service.create_kind("Person", ROOT_KIND, NO_PROPERTIES).unwrap();

    service.create_kind("kind", ROOT_KIND, ["x"]).unwrap();

    let tree = store.snapshot().unwrap();
    assert_eq!(tree.kind_count(), 2);
    assert!(tree.root().properties().is_empty());
}

#[test]
fn duplicate_under_missing_parent_still_persists_repaired_parent() {
    let store = MemoryOntologyStore::new();
    let service = OntologyService::new(&store);
    service.create_kind("Person", ROOT_KIND, NO_PROPERTIES).unwrap();

    service.create_kind("Person", "Agent", NO_PROPERTIES).unwrap();

    let tree = store.snapshot().unwrap();
    assert_eq!(
        tree.children(&KindName::root()).unwrap(),
        &[name("Person"), name("Agent")]
    );
    assert_eq!(tree.get(&name("Person")).unwrap().parent(), Some(&KindName::root()));
}

#[test]
fn kind_named_as_its_own_missing_parent_ends_up_under_root() {
    let store = MemoryOntologyStore::new();
    let service = OntologyService::new(&store);

    service.create_kind("Loop", "loop", ["x"]).unwrap();

    let tree = store.snapshot().unwrap();
    assert_eq!(tree.kind_count(), 2);
    let node = tree.get(&name("Loop")).unwrap();
    assert_eq!(node.parent(), Some(&KindName::root()));
    assert!(node.properties().is_empty());
}

#[test]
fn remove_kind_prunes_whole_subtree() {
    let conn = setup();
    let service = OntologyService::new(SqliteOntologyStore::try_new(&conn).unwrap());
    service.create_kind("Person", ROOT_KIND, NO_PROPERTIES).unwrap();
    service.create_kind("Employee", "Person", NO_PROPERTIES).unwrap();
    service.create_kind("Manager", "Employee", NO_PROPERTIES).unwrap();
    service.create_kind("Place", ROOT_KIND, NO_PROPERTIES).unwrap();

    assert!(service.remove_kind("person").unwrap());

    for gone in ["Person", "Employee", "Manager"] {
        assert_eq!(service.get_kind_properties(gone).unwrap(), None);
        assert_eq!(service.get_descendant_kinds(gone).unwrap(), None);
    }
    assert_eq!(
        service.get_descendant_kinds(ROOT_KIND).unwrap(),
        Some(vec!["Place".to_string()])
    );
}

#[test]
fn remove_unknown_kind_reports_failure_without_saving() {
    let store = MemoryOntologyStore::new();
    let service = OntologyService::new(&store);

    assert!(!service.remove_kind("Person").unwrap());
    assert_eq!(store.save_count(), 0);

    service.create_kind("Person", ROOT_KIND, NO_PROPERTIES).unwrap();
    assert!(!service.remove_kind("Ghost").unwrap());
    assert_eq!(store.save_count(), 1);
}

#[test]
fn remove_root_is_refused() {
    let store = MemoryOntologyStore::new();
    let service = OntologyService::new(&store);
    service.create_kind("Person", ROOT_KIND, NO_PROPERTIES).unwrap();

    assert!(!service.remove_kind(ROOT_KIND).unwrap());
    assert_eq!(store.snapshot().unwrap().kind_count(), 2);
}

#[test]
fn update_properties_renames_pairwise() {
    let conn = setup();
    let service = OntologyService::new(SqliteOntologyStore::try_new(&conn).unwrap());
    service.create_kind("Person", ROOT_KIND, NO_PROPERTIES).unwrap();
    service
        .create_kind("Employee", "Person", ["salary"])
        .unwrap();

    assert!(service
        .update_properties_of_kind("Employee", &["salary"], &["wage"])
        .unwrap());
    assert_eq!(
        service.get_kind_properties("Employee").unwrap(),
        Some(props(&["wage"]))
    );
}

#[test]
fn update_with_unknown_old_property_changes_nothing() {
    let store = MemoryOntologyStore::new();
    let service = OntologyService::new(&store);
    service
        .create_kind("Employee", ROOT_KIND, ["salary", "title"])
        .unwrap();
    let saves_before = store.save_count();

    assert!(!service
        .update_properties_of_kind("Employee", &["title", "role"], &["position", "duty"])
        .unwrap());
    assert!(!service
        .update_properties_of_kind("Employee", &["rank"], &["grade"])
        .unwrap());

    assert_eq!(
        service.get_kind_properties("Employee").unwrap(),
        Some(props(&["salary", "title"]))
    );
    assert_eq!(store.save_count(), saves_before);
}

#[test]
fn update_pairs_apply_in_sequence() {
    let store = MemoryOntologyStore::new();
    let service = OntologyService::new(&store);
    service.create_kind("Employee", ROOT_KIND, ["a"]).unwrap();

    assert!(service
        .update_properties_of_kind("Employee", &["a", "b"], &["b", "c"])
        .unwrap());
    assert_eq!(
        service.get_kind_properties("Employee").unwrap(),
        Some(props(&["c"]))
    );
}

#[test]
fn update_does_not_reach_descendants() {
    let store = MemoryOntologyStore::new();
    let service = OntologyService::new(&store);
    service.create_kind("Person", ROOT_KIND, ["name"]).unwrap();
    service.create_kind("Employee", "Person", NO_PROPERTIES).unwrap();

    assert!(service
        .update_properties_of_kind("Person", &["name"], &["full_name"])
        .unwrap());

    assert_eq!(
        service.get_kind_properties("Person").unwrap(),
        Some(props(&["full_name"]))
    );
    assert_eq!(
        service.get_kind_properties("Employee").unwrap(),
        Some(props(&["name"]))
    );
}

#[test]
fn update_on_unknown_kind_reports_failure() {
    let store = MemoryOntologyStore::new();
    let service = OntologyService::new(&store);
    assert!(!service
        .update_properties_of_kind("Person", &["a"], &["b"])
        .unwrap());

    service.create_kind("Person", ROOT_KIND, ["a"]).unwrap();
    assert!(!service
        .update_properties_of_kind("Ghost", &["a"], &["b"])
        .unwrap());
    assert_eq!(store.save_count(), 1);
}

#[test]
fn descendant_kinds_lists_only_direct_children_in_creation_order() {
    let store = MemoryOntologyStore::new();
    let service = OntologyService::new(&store);
    service.create_kind("Zebra", ROOT_KIND, NO_PROPERTIES).unwrap();
    service.create_kind("Ape", ROOT_KIND, NO_PROPERTIES).unwrap();
    service.create_kind("Calf", "Zebra", NO_PROPERTIES).unwrap();

    assert_eq!(
        service.get_descendant_kinds(ROOT_KIND).unwrap(),
        Some(vec!["Zebra".to_string(), "Ape".to_string()])
    );
    assert_eq!(
        service.get_descendant_kinds("Ape").unwrap(),
        Some(Vec::new())
    );
}

#[test]
fn descendant_kinds_distinguishes_absent_tree_from_absent_kind() {
    let store = MemoryOntologyStore::new();
    let service = OntologyService::new(&store);

    assert_eq!(
        service.get_descendant_kinds("Person").unwrap(),
        Some(Vec::new())
    );

    service.create_kind("Person", ROOT_KIND, NO_PROPERTIES).unwrap();
    assert_eq!(service.get_descendant_kinds("Ghost").unwrap(), None);
}

#[test]
fn kind_properties_absent_without_tree() {
    let service = OntologyService::new(MemoryOntologyStore::new());
    assert_eq!(service.get_kind_properties("Person").unwrap(), None);
}

#[test]
fn properties_membership_is_subset_check() {
    let store = MemoryOntologyStore::new();
    let service = OntologyService::new(&store);
    service
        .create_kind("Person", ROOT_KIND, ["name", "age"])
        .unwrap();

    assert!(service.are_properties_in_kind(&["name"], "person").unwrap());
    assert!(service
        .are_properties_in_kind(&["age", "name"], "Person")
        .unwrap());
    assert!(service.are_properties_in_kind(&NO_PROPERTIES, "Person").unwrap());
    assert!(!service
        .are_properties_in_kind(&["name", "email"], "Person")
        .unwrap());
    assert!(!service.are_properties_in_kind(&["name"], "Ghost").unwrap());
}

#[test]
fn root_stays_propertyless_across_operations() {
    let store = MemoryOntologyStore::new();
    let service = OntologyService::new(&store);

    service.create_kind("Person", ROOT_KIND, ["name"]).unwrap();
    service.create_kind("Robot", "Machine", ["serial"]).unwrap();
    service
        .update_properties_of_kind("Person", &["name"], &["label"])
        .unwrap();
    service.remove_kind("Machine").unwrap();

    let tree = store.load_ontology_graph().unwrap().unwrap();
    assert!(tree.root().properties().is_empty());
    assert_eq!(service.get_kind_properties(ROOT_KIND).unwrap(), Some(PropertySet::new()));
}

#[test]
fn service_reloads_state_written_by_another_service() {
    let conn = setup();
    let writer = OntologyService::new(SqliteOntologyStore::try_new(&conn).unwrap());
    let reader = OntologyService::new(SqliteOntologyStore::try_new(&conn).unwrap());

    assert_eq!(reader.get_kind_properties("Person").unwrap(), None);
    writer.create_kind("Person", ROOT_KIND, ["name"]).unwrap();
    assert_eq!(
        reader.get_kind_properties("Person").unwrap(),
        Some(props(&["name"]))
    );
}
