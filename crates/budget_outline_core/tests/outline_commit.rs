use budget_outline_core::{
    CommitPolicy, MemoryOutlineStore, MoveDirection, NodeChange, NodeId, NodeKind, OutlineCode,
    OutlineEditSession, OutlineNode, OutlineServiceError, OutlineStore, PricedDetail, StoreError,
};

const BUDGET: i64 = 1;

fn stored(
    id: i64,
    parent: Option<i64>,
    kind: NodeKind,
    level: u32,
    sort_key: f64,
    code: &str,
) -> OutlineNode {
    OutlineNode {
        id: NodeId::Stored(id),
        parent_id: parent.map(NodeId::Stored),
        kind,
        level,
        sort_key,
        code: Some(OutlineCode::parse(code).unwrap()),
        label: format!("node {id}"),
        category_id: Some(4),
        priced_detail: None,
    }
}

/// 10 "01" ── 11 "01.01" (line item)
/// 12 "02"
fn store_with_outline() -> MemoryOutlineStore {
    let store = MemoryOutlineStore::new();
    store.insert_outline(
        BUDGET,
        vec![
            stored(10, None, NodeKind::Section, 1, 1.0, "01"),
            stored(11, Some(10), NodeKind::LineItem, 2, 2.0, "01.01"),
            stored(12, None, NodeKind::Section, 1, 3.0, "02"),
        ],
    );
    store
}

/// Moves 12 above 11 (so 11 is re-parented) and appends a draft section.
/// The commit then writes 12, 11 and the draft, in that order.
fn stage_reparent_and_append(session: &mut OutlineEditSession<&MemoryOutlineStore>) -> NodeId {
    let buffer = session.buffer_mut();
    buffer.move_adjacent(NodeId::Stored(12), MoveDirection::Up);
    buffer.add_node(None, 3.0, NodeKind::Section, "Instalaciones")
}

#[test]
fn commit_without_edits_writes_nothing() {
    let store = store_with_outline();
    let mut session = OutlineEditSession::load(&store, BUDGET).unwrap();

    assert!(session.pending_changes().is_empty());
    let report = session.commit(CommitPolicy::default());

    assert!(report.is_complete());
    assert!(report.applied.is_empty());
    assert_eq!(store.write_count(), 0);
}

#[test]
fn draft_parent_and_child_get_persisted_ids() {
    let store = store_with_outline();
    let mut session = OutlineEditSession::load(&store, BUDGET).unwrap();
    let section = session
        .buffer_mut()
        .add_node(None, 3.0, NodeKind::Section, "Instalaciones");
    let item = session
        .buffer_mut()
        .add_node(Some(section), 3.5, NodeKind::LineItem, "Tuberías");

    let report = session.commit(CommitPolicy::StopOnFirstError);

    assert!(report.is_complete());
    assert_eq!(report.created, vec![(section, 13), (item, 14)]);
    assert_eq!(report.applied, vec![NodeId::Stored(13), NodeId::Stored(14)]);

    let persisted_item = store.get_node(BUDGET, 14).unwrap();
    assert_eq!(persisted_item.parent_id, Some(NodeId::Stored(13)));
    assert_eq!(persisted_item.code_text(), "03.01");

    let buffer = session.buffer();
    assert!(buffer.get(section).is_none());
    assert_eq!(
        buffer.get(NodeId::Stored(14)).unwrap().parent_id,
        Some(NodeId::Stored(13))
    );
    assert!(session.pending_changes().is_empty());
}

#[test]
fn stop_on_first_error_skips_the_rest_and_retry_resumes() {
    let store = store_with_outline();
    let mut session = OutlineEditSession::load(&store, BUDGET).unwrap();
    let draft = stage_reparent_and_append(&mut session);
    store.reject_writes_for(NodeId::Stored(11));

    let report = session.commit(CommitPolicy::StopOnFirstError);

    assert!(!report.is_complete());
    assert_eq!(report.applied, vec![NodeId::Stored(12)]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].node_id, NodeId::Stored(11));
    assert!(matches!(
        report.failed[0].error,
        OutlineServiceError::Store(StoreError::Rejected(_))
    ));
    assert_eq!(report.skipped, vec![draft]);
    assert_eq!(store.write_count(), 1);
    assert_eq!(session.pending_changes().len(), 2);

    store.accept_all_writes();
    let retry = session.commit(CommitPolicy::StopOnFirstError);

    assert!(retry.is_complete());
    assert_eq!(retry.applied, vec![NodeId::Stored(11), NodeId::Stored(13)]);
    assert_eq!(store.write_count(), 3);
    assert_eq!(retry.created, vec![(draft, 13)]);
    assert_eq!(
        store.get_node(BUDGET, 11).unwrap().parent_id,
        Some(NodeId::Stored(12))
    );
    assert!(session.pending_changes().is_empty());
}

#[test]
fn continue_on_error_keeps_writing_and_remembers_failures() {
    let store = store_with_outline();
    let mut session = OutlineEditSession::load(&store, BUDGET).unwrap();
    let draft = stage_reparent_and_append(&mut session);
    store.reject_writes_for(NodeId::Stored(11));

    let report = session.commit(CommitPolicy::ContinueOnError);

    assert_eq!(report.failed.len(), 1);
    assert!(report.skipped.is_empty());
    assert_eq!(report.applied, vec![NodeId::Stored(12), NodeId::Stored(13)]);
    assert_eq!(report.created, vec![(draft, 13)]);

    let pending = session.pending_changes();
    assert_eq!(pending.len(), 1);
    assert!(matches!(
        &pending.changes[0],
        NodeChange::Update(node) if node.id == NodeId::Stored(11)
    ));
}

#[test]
fn child_of_failed_draft_reports_unresolved_parent() {
    let store = store_with_outline();
    let mut session = OutlineEditSession::load(&store, BUDGET).unwrap();
    let section = session
        .buffer_mut()
        .add_node(None, 3.0, NodeKind::Section, "Instalaciones");
    let item = session
        .buffer_mut()
        .add_node(Some(section), 3.5, NodeKind::LineItem, "Tuberías");
    store.reject_writes_for(section);

    let report = session.commit(CommitPolicy::ContinueOnError);

    let failed: Vec<NodeId> = report.failed.iter().map(|f| f.node_id).collect();
    assert_eq!(failed, vec![section, item]);
    assert_eq!(
        report.failed[1].error,
        OutlineServiceError::UnresolvedParent {
            node: item,
            parent: section,
        }
    );
    assert!(report.created.is_empty());
    assert_eq!(store.write_count(), 0);
}

#[test]
fn deleting_a_section_orphans_its_children_instead_of_cascading() {
    let store = store_with_outline();
    let mut session = OutlineEditSession::load(&store, BUDGET).unwrap();
    session.buffer_mut().remove_node(NodeId::Stored(10));

    let report = session.commit(CommitPolicy::StopOnFirstError);

    assert!(report.is_complete());
    assert_eq!(
        report.applied,
        vec![NodeId::Stored(11), NodeId::Stored(12), NodeId::Stored(10)]
    );
    assert!(store.get_node(BUDGET, 10).is_none());

    let orphan = store.get_node(BUDGET, 11).unwrap();
    assert_eq!(orphan.parent_id, None);
    assert_eq!(orphan.level, 2);
    assert_eq!(orphan.code_text(), "00.01");
    assert_eq!(store.get_node(BUDGET, 12).unwrap().code_text(), "01");
}

#[test]
fn priced_detail_and_labels_pass_through_untouched() {
    let store = MemoryOutlineStore::new();
    let mut item = stored(11, Some(10), NodeKind::LineItem, 2, 2.0, "01.01");
    item.label = "Concreto f'c=210".to_string();
    item.priced_detail = Some(PricedDetail {
        unit: "m3".to_string(),
        quantity: 12.5,
        unit_price: 420.0,
        shift_hours: Some(8.0),
    });
    store.insert_outline(
        BUDGET,
        vec![stored(10, None, NodeKind::Section, 1, 1.0, "01"), item.clone()],
    );

    let mut session = OutlineEditSession::load(&store, BUDGET).unwrap();
    session
        .buffer_mut()
        .add_node(None, 0.0, NodeKind::Section, "Obras provisionales");
    let report = session.commit(CommitPolicy::StopOnFirstError);

    assert!(report.is_complete());
    let persisted = store.get_node(BUDGET, 11).unwrap();
    assert_eq!(persisted.code_text(), "02.01");
    assert_eq!(persisted.label, item.label);
    assert_eq!(persisted.category_id, item.category_id);
    assert_eq!(persisted.priced_detail, item.priced_detail);
}

#[test]
fn discard_and_reload_drop_staged_edits() {
    let store = store_with_outline();
    let mut session = OutlineEditSession::load(&store, BUDGET).unwrap();
    let loaded = session.buffer().nodes().to_vec();

    session.buffer_mut().remove_node(NodeId::Stored(12));
    session.buffer_mut().discard();
    assert_eq!(session.buffer().nodes(), loaded.as_slice());

    session
        .buffer_mut()
        .add_node(None, 3.0, NodeKind::Section, "Temporal");
    session.reload().unwrap();
    assert_eq!(session.buffer().nodes(), loaded.as_slice());
    assert_eq!(session.budget_id(), BUDGET);
    assert_eq!(store.write_count(), 0);
}

#[test]
fn loading_an_unknown_budget_yields_an_empty_session() {
    let store = store_with_outline();
    let session = OutlineEditSession::load(&store, 99).unwrap();
    assert!(session.buffer().is_empty());
    assert!(session.pending_changes().is_empty());
}

#[test]
fn positions_survive_commit_and_reload_for_the_next_insert() {
    let store = MemoryOutlineStore::new();
    store.insert_outline(
        BUDGET,
        vec![
            stored(10, None, NodeKind::Section, 1, 1.0, "01"),
            stored(11, None, NodeKind::Section, 1, 2.0, "02"),
        ],
    );

    let mut first = OutlineEditSession::load(&store, BUDGET).unwrap();
    first
        .buffer_mut()
        .add_node(Some(NodeId::Stored(10)), 1.0, NodeKind::LineItem, "Trazo");
    assert!(first.commit(CommitPolicy::StopOnFirstError).is_complete());
    assert_eq!(store.get_node(BUDGET, 12).unwrap().sort_key, 2.0);
    assert_eq!(store.get_node(BUDGET, 11).unwrap().sort_key, 3.0);

    let mut second = OutlineEditSession::load(&store, BUDGET).unwrap();
    let anchor = second.buffer().get(NodeId::Stored(12)).unwrap().sort_key;
    second
        .buffer_mut()
        .add_node(Some(NodeId::Stored(10)), anchor, NodeKind::LineItem, "Nivelación");
    assert!(second.commit(CommitPolicy::StopOnFirstError).is_complete());

    let mut persisted = store.load_outline(BUDGET).unwrap();
    persisted.sort_by(|a, b| a.sort_key.total_cmp(&b.sort_key));
    let outline: Vec<(String, String, Option<NodeId>)> = persisted
        .iter()
        .map(|node| (node.label.clone(), node.code_text(), node.parent_id))
        .collect();
    assert_eq!(
        outline,
        vec![
            ("node 10".to_string(), "01".to_string(), None),
            ("Trazo".to_string(), "01.01".to_string(), Some(NodeId::Stored(10))),
            ("Nivelación".to_string(), "01.02".to_string(), Some(NodeId::Stored(10))),
            ("node 11".to_string(), "02".to_string(), None),
        ]
    );
}
