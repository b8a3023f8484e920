use budget_outline_core::{NodeId, NodeKind, OutlineCode, OutlineNode, PricedDetail};
use serde_json::json;

fn priced_line_item() -> OutlineNode {
    OutlineNode {
        id: NodeId::Stored(21),
        parent_id: Some(NodeId::Stored(20)),
        kind: NodeKind::LineItem,
        level: 2,
        sort_key: 2.0,
        code: Some(OutlineCode::parse("01.02").unwrap()),
        label: "Excavación de zanjas".to_string(),
        category_id: Some(3),
        priced_detail: Some(PricedDetail {
            unit: "m3".to_string(),
            quantity: 48.0,
            unit_price: 35.5,
            shift_hours: Some(8.0),
        }),
    }
}

#[test]
fn node_serializes_with_persisted_field_names() {
    let value = serde_json::to_value(priced_line_item()).unwrap();

    assert_eq!(
        value,
        json!({
            "id": 21,
            "parent_id": 20,
            "tipo": "PARTIDA",
            "nivel": 2,
            "orden": 2.0,
            "item": "01.02",
            "descripcion": "Excavación de zanjas",
            "categoria_id": 3,
            "apu": {
                "unidad": "m3",
                "metrado": 48.0,
                "precio_unitario": 35.5,
                "jornada": 8.0
            }
        })
    );
}

#[test]
fn persisted_row_round_trips() {
    let node = priced_line_item();
    let text = serde_json::to_string(&node).unwrap();
    let parsed: OutlineNode = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, node);
}

#[test]
fn section_without_detail_omits_apu_and_accepts_missing_field() {
    let raw = json!({
        "id": 7,
        "parent_id": null,
        "tipo": "TITULO",
        "nivel": 1,
        "orden": 1.0,
        "item": "03",
        "descripcion": "Estructuras",
        "categoria_id": null
    });

    let node: OutlineNode = serde_json::from_value(raw).unwrap();
    assert_eq!(node.kind, NodeKind::Section);
    assert_eq!(node.code, Some(OutlineCode::root(3)));
    assert_eq!(node.priced_detail, None);

    let back = serde_json::to_value(&node).unwrap();
    assert!(back.get("apu").is_none());
}

#[test]
fn draft_ids_serialize_as_uuid_strings() {
    let node = OutlineNode::draft(None, NodeKind::Section, 1, 1.0, "Nuevo");
    let value = serde_json::to_value(&node).unwrap();

    assert!(value["id"].is_string());
    assert_eq!(value["item"], serde_json::Value::Null);
    let parsed: OutlineNode = serde_json::from_value(value).unwrap();
    assert!(parsed.is_new());
    assert_eq!(parsed.id, node.id);
}

#[test]
fn malformed_item_is_rejected_on_load() {
    let raw = json!({
        "id": 8,
        "parent_id": null,
        "tipo": "TITULO",
        "nivel": 1,
        "orden": 1.0,
        "item": "1.2",
        "descripcion": "Roto",
        "categoria_id": null
    });

    let err = serde_json::from_value::<OutlineNode>(raw).unwrap_err();
    assert!(err.to_string().contains("malformed outline code"));
}
