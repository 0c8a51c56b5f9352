use repex_core::{Axis, AxisSlot, Replica, ReplicaId};

#[test]
fn replica_round_trips_through_json() {
    let mut replica = Replica::new(ReplicaId::from_raw(5), 320.0).with_secondary(1.5);
    replica.set_aux_file(Axis::Secondary, "restraint.5");
    replica.cycle = 3;
    replica.note_provenance("unit-0005");

    let json = serde_json::to_string(&replica).unwrap();
    let back: Replica = serde_json::from_str(&json).unwrap();
    assert_eq!(replica, back);
    assert_eq!(back.id().as_raw(), 5);
    assert_eq!(back.parameter(Axis::Temperature), Some(320.0));
}

#[test]
fn axis_serializes_kebab_case() {
    assert_eq!(serde_json::to_string(&Axis::Temperature).unwrap(), "\"temperature\"");
    assert_eq!(serde_json::to_string(&Axis::Secondary).unwrap(), "\"secondary\"");
}

#[test]
fn axis_slot_omits_missing_aux_file() {
    let slot = AxisSlot::new(300.0);
    let json = serde_json::to_string(&slot).unwrap();
    assert!(!json.contains("aux_file"));
}
