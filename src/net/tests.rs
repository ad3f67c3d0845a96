use super::*;
use crate::entity::EntityId;
use crate::time::Duration;

// root
// ├── agg-0: edge-0, edge-1
// └── agg-1: edge-2, edge-3
fn fat_tree() -> Topology {
    let mut t = Topology::default();
    let root = t.add_switch("root", SwitchLevel::Root).unwrap();
    for a in 0..2 {
        let agg = t
            .add_switch(format!("agg-{a}"), SwitchLevel::Aggregate)
            .unwrap();
        t.connect(root, agg).unwrap();
        for e in 0..2 {
            let edge = t
                .add_switch(format!("edge-{}", a * 2 + e), SwitchLevel::Edge)
                .unwrap();
            t.connect(agg, edge).unwrap();
            for h in 0..2 {
                let idx = (a * 2 + e) * 2 + h;
                let host = t.add_host(format!("host-{idx}"), edge).unwrap();
                t.place_vm(VmId(idx as u64), host).unwrap();
            }
        }
    }
    t
}

fn sw(t: &Topology, name: &str) -> SwitchId {
    t.switch_by_name(name).unwrap()
}

#[test]
fn topology_lookups() {
    let t = fat_tree();
    assert_eq!(t.num_switches(), 7);
    assert_eq!(t.num_hosts(), 8);

    assert_eq!(
        t.downlink_switches(sw(&t, "root")),
        &[sw(&t, "agg-0"), sw(&t, "agg-1")]
    );
    assert_eq!(t.uplink_switches(sw(&t, "edge-3")), &[sw(&t, "agg-1")]);
    assert_eq!(t.switch_for_vm(VmId(5)), sw(&t, "edge-2"));
    assert_eq!(t.host_for_vm(VmId(5)), t.host_by_name("host-5"));
    assert_eq!(t.switch_for_vm(VmId(99)), SwitchId::NULL);
    assert!(t.downlink_switches(SwitchId::NULL).is_empty());
    assert_eq!(t.switch_entity(sw(&t, "root")), EntityId::NULL);
}

#[test]
fn invalid_links_are_rejected() {
    let mut t = fat_tree();
    let root = sw(&t, "root");
    let edge = sw(&t, "edge-0");

    let err = t.connect(root, edge).unwrap_err();
    assert_eq!(
        err.to_string(),
        "cannot link edge switch 'edge-0' below root switch 'root'"
    );
    assert!(matches!(
        t.connect(edge, sw(&t, "agg-0")),
        Err(NetworkError::LevelMismatch { .. })
    ));
    assert!(matches!(
        t.add_host("host-x", root),
        Err(NetworkError::NotAnEdge(_))
    ));
    assert!(matches!(
        t.add_switch("edge-1", SwitchLevel::Edge),
        Err(NetworkError::DuplicateName(_))
    ));

    let host = t.host_by_name("host-0").unwrap();
    assert!(matches!(
        t.place_vm(VmId(3), host),
        Err(NetworkError::DuplicateVm(VmId(3)))
    ));
}

#[test]
fn routing_decisions() {
    let t = fat_tree();
    let dst = VmId(6); // host-6 on edge-3
    let dst_edge = t.switch_for_vm(dst);
    let dst_host = t.host_for_vm(dst);

    let hop = |name: &str, up: bool| {
        let id = sw(&t, name);
        let level = t.switch(id).unwrap().level();
        if up {
            route_up(&t, id, level, dst_edge, dst_host)
        } else {
            route_down(&t, id, level, dst_edge, dst_host)
        }
    };

    assert_eq!(hop("edge-0", true), Hop::Up(sw(&t, "agg-0")));
    assert_eq!(hop("agg-0", true), Hop::Up(sw(&t, "root")));
    assert_eq!(hop("root", true), Hop::Down(sw(&t, "agg-1")));
    assert_eq!(hop("agg-1", false), Hop::Down(sw(&t, "edge-3")));
    assert_eq!(hop("edge-3", false), Hop::Host(dst_host.unwrap()));

    // siblings below one aggregate never reach the root
    assert_eq!(hop("agg-1", true), Hop::Down(sw(&t, "edge-3")));
    // wrong subtree on the way down
    assert_eq!(hop("agg-0", false), Hop::Drop);
    assert_eq!(hop("edge-2", false), Hop::Drop);
}

#[test]
fn unknown_destinations_are_dropped() {
    let t = fat_tree();
    let root = sw(&t, "root");
    let edge = sw(&t, "edge-0");

    assert_eq!(
        route_up(&t, edge, SwitchLevel::Edge, SwitchId::NULL, None),
        Hop::Drop
    );

    // an edge that hangs below no aggregate of this root
    let mut t = t;
    let orphan = t.add_switch("edge-orphan", SwitchLevel::Edge).unwrap();
    assert_eq!(find_aggregate_for_edge(&t, root, orphan), None);
    assert_eq!(
        route_up(&t, root, SwitchLevel::Root, orphan, None),
        Hop::Drop
    );
}

#[test]
fn first_aggregate_wins() {
    let mut t = fat_tree();
    let shared = sw(&t, "edge-2");
    // edge-2 now also hangs below agg-0, which is declared first
    t.connect(sw(&t, "agg-0"), shared).unwrap();

    assert_eq!(
        find_aggregate_for_edge(&t, sw(&t, "root"), shared),
        Some(sw(&t, "agg-0"))
    );
    assert_eq!(t.uplink_switches(shared), &[sw(&t, "agg-1"), sw(&t, "agg-0")]);
}

#[test]
fn level_defaults() {
    let root = SwitchParams::for_level(SwitchLevel::Root);
    assert_eq!(root.ports, 1);
    assert_eq!(root.switching_delay, Duration::from_micros(2850));
    assert_eq!(root.downlink_bandwidth, 40 * 1024 * 1024 * 1024);

    let agg = SwitchParams::for_level(SwitchLevel::Aggregate);
    assert_eq!(agg.uplink_bandwidth, root.downlink_bandwidth);

    let edge = SwitchParams::for_level(SwitchLevel::Edge);
    assert_eq!(edge.ports, 4);
    assert_eq!(edge.switching_delay, Duration::from_micros(1570));
    assert_eq!(edge.uplink_bandwidth, agg.downlink_bandwidth);

    assert_eq!(SwitchLevel::Edge.index(), 2);
    assert_eq!(SwitchLevel::Root.below(), Some(SwitchLevel::Aggregate));
    assert_eq!(SwitchLevel::Edge.below(), None);
}

#[test]
fn entity_binding() {
    let mut t = fat_tree();
    t.bind_entities(EntityId(5));
    assert_eq!(t.switch_entity(sw(&t, "root")), EntityId(5));
    assert_eq!(t.switch_entity(sw(&t, "edge-3")), EntityId(11));
    assert_eq!(
        t.host_entity(t.host_by_name("host-0").unwrap()),
        EntityId(12)
    );
}

#[test]
fn config_to_topology() {
    let config = NetworkConfig::from_yaml_str(
        r"
tick: 0.25
switches:
  - { name: root, level: root, ports: 2 }
  - { name: agg, level: aggregate, parents: [root], downlink_bandwidth: 8000 }
  - { name: edge, level: edge, parents: [agg], switching_delay: 0.001 }
hosts:
  - { name: host, edge: edge, vms: [1, 2] }
",
    )
    .unwrap();

    let t = config.to_topology().unwrap();
    assert_eq!(t.tick(), Duration::from_millis(250));

    let root = t.switch(sw(&t, "root")).unwrap();
    assert_eq!(root.params().ports, 2);
    assert_eq!(root.params().switching_delay, Duration::from_micros(2850));

    let agg = t.switch(sw(&t, "agg")).unwrap();
    assert_eq!(agg.params().downlink_bandwidth, 8000);

    let edge = t.switch(sw(&t, "edge")).unwrap();
    assert_eq!(edge.params().switching_delay, Duration::from_millis(1));
    assert_eq!(edge.uplinks(), &[sw(&t, "agg")]);

    let host = t.host(t.host_by_name("host").unwrap()).unwrap();
    assert_eq!(host.vms(), &[VmId(1), VmId(2)]);
}

#[test]
fn config_errors() {
    let unknown_parent = NetworkConfig::from_yaml_str(
        "switches:\n  - { name: edge, level: edge, parents: [agg] }\n",
    )
    .unwrap();
    assert!(matches!(
        unknown_parent.to_topology(),
        Err(NetworkError::UnknownSwitch(name)) if name == "agg"
    ));

    let negative = NetworkConfig::from_yaml_str("tick: -1.0\nswitches: []\n").unwrap();
    assert!(matches!(
        negative.to_topology(),
        Err(NetworkError::InvalidValue { .. })
    ));

    assert!(matches!(
        NetworkConfig::from_yaml_str("switches:\n  - { name: s, level: core }\n"),
        Err(NetworkError::Yaml(_))
    ));
    assert!(matches!(
        NetworkConfig::from_yaml_str("switches: []\nfoo: 1\n"),
        Err(NetworkError::Yaml(_))
    ));
}
