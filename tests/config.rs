#![cfg(feature = "net")]

use dcsim::net::*;
use dcsim::prelude::*;
use serial_test::serial;
use std::path::PathBuf;

fn demo() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/datacenter.yml")
}

#[test]
fn demo_configuration_loads() {
    let config = NetworkConfig::from_file(demo()).unwrap();
    assert_eq!(config.switches.len(), 7);
    assert_eq!(config.hosts.len(), 8);

    let topology = config.to_topology().unwrap();
    let root = topology.switch_by_name("root").unwrap();
    assert_eq!(topology.downlink_switches(root).len(), 2);
    assert_eq!(topology.switch(root).unwrap().params().ports, 2);
    assert_eq!(
        topology.switch_for_vm(VmId(41)),
        topology.switch_by_name("edge-4").unwrap()
    );
}

#[test]
fn configurations_survive_serialization() {
    let config = NetworkConfig::from_file(demo()).unwrap();
    let yaml = config.to_yaml_string().unwrap();
    assert_eq!(NetworkConfig::from_yaml_str(&yaml).unwrap(), config);
}

#[test]
fn missing_files() {
    let err = NetworkConfig::from_file("demos/does-not-exist.yml").unwrap_err();
    assert!(matches!(err, NetworkError::Io(_)));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn invalid_topologies() {
    let cases = [
        // an edge directly below the root
        "switches:\n  - { name: r, level: root }\n  - { name: e, level: edge, parents: [r] }\n",
        // hosts need an edge switch
        "switches:\n  - { name: r, level: root }\nhosts:\n  - { name: h, edge: r }\n",
        // duplicate names across switches and hosts
        "switches:\n  - { name: e, level: edge }\nhosts:\n  - { name: e, edge: e }\n",
        // a VM on two hosts
        "switches:\n  - { name: e, level: edge }\nhosts:\n  - { name: a, edge: e, vms: [1] }\n  - { name: b, edge: e, vms: [1] }\n",
        // a negative switching delay
        "switches:\n  - { name: e, level: edge, switching_delay: -0.5 }\n",
    ];

    for yaml in cases {
        let config = NetworkConfig::from_yaml_str(yaml).unwrap();
        assert!(config.to_topology().is_err(), "accepted {yaml}");
    }
}

#[test]
#[serial]
fn demo_network_delivers() {
    let mut rt = Builder::seeded(5).quiet().build();
    let network = NetworkBuilder::from_file(demo())
        .unwrap()
        .build(&mut rt)
        .unwrap();

    for (i, (from, to)) in [(10, 41), (20, 21), (30, 11), (40, 40)].into_iter().enumerate() {
        let at = SimTime::from(i as f64 * 0.1);
        network
            .send(&mut rt, at, VmPacket::new(VmId(from), VmId(to), 1024))
            .unwrap();
    }

    let result = rt.run();
    assert!(result.is_finished());

    let delivered: usize = result
        .entities()
        .iter()
        .filter_map(|entity| entity.as_any().downcast_ref::<Host>())
        .map(|host| host.delivered().len())
        .sum();
    assert_eq!(delivered, 4);
}
