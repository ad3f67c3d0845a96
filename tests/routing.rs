#![cfg(feature = "net")]

use dcsim::net::*;
use dcsim::prelude::*;
use serial_test::serial;
use std::any::Any;

// root
// ├── agg-1: edge-1, edge-2
// └── agg-2: edge-3, edge-4
//
// Every edge has two hosts, host-<edge>-<i> carries vm <edge * 10 + i>.
fn datacenter() -> Topology {
    let mut t = Topology::default();
    let root = t.add_switch("root", SwitchLevel::Root).unwrap();

    for a in 1..=2 {
        let agg = t
            .add_switch(format!("agg-{a}"), SwitchLevel::Aggregate)
            .unwrap();
        t.connect(root, agg).unwrap();

        for e in (2 * a - 1)..=(2 * a) {
            let edge = t
                .add_switch(format!("edge-{e}"), SwitchLevel::Edge)
                .unwrap();
            t.connect(agg, edge).unwrap();

            for i in 0..2 {
                let host = t.add_host(format!("host-{e}-{i}"), edge).unwrap();
                t.place_vm(VmId(e * 10 + i), host).unwrap();
            }
        }
    }
    t
}

struct Placeholder(EntityCore);

impl Entity for Placeholder {
    fn core(&self) -> &EntityCore {
        &self.0
    }
    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.0
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn process_event(&mut self, _: Event, _: &mut Simulation) {}
}

fn us(micros: u64) -> Duration {
    Duration::from_micros(micros)
}

#[test]
#[serial]
fn packets_cross_the_root() {
    let mut rt = Builder::seeded(1).quiet().build();
    let network = NetworkBuilder::new(datacenter()).build(&mut rt).unwrap();
    network
        .send(&mut rt, SimTime::ZERO, VmPacket::new(VmId(10), VmId(30), 1500))
        .unwrap();

    let result = rt.run();
    assert!(result.is_finished());

    let host = result.entities().by_name::<Host>("host-3-0").unwrap();
    let [delivered] = host.delivered() else {
        panic!("expected exactly one packet, got {:?}", host.delivered());
    };

    let path: Vec<SwitchId> = ["edge-1", "agg-1", "root", "agg-2", "edge-3"]
        .iter()
        .map(|name| network.switch_id(name).unwrap())
        .collect();
    assert_eq!(delivered.packet.path, path);

    // the sum of all switching delays
    let delay = us(1570) + us(2450) + us(2850) + us(2450) + us(1570);
    assert_eq!(delivered.packet.delay, delay);
    assert_eq!(delivered.latency(), delay);
    assert_eq!(delivered.queueing_delay(), Duration::ZERO);
    assert_eq!(delivered.arrival, SimTime::from(delay));

    let sender = result.entities().by_name::<Host>("host-1-0").unwrap();
    assert_eq!(sender.num_sent(), 1);

    let root = result.entities().by_name::<Switch>("root").unwrap();
    assert_eq!(root.stats().forwarded_down, 1);
    let edge = result.entities().by_name::<Switch>("edge-3").unwrap();
    assert_eq!(edge.stats().delivered, 1);
}

#[test]
#[serial]
fn siblings_stay_below_their_aggregate() {
    let mut rt = Builder::seeded(1).quiet().build();
    let network = NetworkBuilder::new(datacenter()).build(&mut rt).unwrap();
    network
        .send(&mut rt, SimTime::from(1.0), VmPacket::new(VmId(11), VmId(21), 64))
        .unwrap();

    let result = rt.run();
    let host = result.entities().by_name::<Host>("host-2-1").unwrap();
    assert_eq!(host.delivered().len(), 1);

    let packet = &host.delivered()[0].packet;
    assert_eq!(packet.path.len(), 3);
    assert_eq!(packet.delay, us(1570) + us(2450) + us(1570));

    let root = result.entities().by_name::<Switch>("root").unwrap();
    assert_eq!(root.stats(), &SwitchStats::default());
}

#[test]
#[serial]
fn local_packets_skip_the_fabric() {
    let mut rt = Builder::seeded(1).quiet().build();
    let mut topology = datacenter();
    let host = topology.host_by_name("host-4-1").unwrap();
    topology.place_vm(VmId(99), host).unwrap();

    let network = NetworkBuilder::new(topology).build(&mut rt).unwrap();
    network
        .send(&mut rt, SimTime::from(2.0), VmPacket::new(VmId(41), VmId(99), 64))
        .unwrap();

    let result = rt.run();
    let host = result.entities().by_name::<Host>("host-4-1").unwrap();
    assert_eq!(host.delivered().len(), 1);
    assert!(host.delivered()[0].packet.path.is_empty());
    assert_eq!(host.delivered()[0].arrival, SimTime::from(2.0));
}

#[test]
#[serial]
fn unreachable_edges_drop_packets() {
    let mut rt = Builder::seeded(1).quiet().build();
    let mut topology = datacenter();
    let orphan = topology.add_switch("edge-orphan", SwitchLevel::Edge).unwrap();
    let host = topology.add_host("host-orphan", orphan).unwrap();
    topology.place_vm(VmId(500), host).unwrap();

    let network = NetworkBuilder::new(topology).build(&mut rt).unwrap();
    network
        .send(&mut rt, SimTime::ZERO, VmPacket::new(VmId(10), VmId(500), 64))
        .unwrap();
    // the orphan has no way up
    network
        .send(&mut rt, SimTime::ZERO, VmPacket::new(VmId(500), VmId(10), 64))
        .unwrap();

    let result = rt.run();
    assert!(result.is_finished());

    let root = result.entities().by_name::<Switch>("root").unwrap();
    assert_eq!(root.stats().dropped, 1);
    let orphan = result.entities().by_name::<Switch>("edge-orphan").unwrap();
    assert_eq!(orphan.stats().dropped, 1);

    for name in ["host-orphan", "host-1-0"] {
        let host = result.entities().by_name::<Host>(name).unwrap();
        assert!(host.delivered().is_empty());
    }
}

#[test]
#[serial]
fn unknown_vms_are_rejected() {
    let mut rt = Builder::seeded(1).quiet().build();
    let network = NetworkBuilder::new(datacenter()).build(&mut rt).unwrap();

    let err = network
        .send(&mut rt, SimTime::ZERO, VmPacket::new(VmId(7), VmId(10), 64))
        .unwrap_err();
    assert!(matches!(err, NetworkError::UnknownVm(VmId(7))));

    // an unknown receiver is only noticed by the sending host
    network
        .send(&mut rt, SimTime::ZERO, VmPacket::new(VmId(10), VmId(7), 64))
        .unwrap();
    let result = rt.run();
    let host = result.entities().by_name::<Host>("host-1-0").unwrap();
    assert_eq!(host.num_sent(), 0);
}

#[test]
#[serial]
fn shared_edges_use_the_first_aggregate() {
    let mut topology = datacenter();
    let agg = topology.switch_by_name("agg-1").unwrap();
    let edge = topology.switch_by_name("edge-3").unwrap();
    topology.connect(agg, edge).unwrap();

    let mut rt = Builder::seeded(1).quiet().build();
    let network = NetworkBuilder::new(topology).build(&mut rt).unwrap();
    network
        .send(&mut rt, SimTime::ZERO, VmPacket::new(VmId(10), VmId(31), 64))
        .unwrap();

    let result = rt.run();
    let host = result.entities().by_name::<Host>("host-3-1").unwrap();
    let path: Vec<SwitchId> = ["edge-1", "agg-1", "edge-3"]
        .iter()
        .map(|name| network.switch_id(name).unwrap())
        .collect();
    assert_eq!(host.delivered()[0].packet.path, path);
}

#[test]
#[serial]
fn bandwidth_contention_delays_to_the_next_tick() {
    // 8000 bit/s on the uplink of edge-a, 1000 bytes per tick
    let config = NetworkConfig::from_yaml_str(
        r"
tick: 1.0
switches:
  - { name: root, level: root }
  - { name: agg, level: aggregate, parents: [root] }
  - { name: edge-a, level: edge, parents: [agg], uplink_bandwidth: 8000 }
  - { name: edge-b, level: edge, parents: [agg] }
hosts:
  - { name: host-a, edge: edge-a, vms: [1] }
  - { name: host-b, edge: edge-b, vms: [2] }
",
    )
    .unwrap();

    let mut rt = Builder::seeded(1).quiet().build();
    let network = NetworkBuilder::from_config(&config)
        .unwrap()
        .build(&mut rt)
        .unwrap();
    for _ in 0..2 {
        network
            .send(&mut rt, SimTime::ZERO, VmPacket::new(VmId(1), VmId(2), 800))
            .unwrap();
    }

    let result = rt.run();
    assert!(result.is_finished());

    let host = result.entities().by_name::<Host>("host-b").unwrap();
    let [first, second] = host.delivered() else {
        panic!("expected two packets, got {:?}", host.delivered());
    };

    let hops = us(1570) + us(2450) + us(1570);
    assert_eq!(first.arrival, SimTime::from(hops));
    assert_eq!(second.arrival, SimTime::from(Duration::from_secs(1) + hops));
    assert_eq!(second.queueing_delay(), Duration::from_secs(1));
    assert_eq!(first.packet.delay, second.packet.delay);

    let edge = result.entities().by_name::<Switch>("edge-a").unwrap();
    assert_eq!(edge.stats().delayed, 1);
    assert_eq!(edge.stats().forwarded_up, 2);
    assert_eq!(edge.backlog_len(), 0);
}

#[test]
#[serial]
fn network_entities_are_registered_in_order() {
    let mut rt = Builder::seeded(1).quiet().build();
    let network = NetworkBuilder::new(datacenter()).build(&mut rt).unwrap();

    assert_eq!(rt.entities().len(), 7 + 8);
    assert_eq!(network.switch_entity("root"), rt.entity_id("root"));
    assert_eq!(network.host_entity("host-4-1"), rt.entity_id("host-4-1"));
    assert_eq!(network.switch_entity("host-4-1"), EntityId::NULL);

    let second = NetworkBuilder::new(datacenter()).build(&mut rt).unwrap_err();
    assert!(matches!(
        second,
        NetworkError::Runtime(RuntimeError::Entity(EntityError::DuplicateName(_)))
    ));
}

#[test]
#[serial]
fn failed_installs_register_nothing() {
    let mut rt = Builder::seeded(1).quiet().build();
    rt.add_entity(Placeholder(EntityCore::new("host-2-1").unwrap()))
        .unwrap();

    let err = NetworkBuilder::new(datacenter()).build(&mut rt).unwrap_err();
    assert!(matches!(
        err,
        NetworkError::Runtime(RuntimeError::Entity(EntityError::DuplicateName(ref name)))
            if name == "host-2-1"
    ));
    assert_eq!(rt.entities().len(), 1);
    assert!(rt.entity_id("root").is_null());
    assert!(rt.entity_id("host-1-0").is_null());

    // the same topology still installs into a fresh runtime
    drop(rt);
    let mut rt = Builder::seeded(1).quiet().build();
    NetworkBuilder::new(datacenter()).build(&mut rt).unwrap();
    rt.start();

    let err = NetworkBuilder::new(datacenter()).build(&mut rt).unwrap_err();
    assert!(matches!(err, NetworkError::Runtime(RuntimeError::AlreadyStarted)));
    assert_eq!(rt.entities().len(), 7 + 8);
}
