use dcsim::prelude::*;
use dcsim::scaling::*;
use serial_test::serial;

fn gradual() -> GradualScaling {
    GradualScaling::new(0.5, Thresholds::new(0.2, 0.8))
}

fn record(time: f64, utilization: f64, from: u64, to: u64) -> ScalingRecord {
    ScalingRecord {
        time: SimTime::from(time),
        utilization,
        from,
        to,
    }
}

#[test]
#[serial]
fn gradual_scaling_within_bounds() {
    let monitor = VerticalScalingMonitor::new("vm-1-ram", 1000, gradual())
        .unwrap()
        .with_thresholds(Thresholds::new(0.2, 0.8))
        .with_model(UtilizationModel::Trace(vec![0.9, 0.9, 0.5, 0.1]))
        .with_interval(Duration::from_secs(10))
        .with_bounds(500, 2000)
        .with_max_checks(4);

    let mut rt = Builder::seeded(1).quiet().build();
    let id = rt.add_entity(monitor).unwrap();
    rt.start();
    assert_eq!(rt.entity(id).unwrap().state(), EntityState::Holding);
    rt.dispatch_all();

    let result = rt.finish();
    assert!(result.is_finished());
    assert_eq!(result.time(), SimTime::from(40.0));

    let monitor = result
        .entities()
        .by_name::<VerticalScalingMonitor>("vm-1-ram")
        .unwrap();
    assert_eq!(monitor.num_checks(), 4);
    assert_eq!(monitor.capacity(), 1000);
    assert!(!monitor.is_active());
    assert_eq!(
        monitor.history(),
        &[
            record(10.0, 0.9, 1000, 1500),
            record(20.0, 0.9, 1500, 2000),
            record(40.0, 0.1, 2000, 1000),
        ]
    );
}

#[test]
#[serial]
fn instantaneous_scaling_hits_the_threshold() {
    let thresholds = Thresholds::new(0.25, 0.5);
    let monitor = VerticalScalingMonitor::new("vm-2-cpu", 1000, InstantaneousScaling::new(thresholds))
        .unwrap()
        .with_thresholds(thresholds)
        .with_model(UtilizationModel::Constant(0.9))
        .with_max_checks(1);

    let mut rt = Builder::seeded(1).quiet().build();
    rt.add_entity(monitor).unwrap();
    let result = rt.run();

    let monitor = result
        .entities()
        .by_name::<VerticalScalingMonitor>("vm-2-cpu")
        .unwrap();
    assert_eq!(monitor.history(), &[record(1.0, 0.9, 1000, 1800)]);
}

#[test]
#[serial]
fn stop_cancels_the_pending_check() {
    let monitor = VerticalScalingMonitor::new("vm-3-ram", 1000, NullScaling).unwrap();

    let mut rt = Builder::seeded(1).quiet().build();
    let id = rt.add_entity(monitor).unwrap();
    rt.schedule(Event::new(
        SimTime::from(3.5),
        EntityId::NULL,
        id,
        EventTag::ScalingStop,
        (),
    ))
    .unwrap();

    let result = rt.run();
    assert!(result.is_finished());
    assert_eq!(result.time(), SimTime::from(3.5));

    let monitor = result
        .entities()
        .by_name::<VerticalScalingMonitor>("vm-3-ram")
        .unwrap();
    assert_eq!(monitor.num_checks(), 3);
    assert!(monitor.history().is_empty());
}

#[test]
#[serial]
fn closures_as_policies() {
    let monitor = VerticalScalingMonitor::new("vm-4-bw", 100, |_: f64, _: u64| 10_i64)
        .unwrap()
        .with_model(UtilizationModel::Constant(1.0))
        .with_max_checks(5);

    let mut rt = Builder::seeded(1).quiet().build();
    rt.add_entity(monitor).unwrap();
    let result = rt.run();

    let monitor = result
        .entities()
        .by_name::<VerticalScalingMonitor>("vm-4-bw")
        .unwrap();
    assert_eq!(monitor.capacity(), 150);
    assert_eq!(monitor.history().len(), 5);
}

fn uniform_run(seed: u64) -> Vec<ScalingRecord> {
    let monitor = VerticalScalingMonitor::new("vm-5-ram", 4096, gradual())
        .unwrap()
        .with_thresholds(Thresholds::new(0.2, 0.8))
        .with_model(UtilizationModel::Uniform { min: 0.0, max: 1.0 })
        .with_max_checks(50);

    let mut rt = Builder::seeded(seed).quiet().build();
    rt.add_entity(monitor).unwrap();
    let result = rt.run();
    let monitor = result
        .entities()
        .by_name::<VerticalScalingMonitor>("vm-5-ram")
        .unwrap();
    monitor.history().to_vec()
}

#[test]
#[serial]
fn random_utilization_is_reproducible() {
    let a = uniform_run(9);
    assert!(!a.is_empty());
    assert_eq!(a, uniform_run(9));
}
