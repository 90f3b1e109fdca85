//! Probe, enable/disable and teardown against the simulated chip

use std::sync::Arc;
use std::time::Duration;

use ft232_mma865x_interface::registers::{REG_CTRL_REG1, REG_XYZ_DATA_CFG};
use ft232_mma865x_interface::{
    ChannelSink, ControlSurface, DriverConfig, Mma865x, Mma865xError, NullSink, PowerState, Range,
    Sample, SimulatedBus,
};

fn fast_config() -> DriverConfig {
    DriverConfig::default()
        .with_settle_delay(Duration::from_millis(1))
        .with_poll_interval_ms(1)
        .with_parked_interval_ms(2)
}

#[test]
fn test_unknown_chip_is_not_bound() {
    let bus = SimulatedBus::with_id(0x2A);
    let result = Mma865x::probe(bus.clone(), fast_config(), Arc::new(NullSink));

    assert!(matches!(result, Err(Mma865xError::NotFound { id: Some(0x2A) })));
    assert!(bus.writes().is_empty());
}

#[test]
fn test_unreadable_chip_is_not_bound() {
    let bus = SimulatedBus::new();
    bus.set_unplugged(true);
    let result = Mma865x::probe(bus, fast_config(), Arc::new(NullSink));
    assert!(matches!(result, Err(Mma865xError::NotFound { id: None })));
}

#[test]
fn test_bring_up_configures_range_in_standby() {
    let bus = SimulatedBus::with_id(0x5A);
    let driver = Mma865x::probe(bus.clone(), fast_config().with_range(Range::G8), Arc::new(NullSink))
        .unwrap();
    driver.wait_idle();

    assert_eq!(
        bus.writes(),
        vec![(REG_CTRL_REG1, 0x00), (REG_XYZ_DATA_CFG, 0x02)]
    );
    assert_eq!(driver.power_state(), PowerState::Standby);
    assert!(!driver.enabled().unwrap());
}

#[test]
fn test_samples_flow_only_while_enabled() {
    let bus = SimulatedBus::new();
    bus.push_samples([Sample::new(1, 2, 3), Sample::new(4, 5, 6)]);

    let (sink, rx) = ChannelSink::bounded(16);
    let driver = Mma865x::probe(bus.clone(), fast_config(), Arc::new(sink)).unwrap();
    driver.wait_idle();

    // Standby: nothing is latched and nothing is reported
    assert!(rx.recv_timeout(Duration::from_millis(30)).is_err());

    driver.set_enabled(true).unwrap();
    assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), Sample::new(1, 2, 3));
    assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), Sample::new(4, 5, 6));

    driver.set_enabled(false).unwrap();
    bus.push_samples([Sample::new(7, 8, 9)]);
    assert!(rx.recv_timeout(Duration::from_millis(30)).is_err());
}

#[test]
fn test_failed_enable_reads_back_false() {
    let bus = SimulatedBus::new();
    let driver = Mma865x::probe(bus.clone(), fast_config(), Arc::new(NullSink)).unwrap();
    driver.wait_idle();

    bus.fail_writes_to(Some(REG_CTRL_REG1));
    assert!(driver.set_enabled(true).is_err());
    assert!(!driver.enabled().unwrap());
    assert_eq!(driver.power_state(), PowerState::Standby);

    bus.fail_writes_to(None);
    driver.set_enabled(true).unwrap();
    assert!(driver.enabled().unwrap());
}

#[test]
fn test_enable_is_idempotent() {
    let bus = SimulatedBus::new();
    let driver = Mma865x::probe(bus.clone(), fast_config(), Arc::new(NullSink)).unwrap();
    driver.wait_idle();

    driver.set_enabled(true).unwrap();
    let writes = bus.writes().len();
    driver.set_enabled(true).unwrap();
    assert_eq!(bus.writes().len(), writes);

    driver.set_enabled(false).unwrap();
    let writes = bus.writes().len();
    driver.set_enabled(false).unwrap();
    assert_eq!(bus.writes().len(), writes);
}

#[test]
fn test_poll_errors_do_not_stop_scheduler() {
    let bus = SimulatedBus::new();
    bus.push_samples([Sample::new(1, 1, 1), Sample::new(2, 2, 2)]);
    let (sink, rx) = ChannelSink::bounded(16);
    let driver = Mma865x::probe(bus.clone(), fast_config(), Arc::new(sink)).unwrap();
    driver.wait_idle();

    bus.short_block_reads(Some(5));
    driver.set_enabled(true).unwrap();
    std::thread::sleep(Duration::from_millis(30));
    assert!(rx.try_recv().is_err());

    bus.short_block_reads(None);
    bus.push_samples([Sample::new(3, 3, 3)]);
    assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
}

#[test]
fn test_drop_powers_device_down() {
    let bus = SimulatedBus::new();
    {
        let driver = Mma865x::probe(bus.clone(), fast_config(), Arc::new(NullSink)).unwrap();
        driver.wait_idle();
        driver.set_enabled(true).unwrap();
        assert!(bus.power_bit());
    }
    assert!(!bus.power_bit());
}
