//! I2C adapter against a mocked embedded-hal bus

use std::sync::Arc;
use std::time::Duration;

use embedded_hal::i2c::ErrorKind;
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
use ft232_mma865x_interface::registers::{
    encode_sample, REG_CTRL_REG1, REG_OUT_X_MSB, REG_STATUS, REG_WHO_AM_I, REG_XYZ_DATA_CFG,
    SAMPLE_BLOCK_LEN, STATUS_ZYXDR,
};
use ft232_mma865x_interface::{
    detect, BusError, ChipVariant, DeviceProtocol, DriverConfig, I2cTransport, Mma865x, NullSink,
    Range, RegisterTransport, Sample,
};

const ADDR: u8 = 0x1D;

#[test]
fn test_detect_over_i2c() {
    let expectations = [I2cTransaction::write_read(ADDR, vec![REG_WHO_AM_I], vec![0x4A])];
    let mut transport = I2cTransport::new(I2cMock::new(&expectations));

    assert_eq!(detect(&mut transport).unwrap(), ChipVariant::Mma8652);
    transport.release().done();
}

#[test]
fn test_configure_and_power_on() {
    let expectations = [
        I2cTransaction::write(ADDR, vec![REG_CTRL_REG1, 0x00]),
        I2cTransaction::write(ADDR, vec![REG_XYZ_DATA_CFG, 0x01]),
        I2cTransaction::write_read(ADDR, vec![REG_CTRL_REG1], vec![0x00]),
        I2cTransaction::write(ADDR, vec![REG_CTRL_REG1, 0x01]),
    ];
    let mut protocol = DeviceProtocol::new(I2cTransport::new(I2cMock::new(&expectations)));

    protocol.configure(Range::G4).unwrap();
    protocol.set_power(true).unwrap();
    protocol.release().release().done();
}

#[test]
fn test_sample_read_uses_single_block_transfer() {
    let block = encode_sample(Sample::new(-1, 512, -2048)).to_vec();
    let expectations = [
        I2cTransaction::write_read(ADDR, vec![REG_STATUS], vec![STATUS_ZYXDR]),
        I2cTransaction::write_read(ADDR, vec![REG_OUT_X_MSB], block),
    ];
    let mut protocol = DeviceProtocol::new(I2cTransport::new(I2cMock::new(&expectations)));

    assert!(protocol.read_status().unwrap());
    assert_eq!(protocol.read_sample().unwrap(), Sample::new(-1, 512, -2048));
    protocol.release().release().done();
}

#[test]
fn test_bus_error_kind_is_preserved() {
    let expectations = [I2cTransaction::write_read(ADDR, vec![REG_CTRL_REG1], vec![0x00])
        .with_error(ErrorKind::Other)];
    let mut transport = I2cTransport::new(I2cMock::new(&expectations));

    assert_eq!(
        transport.read_byte(REG_CTRL_REG1),
        Err(BusError::I2c(ErrorKind::Other))
    );
    transport.release().done();
}

#[test]
fn test_custom_address() {
    let expectations = [I2cTransaction::write_read(0x1C, vec![REG_OUT_X_MSB], vec![0; SAMPLE_BLOCK_LEN])];
    let mut transport = I2cTransport::with_address(I2cMock::new(&expectations), 0x1C);
    assert_eq!(transport.address(), 0x1C);

    assert_eq!(
        transport.read_block(REG_OUT_X_MSB, SAMPLE_BLOCK_LEN).unwrap(),
        vec![0; SAMPLE_BLOCK_LEN]
    );
    transport.release().done();
}

#[test]
fn test_driver_takes_address_from_transport() {
    let expectations = [
        I2cTransaction::write_read(0x1C, vec![REG_WHO_AM_I], vec![0x4A]),
        I2cTransaction::write(0x1C, vec![REG_CTRL_REG1, 0x00]),
        I2cTransaction::write(0x1C, vec![REG_XYZ_DATA_CFG, 0x00]),
        // Teardown powers the chip off
        I2cTransaction::write_read(0x1C, vec![REG_CTRL_REG1], vec![0x00]),
        I2cTransaction::write(0x1C, vec![REG_CTRL_REG1, 0x00]),
    ];
    let mut mock = I2cMock::new(&expectations);
    let config = DriverConfig::default().with_settle_delay(Duration::from_millis(1));

    let driver = Mma865x::probe(
        I2cTransport::with_address(mock.clone(), 0x1C),
        config,
        Arc::new(NullSink),
    )
    .unwrap();
    driver.wait_idle();
    assert_eq!(driver.device().address(), 0x1C);

    driver.shutdown().unwrap();
    mock.done();
}
