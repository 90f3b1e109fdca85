//! MMA865x reader - poll the accelerometer and print samples
//!
//! Runs against the simulated chip by default, or against real hardware on an
//! FT232H bridge when built with the `ftdi` feature.
//!
//! Usage:
//!   mma865x-reader --interval 50 --range 4g --duration 10 --suspend-every 3

use clap::Parser;
use ft232_mma865x_interface::{
    ChannelSink, ControlSurface, DriverConfig, Mma865x, PowerEvents, Range, RegisterTransport,
    Sample, SimulatedBus, StandbyMode,
};
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "mma865x-reader")]
#[command(about = "Poll an MMA8652/MMA8653 accelerometer and print samples", long_about = None)]
struct Args {
    /// Poll interval in milliseconds (clamped to 1-500)
    #[arg(short, long, default_value = "100")]
    interval: u32,

    /// Measurement range: 2g, 4g or 8g
    #[arg(short, long, default_value = "2g")]
    range: Range,

    /// Duration in seconds (optional, runs until Ctrl+C if omitted)
    #[arg(short, long)]
    duration: Option<u64>,

    /// Samples buffered between the poll thread and the console
    #[arg(long, default_value = "64")]
    buffer: usize,

    /// Run a suspend/resume cycle every N seconds
    #[arg(long)]
    suspend_every: Option<u64>,

    /// Treat suspend as a full power cut (range is restored on resume)
    #[arg(long)]
    super_standby: bool,

    /// FT232H I2C channel index; uses the simulated chip if omitted
    #[cfg(feature = "ftdi")]
    #[arg(long)]
    ftdi_channel: Option<u32>,
}

/// Simulated motion: a slow tilt about X with gravity on Z
fn simulated_bus(range: Range) -> SimulatedBus {
    let bus = SimulatedBus::new();
    let counts_per_g = range.counts_per_g();
    bus.set_generator(move |n| {
        let phase = n as f32 * 0.05;
        let y = (phase.sin() * 0.5 * counts_per_g) as i16;
        let z = (phase.cos() * counts_per_g) as i16;
        Sample::new(0, y, z)
    });
    bus
}

fn open_bus(args: &Args) -> Result<Box<dyn RegisterTransport>, Box<dyn std::error::Error>> {
    #[cfg(feature = "ftdi")]
    if let Some(channel) = args.ftdi_channel {
        println!("Opening FT232H channel {}...", channel);
        let transport = ft232_mma865x_interface::Ft232Transport::open(channel)?;
        return Ok(Box::new(transport));
    }

    println!("Using simulated MMA8652");
    Ok(Box::new(simulated_bus(args.range)))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    println!("MMA865x Reader");
    println!("==============");
    println!("Range: {}", args.range);
    println!("Poll interval: {} ms", args.interval);
    if let Some(duration) = args.duration {
        println!("Duration: {} seconds", duration);
    } else {
        println!("Duration: continuous (Ctrl+C to stop)");
    }
    if let Some(every) = args.suspend_every {
        println!("Suspend/resume every {} seconds", every);
    }
    println!();

    let standby = if args.super_standby {
        StandbyMode::Super
    } else {
        StandbyMode::Normal
    };
    let config = DriverConfig::default()
        .with_range(args.range)
        .with_poll_interval_ms(args.interval)
        .with_standby(standby);

    let (sink, samples) = ChannelSink::bounded(args.buffer.max(1));
    let sink = Arc::new(sink);

    let bus = open_bus(&args)?;
    let driver = Mma865x::probe(bus, config, sink.clone())?;
    driver.wait_idle();
    println!("{} ready", driver.variant());

    driver.set_enabled(true)?;
    info!("enabled, polling every {} ms", driver.poll_interval_ms());

    // Setup Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        println!("\nReceived Ctrl+C, stopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    let start = Instant::now();
    let end_time = args.duration.map(|d| start + Duration::from_secs(d));
    let suspend_period = args.suspend_every.map(Duration::from_secs);
    let mut next_suspend = suspend_period.map(|p| start + p);

    let mut printed = 0u64;
    let mut cycles = 0u32;

    while running.load(Ordering::SeqCst) {
        if end_time.is_some_and(|end| Instant::now() >= end) {
            break;
        }

        if let (Some(at), Some(period)) = (next_suspend, suspend_period) {
            if Instant::now() >= at {
                cycles += 1;
                println!("-- suspend #{} --", cycles);
                if let Err(e) = driver.on_suspend() {
                    eprintln!("Suspend failed: {}", e);
                }
                std::thread::sleep(Duration::from_millis(500));
                driver.on_resume();
                println!("-- resume queued --");
                next_suspend = Some(Instant::now() + period);
            }
        }

        match samples.recv_timeout(Duration::from_millis(100)) {
            Ok(sample) => {
                let (x, y, z) = sample.to_g(args.range);
                println!(
                    "{}  x: {:7.3}g  y: {:7.3}g  z: {:7.3}g",
                    chrono::Local::now().format("%H:%M:%S%.3f"),
                    x,
                    y,
                    z
                );
                printed += 1;
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    let reported = driver.shutdown()?;

    println!("\nCollection complete!");
    println!("Samples reported: {}", reported);
    println!("Samples printed: {}", printed);
    println!("Samples dropped: {}", sink.dropped());
    println!("Suspend cycles: {}", cycles);
    println!("Elapsed time: {:.2} seconds", elapsed);
    if elapsed > 0.0 {
        println!("Actual sample rate: {:.1} Hz", printed as f64 / elapsed);
    }

    Ok(())
}
