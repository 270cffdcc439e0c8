#![no_std]
#![no_main]

use assign_resources::assign_resources;
use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::{self, I2C0, SPI0};
use embassy_rp::spi::{self, Spi};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Delay, Duration, Ticker};
use embedded_hal_bus::spi::ExclusiveDevice;
use plant_telemetry::config::{Config, MonitorConfig};
use plant_telemetry::{Board, BoardBuilder};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

bind_interrupts!(struct Irqs {
    I2C0_IRQ => i2c::InterruptHandler<I2C0>;
});

assign_resources! {
    analog: AnalogRes {
        spi0: SPI0,
        clk: PIN_2,
        mosi: PIN_3,
        miso: PIN_4,
        cs: PIN_1,
        dma_ch0: DMA_CH0,
        dma_ch1: DMA_CH1,
    },
    air: AirSensorRes {
        i2c0: I2C0,
        sda: PIN_8,
        scl: PIN_9,
    },
    // same GPIOs as `GrowLight::pin`, in `GrowLight` order
    lights: LightRes {
        light1: PIN_5,
        light2: PIN_17,
        light3: PIN_12,
    },
}

type AnalogSpi = ExclusiveDevice<Spi<'static, SPI0, spi::Async>, Output<'static>, Delay>;
type AirSensorI2c = I2c<'static, I2C0, i2c::Async>;
type PlantBoard = Board<CriticalSectionRawMutex, AnalogSpi, AirSensorI2c, Output<'static>>;

const REPORT_PERIOD_SECS: u64 = 5;

static BOARD: StaticCell<PlantBoard> = StaticCell::new();

#[embassy_executor::main]
async fn main(s: Spawner) {
    let p = embassy_rp::init(Default::default());
    let r = split_resources! {p};

    let mut board: PlantBoard = BoardBuilder::new()
        .with_analog(analog_spi(r.analog))
        .with_air_sensor(air_sensor_i2c(r.air))
        .with_lights(grow_light_pins(r.lights))
        .with_config(MonitorConfig::default())
        .build()
        .expect("all devices should be wired");

    let report = board.init(&mut Delay).await;
    if !report.is_ok() {
        warn!("starting with {=usize} subsystem(s) down", report.failures().len());
    }

    let board: &'static PlantBoard = BOARD.init(board);

    s.spawn(poller(board)).expect("executor should be initialized");
    s.spawn(reporter(board)).expect("executor should be initialized");
}

#[embassy_executor::task]
async fn poller(board: &'static PlantBoard) {
    board.run(&mut Delay).await;
}

#[embassy_executor::task]
async fn reporter(board: &'static PlantBoard) {
    let mut ticker = Ticker::every(Duration::from_secs(REPORT_PERIOD_SECS));
    loop {
        ticker.next().await;

        match board.snapshot() {
            Some(snapshot) => info!("telemetry: {}", snapshot),
            None => info!("telemetry: waiting for the first cycle"),
        }
    }
}

fn analog_spi(r: AnalogRes) -> AnalogSpi {
    let mut config = spi::Config::default();
    config.frequency = Config::SPI_FREQUENCY;

    let cs = Output::new(r.cs, Level::High);
    let spi = Spi::new(r.spi0, r.clk, r.mosi, r.miso, r.dma_ch0, r.dma_ch1, config);

    ExclusiveDevice::new(spi, cs, Delay)
}

fn air_sensor_i2c(r: AirSensorRes) -> AirSensorI2c {
    let mut config = i2c::Config::default();
    config.frequency = Config::I2C_FREQUENCY;

    I2c::new_async(r.i2c0, r.scl, r.sda, Irqs, config)
}

/// Relays start released, the board drives them low again during init.
fn grow_light_pins(r: LightRes) -> [Output<'static>; 3] {
    [
        Output::new(r.light1, Level::Low),
        Output::new(r.light2, Level::Low),
        Output::new(r.light3, Level::Low),
    ]
}
