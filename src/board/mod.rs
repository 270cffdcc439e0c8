//! Owns every device of the controller, runs the polling loop and publishes
//! the telemetry snapshot.

use core::cell::Cell;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embedded_hal_1::digital::StatefulOutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use embedded_hal_async::spi::SpiDevice;
use heapless::Vec;

use crate::actuator::{ActuatorBank, GrowLight};
use crate::air_sensor::{compensation, AirSensor, EnvironmentReading};
use crate::analog::Mcp3008;
use crate::config::{Config, MonitorConfig};
use crate::device::Device;
use crate::error::{ActuatorError, BusError, Error};
use crate::sensor::{PushedReading, Sensor};
use crate::telemetry::{dew_point, heat_index, Field, PlantTelemetrySnapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Subsystem {
    Analog,
    AirSensor,
    Actuators,
}

/// Subsystems that failed to come up, in initialization order.
#[derive(Debug, Default, PartialEq)]
pub struct InitReport {
    failures: Vec<(Subsystem, Error), 3>,
}

impl InitReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[(Subsystem, Error)] {
        &self.failures
    }

    pub fn failure(&self, subsystem: Subsystem) -> Option<Error> {
        self.failures.iter().find(|(s, _)| *s == subsystem).map(|(_, e)| *e)
    }

    fn push(&mut self, subsystem: Subsystem, error: Error) {
        error!("board: {} failed to initialize, {}", subsystem, error);
        // one slot per subsystem
        let _ = self.failures.push((subsystem, error));
    }
}

/// Re-initialization schedule, counted in polling cycles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Backoff {
    interval: u32,
    skip: u32,
}

impl Backoff {
    const fn new() -> Self {
        Self { interval: 1, skip: 0 }
    }

    /// Uses up one waiting cycle, `true` once an attempt is due.
    fn due(&mut self) -> bool {
        if self.skip == 0 {
            true
        } else {
            self.skip -= 1;
            false
        }
    }

    fn failed(&mut self, max_cycles: u32) {
        self.skip = self.interval;
        self.interval = self.interval.saturating_mul(2).min(max_cycles.max(1));
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

struct Supervised<T> {
    device: T,
    backoff: Backoff,
}

impl<T> Supervised<T> {
    fn new(device: T) -> Self {
        Self {
            device,
            backoff: Backoff::new(),
        }
    }

    async fn start<D>(&mut self, delay: &mut D, max_backoff: u32) -> Result<(), Error>
    where
        T: Device<D>,
    {
        match self.device.init(delay).await {
            Ok(_) => {
                self.backoff.reset();
                Ok(())
            }
            Err(e) => {
                self.backoff.failed(max_backoff);
                Err(e)
            }
        }
    }

    /// Brings a device that dropped out back once its backoff ran out.
    async fn ensure_ready<D>(&mut self, subsystem: Subsystem, delay: &mut D, max_backoff: u32) -> bool
    where
        T: Device<D>,
    {
        if <T as Device<D>>::is_ready(&self.device) {
            return true;
        }

        if !self.backoff.due() {
            return false;
        }

        match self.start(delay, max_backoff).await {
            Ok(()) => {
                info!("board: {} recovered", subsystem);
                true
            }
            Err(e) => {
                warn!("board: {} still down, {}, next attempt in {=u32} cycles", subsystem, e, self.backoff.skip);
                false
            }
        }
    }
}

pub struct Board<M: RawMutex, SPI, I2C, P> {
    analog: Mutex<M, Supervised<Mcp3008<SPI>>>,
    air_sensor: Mutex<M, Supervised<AirSensor<I2C>>>,
    lights: ActuatorBank<M, P>,
    humidity: PushedReading<M, f32>,
    snapshot: BlockingMutex<M, Cell<Option<PlantTelemetrySnapshot>>>,
    stop: Signal<M, ()>,
    config: MonitorConfig,
}

pub struct BoardBuilder<SPI, I2C, P> {
    analog: Option<SPI>,
    air_sensor: Option<I2C>,
    lights: Option<[P; 3]>,
    config: MonitorConfig,
}

impl<M, SPI, I2C, P> Board<M, SPI, I2C, P>
where
    M: RawMutex,
    SPI: SpiDevice,
    I2C: I2c,
    P: StatefulOutputPin,
{
    /// Brings up the analog front end, the air sensor and the relays in that
    /// order. A failing subsystem is reported and left for the polling loop to
    /// recover, the others still start.
    pub async fn init<D: DelayNs>(&mut self, delay: &mut D) -> InitReport {
        let max_backoff = self.config.max_backoff_cycles;
        let mut report = InitReport::default();

        info!("board: initializing");

        match self.analog.get_mut().start(delay, max_backoff).await {
            Ok(()) => info!("board: analog front end ready"),
            Err(e) => report.push(Subsystem::Analog, e),
        }

        match self.air_sensor.get_mut().start(delay, max_backoff).await {
            Ok(()) => info!("board: air sensor ready"),
            Err(e) => report.push(Subsystem::AirSensor, e),
        }

        match self.lights.init(delay).await {
            Ok(()) => info!("board: grow lights ready"),
            Err(e) => report.push(Subsystem::Actuators, e),
        }

        // nothing is published until the first cycle completes
        self.snapshot.get_mut().set(None);

        report
    }

    /// Latest complete snapshot, `None` until the first polling cycle finished.
    pub fn snapshot(&self) -> Option<PlantTelemetrySnapshot> {
        self.snapshot.lock(|snapshot| snapshot.get())
    }

    /// Push side of the humidity fallback used when the air sensor has no value.
    pub fn humidity_feed(&self) -> &PushedReading<M, f32> {
        &self.humidity
    }

    pub async fn toggle_actuator(&self, light: GrowLight) -> Result<(), ActuatorError> {
        match self.lights.toggle(light).await {
            Ok(on) => {
                info!("board: {} switched, on={=bool}", light, on);
                Ok(())
            }
            Err(e) => {
                error!("board: failed to toggle {}, {}", light, e);
                Err(e)
            }
        }
    }

    pub async fn set_actuator(&self, light: GrowLight, on: bool) -> Result<(), ActuatorError> {
        self.lights
            .set(light, on)
            .await
            .inspect(|_| info!("board: {} set, on={=bool}", light, on))
            .inspect_err(|e| error!("board: failed to set {}, {}", light, e))
    }

    pub async fn actuator_states(&self) -> Result<[bool; 3], ActuatorError> {
        let mut states = [false; 3];
        for light in Config::GROW_LIGHTS {
            states[light.index()] = self.lights.is_on(light).await?;
        }

        Ok(states)
    }

    /// Ends [`run`](Self::run) at its next iteration boundary.
    pub fn stop(&self) {
        self.stop.signal(());
    }

    pub async fn run<D: DelayNs>(&self, delay: &mut D) {
        let period_ms = u32::try_from(self.config.poll_period.as_millis()).unwrap_or(u32::MAX);

        info!("board: polling every {=u32} ms", period_ms);

        loop {
            if self.stop.try_take().is_some() {
                break;
            }

            self.poll_once(delay).await;

            if let Either::First(()) = select(self.stop.wait(), delay.delay_ms(period_ms)).await {
                break;
            }
        }

        info!("board: polling stopped");
    }

    /// One polling cycle. Reads every sensor, derives the dependent values and
    /// replaces the published snapshot in a single step.
    pub async fn poll_once<D: DelayNs>(&self, delay: &mut D) -> PlantTelemetrySnapshot {
        let mut next = self.snapshot().unwrap_or(PlantTelemetrySnapshot::empty());
        next.cycle = next.cycle.wrapping_add(1);

        self.sample_soil(delay, &mut next).await;
        self.sample_climate(delay, &mut next).await;

        for light in Config::GROW_LIGHTS {
            let field = &mut next.lights[light.index()];
            *field = field.refresh(self.lights.is_on(light).await.ok());
        }

        self.snapshot.lock(|snapshot| snapshot.set(Some(next)));
        debug!("board: published cycle {=u32}", next.cycle);

        next
    }

    async fn sample_soil<D: DelayNs>(&self, delay: &mut D, next: &mut PlantTelemetrySnapshot) {
        let mut analog = self.analog.lock().await;

        if !analog.ensure_ready(Subsystem::Analog, delay, self.config.max_backoff_cycles).await {
            next.moisture = next.moisture.map(Field::stale);
            next.light = next.light.stale();
            return;
        }

        for (field, channel) in next.moisture.iter_mut().zip(Config::MOISTURE_CHANNELS) {
            *field = field.refresh(sample_channel(&mut analog.device, channel).await);
        }

        next.light = next.light.refresh(sample_channel(&mut analog.device, Config::LIGHT_CHANNEL).await);
    }

    async fn sample_climate<D: DelayNs>(&self, delay: &mut D, next: &mut PlantTelemetrySnapshot) {
        let reading = self.measure_air(delay).await;

        // drained every cycle so one published value is used at most once
        let mut feed = &self.humidity;
        let pushed = feed.sample().await.ok();

        let temperature = reading.map(|r| r.temperature_c);
        let humidity = reading.map(|r| r.humidity_pct).or(pushed);
        let pressure = reading.and_then(|r| r.pressure_pa);
        let altitude = pressure.map(|pa| compensation::altitude(pa / 100.0, self.config.sea_level_hpa));
        let climate = temperature.zip(humidity);

        next.temperature_c = next.temperature_c.refresh(temperature);
        next.humidity_pct = next.humidity_pct.refresh(humidity);
        next.pressure_pa = next.pressure_pa.refresh(pressure);
        next.altitude_m = next.altitude_m.refresh(altitude);
        next.dew_point_c = next.dew_point_c.refresh(climate.and_then(|(t, rh)| dew_point(t, rh)));
        next.heat_index_c = next.heat_index_c.refresh(climate.map(|(t, rh)| heat_index(t, rh)));
    }

    async fn measure_air<D: DelayNs>(&self, delay: &mut D) -> Option<EnvironmentReading> {
        let mut air_sensor = self.air_sensor.lock().await;

        if !air_sensor.ensure_ready(Subsystem::AirSensor, delay, self.config.max_backoff_cycles).await {
            return None;
        }

        let result = air_sensor.device.sample().await;
        match result {
            Ok(reading) => Some(reading),
            Err(e) => {
                warn!("board: air sensor read failed, {}", e);
                if e == Error::Bus(BusError::DeviceAbsent) {
                    air_sensor.device.invalidate();
                }
                None
            }
        }
    }
}

async fn sample_channel<SPI: SpiDevice>(adc: &mut Mcp3008<SPI>, channel: u8) -> Option<u16> {
    let result = adc.channel(channel).sample().await;
    match result {
        Ok(raw) => Some(raw),
        Err(e) => {
            warn!("board: analog channel {=u8} read failed, {}", channel, e);
            if e == Error::Bus(BusError::DeviceAbsent) {
                adc.invalidate();
            }
            None
        }
    }
}

impl<SPI, I2C, P> BoardBuilder<SPI, I2C, P> {
    pub fn new() -> BoardBuilder<SPI, I2C, P> {
        BoardBuilder {
            analog: None,
            air_sensor: None,
            lights: None,
            config: MonitorConfig::default(),
        }
    }

    pub fn with_analog(mut self, spi: SPI) -> BoardBuilder<SPI, I2C, P> {
        self.analog = Some(spi);
        self
    }

    pub fn with_air_sensor(mut self, i2c: I2C) -> BoardBuilder<SPI, I2C, P> {
        self.air_sensor = Some(i2c);
        self
    }

    /// Relay pins in [`GrowLight`] order.
    pub fn with_lights(mut self, pins: [P; 3]) -> BoardBuilder<SPI, I2C, P> {
        self.lights = Some(pins);
        self
    }

    pub fn with_config(mut self, config: MonitorConfig) -> BoardBuilder<SPI, I2C, P> {
        self.config = config;
        self
    }

    pub fn build<M: RawMutex>(self) -> Result<Board<M, SPI, I2C, P>, Error>
    where
        SPI: SpiDevice,
        I2C: I2c,
        P: StatefulOutputPin,
    {
        if let (Some(spi), Some(i2c), Some(pins)) = (self.analog, self.air_sensor, self.lights) {
            let air_sensor = AirSensor::new(Config::I2C_ADDR_AIR_SENSOR, i2c, self.config.air);

            Ok(Board {
                analog: Mutex::new(Supervised::new(Mcp3008::new(spi))),
                air_sensor: Mutex::new(Supervised::new(air_sensor)),
                lights: ActuatorBank::new(pins),
                humidity: PushedReading::new(),
                snapshot: BlockingMutex::new(Cell::new(None)),
                stop: Signal::new(),
                config: self.config,
            })
        } else {
            Err(Error::MissingDevice)
        }
    }
}
