//! Grow light relays.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_1::digital::{Error as _, StatefulOutputPin};

use crate::device::Device;
use crate::error::{ActuatorError, Error};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GrowLight {
    Light1,
    Light2,
    Light3,
}

impl GrowLight {
    pub const fn index(self) -> usize {
        match self {
            GrowLight::Light1 => 0,
            GrowLight::Light2 => 1,
            GrowLight::Light3 => 2,
        }
    }

    /// GPIO number the relay of this light is wired to.
    pub const fn pin(self) -> u8 {
        match self {
            GrowLight::Light1 => 5,
            GrowLight::Light2 => 17,
            GrowLight::Light3 => 12,
        }
    }
}

pub struct Relay<P> {
    pin: P,
}

impl<P: StatefulOutputPin> Relay<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn is_on(&mut self) -> Result<bool, ActuatorError> {
        self.pin.is_set_high().map_err(|e| e.kind().into())
    }

    pub fn set(&mut self, on: bool) -> Result<(), ActuatorError> {
        let result = if on { self.pin.set_high() } else { self.pin.set_low() };
        result.map_err(|e| e.kind().into())
    }

    /// Reads the driven level and writes the opposite one.
    pub fn toggle(&mut self) -> Result<bool, ActuatorError> {
        let on = !self.is_on()?;
        self.set(on)?;

        Ok(on)
    }
}

/// Three relays, each behind its own lock so that a toggle's read-modify-write
/// is atomic per channel while channels stay independent.
pub struct ActuatorBank<M: RawMutex, P> {
    relays: [Mutex<M, Relay<P>>; 3],
    bound: bool,
}

impl<M: RawMutex, P: StatefulOutputPin> ActuatorBank<M, P> {
    /// Pins in [`GrowLight`] order.
    pub fn new(pins: [P; 3]) -> Self {
        Self {
            relays: pins.map(|pin| Mutex::new(Relay::new(pin))),
            bound: false,
        }
    }

    pub async fn toggle(&self, light: GrowLight) -> Result<bool, ActuatorError> {
        self.ensure_bound()?;
        let mut relay = self.relays[light.index()].lock().await;

        relay.toggle()
    }

    pub async fn set(&self, light: GrowLight, on: bool) -> Result<(), ActuatorError> {
        self.ensure_bound()?;
        let mut relay = self.relays[light.index()].lock().await;

        relay.set(on)
    }

    pub async fn is_on(&self, light: GrowLight) -> Result<bool, ActuatorError> {
        self.ensure_bound()?;
        let mut relay = self.relays[light.index()].lock().await;

        relay.is_on()
    }

    #[cfg(test)]
    pub(crate) fn pin_mut(&mut self, light: GrowLight) -> &mut P {
        &mut self.relays[light.index()].get_mut().pin
    }

    fn ensure_bound(&self) -> Result<(), ActuatorError> {
        if self.bound {
            Ok(())
        } else {
            Err(ActuatorError::NotInitialized)
        }
    }
}

impl<M: RawMutex, P: StatefulOutputPin, D> Device<D> for ActuatorBank<M, P> {
    type Info = ();

    /// Drives every relay low. One failing pin fails the whole bank.
    async fn init(&mut self, _delay: &mut D) -> Result<(), Error> {
        self.bound = false;

        for (index, relay) in self.relays.iter_mut().enumerate() {
            if let Err(e) = relay.get_mut().set(false) {
                error!("actuator: failed to drive relay {=usize} low", index);
                return Err(e.into());
            }
        }

        self.bound = true;
        info!("actuator: all relays off");

        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.bound
    }
}
