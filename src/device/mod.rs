use crate::error::Error;

/// Lifecycle shared by every bus device owned by the board.
///
/// `init` brings the device from power-on into a usable state and is safe to
/// call again after a failure, which is how the polling loop recovers devices.
pub trait Device<D>: Sized {
    type Info;

    async fn init(&mut self, delay: &mut D) -> Result<Self::Info, Error>;

    fn is_ready(&self) -> bool;
}
