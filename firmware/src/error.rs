use linux_embedded_hal::CdevPinError;
use linux_embedded_hal::gpio_cdev::Error as GpioError;
use spxprobe_signer_lib::{SerialError, ServerError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Serial error: {0}")]
    Serial(#[from] SerialError),
    #[error("Server error: {0}")]
    Server(#[from] ServerError),
    #[error("GPIO error: {0}")]
    Gpio(#[from] GpioError),
    #[error("Cdev pin error: {0}")]
    CdevPin(#[from] CdevPinError),
}

pub type FirmwareResult<T> = Result<T, Error>;
