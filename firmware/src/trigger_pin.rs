//! GPIO trigger line through the Linux character device

use crate::error::FirmwareResult;
use linux_embedded_hal::CdevPin;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use spxprobe_signer_lib::PinTrigger;

pub const DEFAULT_GPIO_CHIP_PATH: &str = "/dev/gpiochip0";

const TRIGGER_CONSUMER: &str = "spxprobe-trigger";

/// Request `line` on `chip_path` as an output, initially low
pub fn open_trigger(chip_path: &str, line: u32) -> FirmwareResult<PinTrigger<CdevPin>> {
    let mut chip = Chip::new(chip_path)?;
    let pin = CdevPin::new(
        chip.get_line(line)?
            .request(LineRequestFlags::OUTPUT, 0, TRIGGER_CONSUMER)?,
    )?;
    log::info!("Trigger on {chip_path} line {line}");
    Ok(PinTrigger::new(pin))
}
