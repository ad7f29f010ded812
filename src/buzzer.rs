use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    channel::{Channel, Receiver, Sender},
};
use embassy_time::{Duration, Timer};
use esp_hal::gpio::Output;

use crate::constants::BUZZER_QUEUE_DEPTH;

pub type BuzzerQueue = Channel<CriticalSectionRawMutex, Pulse, BUZZER_QUEUE_DEPTH>;
pub type BuzzerSender = Sender<'static, CriticalSectionRawMutex, Pulse, BUZZER_QUEUE_DEPTH>;
pub type BuzzerReceiver = Receiver<'static, CriticalSectionRawMutex, Pulse, BUZZER_QUEUE_DEPTH>;

/// A single buzz of the door release.
#[derive(Clone, Copy, Debug)]
pub struct Pulse {
    pub duration_ms: u64,
}

/// Drives the buzzer pin from queued pulses. Runs independently of the MQTT
/// session so an in-progress buzz survives a broker reconnect.
#[embassy_executor::task]
pub async fn buzzer_task(mut pin: Output<'static>, commands: BuzzerReceiver) {
    loop {
        let pulse = commands.receive().await;
        log::info!("Buzzer on for {} ms", pulse.duration_ms);
        pin.set_high();
        Timer::after(Duration::from_millis(pulse.duration_ms)).await;
        pin.set_low();
        log::info!("Buzzer off");
    }
}
