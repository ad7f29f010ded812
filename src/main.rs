#![no_std]
#![no_main]

use static_cell::StaticCell;

use embassy_executor::Spawner;
use embassy_net::Stack;
use embassy_sync::{blocking_mutex::raw::NoopRawMutex, mutex::Mutex};
use embassy_time::{Duration, Timer};

use esp_alloc as _;
use esp_backtrace as _;
use esp_hal::{self as hal};
use esp_println::logger::init_logger;

use hal::{
    gpio::{Level, Output, OutputConfig},
    rng::Trng,
    timer::timg::TimerGroup,
};

extern crate alloc;

mod buzzer;
mod command;
pub mod config;
pub mod constants;
mod mqtt;
pub mod pem;
mod session;
pub mod transport;
mod wifi;

use buzzer::BuzzerQueue;
use config::CONFIG;
use constants::*;
use session::Session;
use wifi::Wifi;

esp_bootloader_esp_idf::esp_app_desc!();

static STACK: StaticCell<Mutex<NoopRawMutex, Stack<'static>>> = StaticCell::new();
static TRNG: StaticCell<Mutex<NoopRawMutex, Trng<'static>>> = StaticCell::new();

static RX_BUF: StaticCell<Mutex<NoopRawMutex, [u8; RX_BUFFER_SIZE]>> = StaticCell::new();
static TX_BUF: StaticCell<Mutex<NoopRawMutex, [u8; TX_BUFFER_SIZE]>> = StaticCell::new();
static TLS_READ_BUF: StaticCell<Mutex<NoopRawMutex, [u8; TLS_READ_BUFFER_SIZE]>> =
    StaticCell::new();
static TLS_WRITE_BUF: StaticCell<Mutex<NoopRawMutex, [u8; TLS_WRITE_BUFFER_SIZE]>> =
    StaticCell::new();

static BUZZER_QUEUE: BuzzerQueue = BuzzerQueue::new();

#[esp_hal_embassy::main]
async fn main(spawner: Spawner) {
    init_logger(log::LevelFilter::Info);

    log::info!("Entry buzzer firmware v{} ({})", VERSION, CONFIG.device_id);

    // Fail fast on a device still carrying placeholder credentials
    if let Err(e) = CONFIG.validate() {
        panic!("Invalid device configuration: {:?}", e);
    }

    let peripherals = esp_hal::init(esp_hal::Config::default());

    esp_alloc::heap_allocator!(size: HEAP_SIZE);

    let trng = Trng::new(peripherals.RNG, peripherals.ADC1);
    let rng = trng.rng;

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let timg1 = TimerGroup::new(peripherals.TIMG1);

    esp_hal_embassy::init(timg0.timer0);

    // possibly high transient required at init
    // https://github.com/esp-rs/esp-hal/issues/1626
    Timer::after(Duration::from_millis(1000)).await;

    let buzzer_pin = Output::new(peripherals.GPIO26, Level::Low, OutputConfig::default());
    spawner
        .spawn(buzzer::buzzer_task(buzzer_pin, BUZZER_QUEUE.receiver()))
        .ok();

    let wifi = Wifi::new(
        peripherals.WIFI,
        timg1.timer0,
        peripherals.RADIO_CLK,
        rng,
        spawner,
    )
    .await
    .unwrap();

    wifi.connect().await.unwrap();

    let stack_shared = STACK.init(Mutex::new(wifi.stack));
    let trng_shared = TRNG.init(Mutex::new(trng));

    let rx_buf = RX_BUF.init(Mutex::new([0; RX_BUFFER_SIZE]));
    let tx_buf = TX_BUF.init(Mutex::new([0; TX_BUFFER_SIZE]));
    let tls_read_buf = TLS_READ_BUF.init(Mutex::new([0; TLS_READ_BUFFER_SIZE]));
    let tls_write_buf = TLS_WRITE_BUF.init(Mutex::new([0; TLS_WRITE_BUFFER_SIZE]));

    let session = Session::new(
        stack_shared,
        trng_shared,
        rx_buf,
        tx_buf,
        tls_read_buf,
        tls_write_buf,
        BUZZER_QUEUE.sender(),
    );

    spawner.spawn(session_task(session)).ok();
}

#[embassy_executor::task]
async fn session_task(mut session: Session) {
    loop {
        if let Err(e) = session.run().await {
            log::error!("MQTT session ended: {:?}", e);
        }
        Timer::after(Duration::from_secs(SESSION_RETRY_DELAY_SECS)).await;
    }
}
