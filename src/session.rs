use embassy_net::Stack;
use embassy_sync::{blocking_mutex::raw::NoopRawMutex, mutex::Mutex};
use embassy_time::{with_timeout, Duration};
use esp_hal::rng::Trng;
use static_cell::StaticCell;

use crate::buzzer::{BuzzerSender, Pulse};
use crate::command::{Report, StatusReport, UnlockCommand};
use crate::config::CONFIG;
use crate::constants::*;
use crate::mqtt::Mqtt;
use crate::transport::Transport;

static MQTT_RX_BUF: StaticCell<Mutex<NoopRawMutex, [u8; MQTT_RX_BUFFER_SIZE]>> = StaticCell::new();
static MQTT_TX_BUF: StaticCell<Mutex<NoopRawMutex, [u8; MQTT_TX_BUFFER_SIZE]>> = StaticCell::new();

#[derive(Debug)]
pub enum Error {
    Transport,
    Mqtt,
    Format,
}

/// One broker session: connect, announce, subscribe, then serve unlock
/// commands until the connection drops.
pub struct Session {
    stack: &'static Mutex<NoopRawMutex, Stack<'static>>,
    trng: &'static Mutex<NoopRawMutex, Trng<'static>>,
    rx_buf: &'static Mutex<NoopRawMutex, [u8; RX_BUFFER_SIZE]>,
    tx_buf: &'static Mutex<NoopRawMutex, [u8; TX_BUFFER_SIZE]>,
    tls_read_buf: &'static Mutex<NoopRawMutex, [u8; TLS_READ_BUFFER_SIZE]>,
    tls_write_buf: &'static Mutex<NoopRawMutex, [u8; TLS_WRITE_BUFFER_SIZE]>,
    mqtt_rx_buf: &'static Mutex<NoopRawMutex, [u8; MQTT_RX_BUFFER_SIZE]>,
    mqtt_tx_buf: &'static Mutex<NoopRawMutex, [u8; MQTT_TX_BUFFER_SIZE]>,
    buzzer: BuzzerSender,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        stack: &'static Mutex<NoopRawMutex, Stack<'static>>,
        trng: &'static Mutex<NoopRawMutex, Trng<'static>>,
        rx_buf: &'static Mutex<NoopRawMutex, [u8; RX_BUFFER_SIZE]>,
        tx_buf: &'static Mutex<NoopRawMutex, [u8; TX_BUFFER_SIZE]>,
        tls_read_buf: &'static Mutex<NoopRawMutex, [u8; TLS_READ_BUFFER_SIZE]>,
        tls_write_buf: &'static Mutex<NoopRawMutex, [u8; TLS_WRITE_BUFFER_SIZE]>,
        buzzer: BuzzerSender,
    ) -> Self {
        let mqtt_rx_buf = MQTT_RX_BUF.init(Mutex::new([0; MQTT_RX_BUFFER_SIZE]));
        let mqtt_tx_buf = MQTT_TX_BUF.init(Mutex::new([0; MQTT_TX_BUFFER_SIZE]));

        Self {
            stack,
            trng,
            rx_buf,
            tx_buf,
            tls_read_buf,
            tls_write_buf,
            mqtt_rx_buf,
            mqtt_tx_buf,
            buzzer,
        }
    }

    pub async fn run(&mut self) -> Result<(), Error> {
        // Will payload outlives the client so the broker can publish it
        // after we vanish
        let will = StatusReport::disconnected()
            .to_json()
            .map_err(|_| Error::Format)?;

        let stack_guard = self.stack.lock().await;
        let mut trng = self.trng.lock().await;
        let mut rx_buf = self.rx_buf.lock().await;
        let mut tx_buf = self.tx_buf.lock().await;
        let mut tls_read_buf = self.tls_read_buf.lock().await;
        let mut tls_write_buf = self.tls_write_buf.lock().await;

        let transport = Transport::new(
            *stack_guard,
            &mut *trng,
            &mut *rx_buf,
            &mut *tx_buf,
            &mut *tls_read_buf,
            &mut *tls_write_buf,
            CONFIG.mqtt_hostname,
            CONFIG.mqtt_port,
        )
        .await
        .map_err(|_| Error::Transport)?;

        let mut mqtt_rx_buf = self.mqtt_rx_buf.lock().await;
        let mut mqtt_tx_buf = self.mqtt_tx_buf.lock().await;
        let mut mqtt = Mqtt::new(transport, &mut *mqtt_tx_buf, &mut *mqtt_rx_buf, &will)
            .await
            .map_err(|_| Error::Mqtt)?;

        let connected = StatusReport::connected()
            .to_json()
            .map_err(|_| Error::Format)?;
        mqtt.send_message(CONFIG.mqtt_pub_topic, &connected)
            .await
            .map_err(|_| Error::Mqtt)?;

        mqtt.subscribe(CONFIG.mqtt_sub_topic)
            .await
            .map_err(|_| Error::Mqtt)?;
        log::info!("Listening for unlock commands on {}", CONFIG.mqtt_sub_topic);

        loop {
            // Ping on idle so the broker doesn't drop us between commands.
            // receive_message is not cancel-safe: a timeout racing an inbound
            // publish drops the partially-read packet and desyncs the parser,
            // which surfaces as a receive error on the next iteration and
            // costs this session a reconnect.
            let idle_window = Duration::from_secs(MQTT_KEEP_ALIVE_SECS as u64 / 2);
            let report = match with_timeout(idle_window, mqtt.receive_message()).await {
                Ok(Ok((topic, payload))) => Some(self.handle_command(topic, payload)),
                Ok(Err(_)) => return Err(Error::Mqtt),
                Err(_) => {
                    mqtt.ping().await.map_err(|_| Error::Mqtt)?;
                    None
                }
            };

            if let Some(report) = report {
                let report = report?;
                mqtt.send_message(CONFIG.mqtt_pub_topic, &report)
                    .await
                    .map_err(|_| Error::Mqtt)?;
            }
        }
    }

    fn handle_command(&self, topic: &str, payload: &[u8]) -> Result<Report, Error> {
        let authorized = UnlockCommand::parse(payload)
            .and_then(|command| command.authorize(CONFIG.secret_key).map(|_| command));

        let report = match authorized {
            Ok(command) => {
                log::info!(
                    "Unlock authorized for {} (entry code {})",
                    command.customer_address,
                    command.entry_code
                );
                if self
                    .buzzer
                    .try_send(Pulse {
                        duration_ms: UNLOCK_PULSE_MS,
                    })
                    .is_err()
                {
                    log::warn!("Buzzer queue full, dropping pulse");
                }
                StatusReport::unlocked(command.entry_code)
            }
            Err(e) => {
                log::warn!("Rejected command on {}: {:?}", topic, e);
                StatusReport::denied()
            }
        };

        report.to_json().map_err(|_| Error::Format)
    }
}
