use embedded_io_async::{Read, Write};
use rust_mqtt::{
    client::{
        client::MqttClient,
        client_config::{ClientConfig, MqttVersion},
    },
    packet::v5::{publish_packet::QualityOfService, reason_codes::ReasonCode},
    utils::rng_generator::CountingRng,
};

use crate::config::CONFIG;
use crate::constants::{MQTT_KEEP_ALIVE_SECS, MQTT_MAX_PROPERTIES};

#[derive(Debug)]
pub enum Error {
    ConnectionFailed,
    SubscribeFailed,
    PublishMessageFailed,
    ReceiveMessageFailed,
    PingFailed,
}

pub struct Mqtt<'a, T>
where
    T: Read + Write,
{
    client: MqttClient<'a, T, MQTT_MAX_PROPERTIES, CountingRng>,
}

impl<'a, T> Mqtt<'a, T>
where
    T: Read + Write,
{
    /// Connects to the broker with the device id as client id and the
    /// last-will registered on the configured topic, so the broker reports
    /// an unexpected disconnect on our behalf.
    pub async fn new(
        transport: T,
        tx_buffer: &'a mut [u8],
        rx_buffer: &'a mut [u8],
        will_payload: &'a [u8],
    ) -> Result<Self, Error> {
        let mut config: ClientConfig<'a, MQTT_MAX_PROPERTIES, CountingRng> =
            ClientConfig::new(MqttVersion::MQTTv5, CountingRng(20000));
        config.add_client_id(CONFIG.device_id);
        config.add_will(CONFIG.mqtt_lastwill_topic, will_payload, true);
        config.add_max_subscribe_qos(QualityOfService::QoS1);
        config.keep_alive = MQTT_KEEP_ALIVE_SECS;
        config.max_packet_size = rx_buffer.len() as u32;

        let tx_len = tx_buffer.len();
        let rx_len = rx_buffer.len();
        let mut client = MqttClient::new(transport, tx_buffer, tx_len, rx_buffer, rx_len, config);

        match client.connect_to_broker().await {
            Ok(_) => {
                log::info!("MQTT connected to broker successfully");
            }
            Err(e) => {
                log::error!("MQTT connect_to_broker failed: {:?}", e);
                return Err(Error::ConnectionFailed);
            }
        }

        Ok(Self { client })
    }

    pub async fn subscribe(&mut self, topic: &str) -> Result<(), Error> {
        self.client.subscribe_to_topic(topic).await.map_err(|e| {
            log::error!("Failed to subscribe to {}: {:?}", topic, e);
            Error::SubscribeFailed
        })
    }

    pub async fn send_message(&mut self, topic: &str, message: &[u8]) -> Result<(), Error> {
        self.client
            .send_message(topic, message, QualityOfService::QoS1, false)
            .await
            .map_err(|e| {
                log::error!("Failed to publish message: {:?}", e);
                Error::PublishMessageFailed
            })
    }

    /// Waits for the next inbound publish on a subscribed topic.
    pub async fn receive_message(&mut self) -> Result<(&str, &[u8]), Error> {
        self.client.receive_message().await.map_err(|e| {
            // NoMatchingSubscription and friends mean a lost session
            log::error!("Failed to receive message: {:?}", e);
            Error::ReceiveMessageFailed
        })
    }

    pub async fn ping(&mut self) -> Result<(), Error> {
        self.client.send_ping().await.map_err(|e: ReasonCode| {
            log::warn!("Keep-alive ping failed: {:?}", e);
            Error::PingFailed
        })
    }

    pub async fn disconnect(mut self) {
        let _ = self.client.disconnect().await;
    }
}
