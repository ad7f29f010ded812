/// Current firmware version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Size of the heap in DRAM (internal memory)
pub const HEAP_SIZE: usize = 72 * 1024;

/// Size of the TCP socket receive buffer for encrypted data
pub const RX_BUFFER_SIZE: usize = 4096;
/// Size of the TCP socket transmit buffer for encrypted data
pub const TX_BUFFER_SIZE: usize = 4096;

/// Size of the TLS record processing buffers. The read buffer must hold a
/// full TLS record (16 KiB) or the handshake fails against AWS IoT.
pub const TLS_READ_BUFFER_SIZE: usize = 16384;
pub const TLS_WRITE_BUFFER_SIZE: usize = 4096;

/// Size of the MQTT client receive buffer for application data
pub const MQTT_RX_BUFFER_SIZE: usize = 1024;
/// Size of the MQTT client transmit buffer for application data
pub const MQTT_TX_BUFFER_SIZE: usize = 1024;

/// Maximum number of MQTT v5 properties per packet
pub const MQTT_MAX_PROPERTIES: usize = 5;
/// MQTT keep-alive interval in seconds
pub const MQTT_KEEP_ALIVE_SECS: u16 = 60;

/// Timeout for a single WiFi association attempt
pub const WIFI_CONNECT_TIMEOUT_SECS: u64 = 15;
/// Delay before retrying a failed WiFi association
pub const WIFI_RECONNECT_DELAY_MS: u64 = 5000;

/// Delay before re-establishing a dropped MQTT session
pub const SESSION_RETRY_DELAY_SECS: u64 = 10;

/// How long the buzzer pin is held high for an accepted unlock
pub const UNLOCK_PULSE_MS: u64 = 3000;
/// Depth of the buzzer command queue
pub const BUZZER_QUEUE_DEPTH: usize = 4;
