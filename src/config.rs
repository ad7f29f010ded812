use crate::pem;

pub struct Config {
    // Device ID (used as MQTT client id and DHCP hostname)
    pub device_id: &'static str,

    // MQTT broker hostname (AWS IoT endpoint)
    pub mqtt_hostname: &'static str,

    // MQTT port (8883 for TLS)
    pub mqtt_port: u16,

    // Topic the broker publishes to when the device disconnects unexpectedly
    pub mqtt_lastwill_topic: &'static str,

    // Topic the device publishes status reports to
    pub mqtt_pub_topic: &'static str,

    // Topic the device subscribes to for unlock commands
    pub mqtt_sub_topic: &'static str,

    // Secret shared with the entry code validator
    pub secret_key: &'static str,

    // TLS CA certificate (optional)
    pub tls_ca: Option<&'static str>,

    // TLS client certificate (optional)
    pub tls_cert: Option<&'static str>,

    // TLS private key for client auth (optional)
    pub tls_key: Option<&'static str>,

    // Wi-Fi pre-shared key (password)
    pub wifi_psk: &'static str,

    // Wi-Fi SSID to connect to
    pub wifi_ssid: &'static str,
}

#[derive(Debug, PartialEq)]
pub enum Error {
    EmptyField(&'static str),
    Placeholder(&'static str),
    InvalidPort,
    InvalidPem(&'static str, pem::Error),
}

impl Config {
    /// Structural deployment check: every required value is present, nothing
    /// is still an unfilled placeholder, and each provided PEM block is
    /// well-formed. Run once at boot so a misconfigured device fails there
    /// instead of looping on WiFi/TLS errors.
    pub fn validate(&self) -> Result<(), Error> {
        let required = [
            ("device_id", self.device_id),
            ("wifi_ssid", self.wifi_ssid),
            ("wifi_psk", self.wifi_psk),
            ("mqtt_hostname", self.mqtt_hostname),
            ("mqtt_lastwill_topic", self.mqtt_lastwill_topic),
            ("mqtt_pub_topic", self.mqtt_pub_topic),
            ("mqtt_sub_topic", self.mqtt_sub_topic),
            ("secret_key", self.secret_key),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(Error::EmptyField(name));
            }
            // all-X values are the unfilled placeholders from cfg.toml
            if value.bytes().all(|b| b == b'X') {
                return Err(Error::Placeholder(name));
            }
        }

        if self.mqtt_port == 0 {
            return Err(Error::InvalidPort);
        }

        for (name, block) in [
            ("tls_ca", self.tls_ca),
            ("tls_cert", self.tls_cert),
            ("tls_key", self.tls_key),
        ] {
            if let Some(block) = block {
                pem::validate(block).map_err(|e| Error::InvalidPem(name, e))?;
            }
        }

        Ok(())
    }
}

// config values are generated at compile time
include!(concat!(env!("OUT_DIR"), "/config.rs"));

#[cfg(test)]
mod tests {
    use super::*;

    const PEM_BLOCK: &str = "-----BEGIN CERTIFICATE-----\naGVsbG8=\n-----END CERTIFICATE-----\n";

    fn valid() -> Config {
        Config {
            device_id: "Esp32B",
            mqtt_hostname: "example.iot.us-east-1.amazonaws.com",
            mqtt_port: 8883,
            mqtt_lastwill_topic: "Esp32B/lastwill",
            mqtt_pub_topic: "Esp32B/buzzer/output",
            mqtt_sub_topic: "Esp32B/buzzer/input",
            secret_key: "hunter2",
            tls_ca: Some(PEM_BLOCK),
            tls_cert: Some(PEM_BLOCK),
            tls_key: Some(PEM_BLOCK),
            wifi_psk: "password",
            wifi_ssid: "network",
        }
    }

    #[test]
    fn accepts_complete_config() {
        assert_eq!(valid().validate(), Ok(()));
    }

    #[test]
    fn accepts_missing_tls_blocks() {
        let mut config = valid();
        config.tls_ca = None;
        config.tls_cert = None;
        config.tls_key = None;
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn rejects_empty_field() {
        let mut config = valid();
        config.wifi_ssid = "";
        assert_eq!(config.validate(), Err(Error::EmptyField("wifi_ssid")));
    }

    #[test]
    fn rejects_placeholder_field() {
        let mut config = valid();
        config.secret_key = "XXXXXXXX";
        assert_eq!(config.validate(), Err(Error::Placeholder("secret_key")));
    }

    #[test]
    fn rejects_zero_port() {
        let mut config = valid();
        config.mqtt_port = 0;
        assert_eq!(config.validate(), Err(Error::InvalidPort));
    }

    #[test]
    fn rejects_malformed_pem() {
        let mut config = valid();
        config.tls_ca = Some("not a pem block");
        assert_eq!(
            config.validate(),
            Err(Error::InvalidPem("tls_ca", pem::Error::MissingBeginMarker))
        );
    }
}
