use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::config::CONFIG;

/// Maximum serialized size of an outbound status report
pub const REPORT_CAPACITY: usize = 192;

pub type Report = Vec<u8, REPORT_CAPACITY>;

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    Malformed,
    UnknownEvent,
    BadSecret,
    Format,
}

/// Unlock event published by the entry code validator.
#[derive(Debug, Deserialize)]
pub struct UnlockCommand {
    pub secret: String<64>,
    #[serde(rename = "customerAddress")]
    pub customer_address: String<64>,
    #[serde(rename = "entryCode")]
    pub entry_code: u32,
    pub event: String<16>,
}

impl UnlockCommand {
    pub fn parse(payload: &[u8]) -> Result<Self, Error> {
        serde_json_core::from_slice(payload)
            .map(|(command, _)| command)
            .map_err(|_| Error::Malformed)
    }

    /// Checks the event type and the shared secret. The secret comparison is
    /// constant-time since the payload arrives on a broker-reachable topic.
    pub fn authorize(&self, secret_key: &str) -> Result<(), Error> {
        if self.event != "unlock" {
            return Err(Error::UnknownEvent);
        }
        if !secret_matches(self.secret.as_bytes(), secret_key.as_bytes()) {
            return Err(Error::BadSecret);
        }
        Ok(())
    }
}

fn secret_matches(received: &[u8], expected: &[u8]) -> bool {
    let mut diff = received.len() ^ expected.len();
    for i in 0..expected.len() {
        let r = received.get(i).copied().unwrap_or(0);
        diff |= (r ^ expected[i]) as usize;
    }
    diff == 0
}

/// Status report published on the output topic (and registered as the
/// last-will payload for the "disconnected" event).
#[derive(Debug, Serialize)]
pub struct StatusReport<'a> {
    pub device: &'a str,
    pub event: &'a str,
    #[serde(rename = "entryCode", skip_serializing_if = "Option::is_none")]
    pub entry_code: Option<u32>,
}

impl<'a> StatusReport<'a> {
    pub fn connected() -> Self {
        Self::event("connected")
    }

    pub fn disconnected() -> Self {
        Self::event("disconnected")
    }

    pub fn unlocked(entry_code: u32) -> Self {
        Self {
            entry_code: Some(entry_code),
            ..Self::event("unlocked")
        }
    }

    pub fn denied() -> Self {
        // no entry code echoed back on a rejected command
        Self::event("denied")
    }

    fn event(event: &'a str) -> Self {
        Self {
            device: CONFIG.device_id,
            event,
            entry_code: None,
        }
    }

    pub fn to_json(&self) -> Result<Report, Error> {
        serde_json_core::to_vec(self).map_err(|_| Error::Format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &[u8] =
        br#"{"secret":"hunter2","customerAddress":"+15551230000","entryCode":4321,"event":"unlock"}"#;

    #[test]
    fn parses_validator_payload() {
        let command = UnlockCommand::parse(PAYLOAD).unwrap();
        assert_eq!(command.secret, "hunter2");
        assert_eq!(command.customer_address, "+15551230000");
        assert_eq!(command.entry_code, 4321);
        assert_eq!(command.event, "unlock");
    }

    #[test]
    fn rejects_truncated_payload() {
        assert_eq!(
            UnlockCommand::parse(&PAYLOAD[..PAYLOAD.len() - 10]).unwrap_err(),
            Error::Malformed
        );
    }

    #[test]
    fn authorizes_matching_secret() {
        let command = UnlockCommand::parse(PAYLOAD).unwrap();
        assert_eq!(command.authorize("hunter2"), Ok(()));
    }

    #[test]
    fn rejects_wrong_secret() {
        let command = UnlockCommand::parse(PAYLOAD).unwrap();
        assert_eq!(command.authorize("hunter3"), Err(Error::BadSecret));
        assert_eq!(command.authorize("hunter22"), Err(Error::BadSecret));
        assert_eq!(command.authorize(""), Err(Error::BadSecret));
    }

    #[test]
    fn rejects_unknown_event() {
        let payload =
            br#"{"secret":"hunter2","customerAddress":"a@b.c","entryCode":1,"event":"lock"}"#;
        let command = UnlockCommand::parse(payload).unwrap();
        assert_eq!(command.authorize("hunter2"), Err(Error::UnknownEvent));
    }

    #[test]
    fn serializes_unlock_report_with_entry_code() {
        let json = StatusReport::unlocked(4321).to_json().unwrap();
        let json = core::str::from_utf8(&json).unwrap();
        assert!(json.contains(r#""event":"unlocked""#));
        assert!(json.contains(r#""entryCode":4321"#));
    }

    #[test]
    fn omits_entry_code_on_status_reports() {
        let json = StatusReport::connected().to_json().unwrap();
        let json = core::str::from_utf8(&json).unwrap();
        assert!(!json.contains("entryCode"));
    }
}
