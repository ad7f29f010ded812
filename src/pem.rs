use alloc::string::String;
use alloc::vec::Vec;

use base64::Engine;

const BEGIN_MARKER: &str = "-----BEGIN ";
const END_MARKER: &str = "-----END ";

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    MissingBeginMarker,
    MissingEndMarker,
    LabelMismatch,
    EmptyBody,
    InvalidBase64,
}

/// Extracts and base64-decodes the body of a PEM block.
pub fn decode(pem: &str) -> Result<Vec<u8>, Error> {
    let start = pem.find(BEGIN_MARKER).ok_or(Error::MissingBeginMarker)?;
    let body_start = pem[start..]
        .find('\n')
        .map(|i| start + i + 1)
        .ok_or(Error::MissingBeginMarker)?;
    let end = pem.find(END_MARKER).ok_or(Error::MissingEndMarker)?;
    if end < body_start {
        return Err(Error::MissingEndMarker);
    }

    let base64_content: String = pem[body_start..end]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if base64_content.is_empty() {
        return Err(Error::EmptyBody);
    }

    base64::engine::general_purpose::STANDARD
        .decode(base64_content)
        .map_err(|_| Error::InvalidBase64)
}

/// Structural check on a PEM block: a BEGIN marker, a matching END marker
/// with the same label, and a non-empty decodable body in between.
pub fn validate(pem: &str) -> Result<(), Error> {
    let begin_label = label_after(pem, BEGIN_MARKER).ok_or(Error::MissingBeginMarker)?;
    let end_label = label_after(pem, END_MARKER).ok_or(Error::MissingEndMarker)?;
    if begin_label != end_label {
        return Err(Error::LabelMismatch);
    }
    decode(pem).map(|_| ())
}

fn label_after<'a>(pem: &'a str, marker: &str) -> Option<&'a str> {
    let start = pem.find(marker)? + marker.len();
    let end = pem[start..].find("-----")?;
    Some(&pem[start..start + end])
}

#[cfg(test)]
mod tests {
    use super::*;

    // "hello" in base64
    const CERT: &str = "-----BEGIN CERTIFICATE-----\naGVsbG8=\n-----END CERTIFICATE-----\n";

    #[test]
    fn decodes_valid_block() {
        assert_eq!(decode(CERT).unwrap(), b"hello");
    }

    #[test]
    fn validates_valid_block() {
        assert_eq!(validate(CERT), Ok(()));
    }

    #[test]
    fn rejects_missing_begin_marker() {
        assert_eq!(
            validate("aGVsbG8=\n-----END CERTIFICATE-----\n"),
            Err(Error::MissingBeginMarker)
        );
    }

    #[test]
    fn rejects_missing_end_marker() {
        assert_eq!(
            validate("-----BEGIN CERTIFICATE-----\naGVsbG8=\n"),
            Err(Error::MissingEndMarker)
        );
    }

    #[test]
    fn rejects_label_mismatch() {
        assert_eq!(
            validate("-----BEGIN CERTIFICATE-----\naGVsbG8=\n-----END RSA PRIVATE KEY-----\n"),
            Err(Error::LabelMismatch)
        );
    }

    #[test]
    fn rejects_empty_body() {
        assert_eq!(
            validate("-----BEGIN CERTIFICATE-----\n-----END CERTIFICATE-----\n"),
            Err(Error::EmptyBody)
        );
    }

    #[test]
    fn rejects_invalid_base64() {
        assert_eq!(
            validate("-----BEGIN CERTIFICATE-----\n!!!!\n-----END CERTIFICATE-----\n"),
            Err(Error::InvalidBase64)
        );
    }

    #[test]
    fn decode_ignores_interior_whitespace() {
        let pem = "-----BEGIN CERTIFICATE-----\naGVs\nbG8=\n-----END CERTIFICATE-----\n";
        assert_eq!(decode(pem).unwrap(), b"hello");
    }
}
