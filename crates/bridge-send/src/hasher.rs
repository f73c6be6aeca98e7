use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use mail_parser::{Header, HeaderName, Message, MessageParser, PartType};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{Result, SendError};

/// Opaque content-derived key for an outgoing message body.
///
/// Two bodies with equal fingerprints are considered the same submission.
/// The fingerprint is stable across transport-layer re-encodings of the body
/// and sensitive to the headers a user would perceive as changing the
/// message. Equality is the only meaningful operation; the textual form is
/// the base64 encoding of a 256-bit digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageFingerprint(String);

impl MessageFingerprint {
    /// Get the string representation of the fingerprint
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for MessageFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compute the fingerprint of a raw message literal.
///
/// The digest covers, in order:
/// - the raw Subject header value
/// - the raw From/To/Cc/Bcc header values
/// - for every leaf MIME part: its raw Content-Type and Content-Disposition
///   header values, and its transfer-decoded body with surrounding
///   whitespace stripped
///
/// Header values contribute verbatim as they appear in the literal. No
/// separators are inserted between contributions; the fingerprint is a
/// private key, not a canonical form. An empty literal hashes to a
/// well-defined constant.
pub fn message_fingerprint(literal: &[u8]) -> Result<MessageFingerprint> {
    let mut digest = Sha256::new();

    if !literal.is_empty() {
        let message = MessageParser::default()
            .parse(literal)
            .ok_or_else(|| SendError::hash("malformed message literal"))?;

        // The root part carries the message headers.
        if let Some(root) = message.part(0) {
            for name in [
                HeaderName::Subject,
                HeaderName::From,
                HeaderName::To,
                HeaderName::Cc,
                HeaderName::Bcc,
            ] {
                digest_raw_header(&mut digest, literal, &root.headers, &name);
            }
        }

        digest_part(&mut digest, literal, &message, 0);
    }

    Ok(MessageFingerprint(STANDARD.encode(digest.finalize())))
}

// The literal header value exactly as it appears in the message; absent
// headers contribute nothing.
fn digest_raw_header(
    digest: &mut Sha256,
    literal: &[u8],
    headers: &[Header<'_>],
    name: &HeaderName<'_>,
) {
    if let Some(header) = headers.iter().find(|header| header.name == *name) {
        digest.update(&literal[header.offset_start as usize..header.offset_end as usize]);
    }
}

// Depth-first, in-order walk of the MIME tree; only leaf parts contribute.
fn digest_part(digest: &mut Sha256, literal: &[u8], message: &Message<'_>, part_id: u32) {
    let Some(part) = message.part(part_id) else {
        return;
    };

    if let PartType::Multipart(children) = &part.body {
        for &child in children {
            digest_part(digest, literal, message, child);
        }
        return;
    }

    digest_raw_header(digest, literal, &part.headers, &HeaderName::ContentType);
    digest_raw_header(digest, literal, &part.headers, &HeaderName::ContentDisposition);
    digest.update(part.contents().trim_ascii());
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    const LITERAL_ATTACHMENT_1: &[u8] = b"From: Sender <sender@example.com>\r\n\
To: Receiver <receiver@example.com>\r\n\
Content-Type: multipart/mixed; boundary=longrandomstring\r\n\
\r\n\
--longrandomstring\r\n\
\r\n\
body\r\n\
--longrandomstring\r\n\
Content-Disposition: attachment; filename=\"attname.txt\"\r\n\
\r\n\
attachment\r\n\
--longrandomstring--\r\n";

    const LITERAL_ATTACHMENT_2: &[u8] = b"From: Sender <sender@example.com>\r\n\
To: Receiver <receiver@example.com>\r\n\
Content-Type: multipart/mixed; boundary=longrandomstring\r\n\
\r\n\
--longrandomstring\r\n\
\r\n\
body\r\n\
--longrandomstring\r\n\
Content-Disposition: attachment; filename=\"attname2.txt\"\r\n\
\r\n\
attachment\r\n\
--longrandomstring--\r\n";

    fn fingerprint(literal: &[u8]) -> MessageFingerprint {
        message_fingerprint(literal).unwrap()
    }

    #[test]
    fn test_empty_literals_hash_equal() {
        let actual = fingerprint(b"");
        let expected = fingerprint(b"");
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_identical_literals_hash_equal() {
        let literal = b"To: someone@example.com\r\n\r\nHello world!";
        assert_eq!(fingerprint(literal), fingerprint(literal));
    }

    #[test]
    fn test_different_to_header() {
        let actual = fingerprint(b"To: someone@example.com\r\n\r\nHello world!");
        let other = fingerprint(b"To: another@example.com\r\n\r\nHello world!");
        assert_ne!(actual, other);
    }

    #[test]
    fn test_different_from_header() {
        let actual = fingerprint(b"From: someone@example.com\r\n\r\nHello world!");
        let other = fingerprint(b"From: another@example.com\r\n\r\nHello world!");
        assert_ne!(actual, other);
    }

    #[test]
    fn test_different_subject() {
        let actual = fingerprint(b"Subject: Hello world!\r\n\r\nHello world!");
        let other = fingerprint(b"Subject: Goodbye world!\r\n\r\nHello world!");
        assert_ne!(actual, other);
    }

    #[test]
    fn test_same_plaintext_body() {
        let literal = b"To: someone@example.com\r\nContent-Type: text/plain\r\n\r\nHello world!";
        assert_eq!(fingerprint(literal), fingerprint(literal));
    }

    #[test]
    fn test_different_plaintext_body() {
        let actual =
            fingerprint(b"To: someone@example.com\r\nContent-Type: text/plain\r\n\r\nHello world!");
        let other = fingerprint(
            b"To: someone@example.com\r\nContent-Type: text/plain\r\n\r\nGoodbye world!",
        );
        assert_ne!(actual, other);
    }

    #[test]
    fn test_different_content_type_parameters() {
        let actual =
            fingerprint(b"To: someone@example.com\r\nContent-Type: text/plain\r\n\r\nHello world!");
        let other = fingerprint(
            b"To: someone@example.com\r\nContent-Type: text/plain; format=flowed\r\n\r\nHello world!",
        );
        assert_ne!(actual, other);
    }

    #[test]
    fn test_different_attachment_filenames() {
        let actual = fingerprint(LITERAL_ATTACHMENT_1);
        let other = fingerprint(LITERAL_ATTACHMENT_2);
        assert_ne!(actual, other);
    }

    #[test]
    fn test_fingerprint_is_base64_digest() {
        let actual = fingerprint(b"Subject: hi\r\n\r\nhello");
        // 32 digest bytes encode to 44 base64 characters.
        assert_eq!(actual.as_str().len(), 44);
    }
}
