//! 구독 봉투 — 로그 구독이 스트림에 기록하는 gzip 압축 JSON 문서

use std::io::Read;

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};

use crate::error::CloudError;

/// 구독으로 전달된 로그 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeEvent {
    pub id: String,
    pub timestamp: i64,
    pub message: String,
}

/// 로그 구독 봉투
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionEnvelope {
    /// `DATA_MESSAGE` 또는 `CONTROL_MESSAGE`
    pub message_type: String,
    pub owner: String,
    pub log_group: String,
    pub log_stream: String,
    #[serde(default)]
    pub subscription_filters: Vec<String>,
    #[serde(default)]
    pub log_events: Vec<EnvelopeEvent>,
}

impl SubscriptionEnvelope {
    /// 구독 설치 시 백엔드가 보내는 확인 메시지인지 반환합니다.
    pub fn is_control(&self) -> bool {
        self.message_type == "CONTROL_MESSAGE"
    }
}

/// 레코드 데이터를 압축 해제하고 봉투로 디코딩합니다.
///
/// # Errors
///
/// gzip 해제 또는 JSON 파싱에 실패하면 `CloudError::Decode`를 반환합니다.
pub fn decode_envelope(data: &[u8]) -> Result<SubscriptionEnvelope, CloudError> {
    let mut json = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut json)
        .map_err(|e| CloudError::Decode(format!("gunzip failed: {e}")))?;
    serde_json::from_slice(&json).map_err(|e| CloudError::Decode(format!("invalid envelope: {e}")))
}

/// 봉투를 gzip 압축된 JSON으로 인코딩합니다.
#[cfg(any(test, feature = "testing"))]
pub fn encode_envelope(envelope: &SubscriptionEnvelope) -> Result<Vec<u8>, CloudError> {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;

    let json =
        serde_json::to_vec(envelope).map_err(|e| CloudError::Decode(format!("encode: {e}")))?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| CloudError::Decode(format!("gzip failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| CloudError::Decode(format!("gzip failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SubscriptionEnvelope {
        SubscriptionEnvelope {
            message_type: "DATA_MESSAGE".to_owned(),
            owner: "000000000000".to_owned(),
            log_group: "/aws/lambda/log-producer".to_owned(),
            log_stream: "2026/10/18/[$LATEST]abc".to_owned(),
            subscription_filters: vec!["logwire-api-log".to_owned()],
            log_events: vec![EnvelopeEvent {
                id: "1".to_owned(),
                timestamp: 1_700_000_000_000,
                message: "called upstream".to_owned(),
            }],
        }
    }

    #[test]
    fn decodes_gzipped_envelope() {
        let encoded = encode_envelope(&sample()).unwrap();
        assert_eq!(&encoded[..2], &[0x1f, 0x8b]);
        assert_eq!(decode_envelope(&encoded).unwrap(), sample());
    }

    #[test]
    fn wire_names_are_camel_case() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["messageType"], "DATA_MESSAGE");
        assert_eq!(value["logGroup"], "/aws/lambda/log-producer");
        assert_eq!(value["logEvents"][0]["message"], "called upstream");
    }

    #[test]
    fn plain_json_is_a_decode_failure() {
        let raw = serde_json::to_vec(&sample()).unwrap();
        assert!(matches!(decode_envelope(&raw), Err(CloudError::Decode(_))));
    }

    #[test]
    fn gzipped_garbage_is_a_decode_failure() {
        use std::io::Write;
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"{not json").unwrap();
        let data = encoder.finish().unwrap();
        let err = decode_envelope(&data).unwrap_err();
        assert!(err.to_string().contains("invalid envelope"));
    }

    #[test]
    fn control_message_detected() {
        let mut envelope = sample();
        envelope.message_type = "CONTROL_MESSAGE".to_owned();
        envelope.log_events.clear();
        assert!(envelope.is_control());
        assert!(!sample().is_control());
    }
}
