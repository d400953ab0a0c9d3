//! 파이프라인 관측자
//!
//! 두 개의 독립적인 폴링 프로토콜로 주입 결과를 관측합니다.
//!
//! - [`LogTail`]: 함수 로그 스트림 (토큰 기반 페이지네이션)
//! - [`StreamReader`]: 스트림 샤드 (이터레이터 기반), 레코드마다 gzip 해제 후 디코딩
//!
//! 출력은 [`Renderer`]가 담당합니다.

pub mod envelope;
pub mod logs;
pub mod render;
pub mod stream;

pub use envelope::{EnvelopeEvent, SubscriptionEnvelope, decode_envelope};
pub use logs::LogTail;
pub use render::Renderer;
pub use stream::{DecodeFailure, DecodedRecord, StreamPoll, StreamReader, StreamSummary};

#[cfg(any(test, feature = "testing"))]
pub use envelope::encode_envelope;
#[cfg(any(test, feature = "testing"))]
pub use render::SharedBuffer;
