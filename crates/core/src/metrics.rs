//! 메트릭 상수
//!
//! 하네스가 기록하는 메트릭의 이름을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수로 `metrics::counter!()`를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logwire_`
//! - 접미어: `_total` (counter)
//!
//! # 사용 예시
//!
//! ```ignore
//! metrics::counter!(logwire_core::metrics::INVOCATIONS_TOTAL).increment(1);
//! ```

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 백엔드 종류 레이블 키
pub const LABEL_BACKEND: &str = "backend";

/// 시작된 백엔드 수 (counter, label: backend)
pub const BACKENDS_STARTED_TOTAL: &str = "logwire_backends_started_total";

/// 함수 호출 수 (counter, label: result)
pub const INVOCATIONS_TOTAL: &str = "logwire_invocations_total";

/// 관측된 함수 로그 라인 수 (counter)
pub const LOG_LINES_OBSERVED_TOTAL: &str = "logwire_log_lines_observed_total";

/// 디코딩된 스트림 레코드 수 (counter)
pub const RECORDS_DECODED_TOTAL: &str = "logwire_records_decoded_total";

/// 디코딩 실패한 스트림 레코드 수 (counter)
pub const RECORD_DECODE_FAILURES_TOTAL: &str = "logwire_record_decode_failures_total";

/// 해제 실패 수 (counter)
pub const TEARDOWN_FAILURES_TOTAL: &str = "logwire_teardown_failures_total";
