//! 합성 이벤트 — 함수에 주입할 결정적 도메인 이벤트 배치
//!
//! [`battery`]는 테넌트, 서드파티, 엔티티 타입, 작업 분류, 기대 mock 시나리오의
//! 고정된 조합을 반환합니다. 엔티티 ID만 호출할 때마다 새로 생성됩니다.
//!
//! 직렬화 형식은 함수가 기대하는 필드명(`TenantId`, `EntityId`, ...)을 따릅니다.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HarnessError;

/// 이벤트가 기대하는 mock 응답 시나리오
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MockScenario {
    Success,
    InternalServerError,
    DelayedResponse,
    ConnectionReset,
    NotFound,
    ValidationFailure,
}

impl MockScenario {
    /// 전체 시나리오 목록
    pub const ALL: [MockScenario; 6] = [
        Self::Success,
        Self::InternalServerError,
        Self::DelayedResponse,
        Self::ConnectionReset,
        Self::NotFound,
        Self::ValidationFailure,
    ];

    /// 직렬화에 쓰이는 태그 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::InternalServerError => "internalServerError",
            Self::DelayedResponse => "delayedResponse",
            Self::ConnectionReset => "connectionReset",
            Self::NotFound => "notFound",
            Self::ValidationFailure => "validationFailure",
        }
    }
}

impl fmt::Display for MockScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 합성 도메인 이벤트
///
/// 생성 후 변경되지 않는 값 레코드입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SyntheticEvent {
    pub tenant_id: String,
    pub third_party_name: String,
    /// 이벤트마다 새로 생성되는 고유 식별자
    pub entity_id: String,
    pub entity_type: String,
    pub operation_category: String,
    pub operation_sub_category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_scenario: Option<MockScenario>,
}

impl SyntheticEvent {
    /// 새 엔티티 ID로 이벤트를 생성합니다.
    pub fn new(
        tenant_id: impl Into<String>,
        third_party_name: impl Into<String>,
        entity_type: impl Into<String>,
        operation_category: impl Into<String>,
        operation_sub_category: impl Into<String>,
        mock_scenario: Option<MockScenario>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            third_party_name: third_party_name.into(),
            entity_id: Uuid::new_v4().to_string(),
            entity_type: entity_type.into(),
            operation_category: operation_category.into(),
            operation_sub_category: operation_sub_category.into(),
            mock_scenario,
        }
    }

    /// 전송용 바이트로 직렬화합니다.
    pub fn to_bytes(&self) -> Result<Bytes, HarnessError> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// 바이트에서 역직렬화합니다.
    pub fn from_slice(raw: &[u8]) -> Result<Self, HarnessError> {
        Ok(serde_json::from_slice(raw)?)
    }
}

/// (tenant, third party, entity type, category, sub-category, scenario)
type Template = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    MockScenario,
);

const BATTERY: [Template; 8] = [
    ("tenant1", "thirdPartyA", "product", "created", "subCat1", MockScenario::Success),
    ("tenant1", "thirdPartyB", "product", "priceUpdated", "subCat2", MockScenario::Success),
    ("tenant2", "thirdPartyA", "order", "checkout", "subCat1", MockScenario::InternalServerError),
    ("tenant2", "thirdPartyB", "order", "paid", "subCat3", MockScenario::DelayedResponse),
    ("tenant1", "thirdPartyA", "order", "enroute", "subCat2", MockScenario::ConnectionReset),
    ("tenant2", "thirdPartyB", "product", "created", "subCat3", MockScenario::NotFound),
    ("tenant1", "thirdPartyA", "order", "delivered", "subCat1", MockScenario::ValidationFailure),
    ("tenant2", "thirdPartyB", "product", "priceUpdated", "subCat2", MockScenario::DelayedResponse),
];

/// 기본 배치 크기
pub const DEFAULT_BATTERY_SIZE: usize = BATTERY.len();

/// `count`개의 합성 이벤트를 생성합니다.
///
/// 고정 템플릿을 순서대로 사용하며, `count`가 템플릿 수보다 크면 순환합니다.
/// 결과 길이는 항상 정확히 `count`입니다.
pub fn battery(count: usize) -> Vec<SyntheticEvent> {
    BATTERY
        .iter()
        .cycle()
        .take(count)
        .map(|(tenant, third_party, entity_type, category, sub_category, scenario)| {
            SyntheticEvent::new(
                *tenant,
                *third_party,
                *entity_type,
                *category,
                *sub_category,
                Some(*scenario),
            )
        })
        .collect()
}

/// 이벤트 배치를 전송용 바이트 시퀀스로 직렬화합니다.
pub fn build_payloads(events: &[SyntheticEvent]) -> Result<Vec<Bytes>, HarnessError> {
    let mut payloads = Vec::with_capacity(events.len());
    for event in events {
        payloads.push(event.to_bytes()?);
    }
    Ok(payloads)
}
