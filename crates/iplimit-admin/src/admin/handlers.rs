//! HTTP handlers for the IP access-control console.

use std::net::IpAddr;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use iplimit_core::error::IpLimitError;
use iplimit_core::model::{
    parse_api_ids, ApiId, BoundApi, PageList, Policy, PolicyDraft, PolicyId, PolicyKind,
    PolicyStatus, PolicyWithApis, RangesInput,
};

use crate::app_state::AppState;
use crate::enforce::AccessDecision;
use crate::engine::Committed;

use super::envelope::{ApiError, ApiResult, ResultBody};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub keyword: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePolicyReq {
    pub policy_id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: PolicyKind,
    #[serde(default)]
    pub ip_ranges: RangesInput,
    #[serde(default)]
    pub status: PolicyStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PolicyIdReq {
    pub policy_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddApisReq {
    pub policy_id: u64,
    pub api_ids: Vec<String>,
    /// Make `api_ids` the exact bound set instead of adding to it.
    #[serde(default)]
    pub replace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClearApisReq {
    pub policy_id: Option<u64>,
    pub api_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckQuery {
    pub api_id: String,
    pub ip: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResp {
    pub api_id: String,
    pub ip: String,
    pub decision: &'static str,
    pub policy_id: Option<PolicyId>,
    pub snapshot_seq: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearResp {
    pub removed: usize,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| ApiError(IpLimitError::BadRequest(e.body_text())))
}

fn query<T>(q: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    q.map(|Query(v)| v)
        .map_err(|e| ApiError(IpLimitError::BadRequest(e.body_text())))
}

fn path_policy_id(path: Result<Path<u64>, PathRejection>) -> Result<PolicyId, ApiError> {
    path.map(|Path(id)| PolicyId(id))
        .map_err(|e| ApiError(IpLimitError::BadRequest(e.body_text())))
}

pub async fn find_list_page(
    State(state): State<AppState>,
    q: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<PageList<Policy>> {
    let q = query(q)?;
    let svc = state.service();
    let page = svc.page_params(q.page, q.limit);
    Ok(ResultBody::success(svc.find_list_page(page, q.keyword.as_deref()).await?))
}

pub async fn find_white_list(
    State(state): State<AppState>,
    q: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<PageList<PolicyWithApis>> {
    let q = query(q)?;
    let svc = state.service();
    Ok(ResultBody::success(svc.find_white_list(svc.page_params(q.page, q.limit)).await?))
}

pub async fn find_black_list(
    State(state): State<AppState>,
    q: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<PageList<PolicyWithApis>> {
    let q = query(q)?;
    let svc = state.service();
    Ok(ResultBody::success(svc.find_black_list(svc.page_params(q.page, q.limit)).await?))
}

pub async fn get_ip_limit_policy(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> ApiResult<Policy> {
    let id = path_policy_id(path)?;
    Ok(ResultBody::success(state.service().get_ip_limit_policy(id).await?))
}

pub async fn find_ip_limit_api_list(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
    q: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<PageList<BoundApi>> {
    let id = path_policy_id(path)?;
    let q = query(q)?;
    let svc = state.service();
    let page = svc.page_params(q.page, q.limit);
    Ok(ResultBody::success(svc.find_ip_limit_api_list(id, page).await?))
}

pub async fn add_ip_limit_policy(
    State(state): State<AppState>,
    payload: Result<Json<PolicyDraft>, JsonRejection>,
) -> ApiResult<PolicyId> {
    let draft = body(payload)?;
    Ok(ResultBody::committed(state.service().add_ip_limit_policy(draft).await?))
}

pub async fn update_ip_limit_policy(
    State(state): State<AppState>,
    payload: Result<Json<UpdatePolicyReq>, JsonRejection>,
) -> ApiResult<()> {
    let req = body(payload)?;
    let draft = PolicyDraft {
        name: req.name,
        description: req.description,
        kind: req.kind,
        ip_ranges: req.ip_ranges,
        status: req.status,
    };
    Ok(ResultBody::committed(
        state.service().update_ip_limit_policy(PolicyId(req.policy_id), draft).await?,
    ))
}

pub async fn remove_ip_limit_policy(
    State(state): State<AppState>,
    payload: Result<Json<PolicyIdReq>, JsonRejection>,
) -> ApiResult<()> {
    let req = body(payload)?;
    Ok(ResultBody::committed(
        state.service().remove_ip_limit_policy(PolicyId(req.policy_id)).await?,
    ))
}

pub async fn add_ip_limit_apis(
    State(state): State<AppState>,
    payload: Result<Json<AddApisReq>, JsonRejection>,
) -> ApiResult<()> {
    let req = body(payload)?;
    let api_ids = parse_api_ids(req.api_ids)?;
    let svc = state.service();
    let committed = if req.replace {
        svc.replace_ip_limit_apis(PolicyId(req.policy_id), api_ids).await?
    } else {
        svc.add_ip_limit_apis(PolicyId(req.policy_id), api_ids).await?
    };
    Ok(ResultBody::committed(committed))
}

/// Clear by `policyId` or by `apiId`; exactly one must be given.
pub async fn clear_ip_limit_apis(
    State(state): State<AppState>,
    payload: Result<Json<ClearApisReq>, JsonRejection>,
) -> ApiResult<ClearResp> {
    let req = body(payload)?;
    let svc = state.service();
    let committed = match (req.policy_id, req.api_id) {
        (Some(policy_id), None) => {
            let c = svc.clear_ip_limit_apis_by_policy_id(PolicyId(policy_id)).await?;
            Committed { value: ClearResp { removed: c.value }, warning: c.warning }
        }
        (None, Some(api_id)) => {
            let c = svc.clear_ip_limit_apis_by_api_id(&ApiId::parse(api_id)?).await?;
            Committed {
                value: ClearResp { removed: usize::from(c.value) },
                warning: c.warning,
            }
        }
        _ => {
            return Err(ApiError(IpLimitError::BadRequest(
                "exactly one of policyId or apiId is required".into(),
            )))
        }
    };
    Ok(ResultBody::committed(committed))
}

pub async fn check_access(
    State(state): State<AppState>,
    q: Result<Query<CheckQuery>, QueryRejection>,
) -> ApiResult<CheckResp> {
    let q = query(q)?;
    let ip: IpAddr = q
        .ip
        .parse()
        .map_err(|_| ApiError(IpLimitError::BadRequest(format!("invalid ip: {}", q.ip))))?;
    let api_id = ApiId::parse(q.api_id.clone())?;

    let snapshot = state.access_table().snapshot();
    let decision = snapshot.decide(&api_id, ip);
    state
        .metrics()
        .access_decisions
        .inc(&[("decision", decision.as_str())]);

    let policy_id = match decision {
        AccessDecision::Deny { policy_id, .. } => Some(policy_id),
        AccessDecision::Pass => snapshot.rule(&api_id).map(|r| r.policy_id),
    };

    Ok(ResultBody::success(CheckResp {
        api_id: q.api_id,
        ip: q.ip,
        decision: decision.as_str(),
        policy_id,
        snapshot_seq: snapshot.seq(),
    }))
}
