//! 授权守卫
//!
//! 处理器在执行业务逻辑前调用，决策本身由 `Authorizer` 完成

use medrec_auth_core::{AccessContext, Action, AllowedBy, Decision, Principal, Resource};
use medrec_errors::AppResult;
use metrics::counter;
use tracing::{debug, error, warn};

use crate::state::AppState;

pub fn authorize(
    state: &AppState,
    principal: &Principal,
    resource: Resource,
    action: Action,
    context: Option<&AccessContext>,
) -> AppResult<AllowedBy> {
    let decision = state
        .authorizer
        .authorize(Some(principal), resource, action, context);
    observe(principal, resource, action, &decision);
    decision.into_result(resource, action)
}

/// 加载实例前的预检，拒绝停用主体与不可能获得授权的角色
///
/// 放行时不计数，实例加载后仍需调用 `authorize`
pub fn prescreen(
    state: &AppState,
    principal: &Principal,
    resource: Resource,
    action: Action,
) -> AppResult<()> {
    let decision = state
        .authorizer
        .prescreen(Some(principal), resource, action);
    if decision.is_allowed() {
        return Ok(());
    }
    observe(principal, resource, action, &decision);
    decision.into_result(resource, action).map(|_| ())
}

fn observe(principal: &Principal, resource: Resource, action: Action, decision: &Decision) {
    counter!("authorization_decisions_total", "decision" => decision.label()).increment(1);

    match decision {
        Decision::Allow(by) => debug!(
            user_id = %principal.id,
            role = %principal.role,
            resource = %resource,
            action = %action,
            allowed_by = ?by,
            "Authorization granted"
        ),
        Decision::Deny(reason) => warn!(
            user_id = %principal.id,
            role = %principal.role,
            resource = %resource,
            action = %action,
            reason = ?reason,
            "Authorization denied"
        ),
        Decision::ConfigError { .. } => error!(
            resource = %resource,
            action = %action,
            "Permission matrix has no rule for requested action"
        ),
    }
}
