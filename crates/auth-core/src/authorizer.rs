//! 授权决策引擎
//!
//! 统一访问控制决策点。纯函数：相同的 (principal, resource, action, context)
//! 在同一矩阵下总是得到相同的决策。
//!
//! 决策顺序:
//! 1. 主体缺失 → Deny(Unauthenticated)；主体停用 → Deny(Inactive)
//! 2. 矩阵缺少 (resource, action) → ConfigError
//! 3. 角色以 Any 范围授权 → Allow(Role)；以 Own 范围授权 → 仅实例所有者 Allow
//! 4. 规则标记为 owner_override 且主体为实例所有者 → Allow(Ownership)
//! 5. 其他 → Deny(InsufficientRole)

use std::sync::Arc;

use medrec_common::UserId;
use medrec_errors::{AppError, AppResult, AuthFailure};

use crate::matrix::{GrantScope, PermissionMatrix};
use crate::principal::Principal;
use crate::resource::{Action, Resource};
use crate::role::Role;

/// 单次授权的实例上下文
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessContext {
    /// 实例所有者
    pub owner_id: Option<UserId>,
}

impl AccessContext {
    pub fn owned_by(owner_id: UserId) -> Self {
        Self {
            owner_id: Some(owner_id),
        }
    }

    fn is_owned_by(&self, principal: &Principal) -> bool {
        self.owner_id.as_ref() == Some(&principal.id)
    }
}

/// 放行依据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowedBy {
    Role,
    Ownership,
}

/// 拒绝原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    Inactive,
    /// 角色只能作用于自有实例，而当前实例不属于该主体
    NotOwner { required: Vec<Role>, actual: Role },
    InsufficientRole { required: Vec<Role>, actual: Role },
}

/// 授权决策
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(AllowedBy),
    Deny(DenyReason),
    /// 矩阵缺少条目，属于部署缺陷
    ConfigError { resource: Resource, action: Action },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Decision::Allow(_) => "allow",
            Decision::Deny(DenyReason::Unauthenticated | DenyReason::Inactive) => {
                "unauthenticated"
            }
            Decision::Deny(_) => "deny",
            Decision::ConfigError { .. } => "config_error",
        }
    }

    /// 将决策映射为错误：401 / 403 / 500
    pub fn into_result(self, resource: Resource, action: Action) -> AppResult<AllowedBy> {
        match self {
            Decision::Allow(by) => Ok(by),
            Decision::Deny(DenyReason::Unauthenticated) => Err(AppError::unauthenticated(
                AuthFailure::MissingCredentials,
                "Authentication required",
            )),
            Decision::Deny(DenyReason::Inactive) => Err(AppError::unauthenticated(
                AuthFailure::AccountInactive,
                "Account is deactivated",
            )),
            Decision::Deny(
                DenyReason::InsufficientRole { required, actual }
                | DenyReason::NotOwner { required, actual },
            ) => Err(AppError::permission_denied(
                resource.as_str(),
                action.as_str(),
                required.iter().map(|r| r.as_str().to_string()).collect(),
                actual.as_str(),
            )),
            Decision::ConfigError { resource, action } => Err(AppError::configuration(format!(
                "No permission rule defined for {}:{}",
                resource, action
            ))),
        }
    }
}

/// 授权服务
#[derive(Debug, Clone)]
pub struct Authorizer {
    matrix: Arc<PermissionMatrix>,
}

impl Authorizer {
    pub fn new(matrix: Arc<PermissionMatrix>) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &PermissionMatrix {
        &self.matrix
    }

    pub fn authorize(
        &self,
        principal: Option<&Principal>,
        resource: Resource,
        action: Action,
        context: Option<&AccessContext>,
    ) -> Decision {
        let Some(principal) = principal else {
            return Decision::Deny(DenyReason::Unauthenticated);
        };
        if !principal.active {
            return Decision::Deny(DenyReason::Inactive);
        }

        let Some(rule) = self.matrix.rule(resource, action) else {
            return Decision::ConfigError { resource, action };
        };

        let is_owner = context.is_some_and(|ctx| ctx.is_owned_by(principal));

        match rule.scope_for(principal.role) {
            Some(GrantScope::Any) => return Decision::Allow(AllowedBy::Role),
            Some(GrantScope::Own) if is_owner => return Decision::Allow(AllowedBy::Ownership),
            Some(GrantScope::Own) if !rule.is_owner_override() => {
                return Decision::Deny(DenyReason::NotOwner {
                    required: rule.unrestricted_roles(),
                    actual: principal.role,
                });
            }
            _ => {}
        }

        if rule.is_owner_override() && is_owner {
            return Decision::Allow(AllowedBy::Ownership);
        }

        Decision::Deny(DenyReason::InsufficientRole {
            required: rule.unrestricted_roles(),
            actual: principal.role,
        })
    }

    /// 加载实例前的预检
    ///
    /// 假定主体就是实例所有者进行判定：若这样仍被拒绝，则任何实例都不会放行。
    /// 放行结果只表示"可能放行"，加载实例后必须再调用 `authorize`
    pub fn prescreen(
        &self,
        principal: Option<&Principal>,
        resource: Resource,
        action: Action,
    ) -> Decision {
        let as_owner = principal.map(|p| AccessContext::owned_by(p.id.clone()));
        self.authorize(principal, resource, action, as_owner.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::PermissionRule;

    fn authorizer() -> Authorizer {
        Authorizer::new(Arc::new(PermissionMatrix::hospital_default()))
    }

    fn principal(role: Role) -> Principal {
        Principal::new(UserId::new(), role, true)
    }

    #[test]
    fn test_prescreen_rejects_roles_without_any_grant() {
        let authorizer = authorizer();
        let lab_tech = principal(Role::LabTech);

        for action in [Action::Update, Action::Delete] {
            assert!(matches!(
                authorizer.prescreen(Some(&lab_tech), Resource::ClinicalNote, action),
                Decision::Deny(DenyReason::InsufficientRole { .. })
            ));
        }
    }

    #[test]
    fn test_prescreen_admits_possible_owners() {
        let authorizer = authorizer();
        let clinician = principal(Role::Clinician);
        let viewer = principal(Role::Viewer);

        // Own 范围与 owner_override 在加载实例前都可能放行
        assert!(
            authorizer
                .prescreen(Some(&clinician), Resource::ClinicalNote, Action::Update)
                .is_allowed()
        );
        assert!(
            authorizer
                .prescreen(Some(&viewer), Resource::Message, Action::Delete)
                .is_allowed()
        );
    }

    #[test]
    fn test_prescreen_denies_inactive_principal() {
        let inactive = Principal::new(UserId::new(), Role::Clinician, false);
        assert_eq!(
            authorizer().prescreen(Some(&inactive), Resource::ClinicalNote, Action::Update),
            Decision::Deny(DenyReason::Inactive)
        );
        assert_eq!(
            authorizer().prescreen(None, Resource::Message, Action::Read),
            Decision::Deny(DenyReason::Unauthenticated)
        );
    }

    #[test]
    fn test_lab_tech_updates_lab_order() {
        let lab_tech = principal(Role::LabTech);
        let decision =
            authorizer().authorize(Some(&lab_tech), Resource::LabOrder, Action::Update, None);
        assert_eq!(decision, Decision::Allow(AllowedBy::Role));
    }

    #[test]
    fn test_lab_tech_cannot_delete_patient() {
        let lab_tech = principal(Role::LabTech);
        let decision =
            authorizer().authorize(Some(&lab_tech), Resource::Patient, Action::Delete, None);
        assert_eq!(
            decision,
            Decision::Deny(DenyReason::InsufficientRole {
                required: vec![Role::Admin],
                actual: Role::LabTech,
            })
        );

        let err = decision
            .into_result(Resource::Patient, Action::Delete)
            .unwrap_err();
        match err {
            AppError::PermissionDenied {
                required, actual, ..
            } => {
                assert_eq!(required, vec!["admin".to_string()]);
                assert_eq!(actual, "lab_tech");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_clinician_owner_updates_own_note() {
        let author = principal(Role::Clinician);
        let ctx = AccessContext::owned_by(author.id.clone());
        let decision = authorizer().authorize(
            Some(&author),
            Resource::ClinicalNote,
            Action::Update,
            Some(&ctx),
        );
        assert_eq!(decision, Decision::Allow(AllowedBy::Ownership));
    }

    #[test]
    fn test_other_clinician_cannot_update_note() {
        let author = principal(Role::Clinician);
        let colleague = principal(Role::Clinician);
        let ctx = AccessContext::owned_by(author.id.clone());
        let decision = authorizer().authorize(
            Some(&colleague),
            Resource::ClinicalNote,
            Action::Update,
            Some(&ctx),
        );
        assert!(matches!(
            decision,
            Decision::Deny(DenyReason::NotOwner {
                actual: Role::Clinician,
                ..
            })
        ));
    }

    #[test]
    fn test_own_scope_without_context_is_denied() {
        let clinician = principal(Role::Clinician);
        let decision =
            authorizer().authorize(Some(&clinician), Resource::ClinicalNote, Action::Update, None);
        assert!(!decision.is_allowed());
    }

    #[test]
    fn test_admin_is_superset_grantor() {
        let admin = principal(Role::Admin);
        let authorizer = authorizer();
        for (resource, action) in authorizer.matrix().pairs().collect::<Vec<_>>() {
            let decision = authorizer.authorize(Some(&admin), resource, action, None);
            assert_eq!(decision, Decision::Allow(AllowedBy::Role), "{resource}:{action}");
        }
    }

    #[test]
    fn test_missing_principal_is_unauthenticated() {
        let decision = authorizer().authorize(None, Resource::Patient, Action::Read, None);
        assert_eq!(decision, Decision::Deny(DenyReason::Unauthenticated));
        let err = decision
            .into_result(Resource::Patient, Action::Read)
            .unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn test_inactive_principal_always_denied() {
        let authorizer = authorizer();
        for role in Role::ALL {
            let inactive = Principal::new(UserId::new(), role, false);
            let ctx = AccessContext::owned_by(inactive.id.clone());
            for (resource, action) in authorizer.matrix().pairs().collect::<Vec<_>>() {
                let decision = authorizer.authorize(Some(&inactive), resource, action, Some(&ctx));
                assert_eq!(decision, Decision::Deny(DenyReason::Inactive));
            }
        }
    }

    #[test]
    fn test_undefined_pair_is_config_error_not_denial() {
        let admin = principal(Role::Admin);
        let decision = authorizer().authorize(Some(&admin), Resource::Kpi, Action::Approve, None);
        assert_eq!(
            decision,
            Decision::ConfigError {
                resource: Resource::Kpi,
                action: Action::Approve,
            }
        );
        let err = decision.into_result(Resource::Kpi, Action::Approve).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_decisions_are_deterministic() {
        let authorizer = authorizer();
        let owner = principal(Role::Viewer);
        let ctx = AccessContext::owned_by(owner.id.clone());
        for role in Role::ALL {
            let p = principal(role);
            for (resource, action) in authorizer.matrix().pairs().collect::<Vec<_>>() {
                for context in [None, Some(&ctx)] {
                    let first = authorizer.authorize(Some(&p), resource, action, context);
                    let second = authorizer.authorize(Some(&p), resource, action, context);
                    assert_eq!(first, second);
                }
            }
        }
    }

    #[test]
    fn test_owner_override_is_scoped_per_instance() {
        let authorizer = authorizer();
        let recipient = principal(Role::Viewer);
        let someone_else = principal(Role::Viewer);
        let ctx = AccessContext::owned_by(recipient.id.clone());

        let own =
            authorizer.authorize(Some(&recipient), Resource::Message, Action::Update, Some(&ctx));
        assert_eq!(own, Decision::Allow(AllowedBy::Ownership));

        let other = authorizer.authorize(
            Some(&someone_else),
            Resource::Message,
            Action::Update,
            Some(&ctx),
        );
        assert!(!other.is_allowed());
    }

    #[test]
    fn test_ownership_never_widens_role_restricted_action() {
        // patient:delete 不是自作用域操作，所有者身份不应放行
        let clinician = principal(Role::Clinician);
        let ctx = AccessContext::owned_by(clinician.id.clone());
        let decision = authorizer().authorize(
            Some(&clinician),
            Resource::Patient,
            Action::Delete,
            Some(&ctx),
        );
        assert!(!decision.is_allowed());

        let note_delete = authorizer().authorize(
            Some(&clinician),
            Resource::ClinicalNote,
            Action::Delete,
            Some(&ctx),
        );
        assert!(!note_delete.is_allowed());
    }

    #[test]
    fn test_user_may_update_own_profile_only() {
        let authorizer = authorizer();
        let user = principal(Role::RecordsStaff);
        let own = AccessContext::owned_by(user.id.clone());
        let other = AccessContext::owned_by(UserId::new());

        assert!(
            authorizer
                .authorize(Some(&user), Resource::User, Action::Update, Some(&own))
                .is_allowed()
        );
        assert!(
            !authorizer
                .authorize(Some(&user), Resource::User, Action::Update, Some(&other))
                .is_allowed()
        );
        assert!(
            !authorizer
                .authorize(Some(&user), Resource::User, Action::Deactivate, Some(&own))
                .is_allowed()
        );
    }

    #[test]
    fn test_custom_matrix_injection() {
        let matrix = PermissionMatrix::builder()
            .rule(Resource::Kpi, Action::Read, PermissionRule::new().allow(&[Role::Viewer]))
            .build();
        let authorizer = Authorizer::new(Arc::new(matrix));
        let viewer = principal(Role::Viewer);

        assert!(
            authorizer
                .authorize(Some(&viewer), Resource::Kpi, Action::Read, None)
                .is_allowed()
        );
        assert!(matches!(
            authorizer.authorize(Some(&viewer), Resource::Patient, Action::Read, None),
            Decision::ConfigError { .. }
        ));
    }
}
