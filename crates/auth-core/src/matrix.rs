//! 权限矩阵
//!
//! (resource, action) → 允许的角色集合。矩阵在进程启动时构建一次，之后只读共享。
//! 未定义的 (resource, action) 是配置错误，不是拒绝。

use std::collections::{BTreeMap, HashMap};

use crate::resource::{Action, Resource};
use crate::role::Role;

/// 角色授权范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantScope {
    /// 可作用于任意实例
    Any,
    /// 仅可作用于自己拥有的实例
    Own,
}

/// 单条权限规则
#[derive(Debug, Clone, Default)]
pub struct PermissionRule {
    grants: BTreeMap<Role, GrantScope>,
    owner_override: bool,
}

impl PermissionRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// 授予角色对任意实例的权限
    pub fn allow(mut self, roles: &[Role]) -> Self {
        for role in roles {
            self.grants.insert(*role, GrantScope::Any);
        }
        self
    }

    /// 授予角色仅对自有实例的权限
    pub fn allow_own(mut self, roles: &[Role]) -> Self {
        for role in roles {
            self.grants.entry(*role).or_insert(GrantScope::Own);
        }
        self
    }

    /// 标记为自作用域操作：实例所有者无论角色均可执行
    pub fn owner_override(mut self) -> Self {
        self.owner_override = true;
        self
    }

    pub fn scope_for(&self, role: Role) -> Option<GrantScope> {
        self.grants.get(&role).copied()
    }

    pub fn is_owner_override(&self) -> bool {
        self.owner_override
    }

    /// 规则中出现的所有角色（有序）
    pub fn roles(&self) -> Vec<Role> {
        self.grants.keys().copied().collect()
    }

    /// 可作用于任意实例的角色（有序）
    pub fn unrestricted_roles(&self) -> Vec<Role> {
        self.grants
            .iter()
            .filter(|(_, scope)| **scope == GrantScope::Any)
            .map(|(role, _)| *role)
            .collect()
    }
}

/// 权限矩阵
#[derive(Debug, Clone)]
pub struct PermissionMatrix {
    rules: HashMap<(Resource, Action), PermissionRule>,
}

impl PermissionMatrix {
    pub fn builder() -> PermissionMatrixBuilder {
        PermissionMatrixBuilder::default()
    }

    /// 查询允许的角色；`None` 表示矩阵缺少该条目（配置错误）
    pub fn allowed_roles(&self, resource: Resource, action: Action) -> Option<Vec<Role>> {
        self.rules.get(&(resource, action)).map(PermissionRule::roles)
    }

    pub fn rule(&self, resource: Resource, action: Action) -> Option<&PermissionRule> {
        self.rules.get(&(resource, action))
    }

    pub fn contains(&self, resource: Resource, action: Action) -> bool {
        self.rules.contains_key(&(resource, action))
    }

    /// 已定义的所有 (resource, action)
    pub fn pairs(&self) -> impl Iterator<Item = (Resource, Action)> + '_ {
        self.rules.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 医院默认权限矩阵
    pub fn hospital_default() -> Self {
        use Action::*;
        use Role::*;

        let everyone = [
            RecordsStaff,
            Clinician,
            LabTech,
            Radiographer,
            DataManager,
            Viewer,
        ];

        let writers = [RecordsStaff, Clinician];

        PermissionMatrix::builder()
            // 患者
            .rule(Resource::Patient, Create, PermissionRule::new().allow(&writers))
            .rule(Resource::Patient, Read, PermissionRule::new().allow(&everyone))
            .rule(Resource::Patient, Update, PermissionRule::new().allow(&writers))
            .rule(Resource::Patient, Delete, PermissionRule::new())
            // 就诊
            .rule(Resource::Encounter, Create, PermissionRule::new().allow(&writers))
            .rule(Resource::Encounter, Read, PermissionRule::new().allow(&everyone))
            .rule(Resource::Encounter, Update, PermissionRule::new().allow(&writers))
            .rule(Resource::Encounter, Close, PermissionRule::new().allow(&writers))
            .rule(Resource::Encounter, Delete, PermissionRule::new())
            // 病程记录：临床医生只能修改自己写的
            .rule(Resource::ClinicalNote, Create, PermissionRule::new().allow(&[Clinician]))
            .rule(
                Resource::ClinicalNote,
                Read,
                PermissionRule::new().allow(&[Clinician, RecordsStaff, DataManager]),
            )
            .rule(Resource::ClinicalNote, Update, PermissionRule::new().allow_own(&[Clinician]))
            .rule(Resource::ClinicalNote, Delete, PermissionRule::new())
            // 检验医嘱
            .rule(Resource::LabOrder, Create, PermissionRule::new().allow(&[Clinician]))
            .rule(
                Resource::LabOrder,
                Read,
                PermissionRule::new().allow(&[Clinician, LabTech, RecordsStaff, DataManager]),
            )
            .rule(Resource::LabOrder, Update, PermissionRule::new().allow(&[LabTech]))
            .rule(Resource::LabOrder, Approve, PermissionRule::new().allow(&[LabTech, Clinician]))
            .rule(Resource::LabOrder, Amend, PermissionRule::new().allow(&[LabTech]))
            .rule(Resource::LabOrder, Close, PermissionRule::new().allow(&[LabTech, Clinician]))
            .rule(Resource::LabOrder, Delete, PermissionRule::new())
            // 影像医嘱
            .rule(Resource::RadiologyOrder, Create, PermissionRule::new().allow(&[Clinician]))
            .rule(
                Resource::RadiologyOrder,
                Read,
                PermissionRule::new().allow(&[Clinician, Radiographer, RecordsStaff, DataManager]),
            )
            .rule(Resource::RadiologyOrder, Update, PermissionRule::new().allow(&[Radiographer]))
            .rule(
                Resource::RadiologyOrder,
                Approve,
                PermissionRule::new().allow(&[Radiographer, Clinician]),
            )
            .rule(Resource::RadiologyOrder, Amend, PermissionRule::new().allow(&[Radiographer]))
            .rule(
                Resource::RadiologyOrder,
                Close,
                PermissionRule::new().allow(&[Radiographer, Clinician]),
            )
            .rule(Resource::RadiologyOrder, Delete, PermissionRule::new())
            // 病案
            .rule(Resource::Record, Create, PermissionRule::new().allow(&[RecordsStaff]))
            .rule(
                Resource::Record,
                Read,
                PermissionRule::new().allow(&[RecordsStaff, Clinician, DataManager]),
            )
            .rule(Resource::Record, Update, PermissionRule::new().allow(&[RecordsStaff]))
            .rule(Resource::Record, Delete, PermissionRule::new())
            // KPI
            .rule(Resource::Kpi, Create, PermissionRule::new().allow(&[DataManager]))
            .rule(
                Resource::Kpi,
                Read,
                PermissionRule::new().allow(&[DataManager, RecordsStaff, Viewer]),
            )
            .rule(Resource::Kpi, Update, PermissionRule::new().allow(&[DataManager]))
            .rule(Resource::Kpi, Delete, PermissionRule::new())
            // 数据质量问题
            .rule(
                Resource::DataQuality,
                Create,
                PermissionRule::new().allow(&[DataManager, RecordsStaff, Clinician]),
            )
            .rule(
                Resource::DataQuality,
                Read,
                PermissionRule::new().allow(&[DataManager, RecordsStaff]),
            )
            .rule(Resource::DataQuality, Update, PermissionRule::new().allow(&[DataManager]))
            .rule(Resource::DataQuality, Close, PermissionRule::new().allow(&[DataManager]))
            .rule(Resource::DataQuality, Delete, PermissionRule::new())
            // 用户：本人可读取/修改自己的资料
            .rule(Resource::User, Create, PermissionRule::new())
            .rule(Resource::User, Read, PermissionRule::new().owner_override())
            .rule(Resource::User, Update, PermissionRule::new().owner_override())
            .rule(Resource::User, Deactivate, PermissionRule::new())
            .rule(Resource::User, Delete, PermissionRule::new())
            // 站内消息：收件人可标记已读、删除
            .rule(Resource::Message, Create, PermissionRule::new().allow(&everyone))
            .rule(Resource::Message, Read, PermissionRule::new().allow(&everyone))
            .rule(Resource::Message, Update, PermissionRule::new().owner_override())
            .rule(Resource::Message, Delete, PermissionRule::new().owner_override())
            // 审计日志
            .rule(Resource::Audit, Read, PermissionRule::new().allow(&[DataManager]))
            .build()
    }
}

/// 权限矩阵构建器
///
/// `build` 时为每条规则补入 admin（Any），admin 是唯一的全局超集授予者
#[derive(Debug, Default)]
pub struct PermissionMatrixBuilder {
    rules: HashMap<(Resource, Action), PermissionRule>,
}

impl PermissionMatrixBuilder {
    pub fn rule(mut self, resource: Resource, action: Action, rule: PermissionRule) -> Self {
        self.rules.insert((resource, action), rule);
        self
    }

    pub fn build(self) -> PermissionMatrix {
        let rules = self
            .rules
            .into_iter()
            .map(|(key, mut rule)| {
                rule.grants.insert(Role::Admin, GrantScope::Any);
                (key, rule)
            })
            .collect();
        PermissionMatrix { rules }
    }
}
