//! medrec-auth-core - 认证与授权核心库
//!
//! 角色、主体、JWT、权限矩阵与授权决策

pub mod authorizer;
pub mod matrix;
pub mod password;
pub mod principal;
pub mod resource;
pub mod role;
pub mod token;

pub use authorizer::{AccessContext, AllowedBy, Authorizer, Decision, DenyReason};
pub use matrix::{GrantScope, PermissionMatrix, PermissionMatrixBuilder, PermissionRule};
pub use password::PasswordService;
pub use principal::Principal;
pub use resource::{Action, Resource};
pub use role::Role;
pub use token::{Claims, TokenService};
