//! 领域模型

pub mod clinical_note;
pub mod data_quality;
pub mod lab_order;
pub mod message;
pub mod patient;
pub mod repositories;
pub mod user;

pub use clinical_note::ClinicalNote;
pub use data_quality::{DataQualityIssue, IssueStatus};
pub use lab_order::{LabOrder, LabOrderStatus};
pub use message::Message;
pub use patient::Patient;
pub use user::{User, UserView};
