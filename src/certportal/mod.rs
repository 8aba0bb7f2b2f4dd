pub mod client;
pub mod mock;
pub mod token;
pub mod types;

pub use client::{CertPortalApi, CertPortalClient};
pub use mock::{MockCertPortal, RecordedCall};
pub use types::{
    ApiResult, CertificatePayload, DraftPayload, FactoryPayload, ResponsiblePersonPayload,
    SignaturePayload, TeamMember,
};
