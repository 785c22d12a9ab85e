use crate::{JobSpec, Profile, RequestId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start generation for a validated request.
    Run { request_id: RequestId, job: JobSpec },
    /// Abandon an in-flight request; its late results are ignored either way.
    Cancel { request_id: RequestId },
    /// Store the local session (profile and pending referral code).
    PersistSession {
        profile: Option<Profile>,
        referral: Option<String>,
    },
    /// A signed-in user arrived through a referral link.
    AttributeReferral { email: String, referral: String },
}
