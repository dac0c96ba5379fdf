use serde::{Deserialize, Serialize};

pub const DEFAULT_APPLY_URL: &str = "http://localhost:5173/CandidateLogin";
pub const DEFAULT_COMPANY_FALLBACK: &str = "Our Company";

/// Knobs for invite rendering and auto-selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteSettings {
    /// Candidate portal link placed in every invite.
    pub apply_url: String,
    /// Company shown in the body when the opening has none.
    pub company_fallback: String,
    /// Whether auto-selection treats legacy `pending` records like `applied` ones.
    pub legacy_pending_eligible: bool,
}

impl Default for InviteSettings {
    fn default() -> Self {
        Self {
            apply_url: DEFAULT_APPLY_URL.to_string(),
            company_fallback: DEFAULT_COMPANY_FALLBACK.to_string(),
            legacy_pending_eligible: true,
        }
    }
}
