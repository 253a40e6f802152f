pub const SAVE_PROGRESS_URL: &str = "/api/progress/save";
pub const GUIDED_SYNC_URL: &str = "/api/progress/guided-learning/sync";
pub const FREE_STYLE_SYNC_URL: &str = "/api/progress/free-style/sync";
pub const FREE_STYLE_PROGRESS_URL: &str = "/api/progress/free-style";

pub fn plan_hierarchy_url(plan_id: &str) -> String {
    format!("/api/plans/{plan_id}/hierarchy")
}

pub fn guided_progress_url(plan_id: &str) -> String {
    format!("/api/progress/guided-learning/{plan_id}")
}

pub const PROGRESS_SUMMARY_COOKIE_NAME: &str = "progress-summary";
pub const PROGRESS_SUMMARY_COOKIE_MAX_AGE: i64 = 30 * 24 * 60 * 60;

// Outbox key conventions, shared between the sync client and anything that
// stores pending progress locally.
pub const GUIDED_OUTBOX_PREFIX: &str = "guided-practice-progress-";
pub const FREE_STYLE_OUTBOX_KEY: &str = "free-style-practice-progress";

pub fn guided_outbox_key(plan_id: &str) -> String {
    format!("{GUIDED_OUTBOX_PREFIX}{plan_id}")
}

// Learning modes carried on answer events
pub const GUIDED_MODE: &str = "guided";
pub const FREE_STYLE_MODE: &str = "free-style";
