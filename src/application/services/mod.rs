pub mod captcha_service;
pub mod deletion_registry;
pub mod form_service;
pub mod query_client;
pub mod retry;
pub mod smart_query;

pub use captcha_service::{CaptchaService, DEVELOPMENT_BYPASS_TOKEN};
pub use deletion_registry::{
    ActiveDeletions, DeletionGuard, DeletionRegistry, deletion_id, new_deletion_id,
};
pub use form_service::{FormService, FormTimeouts};
pub use query_client::{QueryClient, QueryOptions};
pub use retry::BackoffPolicy;
pub use smart_query::{PollingHandle, SmartQuery};
