pub mod models;
pub mod payloads;
pub mod transform;

pub use models::{
    NormalizedPullRequest, NormalizedRepository, NormalizedReview, NormalizedUser, ReviewState,
};
pub use payloads::{PullPayload, RepoPayload, ReviewPayload, UserRef};
pub use transform::{
    normalize_pull, normalize_repo, normalize_review, normalize_user, ValidationError,
};
