use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Validate, Deserialize)]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 3, max = 20, message = "Username must be 3-20 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 100, message = "Password must be 8-100 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Validate, Deserialize)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 3, max = 20, message = "Username must be 3-20 characters"))]
    pub username: Option<String>,
    #[validate(length(max = 300, message = "Bio must be at most 300 characters"))]
    pub bio: Option<String>,
    pub profile_image: Option<String>,
}

#[derive(Debug, Validate, Deserialize)]
pub struct CreatePostRequest {
    #[validate(length(min = 3, max = 500, message = "Caption must be 3-500 characters"))]
    pub caption: String,
    #[validate(length(min = 1, message = "Image is required"))]
    pub image_data: String,
    #[validate(length(max = 200, message = "Location must be at most 200 characters"))]
    pub location: Option<String>,
}

/// `vote_type` stays a string here so an unknown kind is reported as an
/// invalid vote kind rather than a body parse failure.
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub vote_type: String,
}

#[derive(Debug, Validate, Deserialize)]
pub struct AddCommentRequest {
    #[validate(length(min = 1, max = 1000, message = "Comment must be 1-1000 characters"))]
    pub text: String,
}
