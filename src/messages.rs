//! User-facing response messages.

pub const WELCOME_MESSAGE: &str = "Welcome to PhotoShare!";
pub const DB_CONFIG_ERROR: &str = "Database is not configured correctly";
pub const DB_CONNECT_ERROR: &str = "Error connecting to the database";

pub const NOT_FOUND: &str = "Not Found";
pub const ALREADY_EXISTS: &str = "Account already exists";
pub const DOESNT_EXISTS: &str = "Account doesn't exists";
pub const SUCCESS_CREATE_USER: &str =
    "User successfully created. Check your email for confirmation.";
pub const INVALID_PASSWORD: &str = "Invalid password";
pub const INVALID_TOKEN: &str = "Invalid refresh token";
pub const VERIFICATION_ERROR: &str = "Verification error";
pub const INVALID_EMAIL: &str = "Invalid email";
pub const EMAIL_NOT_CONFIRMED: &str = "Email not confirmed";
pub const EMAIL_ALREADY_CONFIRMED: &str = "Your email is already confirmed";
pub const EMAIL_CONFIRMED: &str = "Email successfully confirmed";
pub const CHECK_YOUR_EMAIL: &str = "Check your email for confirmation.";
pub const FAIL_EMAIL_VERIFICATION: &str = "Invalid token for email verification";
pub const INVALID_SCOPE: &str = "Invalid scope for token";
pub const NOT_VALIDATE_CREDENTIALS: &str = "Could not validate credentials";
pub const TOKEN_BLACKLISTED: &str = "Token is blacklisted";

pub const USER_NOT_ACTIVE: &str = "User is banned";
pub const USER_BANNED: &str = "User successfully banned";
pub const USER_ALREADY_NOT_ACTIVE: &str = "User already is banned";
pub const USER_IS_LOGOUT: &str = "Successfully logged out!";
pub const USER_ROLE_EXISTS: &str = "Role is already exists";
pub const USER_CHANGE_ROLE_TO: &str = "User role changed to";
pub const ADMIN_ROLE_LOCKED: &str = "Administrator role cannot be changed";

pub const TOO_MANY_HASHTAGS: &str = "Too many hashtags! Maximum 5.";
pub const TAG_ALREADY_EXISTS: &str = "This tag already exists. Please enter another tag";

pub const PHOTO_NOT_FOUND: &str = "Photo not found";
pub const NO_POST_ID: &str = "No post with this ID.";
pub const COMM_NOT_FOUND: &str = "Comment not found or not available.";
pub const PERMISSION_DENIED: &str = "Permission denied";
pub const OPERATION_FORBIDDEN: &str = "Operation forbidden";

pub const ALREADY_LIKED: &str = "You already liked this photo";
pub const CANNOT_LIKE_OWN: &str = "You cannot like your own photo";
pub const LIKE_NOT_FOUND: &str = "Like not found";

pub const NO_TRANSFORMATION: &str = "No transformation selected";
pub const TRANSFORM_SUCCESS: &str = "Image successfully transform";
pub const NO_TRANSFORMED_IMAGE: &str = "Photo has no transformed image yet";
pub const UNSUPPORTED_IMAGE: &str = "Only PNG, JPEG, WEBP and GIF images are allowed";
pub const MISSING_IMAGE: &str = "Image file is required";
