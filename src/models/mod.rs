mod comment;
mod photo;
mod tag;
mod transform;
mod user;

pub use comment::{Comment, CommentRequest};
pub use photo::{
    LikeResponse, Pagination, PhotoLinkTransform, PhotoRecord, PhotoResponse, PhotoSearch,
    PhotoTransformResponse, PhotoUpdate, PhotoUpload,
};
pub use tag::{Tag, TagRequest, TagResponse};
pub use transform::{
    TransformBody, TransformCircle, TransformEffect, TransformResize, TransformRotate,
    TransformText,
};
pub use user::{
    LoginForm, MessageResponse, RequestEmail, Role, RoleUpdate, SignupRequest, SignupResponse,
    TokenResponse, User, UserResponse, UserUpdate,
};
