pub mod validation;

pub use validation::{
    validate_app_name, validate_certificate_name, validate_domain, validate_env,
    validate_github_token, validate_location_code, validate_project,
};
