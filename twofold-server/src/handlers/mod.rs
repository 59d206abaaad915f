pub mod auth;
pub mod category;
pub mod cron;
pub mod dashboard;
pub mod health;
pub mod list;
pub mod partner;
pub mod transaction;
pub mod user;

pub mod verification {
    use std::str::FromStr;
    use tokio::sync::oneshot;
    use zeroize::Zeroizing;

    use super::error::HttpErrorResponse;
    use crate::env;

    pub async fn hash_password(password: &str) -> Result<String, HttpErrorResponse> {
        let password = Zeroizing::new(Vec::from(password.as_bytes()));
        let (sender, receiver) = oneshot::channel();

        rayon::spawn(move || {
            let hash_result = argon2_kdf::Hasher::default()
                .algorithm(argon2_kdf::Algorithm::Argon2id)
                .salt_length(env::CONF.hash_salt_length)
                .hash_length(env::CONF.hash_length)
                .iterations(env::CONF.hash_iterations)
                .memory_cost_kib(env::CONF.hash_mem_cost_kib)
                .threads(env::CONF.hash_threads)
                .secret(argon2_kdf::Secret::using_bytes(&env::CONF.hashing_key))
                .hash(&password);

            // The receiver only goes away if the request was dropped
            let _ = sender.send(hash_result.map(|h| h.to_string()));
        });

        match receiver.await? {
            Ok(hash) => Ok(hash),
            Err(e) => {
                log::error!("{e}");
                Err(HttpErrorResponse::InternalError("Failed to hash password".into()))
            }
        }
    }

    pub async fn verify_password(
        password: &str,
        password_hash: String,
    ) -> Result<bool, HttpErrorResponse> {
        let password = Zeroizing::new(Vec::from(password.as_bytes()));
        let (sender, receiver) = oneshot::channel();

        rayon::spawn(move || {
            let hash = match argon2_kdf::Hash::from_str(&password_hash) {
                Ok(h) => h,
                Err(e) => {
                    let _ = sender.send(Err(e));
                    return;
                }
            };

            let does_password_match_hash = hash.verify_with_secret(
                &password,
                argon2_kdf::Secret::using_bytes(&env::CONF.hashing_key),
            );

            let _ = sender.send(Ok(does_password_match_hash));
        });

        match receiver.await? {
            Ok(matches) => Ok(matches),
            Err(e) => {
                log::error!("{e}");
                Err(HttpErrorResponse::InternalError("Failed to validate password".into()))
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[actix_web::test]
        async fn test_hash_and_verify_password() {
            let hash = hash_password("correct horse battery").await.unwrap();

            assert!(verify_password("correct horse battery", hash.clone())
                .await
                .unwrap());
            assert!(!verify_password("incorrect horse battery", hash)
                .await
                .unwrap());
        }
    }
}

pub mod error {
    use twofold_common::partner::PartnerError;
    use twofold_common::request_io::inputs::FieldError;
    use twofold_common::token::TokenError;

    use actix_web::http::StatusCode;
    use actix_web::{HttpResponse, HttpResponseBuilder};
    use serde::Serialize;
    use std::borrow::Cow;
    use std::fmt;
    use tokio::sync::oneshot;

    #[derive(Debug)]
    pub enum DoesNotExistType {
        User,
        Partner,
        Category,
        Transaction,
        List,
        ListItem,
        Invitation,
    }

    #[derive(Debug)]
    pub enum HttpErrorResponse {
        // 400
        IncorrectlyFormed(Cow<'static, str>),
        InvalidFields(Vec<FieldError>),
        InvalidState(Cow<'static, str>),

        // 401
        IncorrectCredential(Cow<'static, str>),
        BadToken(Cow<'static, str>),
        TokenExpired(Cow<'static, str>),
        TokenMissing(Cow<'static, str>),

        // 403
        UserDisallowed(Cow<'static, str>),

        // 404
        DoesNotExist(Cow<'static, str>, DoesNotExistType),

        // 409
        ConflictWithExisting(Cow<'static, str>),

        // 500
        InternalError(Cow<'static, str>),
    }

    #[derive(Clone, Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ServerErrorResponse {
        pub err_type: &'static str,
        pub err_message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub fields: Option<Vec<FieldError>>,
    }

    impl HttpErrorResponse {
        pub fn invalid_field(field: &'static str, message: &'static str) -> Self {
            HttpErrorResponse::InvalidFields(vec![FieldError::new(field, message)])
        }
    }

    impl std::error::Error for HttpErrorResponse {}

    impl fmt::Display for HttpErrorResponse {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let server_error: ServerErrorResponse = self.into();
            write!(f, "{}: {}", server_error.err_type, server_error.err_message)
        }
    }

    impl From<&HttpErrorResponse> for ServerErrorResponse {
        fn from(resp: &HttpErrorResponse) -> Self {
            let (err_type, err_message) = match resp {
                // 400
                HttpErrorResponse::IncorrectlyFormed(msg) => {
                    ("IncorrectlyFormed", format!("Incorrectly formed request: {msg}"))
                }
                HttpErrorResponse::InvalidFields(_) => {
                    ("InvalidFields", String::from("One or more fields are invalid"))
                }
                HttpErrorResponse::InvalidState(msg) => {
                    ("InvalidState", format!("Invalid state: {msg}"))
                }

                // 401
                HttpErrorResponse::IncorrectCredential(msg) => {
                    ("IncorrectCredential", format!("Incorrect credential: {msg}"))
                }
                HttpErrorResponse::BadToken(msg) => ("BadToken", format!("Bad token: {msg}")),
                HttpErrorResponse::TokenExpired(msg) => {
                    ("TokenExpired", format!("Token expired: {msg}"))
                }
                HttpErrorResponse::TokenMissing(msg) => {
                    ("TokenMissing", format!("Token missing: {msg}"))
                }

                // 403
                HttpErrorResponse::UserDisallowed(msg) => {
                    ("UserDisallowed", format!("User disallowed: {msg}"))
                }

                // 404
                HttpErrorResponse::DoesNotExist(msg, dne_type) => (
                    match dne_type {
                        DoesNotExistType::User => "UserDoesNotExist",
                        DoesNotExistType::Partner => "PartnerDoesNotExist",
                        DoesNotExistType::Category => "CategoryDoesNotExist",
                        DoesNotExistType::Transaction => "TransactionDoesNotExist",
                        DoesNotExistType::List => "ListDoesNotExist",
                        DoesNotExistType::ListItem => "ListItemDoesNotExist",
                        DoesNotExistType::Invitation => "InvitationDoesNotExist",
                    },
                    format!("Does not exist: {msg}"),
                ),

                // 409
                HttpErrorResponse::ConflictWithExisting(msg) => (
                    "ConflictWithExisting",
                    format!("Conflict with existing data: {msg}"),
                ),

                // 500
                HttpErrorResponse::InternalError(msg) => {
                    ("InternalError", format!("Internal error: {msg}"))
                }
            };

            let fields = match resp {
                HttpErrorResponse::InvalidFields(fields) => Some(fields.clone()),
                _ => None,
            };

            ServerErrorResponse {
                err_type,
                err_message,
                fields,
            }
        }
    }

    impl actix_web::error::ResponseError for HttpErrorResponse {
        fn error_response(&self) -> HttpResponse {
            HttpResponseBuilder::new(self.status_code()).json(ServerErrorResponse::from(self))
        }

        fn status_code(&self) -> StatusCode {
            match *self {
                HttpErrorResponse::IncorrectlyFormed(_)
                | HttpErrorResponse::InvalidFields(_)
                | HttpErrorResponse::InvalidState(_) => StatusCode::BAD_REQUEST,
                HttpErrorResponse::IncorrectCredential(_)
                | HttpErrorResponse::BadToken(_)
                | HttpErrorResponse::TokenExpired(_)
                | HttpErrorResponse::TokenMissing(_) => StatusCode::UNAUTHORIZED,
                HttpErrorResponse::UserDisallowed(_) => StatusCode::FORBIDDEN,
                HttpErrorResponse::DoesNotExist(_, _) => StatusCode::NOT_FOUND,
                HttpErrorResponse::ConflictWithExisting(_) => StatusCode::CONFLICT,
                HttpErrorResponse::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl From<oneshot::error::RecvError> for HttpErrorResponse {
        fn from(_err: oneshot::error::RecvError) -> Self {
            HttpErrorResponse::InternalError(Cow::Borrowed("Rayon thread pool failure"))
        }
    }

    impl From<Vec<FieldError>> for HttpErrorResponse {
        fn from(fields: Vec<FieldError>) -> Self {
            HttpErrorResponse::InvalidFields(fields)
        }
    }

    impl From<TokenError> for HttpErrorResponse {
        fn from(err: TokenError) -> Self {
            match err {
                TokenError::TokenInvalid => {
                    HttpErrorResponse::BadToken(Cow::Borrowed("Token is invalid"))
                }
                TokenError::TokenExpired => {
                    HttpErrorResponse::TokenExpired(Cow::Borrowed("Token is expired"))
                }
                TokenError::TokenMissing => {
                    HttpErrorResponse::TokenMissing(Cow::Borrowed("Token is missing"))
                }
                TokenError::SigningFailed => {
                    HttpErrorResponse::InternalError(Cow::Borrowed("Failed to sign token"))
                }
            }
        }
    }

    impl From<PartnerError> for HttpErrorResponse {
        fn from(err: PartnerError) -> Self {
            match err {
                PartnerError::AlreadyPartnered => HttpErrorResponse::ConflictWithExisting(
                    Cow::Borrowed("A user in this pair already has a partner"),
                ),
                PartnerError::DuplicateInvitation => HttpErrorResponse::ConflictWithExisting(
                    Cow::Borrowed("A pending invitation already exists between these users"),
                ),
                PartnerError::SelfInvitation => {
                    HttpErrorResponse::InvalidState(Cow::Borrowed("Users cannot invite themselves"))
                }
                PartnerError::UserNotFound => HttpErrorResponse::DoesNotExist(
                    Cow::Borrowed("No user with the given ID"),
                    DoesNotExistType::User,
                ),
                PartnerError::InvitationNotFound => HttpErrorResponse::DoesNotExist(
                    Cow::Borrowed("Invitation not found"),
                    DoesNotExistType::Invitation,
                ),
                PartnerError::InvitationExpired => {
                    HttpErrorResponse::InvalidState(Cow::Borrowed("Invitation has expired"))
                }
                PartnerError::NotPermitted => HttpErrorResponse::UserDisallowed(Cow::Borrowed(
                    "User is not permitted to act on this invitation",
                )),
                PartnerError::NoPartner => HttpErrorResponse::DoesNotExist(
                    Cow::Borrowed("User does not have a partner"),
                    DoesNotExistType::Partner,
                ),
                PartnerError::Dao(e) => {
                    log::error!("{e}");
                    HttpErrorResponse::InternalError(Cow::Borrowed("Failed to update partnership"))
                }
            }
        }
    }

}
