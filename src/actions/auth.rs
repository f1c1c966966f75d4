//! Sign-up, sign-in and email verification actions.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;
use validator::Validate;

use super::{codes, run_action, run_authenticated_action, validate, ActionContext, ActionError, ActionResult};
use crate::auth::{
    digest_token, hash_password, normalize_email, verify_password, AuthSettings, Session,
    VerificationToken,
};
use crate::database::models::{NewUser, UserProfile};

const ACCOUNT_EXISTS_UNVERIFIED: &str = "An account with this email already exists. Please check your email for the verification link or use the button below to resend it.";
const CHECK_YOUR_EMAIL: &str = "Please check your email to verify your account before signing in.";
const VERIFY_BEFORE_SIGN_IN: &str = "Please verify your email before signing in. Check your inbox for the verification link.";
const INVALID_CREDENTIALS: &str = "Invalid login credentials";
const INVALID_VERIFICATION_TOKEN: &str = "Invalid verification token";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignUpInput {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignInInput {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignUpOutcome {
    /// No confirmation needed; the account is usable right away
    SignedIn(Session),
    VerificationRequired { email: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

pub async fn sign_up(
    ctx: &ActionContext,
    settings: &AuthSettings,
    input: SignUpInput,
) -> ActionResult<SignUpOutcome> {
    run_action(ctx, false, move |client, _| async move {
        validate(&input)?;
        let email = normalize_email(&input.email);

        if let Some(existing) = client.find_user_by_email(&email).await? {
            return Err(if existing.is_confirmed() {
                ActionError::conflict("User already registered")
            } else {
                ActionError::with_code(ACCOUNT_EXISTS_UNVERIFIED, codes::UNVERIFIED_EMAIL)
            });
        }

        let password_hash = hash_password(&input.password, settings.bcrypt_cost).await?;

        if !settings.require_email_confirmation {
            let user = client
                .create_user(NewUser {
                    email,
                    password_hash,
                    confirmed: true,
                    verification_token_hash: None,
                })
                .await?;
            info!(user_id = %user.id, "Registered account");
            return Ok(SignUpOutcome::SignedIn(settings.issue_session(&user)?));
        }

        let token = VerificationToken::generate();
        let user = client
            .create_user(NewUser {
                email,
                password_hash,
                confirmed: false,
                verification_token_hash: Some(token.digest()),
            })
            .await?;
        info!(user_id = %user.id, "Registered account pending email verification");
        announce_verification_link(settings, &user.email, &token)?;

        Ok(SignUpOutcome::VerificationRequired {
            email: user.email,
            message: CHECK_YOUR_EMAIL.to_string(),
        })
    })
    .await
}

pub async fn sign_in(ctx: &ActionContext, settings: &AuthSettings, input: SignInInput) -> ActionResult<Session> {
    run_action(ctx, false, move |client, _| async move {
        validate(&input)?;
        let email = normalize_email(&input.email);
        let invalid = || ActionError::with_code(INVALID_CREDENTIALS, codes::INVALID_CREDENTIALS);

        let user = client.find_user_by_email(&email).await?.ok_or_else(invalid)?;
        if !verify_password(&input.password, &user.password_hash).await? {
            debug!(user_id = %user.id, "Rejected sign-in: wrong password");
            return Err(invalid());
        }
        if !user.is_confirmed() {
            return Err(ActionError::with_code(VERIFY_BEFORE_SIGN_IN, codes::UNVERIFIED_EMAIL));
        }

        Ok(settings.issue_session(&user)?)
    })
    .await
}

/// Sessions are stateless tokens; the transport drops its copy
pub async fn sign_out(ctx: &ActionContext) -> ActionResult<Notice> {
    run_action(ctx, false, |_, identity| async move {
        if let Some(identity) = identity {
            debug!(user_id = %identity.user_id, "Signed out");
        }
        Ok(Notice::new("Signed out"))
    })
    .await
}

pub async fn current_user(ctx: &ActionContext) -> ActionResult<UserProfile> {
    run_authenticated_action(ctx, |client, identity| async move {
        let user = client
            .find_user(identity.user_id)
            .await?
            .ok_or(ActionError::Unauthorized)?;
        Ok(user.profile())
    })
    .await
}

pub async fn verify_email(ctx: &ActionContext, token: &str) -> ActionResult<UserProfile> {
    let digest = digest_token(token.trim());
    run_action(ctx, false, move |client, _| async move {
        let user = client
            .confirm_user_by_token(&digest)
            .await?
            .ok_or_else(|| ActionError::not_found(INVALID_VERIFICATION_TOKEN))?;
        info!(user_id = %user.id, "Email verified");
        Ok(user.profile())
    })
    .await
}

/// Issue a fresh verification token for an account that has not been confirmed yet
pub async fn resend_verification(
    ctx: &ActionContext,
    settings: &AuthSettings,
    email: &str,
) -> ActionResult<Notice> {
    let email = normalize_email(email);
    run_action(ctx, false, move |client, _| async move {
        let user = client.find_user_by_email(&email).await?.ok_or_else(|| {
            ActionError::not_found("Unable to resend verification email. Please try again later.")
        })?;
        if user.is_confirmed() {
            return Err(ActionError::with_code(
                "Unable to resend verification email. The account may already be verified.",
                codes::ALREADY_VERIFIED,
            ));
        }

        let token = VerificationToken::generate();
        client.set_verification_token(user.id, &token.digest()).await?;
        announce_verification_link(settings, &user.email, &token)?;

        Ok(Notice::new("Verification email sent! Please check your inbox."))
    })
    .await
}

/// Mail delivery lives outside this service; the link goes to the operational log
fn announce_verification_link(
    settings: &AuthSettings,
    email: &str,
    token: &VerificationToken,
) -> Result<(), ActionError> {
    let mut link = Url::parse(&settings.app_url)
        .and_then(|base| base.join("/auth/verify"))
        .map_err(anyhow::Error::from)?;
    link.query_pairs_mut().append_pair("token", token.as_str());
    info!(email = %email, link = %link, "Verification link issued");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Backend;
    use crate::testing::{auth_settings, TestContext};

    fn sign_up_input(email: &str) -> SignUpInput {
        SignUpInput {
            email: email.to_string(),
            password: "hunter2hunter2".to_string(),
        }
    }

    fn sign_in_input(email: &str, password: &str) -> SignInInput {
        SignInInput {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn sign_up_without_confirmation_signs_in() {
        let test = TestContext::new();
        let settings = auth_settings(false);

        let outcome = sign_up(&test.anonymous(), &settings, sign_up_input(" Fan@Example.com "))
            .await
            .into_result()
            .unwrap();
        match outcome {
            SignUpOutcome::SignedIn(session) => {
                assert_eq!(session.user.email, "fan@example.com");
                assert!(settings.validate_jwt(&session.token).is_ok());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn sign_up_rejects_weak_password_and_bad_email() {
        let test = TestContext::new();
        let settings = auth_settings(false);
        let result = sign_up(
            &test.anonymous(),
            &settings,
            SignUpInput {
                email: "not-an-email".to_string(),
                password: "short".to_string(),
            },
        )
        .await;
        assert_eq!(result.code(), Some(codes::VALIDATION_ERROR));
        assert_eq!(
            result.error(),
            Some("Invalid email address; Password must be at least 8 characters")
        );
    }

    #[tokio::test]
    async fn confirmation_flow_end_to_end() {
        let test = TestContext::new();
        let settings = auth_settings(true);
        let ctx = test.anonymous();

        let outcome = sign_up(&ctx, &settings, sign_up_input("fan@example.com"))
            .await
            .into_result()
            .unwrap();
        assert!(matches!(outcome, SignUpOutcome::VerificationRequired { .. }));

        // Signing up again points the user at the resend flow
        let again = sign_up(&ctx, &settings, sign_up_input("fan@example.com")).await;
        assert_eq!(again.code(), Some(codes::UNVERIFIED_EMAIL));
        assert_eq!(again.error(), Some(ACCOUNT_EXISTS_UNVERIFIED));

        let blocked = sign_in(&ctx, &settings, sign_in_input("fan@example.com", "hunter2hunter2")).await;
        assert_eq!(blocked.code(), Some(codes::UNVERIFIED_EMAIL));

        // Resending rotates the token; install a known one to finish the flow
        let resent = resend_verification(&ctx, &settings, "FAN@example.com").await;
        assert!(resent.is_success());
        let user = test.backend.find_user_by_email("fan@example.com").await.unwrap().unwrap();
        let token = VerificationToken::generate();
        test.backend.set_verification_token(user.id, &token.digest()).await.unwrap();

        let verified = verify_email(&ctx, token.as_str()).await.into_result().unwrap();
        assert!(verified.email_confirmed);

        let reused = verify_email(&ctx, token.as_str()).await;
        assert_eq!(reused.code(), Some(codes::NOT_FOUND));
        assert_eq!(reused.error(), Some(INVALID_VERIFICATION_TOKEN));

        let session = sign_in(&ctx, &settings, sign_in_input("fan@example.com", "hunter2hunter2"))
            .await
            .into_result()
            .unwrap();
        assert_eq!(session.user.id, user.id);

        let after = resend_verification(&ctx, &settings, "fan@example.com").await;
        assert_eq!(after.code(), Some(codes::ALREADY_VERIFIED));
    }

    #[tokio::test]
    async fn resend_never_creates_accounts() {
        let test = TestContext::new();
        let settings = auth_settings(true);
        let result = resend_verification(&test.anonymous(), &settings, "nobody@example.com").await;
        assert_eq!(result.code(), Some(codes::NOT_FOUND));
        assert!(test.backend.find_user_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sign_in_rejects_bad_credentials_uniformly() {
        let test = TestContext::new();
        let settings = auth_settings(false);
        let ctx = test.anonymous();
        sign_up(&ctx, &settings, sign_up_input("fan@example.com")).await.into_result().unwrap();

        let wrong_password = sign_in(&ctx, &settings, sign_in_input("fan@example.com", "nope-nope")).await;
        let unknown_user = sign_in(&ctx, &settings, sign_in_input("ghost@example.com", "nope-nope")).await;
        for result in [wrong_password, unknown_user] {
            assert_eq!(result.code(), Some(codes::INVALID_CREDENTIALS));
            assert_eq!(result.error(), Some(INVALID_CREDENTIALS));
        }
    }

    #[tokio::test]
    async fn duplicate_confirmed_sign_up_conflicts() {
        let test = TestContext::new();
        let settings = auth_settings(false);
        let ctx = test.anonymous();
        sign_up(&ctx, &settings, sign_up_input("fan@example.com")).await.into_result().unwrap();

        let again = sign_up(&ctx, &settings, sign_up_input("fan@example.com")).await;
        assert_eq!(again.code(), Some(codes::CONFLICT));
    }

    #[tokio::test]
    async fn current_user_needs_session() {
        let test = TestContext::new();
        assert_eq!(current_user(&test.anonymous()).await.code(), Some(codes::UNAUTHORIZED));

        let (user, identity) = test.user("fan@example.com").await;
        let profile = current_user(&test.as_caller(identity)).await.into_result().unwrap();
        assert_eq!(profile.id, user.id);
    }

    #[tokio::test]
    async fn sign_out_is_always_successful() {
        let test = TestContext::new();
        let result = sign_out(&test.anonymous()).await;
        assert_eq!(result.into_result().unwrap().message, "Signed out");
    }
}
