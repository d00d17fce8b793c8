//! Authentication flows: registration, login, token refresh and logout.
//! Login failures feed both the per-account lockout counter and the
//! per-address rate limit; refresh tokens are rotated on every use.

use crate::{
    auth::{jwt::JwtService, password::PasswordHasher},
    config::AppConfig,
    error::AppError,
    models::{
        auth::*,
        business::BusinessSummary,
        user::{Role, User, UserResponse},
    },
    repository::{AuthRepository, BusinessRepository, UserRepository},
};
use chrono::{Duration, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Window over which login failures from one address are counted
const FAILURE_WINDOW_SECS: i64 = 900;
/// Failures from one address within the window before requests are refused
const MAX_FAILURES_PER_IP: i64 = 20;

pub struct AuthService {
    db: PgPool,
    users: UserRepository,
    auth_repo: AuthRepository,
    businesses: BusinessRepository,
    jwt: Arc<JwtService>,
    hasher: PasswordHasher,
    config: Arc<AppConfig>,
}

impl AuthService {
    pub fn new(db: PgPool, jwt: Arc<JwtService>, config: Arc<AppConfig>) -> Self {
        Self {
            users: UserRepository::new(db.clone()),
            auth_repo: AuthRepository::new(db.clone()),
            businesses: BusinessRepository::new(db.clone()),
            db,
            jwt,
            hasher: PasswordHasher::new(),
            config,
        }
    }

    /// Register a new account. A matching superadmin code creates a
    /// platform superadmin; otherwise a business plus its admin user is
    /// created atomically.
    pub async fn register(&self, req: &RegisterRequest) -> Result<UserResponse, AppError> {
        if !crate::models::user::is_valid_username(&req.username) {
            return Err(AppError::BadRequest(
                "Username may only contain letters, digits, '_', '.' and '-'".to_string(),
            ));
        }
        PasswordHasher::validate_password_policy(&req.password, &self.config)?;

        let wants_superadmin = req
            .superadmin_code
            .as_deref()
            .is_some_and(|code| code == self.config.security.superadmin_code.expose_secret());

        if req.superadmin_code.is_some() && !wants_superadmin {
            return Err(AppError::Forbidden);
        }

        if wants_superadmin {
            if self.users.username_exists(None, &req.username).await? {
                return Err(AppError::Conflict("Username is already taken".to_string()));
            }

            let password_hash = self.hasher.hash(&req.password)?;
            let user = sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (business_id, username, email, password_hash, full_name, role)
                VALUES (NULL, $1, $2, $3, $4, 'superadmin')
                RETURNING *
                "#,
            )
            .bind(&req.username)
            .bind(&req.email)
            .bind(&password_hash)
            .bind(&req.full_name)
            .fetch_one(&self.db)
            .await?;

            tracing::info!(username = %user.username, "Superadmin registered");
            return Ok(user.into());
        }

        let business_name = req
            .business_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("business_name is required".to_string()))?;

        let password_hash = self.hasher.hash(&req.password)?;
        let business_code = BusinessRepository::generate_business_code();

        // Business and its first admin must exist together or not at all
        let mut tx = self.db.begin().await?;

        let business_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO businesses
                (name, business_code, owner_name, owner_phone, address, monthly_fee, grace_period_days)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(business_name)
        .bind(&business_code)
        .bind(&req.full_name)
        .bind(&req.business_phone)
        .bind(&req.business_address)
        .bind(self.config.billing.default_monthly_fee)
        .bind(self.config.billing.default_grace_period_days as i32)
        .fetch_one(&mut *tx)
        .await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (business_id, username, email, password_hash, full_name, role)
            VALUES ($1, $2, $3, $4, $5, 'admin')
            RETURNING *
            "#,
        )
        .bind(business_id)
        .bind(&req.username)
        .bind(&req.email)
        .bind(&password_hash)
        .bind(&req.full_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("Username is already taken".to_string())
            }
            _ => AppError::Database(e),
        })?;

        tx.commit().await?;

        tracing::info!(
            business_code = %business_code,
            username = %user.username,
            "Business registered"
        );

        Ok(user.into())
    }

    pub async fn login(
        &self,
        req: &LoginRequest,
        source_ip: &str,
        user_agent: Option<&str>,
    ) -> Result<LoginResponse, AppError> {
        let recent_failures = self
            .auth_repo
            .count_recent_login_failures(source_ip, FAILURE_WINDOW_SECS)
            .await?;
        if recent_failures >= MAX_FAILURES_PER_IP {
            tracing::warn!(source_ip, "Login rate limit exceeded");
            return Err(AppError::RateLimitExceeded);
        }

        let user = match self.users.find_by_identifier(&req.identifier).await? {
            Some(user) => user,
            None => {
                self.record_failure(None, &req.identifier, "unknown_user", source_ip, user_agent)
                    .await;
                return Err(AppError::Unauthorized);
            }
        };

        if let Some(locked_until) = user.locked_until {
            if locked_until > Utc::now() {
                self.record_failure(
                    Some(user.id),
                    &user.username,
                    "account_locked",
                    source_ip,
                    user_agent,
                )
                .await;
                return Err(AppError::Unauthorized);
            }
        }

        if user.status != "active" {
            self.record_failure(
                Some(user.id),
                &user.username,
                "account_inactive",
                source_ip,
                user_agent,
            )
            .await;
            return Err(AppError::Unauthorized);
        }

        if self.hasher.verify(&req.password, &user.password_hash).is_err() {
            self.users.increment_failed_attempts(user.id).await?;

            let attempts = user.failed_login_attempts as u32 + 1;
            if attempts >= self.config.security.max_login_attempts {
                let until = Utc::now()
                    + Duration::seconds(self.config.security.login_lockout_duration_secs as i64);
                self.users.lock_account(user.id, until).await?;
                tracing::warn!(username = %user.username, "Account locked after repeated failures");
            }

            self.record_failure(
                Some(user.id),
                &user.username,
                "bad_password",
                source_ip,
                user_agent,
            )
            .await;
            return Err(AppError::Unauthorized);
        }

        // Tenant payment state gates tenant users, not superadmins
        let mut business_summary = None;
        let mut payment_warning = None;
        if let Some(business_id) = user.business_id {
            let business = self
                .businesses
                .find_by_id(business_id)
                .await?
                .ok_or(AppError::Unauthorized)?;

            if business.payment_status == "suspended" || !business.is_active {
                self.record_failure(
                    Some(user.id),
                    &user.username,
                    "business_suspended",
                    source_ip,
                    user_agent,
                )
                .await;
                return Err(AppError::Forbidden);
            }

            if business.payment_status == "grace_period" {
                payment_warning = Some(match business.grace_period_end_date {
                    Some(end) => format!(
                        "Subscription payment overdue. Access will be suspended after {}.",
                        end
                    ),
                    None => "Subscription payment overdue.".to_string(),
                });
            }

            business_summary = Some(BusinessSummary::from(&business));
        } else if user.role() != Role::Superadmin {
            return Err(AppError::Unauthorized);
        }

        self.users.reset_failed_attempts(user.id).await?;

        let tokens = self
            .jwt
            .generate_token_pair(&user.id, &user.username, &user.role, user.business_id)?;

        self.store_refresh_token(&user, &tokens.refresh_token, source_ip, user_agent, None)
            .await?;

        self.auth_repo
            .record_login_event(&LoginEvent {
                id: Uuid::new_v4(),
                user_id: Some(user.id),
                username: user.username.clone(),
                event_type: "login_success".to_string(),
                failure_reason: None,
                source_ip: source_ip.to_string(),
                user_agent: user_agent.map(|s| s.to_string()),
                occurred_at: Utc::now(),
            })
            .await?;

        tracing::info!(username = %user.username, "User logged in");

        Ok(LoginResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            user: user.into(),
            business: business_summary,
            payment_warning,
        })
    }

    /// Rotate a refresh token: the presented token is revoked and a new
    /// pair issued. A previously revoked token is rejected outright.
    pub async fn refresh(
        &self,
        req: &RefreshTokenRequest,
        source_ip: &str,
        user_agent: Option<&str>,
    ) -> Result<LoginResponse, AppError> {
        self.jwt.validate_refresh_token(&req.refresh_token)?;

        let token_hash = AuthRepository::hash_token(&req.refresh_token);
        let stored = self
            .auth_repo
            .find_refresh_token_by_hash(&token_hash)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if stored.revoked_at.is_some() || stored.expires_at < Utc::now() {
            return Err(AppError::Unauthorized);
        }

        let user = self
            .users
            .find_by_id(&stored.user_id)
            .await?
            .filter(|u| u.status == "active")
            .ok_or(AppError::Unauthorized)?;

        if let Some(business_id) = user.business_id {
            let business = self
                .businesses
                .find_by_id(business_id)
                .await?
                .ok_or(AppError::Unauthorized)?;
            if business.payment_status == "suspended" || !business.is_active {
                return Err(AppError::Forbidden);
            }
        }

        let tokens = self
            .jwt
            .generate_token_pair(&user.id, &user.username, &user.role, user.business_id)?;

        let new_id = self
            .store_refresh_token(&user, &tokens.refresh_token, source_ip, user_agent, None)
            .await?;
        self.auth_repo.mark_replaced(stored.id, new_id).await?;

        Ok(LoginResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            user: user.into(),
            business: None,
            payment_warning: None,
        })
    }

    /// Revoke the presented refresh token
    pub async fn logout(&self, user_id: Uuid, req: &LogoutRequest) -> Result<(), AppError> {
        let token_hash = AuthRepository::hash_token(&req.refresh_token);
        self.auth_repo
            .revoke_refresh_token_by_hash(&token_hash, user_id)
            .await?;

        Ok(())
    }

    /// Revoke every refresh token the user holds
    pub async fn logout_all(&self, user_id: Uuid) -> Result<u64, AppError> {
        self.auth_repo.revoke_all_refresh_tokens(user_id).await
    }

    async fn store_refresh_token(
        &self,
        user: &User,
        refresh_token: &str,
        source_ip: &str,
        user_agent: Option<&str>,
        replaced_by: Option<Uuid>,
    ) -> Result<Uuid, AppError> {
        let now = Utc::now();
        let record = RefreshToken {
            id: Uuid::new_v4(),
            user_id: user.id,
            token_hash: AuthRepository::hash_token(refresh_token),
            ip_address: Some(source_ip.to_string()),
            user_agent: user_agent.map(|s| s.to_string()),
            expires_at: now + Duration::seconds(self.config.security.refresh_token_exp_secs as i64),
            revoked_at: None,
            replaced_by,
            created_at: now,
        };
        self.auth_repo.store_refresh_token(&record).await?;

        Ok(record.id)
    }

    async fn record_failure(
        &self,
        user_id: Option<Uuid>,
        username: &str,
        reason: &str,
        source_ip: &str,
        user_agent: Option<&str>,
    ) {
        let event = LoginEvent {
            id: Uuid::new_v4(),
            user_id,
            username: username.to_string(),
            event_type: "login_failure".to_string(),
            failure_reason: Some(reason.to_string()),
            source_ip: source_ip.to_string(),
            user_agent: user_agent.map(|s| s.to_string()),
            occurred_at: Utc::now(),
        };

        if let Err(e) = self.auth_repo.record_login_event(&event).await {
            tracing::warn!(error = ?e, "Failed to record login event");
        }
    }
}
