//! Authentication and user directory service

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::UsersConfig,
    error::{AppError, AppResult},
    models::user::{Actor, CreateUser, Role, User, UserClaims, UserQuery},
    repository::Repository,
};

use super::{clock::Clock, locks::LockTable};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: UsersConfig,
    locks: Arc<LockTable>,
    clock: Arc<dyn Clock>,
}

impl UsersService {
    pub fn new(repository: Repository, config: UsersConfig, locks: Arc<LockTable>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            config,
            locks,
            clock,
        }
    }

    /// Authenticate user by email and return a JWT token
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_email(email.trim())
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        tracing::info!(user_id = user.id, role = %user.role, "User logged in");
        Ok((token, user))
    }

    /// Token lifetimes follow the wall clock, whatever clock the service runs on
    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Seed the bootstrap administrator when it does not exist yet
    pub async fn ensure_admin(&self) -> AppResult<()> {
        if self.repository.users.get_by_email(&self.config.admin_email).is_some() {
            return Ok(());
        }

        let data = CreateUser {
            name: self.config.admin_name.clone(),
            email: self.config.admin_email.clone(),
            password: self.config.admin_password.clone(),
            role: Role::Admin,
            department: None,
            phone: None,
            supervisor_id: None,
        };
        let password = self.hash_password(&data.password)?;
        let admin = self.repository.users.create(&data, password, self.clock.now())?;
        tracing::info!(user_id = admin.id, email = %admin.email, "Bootstrap administrator created");
        Ok(())
    }

    /// Create an account (admin only)
    pub async fn create_user(&self, actor: &Actor, data: &CreateUser) -> AppResult<User> {
        if !actor.is_admin() {
            return Err(AppError::Authorization("Administrator privileges required".to_string()));
        }
        data.validate()?;

        match (data.role, data.supervisor_id) {
            (Role::Student, Some(supervisor_id)) => {
                self.require_supervisor(supervisor_id)?;
            }
            (Role::Student, None) => {
                return Err(AppError::Validation("A student requires a supervisor".to_string()));
            }
            (_, Some(_)) => {
                return Err(AppError::Validation("Only students have a supervisor".to_string()));
            }
            (_, None) => {}
        }

        let password = self.hash_password(&data.password)?;
        let user = self.repository.users.create(data, password, self.clock.now())?;
        match (user.role, user.supervisor_id) {
            (Role::Supervisor, _) => {
                self.repository.credits.open_account(user.id);
            }
            (Role::Student, Some(supervisor_id)) => {
                self.repository.credits.open_usage(user.id, supervisor_id);
            }
            _ => {}
        }

        tracing::info!(user_id = user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Get a user visible to the caller
    pub async fn get_user(&self, actor: &Actor, id: i32) -> AppResult<User> {
        let user = self.repository.users.get_by_id(id)?;
        let allowed = match actor.role {
            Role::Admin => true,
            Role::Supervisor => user.id == actor.user_id || user.supervisor_id == Some(actor.user_id),
            Role::Student => user.id == actor.user_id,
        };
        if !allowed {
            return Err(AppError::Authorization(format!("User {} is not visible to you", id)));
        }
        Ok(user)
    }

    /// List users; supervisors only see their own students
    pub async fn list_users(&self, actor: &Actor, mut query: UserQuery) -> AppResult<Vec<User>> {
        match actor.role {
            Role::Admin => {}
            Role::Supervisor => {
                if query.supervisor_id.is_some_and(|id| id != actor.user_id) {
                    return Err(AppError::Authorization(
                        "Supervisors can only list their own students".to_string(),
                    ));
                }
                query.supervisor_id = Some(actor.user_id);
            }
            Role::Student => {
                return Err(AppError::Authorization(
                    "Supervisor or administrator privileges required".to_string(),
                ));
            }
        }
        Ok(self.repository.users.list(&query))
    }

    /// Move a student under another supervisor (admin only).
    ///
    /// Bookings already made stay charged to the supervisor recorded on them.
    pub async fn transfer_student(&self, actor: &Actor, student_id: i32, supervisor_id: i32) -> AppResult<User> {
        if !actor.is_admin() {
            return Err(AppError::Authorization("Administrator privileges required".to_string()));
        }
        let student = self.repository.users.get_by_id(student_id)?;
        if student.role != Role::Student {
            return Err(AppError::Validation(format!("User {} is not a student", student_id)));
        }
        self.require_supervisor(supervisor_id)?;

        // Pending requests for this student finish against the old assignment
        let _student_guard = self.locks.students.lock(student_id).await;
        let student = self.repository.users.set_supervisor(student_id, supervisor_id)?;
        self.repository.credits.reassign_usage(student_id, supervisor_id)?;

        tracing::info!(student_id, supervisor_id, "Student transferred");
        Ok(student)
    }

    fn require_supervisor(&self, supervisor_id: i32) -> AppResult<User> {
        self.repository
            .users
            .get_by_id(supervisor_id)
            .ok()
            .filter(|u| u.role == Role::Supervisor)
            .ok_or_else(|| AppError::Validation(format!("User {} is not a supervisor", supervisor_id)))
    }
}
