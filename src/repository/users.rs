//! Users table

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, User, UserQuery},
};

#[derive(Default)]
struct UsersTable {
    next_id: i32,
    rows: IndexMap<i32, User>,
}

#[derive(Clone, Default)]
pub struct UsersRepository {
    table: Arc<RwLock<UsersTable>>,
}

impl UsersRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get user by ID
    pub fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.table
            .read()
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    /// Get user by email (case-insensitive)
    pub fn get_by_email(&self, email: &str) -> Option<User> {
        self.table
            .read()
            .rows
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    pub fn list(&self, query: &UserQuery) -> Vec<User> {
        self.table
            .read()
            .rows
            .values()
            .filter(|u| query.role.map_or(true, |role| u.role == role))
            .filter(|u| {
                query
                    .supervisor_id
                    .map_or(true, |id| u.supervisor_id == Some(id))
            })
            .cloned()
            .collect()
    }

    /// Insert a user; the email must not be taken
    pub fn create(&self, data: &CreateUser, password_hash: String, now: DateTime<Utc>) -> AppResult<User> {
        let mut table = self.table.write();
        if table
            .rows
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&data.email))
        {
            return Err(AppError::Conflict(format!("Email {} is already registered", data.email)));
        }

        table.next_id += 1;
        let user = User {
            id: table.next_id,
            name: data.name.trim().to_string(),
            email: data.email.trim().to_lowercase(),
            role: data.role,
            department: data.department.clone(),
            phone: data.phone.clone(),
            supervisor_id: data.supervisor_id,
            password: password_hash,
            crea_date: now,
        };
        table.rows.insert(user.id, user.clone());
        Ok(user)
    }

    pub fn set_supervisor(&self, student_id: i32, supervisor_id: i32) -> AppResult<User> {
        let mut table = self.table.write();
        let user = table
            .rows
            .get_mut(&student_id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", student_id)))?;
        user.supervisor_id = Some(supervisor_id);
        Ok(user.clone())
    }
}
