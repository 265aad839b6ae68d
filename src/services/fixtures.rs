//! Shared test setup: a small lab with users, one equipment and a fixed clock

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;

use crate::{
    config::AppConfig,
    models::{
        booking::{Booking, CreateBooking},
        equipment::{CreateEquipment, Equipment},
        slot::{CreateSlotTemplate, SlotLabel, SlotTemplate},
        user::{Actor, CreateUser, Role, User},
    },
    repository::Repository,
};

use super::{
    clock::{Clock, FixedClock},
    Services,
};

pub(crate) struct Fixture {
    pub repository: Repository,
    pub clock: Arc<FixedClock>,
    pub services: Services,
    pub admin: User,
    pub supervisor: User,
    pub other_supervisor: User,
    pub student: User,
    pub other_student: User,
    /// "Microscope Pro X1": a Day slot (10:00, 3h, 50, one booking) and an
    /// Evening slot (17:00, 2h, 20, three bookings)
    pub equipment: Equipment,
}

impl Fixture {
    /// Clock on Monday 2024-06-03; Saturdays and Sundays are closed
    pub fn new() -> Self {
        let repository = Repository::new();
        let clock = Arc::new(FixedClock::at_date(
            NaiveDate::from_ymd_opt(2024, 6, 3).expect("valid date"),
        ));
        let services = Services::new(repository.clone(), &AppConfig::default(), clock.clone());

        let admin = Self::user(&repository, "Ada Admin", "ada@lab.edu", Role::Admin, None);
        let supervisor = Self::user(&repository, "Dr. Okafor", "okafor@lab.edu", Role::Supervisor, None);
        let other_supervisor = Self::user(&repository, "Dr. Lind", "lind@lab.edu", Role::Supervisor, None);
        let student = Self::user(&repository, "Sam Student", "sam@lab.edu", Role::Student, Some(supervisor.id));
        let other_student = Self::user(&repository, "Kim Student", "kim@lab.edu", Role::Student, Some(supervisor.id));

        let equipment = repository.equipment.create(
            &CreateEquipment {
                name: "Microscope Pro X1".to_string(),
                location: "Lab A - Room 101".to_string(),
                description: None,
                lab_hours: None,
                slot_templates: vec![
                    CreateSlotTemplate {
                        label: SlotLabel::Day,
                        duration_hours: 3,
                        start_time: NaiveTime::from_hms_opt(10, 0, 0).expect("valid time"),
                        usage_charge: Decimal::from(50),
                        max_concurrent_bookings: 1,
                    },
                    CreateSlotTemplate {
                        label: SlotLabel::Evening,
                        duration_hours: 2,
                        start_time: NaiveTime::from_hms_opt(17, 0, 0).expect("valid time"),
                        usage_charge: Decimal::from(20),
                        max_concurrent_bookings: 3,
                    },
                ],
            },
            clock.now(),
        );

        Self {
            repository,
            clock,
            services,
            admin,
            supervisor,
            other_supervisor,
            student,
            other_student,
            equipment,
        }
    }

    fn user(repository: &Repository, name: &str, email: &str, role: Role, supervisor_id: Option<i32>) -> User {
        let data = CreateUser {
            name: name.to_string(),
            email: email.to_string(),
            password: "password".to_string(),
            role,
            department: None,
            phone: None,
            supervisor_id,
        };
        let user = repository
            .users
            .create(&data, "unusable-hash".to_string(), chrono::Utc::now())
            .expect("fixture user");
        match (role, supervisor_id) {
            (Role::Supervisor, _) => {
                repository.credits.open_account(user.id);
            }
            (Role::Student, Some(supervisor_id)) => {
                repository.credits.open_usage(user.id, supervisor_id);
            }
            _ => {}
        }
        user
    }

    /// `count` extra students of the main supervisor
    pub fn more_students(&self, count: usize) -> Vec<i32> {
        (0..count)
            .map(|i| {
                Self::user(
                    &self.repository,
                    &format!("Student {}", i),
                    &format!("student{}@lab.edu", i),
                    Role::Student,
                    Some(self.supervisor.id),
                )
                .id
            })
            .collect()
    }

    pub fn single_slot(&self) -> SlotTemplate {
        self.equipment.slot_templates[0].clone()
    }

    pub fn shared_slot(&self) -> SlotTemplate {
        self.equipment.slot_templates[1].clone()
    }

    pub fn admin_actor(&self) -> Actor {
        Actor {
            user_id: self.admin.id,
            role: Role::Admin,
        }
    }

    pub fn supervisor_actor(&self) -> Actor {
        Actor {
            user_id: self.supervisor.id,
            role: Role::Supervisor,
        }
    }

    pub fn student_actor(&self) -> Actor {
        Actor {
            user_id: self.student.id,
            role: Role::Student,
        }
    }

    pub fn allocate(&self, amount: i64) {
        self.repository
            .credits
            .allocate(
                self.supervisor.id,
                Decimal::from(amount),
                None,
                self.admin.id,
                self.clock.now(),
            )
            .expect("allocation");
    }

    pub fn balance(&self) -> Decimal {
        self.repository
            .credits
            .account(self.supervisor.id)
            .expect("account")
            .balance
    }

    pub fn used(&self) -> Decimal {
        self.repository
            .credits
            .usage(self.student.id)
            .expect("usage")
            .total_used
    }

    /// Pending booking of the main student, requested by their supervisor
    pub async fn book(&self, slot_id: i32, date: NaiveDate) -> Booking {
        self.book_for(self.student.id, slot_id, date).await
    }

    pub async fn book_for(&self, student_id: i32, slot_id: i32, date: NaiveDate) -> Booking {
        self.services
            .bookings
            .request(
                &self.supervisor_actor(),
                &CreateBooking {
                    equipment_id: self.equipment.id,
                    slot_template_id: slot_id,
                    date,
                    student_id,
                    supervisor_id: None,
                    notes: None,
                },
            )
            .await
            .expect("booking request")
    }
}
