//! # School Repository
//!
//! Schools, their courses and the monthly fees collected per student.
//! A `(course, student, period)` triple is unique in the database, so paying a
//! month twice is a 409.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    Set,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::course::{self, Entity as Course};
use crate::models::fee_payment::{self, Entity as FeePayment};
use crate::models::school::{self, Entity as School};
use crate::pagination::{Page, PageRequest};
use crate::repositories::crud::{Creatable, Resource, Updatable};
use crate::repositories::now;
use crate::validation::{FieldErrors, is_valid_period, normalize_optional};

/// School fields accepted on create and full update
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SchoolInput {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl SchoolInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.required_text("name", &self.name, 120);
        errors.optional_text("address", self.address.as_deref(), 200);
        errors.optional_text("phone", self.phone.as_deref(), 30);
        errors.into_result()
    }

    fn apply(self, active: &mut school::ActiveModel) {
        active.name = Set(self.name.trim().to_string());
        active.address = Set(normalize_optional(self.address));
        active.phone = Set(normalize_optional(self.phone));
        active.updated_at = Set(now());
    }
}

/// Course fields accepted on create and full update
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CourseInput {
    pub school_id: Uuid,
    pub name: String,
    #[schema(example = 25000)]
    pub monthly_fee_cents: i64,
}

impl CourseInput {
    fn validate(&self) -> Result<(), RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.required_text("name", &self.name, 120);
        errors.non_negative("monthly_fee_cents", self.monthly_fee_cents);
        errors.into_result()
    }

    fn apply(self, active: &mut course::ActiveModel) {
        active.school_id = Set(self.school_id);
        active.name = Set(self.name.trim().to_string());
        active.monthly_fee_cents = Set(self.monthly_fee_cents);
        active.updated_at = Set(now());
    }
}

/// Fee payment fields accepted on create and full update
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FeePaymentInput {
    pub course_id: Uuid,
    pub student_name: String,
    #[schema(example = "2025-03")]
    pub period: String,
    /// Defaults to the course's monthly fee
    pub amount_cents: Option<i64>,
    /// Defaults to now
    pub paid_at: Option<DateTime<FixedOffset>>,
}

impl FeePaymentInput {
    /// Validates against the course and resolves the defaults.
    async fn resolve(
        self,
        db: &DatabaseConnection,
        active: &mut fee_payment::ActiveModel,
    ) -> Result<(), RepositoryError> {
        let mut errors = FieldErrors::new();
        errors.required_text("student_name", &self.student_name, 120);
        errors.check(
            is_valid_period(self.period.trim()),
            "period",
            "must be formatted as YYYY-MM",
        );
        errors.into_result()?;

        let course = Course::find_by_id(self.course_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                RepositoryError::validation(
                    "Unknown course",
                    json!({ "course_id": "does not exist" }),
                )
            })?;

        let amount_cents = self.amount_cents.unwrap_or(course.monthly_fee_cents);
        let mut errors = FieldErrors::new();
        errors.positive("amount_cents", amount_cents);
        errors.into_result()?;

        active.course_id = Set(course.id);
        active.student_name = Set(self.student_name.trim().to_string());
        active.period = Set(self.period.trim().to_string());
        active.amount_cents = Set(amount_cents);
        active.paid_at = Set(self.paid_at.unwrap_or_else(now));
        active.updated_at = Set(now());
        Ok(())
    }
}

/// Query of `GET /api/courses/{id}/fee-payments`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeePaymentFilter {
    /// Only payments for this `YYYY-MM` period
    pub period: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl Resource for School {
    const NAME: &'static str = "School";
    const COLLECTION: &'static str = "schools";

    fn id_column() -> school::Column {
        school::Column::Id
    }

    fn created_at_column() -> school::Column {
        school::Column::CreatedAt
    }

    fn search_columns() -> Vec<school::Column> {
        vec![school::Column::Name, school::Column::Address]
    }

    fn id_of(model: &school::Model) -> Uuid {
        model.id
    }
}

#[async_trait]
impl Creatable for School {
    type Create = SchoolInput;

    async fn create_record(
        db: &DatabaseConnection,
        input: SchoolInput,
    ) -> Result<school::Model, RepositoryError> {
        input.validate()?;

        let mut active = school::ActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(now()),
            ..Default::default()
        };
        input.apply(&mut active);

        Ok(active.insert(db).await?)
    }
}

#[async_trait]
impl Updatable for School {
    type Update = SchoolInput;

    async fn update_record(
        db: &DatabaseConnection,
        current: school::Model,
        input: SchoolInput,
    ) -> Result<school::Model, RepositoryError> {
        input.validate()?;

        let mut active = current.into_active_model();
        input.apply(&mut active);

        Ok(active.update(db).await?)
    }
}

impl Resource for Course {
    const NAME: &'static str = "Course";
    const COLLECTION: &'static str = "courses";

    fn id_column() -> course::Column {
        course::Column::Id
    }

    fn created_at_column() -> course::Column {
        course::Column::CreatedAt
    }

    fn search_columns() -> Vec<course::Column> {
        vec![course::Column::Name]
    }

    fn id_of(model: &course::Model) -> Uuid {
        model.id
    }
}

#[async_trait]
impl Creatable for Course {
    type Create = CourseInput;

    async fn create_record(
        db: &DatabaseConnection,
        input: CourseInput,
    ) -> Result<course::Model, RepositoryError> {
        input.validate()?;

        let mut active = course::ActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(now()),
            ..Default::default()
        };
        input.apply(&mut active);

        Ok(active.insert(db).await?)
    }
}

#[async_trait]
impl Updatable for Course {
    type Update = CourseInput;

    async fn update_record(
        db: &DatabaseConnection,
        current: course::Model,
        input: CourseInput,
    ) -> Result<course::Model, RepositoryError> {
        input.validate()?;

        let mut active = current.into_active_model();
        input.apply(&mut active);

        Ok(active.update(db).await?)
    }
}

impl Resource for FeePayment {
    const NAME: &'static str = "Fee payment";
    const COLLECTION: &'static str = "fee-payments";

    fn id_column() -> fee_payment::Column {
        fee_payment::Column::Id
    }

    fn created_at_column() -> fee_payment::Column {
        fee_payment::Column::CreatedAt
    }

    fn search_columns() -> Vec<fee_payment::Column> {
        vec![fee_payment::Column::StudentName, fee_payment::Column::Period]
    }

    fn id_of(model: &fee_payment::Model) -> Uuid {
        model.id
    }
}

#[async_trait]
impl Creatable for FeePayment {
    type Create = FeePaymentInput;

    async fn create_record(
        db: &DatabaseConnection,
        input: FeePaymentInput,
    ) -> Result<fee_payment::Model, RepositoryError> {
        let mut active = fee_payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(now()),
            ..Default::default()
        };
        input.resolve(db, &mut active).await?;

        let payment = active.insert(db).await?;
        tracing::info!(
            fee_payment_id = %payment.id,
            course_id = %payment.course_id,
            period = %payment.period,
            "Recorded fee payment"
        );
        Ok(payment)
    }
}

#[async_trait]
impl Updatable for FeePayment {
    type Update = FeePaymentInput;

    async fn update_record(
        db: &DatabaseConnection,
        current: fee_payment::Model,
        input: FeePaymentInput,
    ) -> Result<fee_payment::Model, RepositoryError> {
        let mut active = current.into_active_model();
        input.resolve(db, &mut active).await?;

        Ok(active.update(db).await?)
    }
}

/// Repository for school listings
pub struct SchoolRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> SchoolRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn courses(
        &self,
        school_id: Uuid,
        request: PageRequest,
    ) -> Result<Page<course::Model>, RepositoryError> {
        School::get_by_id(self.db, school_id).await?;

        Course::page_where(
            self.db,
            Condition::all().add(course::Column::SchoolId.eq(school_id)),
            request,
        )
        .await
    }

    pub async fn fee_payments(
        &self,
        course_id: Uuid,
        period: Option<&str>,
        request: PageRequest,
    ) -> Result<Page<fee_payment::Model>, RepositoryError> {
        Course::get_by_id(self.db, course_id).await?;

        let mut condition = Condition::all().add(fee_payment::Column::CourseId.eq(course_id));
        if let Some(period) = period.map(str::trim).filter(|period| !period.is_empty()) {
            if !is_valid_period(period) {
                return Err(RepositoryError::validation(
                    "Invalid period",
                    json!({ "period": "must be formatted as YYYY-MM" }),
                ));
            }
            condition = condition.add(fee_payment::Column::Period.eq(period));
        }

        FeePayment::page_where(self.db, condition, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::repositories::test_support::test_db;
    use axum::http::StatusCode;

    const PAGE: PageRequest = PageRequest { page: 1, limit: 20 };

    async fn school_with_course(db: &DatabaseConnection) -> (school::Model, course::Model) {
        let school = School::create_record(
            db,
            SchoolInput {
                name: "Academia Andina".to_string(),
                address: None,
                phone: Some(" ".to_string()),
            },
        )
        .await
        .unwrap();
        let course = Course::create_record(
            db,
            CourseInput {
                school_id: school.id,
                name: "Guitarra".to_string(),
                monthly_fee_cents: 25_000,
            },
        )
        .await
        .unwrap();
        (school, course)
    }

    fn payment(course_id: Uuid, student: &str, period: &str) -> FeePaymentInput {
        FeePaymentInput {
            course_id,
            student_name: student.to_string(),
            period: period.to_string(),
            amount_cents: None,
            paid_at: None,
        }
    }

    #[tokio::test]
    async fn fee_defaults_to_course_fee_and_period_is_unique() {
        let db = test_db().await;
        let (school, course) = school_with_course(&db).await;
        assert_eq!(school.phone, None);

        let paid = FeePayment::create_record(&db, payment(course.id, "Luis Mamani", "2025-03"))
            .await
            .unwrap();
        assert_eq!(paid.amount_cents, 25_000);

        let err = FeePayment::create_record(&db, payment(course.id, "Luis Mamani", "2025-03"))
            .await
            .unwrap_err();
        assert_eq!(ApiError::from(err).status, StatusCode::CONFLICT);

        FeePayment::create_record(&db, payment(course.id, "Luis Mamani", "2025-04"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn fee_payment_validation() {
        let db = test_db().await;
        let (_, course) = school_with_course(&db).await;

        for period in ["2025-13", "25-01", "2025/01", ""] {
            assert!(
                FeePayment::create_record(&db, payment(course.id, "Ana", period))
                    .await
                    .is_err(),
                "{period} should be rejected"
            );
        }

        let mut zero = payment(course.id, "Ana", "2025-01");
        zero.amount_cents = Some(0);
        assert!(FeePayment::create_record(&db, zero).await.is_err());

        assert!(matches!(
            FeePayment::create_record(&db, payment(Uuid::new_v4(), "Ana", "2025-01")).await,
            Err(RepositoryError::Invalid { .. })
        ));
    }

    #[tokio::test]
    async fn listings_scope_to_parent() {
        let db = test_db().await;
        let (school, course) = school_with_course(&db).await;
        let repo = SchoolRepository::new(&db);

        let courses = repo.courses(school.id, PAGE).await.unwrap();
        assert_eq!(courses.pagination.total, 1);
        assert!(matches!(
            repo.courses(Uuid::new_v4(), PAGE).await,
            Err(RepositoryError::NotFound { .. })
        ));

        for (student, period) in [("Ana", "2025-01"), ("Ana", "2025-02"), ("Luis", "2025-01")] {
            FeePayment::create_record(&db, payment(course.id, student, period))
                .await
                .unwrap();
        }
        let january = repo
            .fee_payments(course.id, Some("2025-01"), PAGE)
            .await
            .unwrap();
        assert_eq!(january.pagination.total, 2);
        let all = repo.fee_payments(course.id, None, PAGE).await.unwrap();
        assert_eq!(all.pagination.total, 3);
        assert!(repo.fee_payments(course.id, Some("enero"), PAGE).await.is_err());
    }

    #[tokio::test]
    async fn course_names_are_unique_per_school() {
        let db = test_db().await;
        let (school, _) = school_with_course(&db).await;

        let err = Course::create_record(
            &db,
            CourseInput {
                school_id: school.id,
                name: "Guitarra".to_string(),
                monthly_fee_cents: 1,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(ApiError::from(err).status, StatusCode::CONFLICT);
    }
}
