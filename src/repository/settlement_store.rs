use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool, Transaction};
use uuid::Uuid;

use crate::{
    domain::{
        self, MemberStatus, MembershipIntent, Payment, PaymentGateway, PaymentMethod,
        PaymentStatus, ProgramIntent, Segment, User, UserRole,
    },
    error::{AppError, Result},
    repository::{
        member_repository::{
            member_status_to_str, row_to_member, segment_to_str, MemberRow, MEMBER_COLUMNS,
        },
        registration_repository::{
            row_to_registration, source_to_str, RegistrationRow, REGISTRATION_COLUMNS,
        },
        MembershipSettlement, NewPayment, NotificationMeta, ProgramSettlement, SettlementStore,
        StatusChange,
    },
};

#[derive(FromRow)]
pub(crate) struct PaymentRow {
    id: String,
    order_id: String,
    email: String,
    amount: i64,
    currency: String,
    method: Option<String>,
    gateway: Option<String>,
    status: String,
    raw_payload: Option<String>,
    gateway_transaction_id: Option<String>,
    paid_at: Option<NaiveDateTime>,
    registration_id: Option<String>,
    member_id: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const PAYMENT_COLUMNS: &str =
    "id, order_id, email, amount, currency, method, gateway, status, raw_payload, \
     gateway_transaction_id, paid_at, registration_id, member_id, created_at, updated_at";

fn row_to_payment(row: PaymentRow) -> Result<Payment> {
    Ok(Payment {
        id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
        order_id: row.order_id,
        email: row.email,
        amount: row.amount,
        currency: row.currency,
        method: row.method.as_deref().map(parse_payment_method).transpose()?,
        gateway: row.gateway.as_deref().map(parse_gateway).transpose()?,
        status: parse_payment_status(&row.status)?,
        raw_payload: row
            .raw_payload
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| AppError::Database(format!("Invalid raw payload: {}", e)))?,
        gateway_transaction_id: row.gateway_transaction_id,
        paid_at: row
            .paid_at
            .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
        registration_id: super::member_repository::parse_optional_uuid(row.registration_id)?,
        member_id: super::member_repository::parse_optional_uuid(row.member_id)?,
        created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
    })
}

fn parse_payment_status(s: &str) -> Result<PaymentStatus> {
    match s {
        "Pending" => Ok(PaymentStatus::Pending),
        "Completed" => Ok(PaymentStatus::Completed),
        "Failed" => Ok(PaymentStatus::Failed),
        "Refunded" => Ok(PaymentStatus::Refunded),
        _ => Err(AppError::Database(format!("Invalid payment status: {}", s))),
    }
}

fn payment_status_to_str(status: &PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "Pending",
        PaymentStatus::Completed => "Completed",
        PaymentStatus::Failed => "Failed",
        PaymentStatus::Refunded => "Refunded",
    }
}

fn parse_payment_method(s: &str) -> Result<PaymentMethod> {
    match s {
        "Qris" => Ok(PaymentMethod::Qris),
        "Va" => Ok(PaymentMethod::Va),
        "BankTransfer" => Ok(PaymentMethod::BankTransfer),
        "Ewallet" => Ok(PaymentMethod::Ewallet),
        _ => Err(AppError::Database(format!("Invalid payment method: {}", s))),
    }
}

fn payment_method_to_str(method: &PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Qris => "Qris",
        PaymentMethod::Va => "Va",
        PaymentMethod::BankTransfer => "BankTransfer",
        PaymentMethod::Ewallet => "Ewallet",
    }
}

fn parse_gateway(s: &str) -> Result<PaymentGateway> {
    match s {
        "Midtrans" => Ok(PaymentGateway::Midtrans),
        "Ipaymu" => Ok(PaymentGateway::Ipaymu),
        _ => Err(AppError::Database(format!("Invalid gateway: {}", s))),
    }
}

fn gateway_to_str(gateway: &PaymentGateway) -> &'static str {
    match gateway {
        PaymentGateway::Midtrans => "Midtrans",
        PaymentGateway::Ipaymu => "Ipaymu",
    }
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    name: String,
    phone: Option<String>,
    password_hash: String,
    role: String,
    is_email_verified: i32,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const USER_COLUMNS: &str =
    "id, email, name, phone, password_hash, role, is_email_verified, created_at, updated_at";

fn row_to_user(row: UserRow) -> Result<User> {
    Ok(User {
        id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
        email: row.email,
        name: row.name,
        phone: row.phone,
        password_hash: row.password_hash,
        role: parse_role(&row.role)?,
        is_email_verified: row.is_email_verified != 0,
        created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
    })
}

fn parse_role(s: &str) -> Result<UserRole> {
    match s {
        "User" => Ok(UserRole::User),
        "Member" => Ok(UserRole::Member),
        "Admin" => Ok(UserRole::Admin),
        _ => Err(AppError::Database(format!("Invalid user role: {}", s))),
    }
}

pub struct SqliteSettlementStore {
    pool: SqlitePool,
    /// Assigned to users created lazily at settlement time.
    default_password: String,
}

impl SqliteSettlementStore {
    pub fn new(pool: SqlitePool, default_password: String) -> Self {
        Self {
            pool,
            default_password,
        }
    }

    async fn fetch_payment(&self, order_id: &str) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE order_id = ?",
            PAYMENT_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(row_to_payment(r)?)),
            None => Ok(None),
        }
    }

    /// Upsert the settled payment inside an open transaction. The
    /// `ON CONFLICT(order_id)` arm is what resolves two webhook
    /// deliveries racing each other: the loser converges on the winner's
    /// row instead of erroring out.
    #[allow(clippy::too_many_arguments)]
    async fn upsert_settled_payment(
        tx: &mut Transaction<'_, sqlx::Sqlite>,
        order_id: &str,
        email: &str,
        amount: i64,
        currency: &str,
        method: PaymentMethod,
        meta: &NotificationMeta,
        registration_id: Option<Uuid>,
        member_id: Option<Uuid>,
        now: NaiveDateTime,
    ) -> Result<PaymentRow> {
        let raw = serde_json::to_string(&meta.raw_payload)
            .map_err(|e| AppError::Internal(format!("Failed to encode raw payload: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, order_id, email, amount, currency, method, gateway, status,
                raw_payload, gateway_transaction_id, paid_at,
                registration_id, member_id, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, 'Completed', ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(order_id) DO UPDATE SET
                status = excluded.status,
                raw_payload = excluded.raw_payload,
                gateway_transaction_id =
                    COALESCE(excluded.gateway_transaction_id, payments.gateway_transaction_id),
                method = COALESCE(excluded.method, payments.method),
                gateway = COALESCE(excluded.gateway, payments.gateway),
                paid_at = COALESCE(payments.paid_at, excluded.paid_at),
                registration_id =
                    COALESCE(excluded.registration_id, payments.registration_id),
                member_id = COALESCE(excluded.member_id, payments.member_id),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(order_id)
        .bind(email)
        .bind(amount)
        .bind(currency)
        .bind(payment_method_to_str(&method))
        .bind(gateway_to_str(&meta.gateway))
        .bind(raw)
        .bind(&meta.gateway_transaction_id)
        .bind(now)
        .bind(registration_id.map(|id| id.to_string()))
        .bind(member_id.map(|id| id.to_string()))
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE order_id = ?",
            PAYMENT_COLUMNS
        ))
        .bind(order_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_or_create_user(
        &self,
        tx: &mut Transaction<'_, sqlx::Sqlite>,
        intent: &MembershipIntent,
        now: NaiveDateTime,
    ) -> Result<User> {
        let existing = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(&intent.email)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let user_id = match existing {
            None => {
                let id = Uuid::new_v4();
                let hash = domain::user::hash_password(&self.default_password)?;
                sqlx::query(
                    r#"
                    INSERT INTO users (
                        id, email, name, phone, password_hash, role,
                        is_email_verified, created_at, updated_at
                    ) VALUES (?, ?, ?, ?, ?, 'Member', 1, ?, ?)
                    "#,
                )
                .bind(id.to_string())
                .bind(&intent.email)
                .bind(&intent.name)
                .bind(&intent.phone)
                .bind(hash)
                .bind(now)
                .bind(now)
                .execute(&mut **tx)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
                id
            }
            Some(row) => {
                let id =
                    Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?;
                // Promote plain users; admins keep their role.
                if row.role == "User" {
                    sqlx::query("UPDATE users SET role = 'Member', updated_at = ? WHERE id = ?")
                        .bind(now)
                        .bind(row.id)
                        .execute(&mut **tx)
                        .await
                        .map_err(|e| AppError::Database(e.to_string()))?;
                }
                id
            }
        };

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(user_id.to_string())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row_to_user(row)
    }

    async fn find_or_create_member(
        &self,
        tx: &mut Transaction<'_, sqlx::Sqlite>,
        intent: &MembershipIntent,
        user_id: Uuid,
        now: NaiveDateTime,
    ) -> Result<domain::Member> {
        let existing = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {} FROM members WHERE email = ?",
            MEMBER_COLUMNS
        ))
        .bind(&intent.email)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let member_id = match existing {
            None => {
                let id = Uuid::new_v4();
                let segment = intent.segment.unwrap_or(Segment::Basic);
                let areas = serde_json::to_string(&intent.interest_areas)
                    .map_err(|e| AppError::Internal(format!("Failed to encode areas: {}", e)))?;
                let join_date = intent
                    .join_date
                    .map(|dt| dt.naive_utc())
                    .unwrap_or(now);

                sqlx::query(
                    r#"
                    INSERT INTO members (
                        id, email, name, phone, institution, segment, student_id,
                        degree, interest_areas, join_date, status,
                        membership_package_id, user_id, created_at, updated_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'Active', ?, ?, ?, ?)
                    "#,
                )
                .bind(id.to_string())
                .bind(&intent.email)
                .bind(&intent.name)
                .bind(&intent.phone)
                .bind(&intent.institution)
                .bind(segment_to_str(&segment))
                .bind(&intent.student_id)
                .bind(&intent.degree)
                .bind(areas)
                .bind(join_date)
                .bind(intent.membership_package_id.to_string())
                .bind(user_id.to_string())
                .bind(now)
                .bind(now)
                .execute(&mut **tx)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
                id
            }
            Some(row) => {
                let member = row_to_member(row)?;

                // Union of interest areas, existing entries first.
                let mut merged = member.interest_areas.clone();
                for area in &intent.interest_areas {
                    if !merged.contains(area) {
                        merged.push(area.clone());
                    }
                }
                let areas = serde_json::to_string(&merged)
                    .map_err(|e| AppError::Internal(format!("Failed to encode areas: {}", e)))?;

                sqlx::query(
                    r#"
                    UPDATE members SET
                        status = ?,
                        user_id = COALESCE(user_id, ?),
                        membership_package_id = ?,
                        phone = COALESCE(phone, ?),
                        institution = COALESCE(institution, ?),
                        interest_areas = ?,
                        updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(member_status_to_str(&MemberStatus::Active))
                .bind(user_id.to_string())
                .bind(intent.membership_package_id.to_string())
                .bind(&intent.phone)
                .bind(&intent.institution)
                .bind(areas)
                .bind(now)
                .bind(member.id.to_string())
                .execute(&mut **tx)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
                member.id
            }
        };

        let row = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {} FROM members WHERE id = ?",
            MEMBER_COLUMNS
        ))
        .bind(member_id.to_string())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        row_to_member(row)
    }
}

#[async_trait]
impl SettlementStore for SqliteSettlementStore {
    async fn find_payment(&self, order_id: &str) -> Result<Option<Payment>> {
        self.fetch_payment(order_id).await
    }

    async fn record_status_change(&self, order_id: &str, change: StatusChange) -> Result<Payment> {
        let now = Utc::now().naive_utc();
        let raw = serde_json::to_string(&change.raw_payload)
            .map_err(|e| AppError::Internal(format!("Failed to encode raw payload: {}", e)))?;
        let paid_at = if change.status == PaymentStatus::Completed {
            Some(now)
        } else {
            None
        };

        sqlx::query(
            r#"
            UPDATE payments SET
                status = ?,
                raw_payload = ?,
                gateway_transaction_id = COALESCE(?, gateway_transaction_id),
                method = COALESCE(?, method),
                paid_at = COALESCE(?, paid_at),
                updated_at = ?
            WHERE order_id = ?
            "#,
        )
        .bind(payment_status_to_str(&change.status))
        .bind(raw)
        .bind(&change.gateway_transaction_id)
        .bind(change.method.as_ref().map(payment_method_to_str))
        .bind(paid_at)
        .bind(now)
        .bind(order_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.fetch_payment(order_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Payment not found for order {}", order_id))
        })
    }

    async fn insert_payment(&self, new: NewPayment) -> Result<Payment> {
        let now = Utc::now().naive_utc();
        let raw = new
            .raw_payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| AppError::Internal(format!("Failed to encode raw payload: {}", e)))?;

        // DO NOTHING + re-read: if a concurrent delivery won the insert,
        // return its row.
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, order_id, email, amount, currency, method, gateway, status,
                raw_payload, gateway_transaction_id, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(order_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&new.order_id)
        .bind(&new.email)
        .bind(new.amount)
        .bind(&new.currency)
        .bind(new.method.as_ref().map(payment_method_to_str))
        .bind(new.gateway.as_ref().map(gateway_to_str))
        .bind(payment_status_to_str(&new.status))
        .bind(raw)
        .bind(&new.gateway_transaction_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.fetch_payment(&new.order_id).await?.ok_or_else(|| {
            AppError::Database(format!(
                "Failed to retrieve payment for order {}",
                new.order_id
            ))
        })
    }

    async fn settle_program(
        &self,
        order_id: &str,
        intent: &ProgramIntent,
        meta: &NotificationMeta,
    ) -> Result<ProgramSettlement> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let now = Utc::now().naive_utc();

        // Create or reuse the registration; details are not rewritten on
        // a webhook for an enrollment that already exists.
        sqlx::query(
            r#"
            INSERT INTO program_registrations (
                id, program_id, email, name, phone, institution, segment,
                source, member_id, user_id, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(email, program_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(intent.program_id.to_string())
        .bind(&intent.email)
        .bind(&intent.name)
        .bind(&intent.phone)
        .bind(&intent.institution)
        .bind(intent.segment.as_ref().map(segment_to_str))
        .bind(source_to_str(&intent.source))
        .bind(intent.member_id.map(|id| id.to_string()))
        .bind(intent.user_id.map(|id| id.to_string()))
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let reg_row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {} FROM program_registrations WHERE email = ? AND program_id = ?",
            REGISTRATION_COLUMNS
        ))
        .bind(&intent.email)
        .bind(intent.program_id.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        let registration = row_to_registration(reg_row)?;

        let payment_row = Self::upsert_settled_payment(
            &mut tx,
            order_id,
            &intent.email,
            intent.amount,
            &intent.currency,
            intent.method,
            meta,
            Some(registration.id),
            intent.member_id,
            now,
        )
        .await?;
        let payment = row_to_payment(payment_row)?;

        tx.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(ProgramSettlement {
            registration,
            payment,
        })
    }

    async fn settle_membership(
        &self,
        order_id: &str,
        intent: &MembershipIntent,
        meta: &NotificationMeta,
    ) -> Result<MembershipSettlement> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let now = Utc::now().naive_utc();

        let user = self.find_or_create_user(&mut tx, intent, now).await?;
        let member = self
            .find_or_create_member(&mut tx, intent, user.id, now)
            .await?;

        let payment_row = Self::upsert_settled_payment(
            &mut tx,
            order_id,
            &intent.email,
            intent.amount,
            &intent.currency,
            intent.method,
            meta,
            None,
            Some(member.id),
            now,
        )
        .await?;
        let payment = row_to_payment(payment_row)?;

        tx.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(MembershipSettlement {
            member,
            user,
            payment,
        })
    }
}
