use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PaymentMethod, RegistrationSource, Segment};

/// Pending-checkout metadata. Lives only in the intent cache under
/// `pay:<orderId>` until the webhook reconciler either commits it to the
/// database or its TTL expires (abandoned checkout).
///
/// The `kind` tag is the discriminant; the reconciler decodes it once at
/// cache-read time instead of sniffing which id field happens to be set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegistrationIntent {
    Program(ProgramIntent),
    Membership(MembershipIntent),
}

impl RegistrationIntent {
    pub fn email(&self) -> &str {
        match self {
            RegistrationIntent::Program(i) => &i.email,
            RegistrationIntent::Membership(i) => &i.email,
        }
    }

    pub fn amount(&self) -> i64 {
        match self {
            RegistrationIntent::Program(i) => i.amount,
            RegistrationIntent::Membership(i) => i.amount,
        }
    }

    pub fn method(&self) -> PaymentMethod {
        match self {
            RegistrationIntent::Program(i) => i.method,
            RegistrationIntent::Membership(i) => i.method,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgramIntent {
    pub program_id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub institution: Option<String>,
    pub segment: Option<Segment>,
    pub user_id: Option<Uuid>,
    /// Set when the pricing resolver matched the email to a member.
    pub member_id: Option<Uuid>,
    pub source: RegistrationSource,
    pub amount: i64,
    pub currency: String,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MembershipIntent {
    pub membership_package_id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub institution: Option<String>,
    pub segment: Option<Segment>,
    pub student_id: Option<String>,
    pub degree: Option<String>,
    #[serde(default)]
    pub interest_areas: Vec<String>,
    pub join_date: Option<DateTime<Utc>>,
    pub user_id: Option<Uuid>,
    pub amount: i64,
    pub currency: String,
    pub method: PaymentMethod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_round_trips_with_kind_tag() {
        let intent = RegistrationIntent::Program(ProgramIntent {
            program_id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            name: "A".to_string(),
            phone: None,
            institution: None,
            segment: Some(Segment::Student),
            user_id: None,
            member_id: None,
            source: RegistrationSource::NonMember,
            amount: 60000,
            currency: "IDR".to_string(),
            method: PaymentMethod::Qris,
        });

        let json = serde_json::to_string(&intent).unwrap();
        assert!(json.contains("\"kind\":\"program\""));

        let back: RegistrationIntent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, intent);
    }

    #[test]
    fn membership_intent_tolerates_missing_interest_areas() {
        let json = r#"{
            "kind": "membership",
            "membership_package_id": "6f8e1a38-44a8-4f58-9f6f-0d9a3c2e1b00",
            "email": "b@x.com",
            "name": "B",
            "phone": null,
            "institution": null,
            "segment": null,
            "student_id": null,
            "degree": null,
            "join_date": null,
            "user_id": null,
            "amount": 150000,
            "currency": "IDR",
            "method": "va"
        }"#;

        let intent: RegistrationIntent = serde_json::from_str(json).unwrap();
        match intent {
            RegistrationIntent::Membership(m) => assert!(m.interest_areas.is_empty()),
            _ => panic!("wrong kind"),
        }
    }
}
