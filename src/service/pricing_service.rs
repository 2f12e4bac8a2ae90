use std::sync::Arc;

use uuid::Uuid;

use crate::{
    domain::RegistrationSource,
    error::{AppError, Result},
    repository::{MemberRepository, MembershipPackageRepository, ProgramRepository},
};

/// Normalized form used everywhere an email acts as an identity key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Price for one program checkout, resolved against membership.
#[derive(Debug, Clone)]
pub struct ProgramQuote {
    pub program_id: Uuid,
    pub program_name: String,
    pub amount: i64,
    pub source: RegistrationSource,
    pub member_id: Option<Uuid>,
}

/// Flat price for a membership package; membership is what's being
/// acquired, so no member discount applies.
#[derive(Debug, Clone)]
pub struct PackageQuote {
    pub package_id: Uuid,
    pub name: String,
    pub amount: i64,
}

pub struct PricingService {
    program_repo: Arc<dyn ProgramRepository>,
    package_repo: Arc<dyn MembershipPackageRepository>,
    member_repo: Arc<dyn MemberRepository>,
}

impl PricingService {
    pub fn new(
        program_repo: Arc<dyn ProgramRepository>,
        package_repo: Arc<dyn MembershipPackageRepository>,
        member_repo: Arc<dyn MemberRepository>,
    ) -> Self {
        Self {
            program_repo,
            package_repo,
            member_repo,
        }
    }

    /// Member vs non-member pricing for a program. `email` must already
    /// be normalized by the caller.
    pub async fn resolve_program_price(
        &self,
        program_id: Uuid,
        email: &str,
    ) -> Result<ProgramQuote> {
        let program = self
            .program_repo
            .find_by_id(program_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Program not found".to_string()))?;

        let member = self.member_repo.find_by_email(email).await?;

        let (amount, source, member_id) = match member {
            Some(m) => (program.price_member, RegistrationSource::Member, Some(m.id)),
            None => (program.price_non_member, RegistrationSource::NonMember, None),
        };

        if amount == 0 {
            tracing::warn!(
                program = %program.name,
                ?source,
                "Program has no price configured; proceeding with amount 0"
            );
        }

        Ok(ProgramQuote {
            program_id: program.id,
            program_name: program.name,
            amount,
            source,
            member_id,
        })
    }

    pub async fn resolve_package_price(&self, package_id: Uuid) -> Result<PackageQuote> {
        let package = self
            .package_repo
            .find_by_id(package_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Membership package not found".to_string()))?;

        if package.price == 0 {
            tracing::warn!(
                package = %package.name,
                "Membership package has no price configured; proceeding with amount 0"
            );
        }

        Ok(PackageQuote {
            package_id: package.id,
            name: package.name,
            amount: package.price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  A@X.Com "), "a@x.com");
        assert_eq!(normalize_email("a@x.com"), "a@x.com");
    }
}
