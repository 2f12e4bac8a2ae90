use chrono::{Duration, Utc};
use clap::Parser;
use fake::faker::lorem::en::{Sentence, Word};
use fake::Fake;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

use sanggar::{
    domain::{MembershipPackage, Program},
    repository::{
        MembershipPackageRepository, ProgramRepository, SqliteMembershipPackageRepository,
        SqliteProgramRepository,
    },
};

#[derive(Parser)]
#[command(about = "Seed the catalog with demo programs and membership packages")]
struct Args {
    /// Overrides the DATABASE_URL environment variable
    #[arg(long)]
    database_url: Option<String>,

    /// Number of extra randomly-named programs to create
    #[arg(long, default_value_t = 3)]
    programs: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("🌱 Starting database seeding...");

    let database_url = args
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite:sanggar.db".to_string());

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let program_repo = SqliteProgramRepository::new(db_pool.clone());
    let package_repo = SqliteMembershipPackageRepository::new(db_pool.clone());

    println!("📚 Creating programs...");

    let now = Utc::now();
    program_repo
        .create(Program {
            id: Uuid::new_v4(),
            name: "Geothermal Data Bootcamp".to_string(),
            description: Some("Hands-on subsurface data processing, two weekends".to_string()),
            price_member: 30000,
            price_non_member: 60000,
            starts_at: Some(now + Duration::days(30)),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .await?;
    println!("  ✅ Created Geothermal Data Bootcamp (30k member / 60k non-member)");

    for _ in 0..args.programs {
        let word: String = Word().fake();
        let mut name = word;
        if let Some(first) = name.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        let program = program_repo
            .create(Program {
                id: Uuid::new_v4(),
                name: format!("{} Workshop", name),
                description: Some(Sentence(4..9).fake()),
                price_member: (30..100).fake::<i64>() * 1000,
                price_non_member: (100..250).fake::<i64>() * 1000,
                starts_at: Some(now + Duration::days((14..90).fake::<i64>())),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await?;
        println!("  ✅ Created {}", program.name);
    }

    println!("🎟️  Creating membership packages...");

    for (name, price, months) in [
        ("Student Annual", 100_000_i64, Some(12)),
        ("Professional Annual", 250_000, Some(12)),
        ("Lifetime", 2_000_000, None),
    ] {
        package_repo
            .create(MembershipPackage {
                id: Uuid::new_v4(),
                name: name.to_string(),
                description: Some(Sentence(4..9).fake()),
                price,
                duration_months: months,
                created_at: now,
                updated_at: now,
            })
            .await?;
        println!("  ✅ Created {} ({} IDR)", name, price);
    }

    println!("🎉 Seeding complete!");
    Ok(())
}
