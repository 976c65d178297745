//! Demo data.
//!
//! Creates one account per role, two stores for the owner and two ratings
//! from the regular user. Skips everything when the admin account already
//! exists, so the command can be rerun safely.

use storerate_api::db::{PgRepository, RatingRepository, StoreRepository, UserRepository};
use storerate_api::models::{CreateUserRequest, NewStore, User};
use storerate_api::services::auth::create_account;
use storerate_core::{Address, DisplayName, Email, RatingValue};

use super::{CommandError, connect};

/// Password shared by every seeded account.
const SEED_PASSWORD: &str = "Admin@1234";

struct SeedUser {
    name: &'static str,
    email: &'static str,
    address: &'static str,
    role: &'static str,
}

const USERS: [SeedUser; 3] = [
    SeedUser {
        name: "System Administrator User",
        email: "admin@storerating.com",
        address: "123 Admin Street, Admin City, Admin State 12345",
        role: "ADMIN",
    },
    SeedUser {
        name: "Store Owner Business Manager",
        email: "owner@storerating.com",
        address: "456 Business Avenue, Business City, Business State 67890",
        role: "OWNER",
    },
    SeedUser {
        name: "Regular User Customer Person",
        email: "user@storerating.com",
        address: "789 Customer Lane, Customer City, Customer State 13579",
        role: "USER",
    },
];

/// `(name, email, address, rating from the regular user)`
const STORES: [(&str, &str, &str, i64); 2] = [
    (
        "Amazing Electronics Store and More",
        "info@amazingstore.com",
        "100 Electronics Boulevard, Tech City, Tech State 11111",
        5,
    ),
    (
        "Super Fresh Grocery Market Chain",
        "contact@supermarket.com",
        "200 Fresh Food Street, Grocery Town, Food State 22222",
        4,
    ),
];

fn rejected(e: impl std::fmt::Display) -> CommandError {
    CommandError::Rejected(e.to_string())
}

/// Seed the demo data.
///
/// # Errors
///
/// Returns an error if the connection fails or a row is rejected.
pub async fn run() -> Result<(), CommandError> {
    let repo = PgRepository::new(connect().await?);

    let admin_email = Email::parse(USERS[0].email).map_err(rejected)?;
    if repo
        .find_user_by_email(&admin_email)
        .await
        .map_err(rejected)?
        .is_some()
    {
        tracing::warn!("Seed data already present, skipping");
        return Ok(());
    }

    let mut users: Vec<User> = Vec::with_capacity(USERS.len());
    for seed in &USERS {
        let request = CreateUserRequest {
            name: seed.name.to_owned(),
            email: seed.email.to_owned(),
            password: SEED_PASSWORD.to_owned(),
            address: seed.address.to_owned(),
            role: seed.role.to_owned(),
        };
        let (profile, role) = request.validate().map_err(rejected)?;
        let user = create_account(&repo, profile, role)
            .await
            .map_err(rejected)?;
        tracing::info!("Created {} {}", user.role, user.email);
        users.push(user);
    }
    let (owner, rater) = match users.as_slice() {
        [_, owner, rater] => (owner.id, rater.id),
        _ => return Err(rejected("seed users missing")),
    };

    for (name, email, address, value) in STORES {
        let store = repo
            .create_store(NewStore {
                name: DisplayName::parse(name).map_err(rejected)?,
                email: Email::parse(email).map_err(rejected)?,
                address: Address::parse(address).map_err(rejected)?,
                owner_id: owner,
            })
            .await
            .map_err(rejected)?;
        tracing::info!("Created store {}", store.name);

        let value = RatingValue::new(value).map_err(rejected)?;
        repo.upsert_rating(rater, store.id, value)
            .await
            .map_err(rejected)?;
    }

    tracing::info!("Seeding complete! Every account uses password {SEED_PASSWORD}");
    Ok(())
}
