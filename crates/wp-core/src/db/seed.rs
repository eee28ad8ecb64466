//! Database seeding utilities.
//!
//! Creates the initial admin account on first run so a fresh deployment can
//! be logged into.

#[cfg(feature = "database")]
use super::{create_user_repository, DbPool};
use super::UserRepository;
use crate::auth::{password::hash_password, Role, User};
use rand::Rng;
use tracing::{info, warn};

/// Default email of the seeded admin account.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@watchpost.local";

/// Credentials of a freshly seeded admin account.
#[derive(Debug, Clone)]
pub struct SeededAdmin {
    pub email: String,
    pub password: String,
    /// True when the password was generated rather than read from the environment.
    pub generated: bool,
}

/// Ensures an admin user exists in the database.
///
/// If the user table is empty, creates an Admin with:
/// - Email: from `WP_ADMIN_EMAIL`, or `admin@watchpost.local`
/// - Password: from `WP_ADMIN_PASSWORD`, or randomly generated
///
/// Returns `Ok(None)` when users already exist.
#[cfg(feature = "database")]
pub async fn ensure_admin_user(
    pool: &DbPool,
) -> Result<Option<SeededAdmin>, Box<dyn std::error::Error + Send + Sync>> {
    let user_repo = create_user_repository(pool);
    seed_admin(
        user_repo.as_ref(),
        std::env::var("WP_ADMIN_EMAIL").ok(),
        std::env::var("WP_ADMIN_PASSWORD").ok(),
    )
    .await
}

/// Seeds an admin into `user_repo` when it has no users.
pub async fn seed_admin(
    user_repo: &dyn UserRepository,
    email: Option<String>,
    password: Option<String>,
) -> Result<Option<SeededAdmin>, Box<dyn std::error::Error + Send + Sync>> {
    if user_repo.any_exist().await? {
        info!("Users already exist, skipping admin seed");
        return Ok(None);
    }

    let email = email
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ADMIN_EMAIL.to_string());

    let (password, generated) = match password.filter(|p| !p.is_empty()) {
        Some(password) => (password, false),
        None => {
            warn!("No WP_ADMIN_PASSWORD set, generated random password");
            (generate_secure_password(), true)
        }
    };

    let password_hash = hash_password(&password)?;
    let admin = User::new(&email, "Administrator", password_hash, Role::Admin);
    user_repo.create(&admin).await?;

    info!(email = %admin.email, "Created default admin user");

    Ok(Some(SeededAdmin {
        email: admin.email,
        password,
        generated,
    }))
}

/// Generates a 16 character password with at least one uppercase letter,
/// lowercase letter, digit, and symbol.
fn generate_secure_password() -> String {
    const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
    const DIGITS: &[u8] = b"0123456789";
    const SPECIAL: &[u8] = b"!@#$%^&*";

    let mut rng = rand::thread_rng();
    let mut password = Vec::with_capacity(16);

    password.push(UPPER[rng.gen_range(0..UPPER.len())]);
    password.push(LOWER[rng.gen_range(0..LOWER.len())]);
    password.push(DIGITS[rng.gen_range(0..DIGITS.len())]);
    password.push(SPECIAL[rng.gen_range(0..SPECIAL.len())]);

    let all: Vec<u8> = [UPPER, LOWER, DIGITS, SPECIAL].concat();
    for _ in 0..12 {
        password.push(all[rng.gen_range(0..all.len())]);
    }

    for i in (1..password.len()).rev() {
        let j = rng.gen_range(0..=i);
        password.swap(i, j);
    }

    password.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::db::mocks::MockUserRepository;

    #[test]
    fn test_generate_secure_password() {
        let password = generate_secure_password();

        assert_eq!(password.len(), 16);
        assert!(password.chars().any(|c| c.is_ascii_uppercase()));
        assert!(password.chars().any(|c| c.is_ascii_lowercase()));
        assert!(password.chars().any(|c| c.is_ascii_digit()));
        assert!(password.chars().any(|c| "!@#$%^&*".contains(c)));
    }

    #[tokio::test]
    async fn test_seed_admin_with_explicit_password() {
        let repo = MockUserRepository::new();
        let seeded = seed_admin(&repo, Some("Root@Corp.io".into()), Some("hunter22".into()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(seeded.email, "root@corp.io");
        assert!(!seeded.generated);

        let users = repo.snapshot().await;
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, Role::Admin);
        assert!(verify_password("hunter22", &users[0].password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_seed_admin_generates_password_and_runs_once() {
        let repo = MockUserRepository::new();
        let seeded = seed_admin(&repo, None, None).await.unwrap().unwrap();
        assert_eq!(seeded.email, DEFAULT_ADMIN_EMAIL);
        assert!(seeded.generated);
        assert_eq!(seeded.password.len(), 16);

        assert!(seed_admin(&repo, None, None).await.unwrap().is_none());
        assert_eq!(repo.snapshot().await.len(), 1);
    }
}
