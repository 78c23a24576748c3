/// Startup seeding of the default promo codes and the initial administrator
use crate::{
    context::AppContext,
    db::{
        account::AdministratorStore,
        promo::{NewPromoCode, PromoCodeRegistry},
    },
    error::PointsResult,
};
use tracing::info;

/// Code, point value, description
const DEFAULT_CODES: [(&str, i64, &str); 8] = [
    ("NORTEGAS2024", 200, "NorteGAS 2024 promotional code"),
    ("GASNATURAL", 300, "Natural gas code"),
    ("PROMO2024", 250, "Special 2024 promotion"),
    ("BIENVENIDO", 100, "Welcome code"),
    ("ESPECIAL", 150, "Special code"),
    ("BONUS", 75, "Bonus code"),
    ("REGALO", 200, "Gift code"),
    ("DEMO123", 50, "Demo code"),
];

/// Insert whatever seed data is missing. Existing rows are left untouched.
pub async fn run(ctx: &AppContext) -> PointsResult<()> {
    let mut tx = ctx.db.begin().await?;

    if ctx.config.seed.default_codes {
        let mut inserted = 0;
        for (code, point_value, description) in DEFAULT_CODES {
            if PromoCodeRegistry::find_by_code(&mut tx, code).await?.is_some() {
                continue;
            }

            PromoCodeRegistry::create(
                &mut tx,
                &NewPromoCode {
                    code: code.to_string(),
                    point_value,
                    description: Some(description.to_string()),
                    expires_at: None,
                    max_uses: None,
                },
            )
            .await?;
            inserted += 1;
        }

        if inserted > 0 {
            info!("Seeded {} default promo codes", inserted);
        }
    }

    if let Some(password) = &ctx.config.seed.admin_password {
        let email = &ctx.config.seed.admin_email;
        if AdministratorStore::find_by_email(&mut tx, email).await?.is_none() {
            let hash = ctx.account_manager.hash_password(password).await?;
            AdministratorStore::create(&mut tx, email, &ctx.config.seed.admin_name, &hash).await?;
            info!("Created initial administrator {}", email);
        }
    }

    tx.commit().await?;

    Ok(())
}
