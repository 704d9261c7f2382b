use std::collections::HashSet;

use horizon_core::matching::{rank_partners, PartnerCriteria};
use horizon_db::{connect_with_settings, migrations, Repositories, SeedDataset};

type SeedContractTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

async fn seeded_sql_store() -> SeedContractTestResult<Repositories> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("connect: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("migrate: {error}"))?;
    let repositories = Repositories::sql(pool);
    SeedDataset::load(&repositories).await.map_err(|error| format!("seed: {error}"))?;
    Ok(repositories)
}

#[tokio::test]
async fn seeded_sql_store_passes_verification() -> SeedContractTestResult {
    let repositories = seeded_sql_store().await?;

    let verification =
        SeedDataset::verify(&repositories).await.map_err(|error| format!("verify: {error}"))?;
    require!(verification.all_present, "failed checks: {:?}", verification.checks);

    let partners =
        repositories.partners.list_all().await.map_err(|error| format!("list: {error}"))?;
    require_eq!(partners.len(), SeedDataset::partners().len());
    require!(partners.iter().any(|partner| partner.erasmus_code == "DE-YOUTH-001"));
    Ok(())
}

#[tokio::test]
async fn seeded_catalog_honours_country_allow_list() -> SeedContractTestResult {
    let repositories = seeded_sql_store().await?;
    let catalog =
        repositories.partners.list_all().await.map_err(|error| format!("list: {error}"))?;

    let criteria = PartnerCriteria {
        project_focus: "Youth Work".to_string(),
        required_countries: vec!["Germany".to_string(), "Spain".to_string()],
        expertise_areas: vec!["Youth Work".to_string()],
        max_results: 10,
    };
    let matches = rank_partners(&catalog, &criteria);

    require!(!matches.potential_partners.is_empty(), "expected at least one partner");
    let allowed: HashSet<&str> = ["Germany", "Spain"].into_iter().collect();
    for partner in &matches.potential_partners {
        require!(
            allowed.contains(partner.country.as_str()),
            "{} is based in {}",
            partner.name,
            partner.country
        );
        require!((1..=10).contains(&partner.compatibility_score));
    }

    let again = rank_partners(&catalog, &criteria);
    require_eq!(again, matches);
    Ok(())
}
